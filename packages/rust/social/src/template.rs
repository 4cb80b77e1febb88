//! Announcement text templates.
//!
//! Supports two placeholders, `{{ title }}` and `{{ url }}`; whitespace
//! inside the braces is optional. Anything else is left as written.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Substitute `title` and `url` into `template`.
pub fn render_template(template: &str, title: &str, url: &str) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\{\{\s*(title|url)\s*\}\}").expect("valid regex")
    });

    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "title" => title.to_string(),
            _ => url.to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_both_placeholders() {
        let text = render_template("New: {{ title }} - {{ url }}", "Morskie Oko", "https://x/p.html");
        assert_eq!(text, "New: Morskie Oko - https://x/p.html");
    }

    #[test]
    fn whitespace_inside_braces_is_optional() {
        let text = render_template("{{title}}|{{  url  }}|{{ title}}", "T", "U");
        assert_eq!(text, "T|U|T");
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let text = render_template("{{ date }} {{ title }}", "T", "U");
        assert_eq!(text, "{{ date }} T");
    }

    #[test]
    fn substituted_values_are_not_reexpanded() {
        let text = render_template("{{ title }}", "{{ url }}", "U");
        assert_eq!(text, "{{ url }}");
    }
}
