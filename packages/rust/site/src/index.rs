//! Site index page.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use autoniche_shared::{AppConfig, Result, escape_html};

use crate::{list_posts, read_post, write_atomic};

const INDEX_FILE: &str = "index.html";

/// Regenerate `{output_dir}/index.html` from the posts on disk, newest first.
#[instrument(skip_all)]
pub fn render_index(config: &AppConfig) -> Result<PathBuf> {
    let site = &config.site;
    let name = escape_html(&site.name);

    let mut items = String::new();
    let paths = list_posts(site)?;
    for path in &paths {
        let post = read_post(&site.base_url, path)?;
        let stem = post.file_name.trim_end_matches(".md");
        let date = post
            .date
            .map(|d| format!(" <time datetime=\"{d}\">{d}</time>"))
            .unwrap_or_default();
        let _ = writeln!(
            items,
            "      <li><a href=\"posts/{}.html\">{}</a>{date}</li>",
            escape_html(stem),
            escape_html(&post.title),
        );
    }

    let feed_link = if site.enable_rss {
        format!(
            "\n    <link rel=\"alternate\" type=\"application/rss+xml\" title=\"{name}\" href=\"rss.xml\">"
        )
    } else {
        String::new()
    };

    let html = format!(
        r#"<!doctype html>
<html lang="{lang}">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{name}</title>{feed_link}
  </head>
  <body>
    <h1>{name}</h1>
    <ul>
{items}    </ul>
  </body>
</html>
"#,
        lang = escape_html(&site.language),
    );

    let path = Path::new(&site.output_dir).join(INDEX_FILE);
    write_atomic(&path, html.as_bytes())?;

    debug!(path = %path.display(), posts = paths.len(), "index written");
    Ok(path)
}
