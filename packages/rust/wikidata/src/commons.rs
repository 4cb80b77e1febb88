//! Wikimedia Commons `imageinfo` response parsing.

use scraper::Html;
use serde_json::Value;

use autoniche_shared::ImageMeta;

/// Query parameters for an `imageinfo` lookup of `file`.
pub(crate) fn imageinfo_params(file: &str) -> [(&'static str, String); 5] {
    [
        ("action", "query".into()),
        ("prop", "imageinfo".into()),
        ("iiprop", "extmetadata|url".into()),
        ("titles", format!("File:{file}")),
        ("format", "json".into()),
    ]
}

/// Attribution from the first page of an `imageinfo` response.
///
/// Returns `None` when the response carries no page or no `imageinfo` entry.
pub(crate) fn parse_imageinfo(body: &Value) -> Option<ImageMeta> {
    let page = body
        .get("query")?
        .get("pages")?
        .as_object()?
        .values()
        .next()?;
    let info = page.get("imageinfo")?.as_array()?.first()?;
    let ext = &info["extmetadata"];

    Some(ImageMeta {
        page: non_empty(info["descriptionurl"].as_str()),
        license: non_empty(ext["LicenseShortName"]["value"].as_str()),
        author: ext["Artist"]["value"]
            .as_str()
            .map(html_to_text)
            .and_then(|s| non_empty(Some(s.as_str()))),
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Commons returns the artist as an HTML fragment; keep only its text.
fn html_to_text(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    doc.root_element()
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
