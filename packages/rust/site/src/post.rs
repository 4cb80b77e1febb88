//! Markdown post rendering.
//!
//! Layout of a post:
//!
//! ```text
//! ---
//! title: "Tatra National Park"
//! date: 2024-05-01
//! qid: Q1
//! source: https://www.wikidata.org/wiki/Q1
//! ---
//!
//! # Tatra National Park
//!
//! <description>
//!
//! ## Facts
//!
//! - ...
//!
//! <image block, affiliate block>
//! ```

use std::path::Path;

use chrono::NaiveDate;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use tracing::{info, instrument, warn};

use autoniche_shared::{AppConfig, Entity, ImageRef, Result};

use crate::{PublishedPost, post_url, posts_dir, write_atomic};

/// Commons redirect serving the raw file for a name.
const COMMONS_FILE_PATH: &str = "https://commons.wikimedia.org/wiki/Special:FilePath/";

/// Width requested for embedded images.
const IMAGE_WIDTH: u32 = 1024;

/// Characters escaped in a Commons file name used as a URL path segment.
const FILE_NAME: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'(')
    .add(b')');

/// URL-safe slug for a title: transliterated, lowercased, hyphen-separated.
/// Titles with no sluggable characters fall back to the identifier.
pub fn make_slug(title: &str, qid: &str) -> String {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        slug::slugify(qid)
    } else {
        slug
    }
}

/// `{YYYY-MM-DD}-{slug}.md`
pub fn post_file_name(date: NaiveDate, slug: &str) -> String {
    format!("{}-{slug}.md", date.format("%Y-%m-%d"))
}

/// Render the Markdown body of a post for `entity`.
pub fn render_post(config: &AppConfig, entity: &Entity, date: NaiveDate) -> String {
    let mut out = String::from("---\n");
    out.push_str(&format!("title: {}\n", quote(&entity.title)));
    out.push_str(&format!("date: {}\n", date.format("%Y-%m-%d")));
    out.push_str(&format!("qid: {}\n", entity.qid));
    out.push_str(&format!("source: {}\n", entity.wikidata_url()));
    out.push_str("---\n\n");

    out.push_str(&format!("# {}\n\n", entity.title.trim()));

    if let Some(description) = &entity.description {
        out.push_str(&format!("{description}\n\n"));
    }

    out.push_str("## Facts\n\n");
    if let Some(year) = entity.inception_year {
        out.push_str(&format!("- **Established:** {}\n", format_year(year)));
    }
    if let Some(c) = entity.coordinates {
        out.push_str(&format!(
            "- **Location:** [{lat:.4}, {lon:.4}](https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map=12/{lat}/{lon})\n",
            lat = c.lat,
            lon = c.lon,
        ));
    }
    if let Some(website) = &entity.website {
        out.push_str(&format!("- **Website:** <{website}>\n"));
    }
    out.push_str(&format!(
        "- **Wikidata:** [{}]({})\n\n",
        entity.qid,
        entity.wikidata_url()
    ));

    if config.site.enable_images {
        if let Some(image) = &entity.image {
            render_image(&mut out, &entity.title, image);
        }
    }

    let affiliate = &config.affiliate;
    if !affiliate.insert_paragraph.trim().is_empty() {
        out.push_str(affiliate.insert_paragraph.trim());
        out.push_str("\n\n");
    }
    if !affiliate.links.is_empty() {
        for link in &affiliate.links {
            out.push_str(&format!("- [{}]({})\n", link.label, link.url));
        }
        out.push('\n');
    }

    out
}

/// Render and write the post for `entity`, dated `date`.
///
/// A file left by the same entity is overwritten. When another entity
/// already owns `{date}-{slug}.md`, the identifier is appended to the slug.
#[instrument(skip_all, fields(qid = %entity.qid))]
pub fn write_post(config: &AppConfig, entity: &Entity, date: NaiveDate) -> Result<PublishedPost> {
    let dir = posts_dir(&config.site);
    let slug = make_slug(&entity.title, &entity.qid);

    let mut file_name = post_file_name(date, &slug);
    if let Some(owner) = existing_qid(&dir.join(&file_name)) {
        if owner != entity.qid {
            warn!(%file_name, %owner, "post name taken by another entity, adding identifier");
            file_name = post_file_name(date, &format!("{slug}-{}", entity.qid.to_lowercase()));
        }
    }

    let path = dir.join(&file_name);
    if path.exists() {
        warn!(path = %path.display(), "post file already exists, overwriting");
    }

    let content = render_post(config, entity, date);
    write_atomic(&path, content.as_bytes())?;

    info!(path = %path.display(), "post written");
    Ok(PublishedPost {
        url: post_url(&config.site.base_url, &file_name),
        title: entity.title.trim().to_string(),
        date: Some(date),
        path,
        file_name,
    })
}

/// The `qid:` recorded in the front matter of an existing post file.
/// Files without front matter are owned by no one (empty string).
fn existing_qid(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let owner = content
        .strip_prefix("---\n")
        .and_then(|rest| rest.split("\n---").next())
        .and_then(|front| front.lines().find_map(|l| l.strip_prefix("qid:")))
        .map(|q| q.trim().to_string())
        .unwrap_or_default();
    Some(owner)
}

fn render_image(out: &mut String, title: &str, image: &ImageRef) {
    let encoded = utf8_percent_encode(&image.file.replace(' ', "_"), FILE_NAME).to_string();
    out.push_str(&format!(
        "![{title}]({COMMONS_FILE_PATH}{encoded}?width={IMAGE_WIDTH})\n\n"
    ));

    let mut credit = Vec::new();
    if let Some(author) = &image.author {
        credit.push(author.clone());
    }
    if let Some(license) = &image.license {
        credit.push(license.clone());
    }
    let source = image
        .page
        .as_deref()
        .map(|page| format!("[Wikimedia Commons]({page})"))
        .unwrap_or_else(|| "Wikimedia Commons".to_string());
    credit.push(source);

    out.push_str(&format!("*Image: {}*\n\n", credit.join(", ")));
}

/// Year with an era suffix for negative values.
fn format_year(year: i32) -> String {
    if year < 0 {
        format!("{} BCE", -year)
    } else {
        year.to_string()
    }
}

/// Double-quoted front matter scalar.
fn quote(value: &str) -> String {
    let escaped = value.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
