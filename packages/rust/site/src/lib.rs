//! Static site publisher.
//!
//! Writes one Markdown post per entity and regenerates the site-level
//! artifacts from whatever posts exist on disk:
//!
//! ```text
//! <output_dir>/
//! ├── index.html
//! ├── rss.xml          (when site.enable_rss)
//! └── posts/
//!     ├── 2024-05-02-morskie-oko.md
//!     └── 2024-05-01-tatra-national-park.md
//! ```
//!
//! Public URLs are derived from file names only
//! (`{base_url}/posts/{stem}.html`), so the feed and the announcer agree on
//! them without any extra bookkeeping.

mod feed;
mod index;
mod post;

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use autoniche_shared::{AutoNicheError, Result, SiteConfig};

pub use feed::{FEED_LIMIT, render_feed};
pub use index::render_index;
pub use post::{make_slug, post_file_name, render_post, write_post};

/// Subdirectory of `output_dir` holding the posts.
const POSTS_DIR: &str = "posts";

/// Title used when a post file has no `# ` heading.
const FALLBACK_TITLE: &str = "Post";

// ---------------------------------------------------------------------------
// PublishedPost
// ---------------------------------------------------------------------------

/// A post file on disk and its public identity.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPost {
    /// Path of the Markdown file.
    pub path: PathBuf,
    /// File name, e.g. `2024-05-01-tatra-national-park.md`.
    pub file_name: String,
    /// Title from the first top-level heading.
    pub title: String,
    /// Public URL of the rendered page.
    pub url: String,
    /// Publication date from the file-name prefix, if well-formed.
    pub date: Option<NaiveDate>,
}

/// Directory holding the post files.
pub fn posts_dir(site: &SiteConfig) -> PathBuf {
    Path::new(&site.output_dir).join(POSTS_DIR)
}

/// Public URL for a post file name: `{base_url}/posts/{stem}.html`.
pub fn post_url(base_url: &str, file_name: &str) -> String {
    let stem = file_name.strip_suffix(".md").unwrap_or(file_name);
    format!("{}/{POSTS_DIR}/{stem}.html", base_url.trim_end_matches('/'))
}

/// Date encoded in the first ten characters of a post file name.
pub fn date_from_file_name(file_name: &str) -> Option<NaiveDate> {
    let prefix = file_name.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Title of a Markdown document: the first line starting with `# `.
pub fn extract_title(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Read an existing post file and derive its title and URL.
pub fn read_post(base_url: &str, path: &Path) -> Result<PublishedPost> {
    let content = std::fs::read_to_string(path).map_err(|e| AutoNicheError::io(path, e))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AutoNicheError::validation(format!("not a file: {}", path.display())))?;

    Ok(PublishedPost {
        path: path.to_path_buf(),
        title: extract_title(&content).unwrap_or_else(|| FALLBACK_TITLE.to_string()),
        url: post_url(base_url, &file_name),
        date: date_from_file_name(&file_name),
        file_name,
    })
}

/// Post files sorted newest first (by file name, descending).
///
/// A missing posts directory is treated as an empty site.
pub fn list_posts(site: &SiteConfig) -> Result<Vec<PathBuf>> {
    let dir = posts_dir(site);
    if !dir.exists() {
        debug!(dir = %dir.display(), "posts directory does not exist yet");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(&dir).map_err(|e| AutoNicheError::io(&dir, e))?;

    let mut posts = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| AutoNicheError::io(&dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            posts.push(path);
        }
    }

    posts.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(posts)
}

/// Write `content` to `target` via a sibling temp file and a rename.
pub(crate) fn write_atomic(target: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AutoNicheError::io(parent, e))?;
    }

    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| AutoNicheError::validation(format!("not a file: {}", target.display())))?;
    let temp = target.with_file_name(format!(".{name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| AutoNicheError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| AutoNicheError::io(target, e))?;
    Ok(())
}

/// Today's date in the site's timezone.
pub fn today(site: &SiteConfig) -> Result<NaiveDate> {
    let tz: Tz = site.timezone.parse().map_err(|e| {
        AutoNicheError::validation(format!("unknown timezone '{}': {e}", site.timezone))
    })?;
    Ok(Utc::now().with_timezone(&tz).date_naive())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::PathBuf;

    use autoniche_shared::{AppConfig, Coordinates, Entity};

    /// A config writing into a fresh temp directory.
    pub fn temp_config() -> (PathBuf, AppConfig) {
        let dir = std::env::temp_dir().join(format!("an-site-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = AppConfig::default();
        config.site.name = "Test Site".into();
        config.site.base_url = "https://example.com".into();
        config.site.output_dir = dir.join("docs").to_string_lossy().into_owned();
        config.site.language = "pl".into();
        config.affiliate.insert_paragraph = "Rek.".into();
        config.affiliate.links = vec![autoniche_shared::AffiliateLink {
            label: "L1".into(),
            url: "https://x".into(),
        }];
        (dir, config)
    }

    pub fn park() -> Entity {
        Entity {
            qid: "Q1".into(),
            title: "Testowy Park Narodowy".into(),
            description: Some("Opis".into()),
            inception_year: Some(1980),
            coordinates: Some(Coordinates {
                lat: 50.06,
                lon: 19.94,
            }),
            website: Some("https://example.org".into()),
            image: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{park, temp_config};

    #[test]
    fn post_url_is_derived_from_file_name() {
        assert_eq!(
            post_url("https://example.com/", "2024-05-01-morskie-oko.md"),
            "https://example.com/posts/2024-05-01-morskie-oko.html"
        );
    }

    #[test]
    fn dates_from_file_names() {
        assert_eq!(
            date_from_file_name("2024-05-01-morskie-oko.md"),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
        assert_eq!(date_from_file_name("notes.md"), None);
        assert_eq!(date_from_file_name("ąę"), None);
    }

    #[test]
    fn extracts_first_h1() {
        let md = "---\ntitle: \"x\"\n---\n\n# Morskie Oko\n\n## Facts\n";
        assert_eq!(extract_title(md).as_deref(), Some("Morskie Oko"));
        assert_eq!(extract_title("## only h2\n"), None);
    }

    #[test]
    fn lists_posts_newest_first() {
        let (dir, config) = temp_config();
        let posts = posts_dir(&config.site);
        std::fs::create_dir_all(&posts).unwrap();
        for name in ["2024-01-02-b.md", "2024-03-01-c.md", "2023-12-31-a.md", "notes.txt"] {
            std::fs::write(posts.join(name), "# x\n").unwrap();
        }

        let listed: Vec<String> = list_posts(&config.site)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(listed, ["2024-03-01-c.md", "2024-01-02-b.md", "2023-12-31-a.md"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_posts_dir_lists_nothing() {
        let (dir, config) = temp_config();
        assert!(list_posts(&config.site).unwrap().is_empty());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_post_round_trips_written_post() {
        let (dir, config) = temp_config();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let written = write_post(&config, &park(), date).unwrap();

        let read = read_post(&config.site.base_url, &written.path).unwrap();
        assert_eq!(read, written);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn today_rejects_unknown_timezone() {
        let mut site = SiteConfig::default();
        assert!(today(&site).is_ok());
        site.timezone = "Mars/Olympus".into();
        assert!(today(&site).unwrap_err().to_string().contains("Mars/Olympus"));
    }
}
