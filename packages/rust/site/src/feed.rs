//! RSS 2.0 feed.

use std::path::{Path, PathBuf};

use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use tracing::{debug, instrument};

use autoniche_shared::{AppConfig, AutoNicheError, Result};

use crate::{list_posts, read_post, write_atomic};

/// Maximum number of items in the feed.
pub const FEED_LIMIT: usize = 50;

const FEED_FILE: &str = "rss.xml";

/// Regenerate `{output_dir}/rss.xml` from the newest posts.
///
/// Returns `None` without touching disk when the feed is disabled.
#[instrument(skip_all)]
pub fn render_feed(config: &AppConfig) -> Result<Option<PathBuf>> {
    let site = &config.site;
    if !site.enable_rss {
        debug!("rss disabled, skipping feed");
        return Ok(None);
    }

    let mut items: Vec<Item> = Vec::new();
    for path in list_posts(site)?.into_iter().take(FEED_LIMIT) {
        let post = read_post(&site.base_url, &path)?;
        let guid = GuidBuilder::default()
            .value(post.url.clone())
            .permalink(true)
            .build();
        let pub_date = post
            .date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().to_rfc2822());

        items.push(
            ItemBuilder::default()
                .title(Some(post.title))
                .link(Some(post.url))
                .guid(Some(guid))
                .pub_date(pub_date)
                .build(),
        );
    }

    let base_url = site.base_url_trimmed();
    let channel = ChannelBuilder::default()
        .title(site.name.clone())
        .link(base_url.to_string())
        .description(format!("Latest posts from {}", site.name))
        .language(Some(site.language.clone()))
        .items(items)
        .build();

    let xml = channel
        .pretty_write_to(Vec::new(), b' ', 2)
        .map_err(|e| AutoNicheError::validation(format!("failed to serialize feed: {e}")))?;

    let path = Path::new(&site.output_dir).join(FEED_FILE);
    write_atomic(&path, &xml)?;

    debug!(path = %path.display(), items = channel.items().len(), "feed written");
    Ok(Some(path))
}
