//! End-to-end runs: candidates → rotation → resolve → publish → announce.
//!
//! State is loaded once, accumulated in memory and saved once per run. If an
//! entity fails midway, what was published so far is saved before the error
//! is returned, so a rerun only repeats the entity that failed
//! (at-least-once).

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use autoniche_shared::{AppConfig, Entity, Result};
use autoniche_site::{PublishedPost, list_posts, read_post, render_feed, render_index, write_post};
use autoniche_social::{AnnounceReport, Announcer};
use autoniche_storage::{RunState, StateStore};
use autoniche_wikidata::WikidataClient;

use crate::selector::{Rotation, next_batch};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Source of candidate identifiers and resolver of entities.
#[allow(async_fn_in_trait)]
pub trait KnowledgeGraph {
    /// Candidate identifiers for the niche query, in selection order.
    async fn candidate_ids(&self, query: &str) -> Result<Vec<String>>;
    /// Publishable attributes of one identifier.
    async fn resolve(&self, qid: &str, lang: &str) -> Result<Entity>;
}

impl KnowledgeGraph for WikidataClient {
    async fn candidate_ids(&self, query: &str) -> Result<Vec<String>> {
        WikidataClient::candidate_ids(self, query).await
    }

    async fn resolve(&self, qid: &str, lang: &str) -> Result<Entity> {
        WikidataClient::resolve(self, qid, lang).await
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Result of a `generate` run.
#[derive(Debug)]
pub struct GenerateSummary {
    /// Posts written in this run, in processing order.
    pub published: Vec<PublishedPost>,
    /// Whether this run started a new rotation.
    pub rotation: Rotation,
    /// Number of candidates returned by the niche query.
    pub candidates: usize,
    /// Regenerated index page.
    pub index: PathBuf,
    /// Regenerated feed, if enabled.
    pub feed: Option<PathBuf>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// One post and how each channel handled it.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub post: PublishedPost,
    pub report: AnnounceReport,
}

/// Result of `run_all`.
#[derive(Debug)]
pub struct RunSummary {
    pub generate: GenerateSummary,
    pub announcements: Vec<Announcement>,
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when an entity has been resolved.
    fn entity_resolved(&self, entity: &Entity, current: usize, total: usize);
    /// Called when a post file has been written.
    fn post_written(&self, post: &PublishedPost, current: usize, total: usize);
    /// Called when a post has been announced.
    fn announced(&self, announcement: &Announcement);
    /// Called when a generate run completes.
    fn done(&self, summary: &GenerateSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn entity_resolved(&self, _entity: &Entity, _current: usize, _total: usize) {}
    fn post_written(&self, _post: &PublishedPost, _current: usize, _total: usize) {}
    fn announced(&self, _announcement: &Announcement) {}
    fn done(&self, _summary: &GenerateSummary) {}
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Publish the next batch of entities, dated `date`.
///
/// 1. Load run state
/// 2. Query candidates (none at all is fatal; nothing is written)
/// 3. Select the batch, restarting the rotation if exhausted
/// 4. Resolve and publish each entity, recording it as processed
/// 5. Save run state
/// 6. Regenerate the index and feed
#[instrument(skip_all, fields(date = %date))]
pub async fn generate<G: KnowledgeGraph>(
    config: &AppConfig,
    graph: &G,
    store: &StateStore,
    date: NaiveDate,
    progress: &dyn ProgressReporter,
) -> Result<GenerateSummary> {
    let start = Instant::now();
    config.validate()?;

    progress.phase("Loading run state");
    let mut state = store.load()?;

    progress.phase("Querying candidates");
    let all_ids = graph.candidate_ids(&config.niche.sparql).await?;
    let selection = next_batch(&all_ids, &mut state, config.site.items_per_run)?;

    info!(
        candidates = all_ids.len(),
        batch = selection.ids.len(),
        rotation = ?selection.rotation,
        "batch selected"
    );

    progress.phase("Publishing posts");
    let published = match publish_batch(config, graph, &selection.ids, &mut state, date, progress)
        .await
    {
        Ok(published) => published,
        Err(e) => {
            warn!(error = %e, processed = state.len(), "run failed, saving progress");
            if let Err(save_err) = store.save(&state) {
                warn!(error = %save_err, "could not save progress after failure");
            }
            return Err(e);
        }
    };

    store.save(&state)?;

    progress.phase("Rendering index and feed");
    let index = render_index(config)?;
    let feed = render_feed(config)?;

    let summary = GenerateSummary {
        published,
        rotation: selection.rotation,
        candidates: all_ids.len(),
        index,
        feed,
        elapsed: start.elapsed(),
    };

    progress.done(&summary);
    info!(
        posts = summary.published.len(),
        elapsed_ms = summary.elapsed.as_millis(),
        "generate complete"
    );

    Ok(summary)
}

async fn publish_batch<G: KnowledgeGraph>(
    config: &AppConfig,
    graph: &G,
    ids: &[String],
    state: &mut RunState,
    date: NaiveDate,
    progress: &dyn ProgressReporter,
) -> Result<Vec<PublishedPost>> {
    let total = ids.len();
    let mut published = Vec::with_capacity(total);

    for (i, qid) in ids.iter().enumerate() {
        let entity = graph.resolve(qid, &config.site.language).await?;
        progress.entity_resolved(&entity, i + 1, total);

        let post = write_post(config, &entity, date)?;
        progress.post_written(&post, i + 1, total);

        if !state.mark_processed(qid.as_str()) {
            warn!(qid = %qid, "identifier already recorded in this rotation");
        }
        published.push(post);
    }

    Ok(published)
}

/// Announce each post in order. Channel failures are carried in the reports.
pub async fn announce(
    announcer: &Announcer,
    posts: &[PublishedPost],
    progress: &dyn ProgressReporter,
) -> Vec<Announcement> {
    let mut announcements = Vec::with_capacity(posts.len());

    for post in posts {
        let report = announcer.announce(&post.title, &post.url).await;
        let announcement = Announcement {
            post: post.clone(),
            report,
        };
        progress.announced(&announcement);
        announcements.push(announcement);
    }

    announcements
}

/// `generate`, then announce every post it wrote.
#[instrument(skip_all)]
pub async fn run_all<G: KnowledgeGraph>(
    config: &AppConfig,
    graph: &G,
    store: &StateStore,
    announcer: &Announcer,
    date: NaiveDate,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let generate = generate(config, graph, store, date, progress).await?;

    progress.phase("Announcing posts");
    let announcements = announce(announcer, &generate.published, progress).await;

    Ok(RunSummary {
        generate,
        announcements,
    })
}

/// Re-announce the newest `site.items_per_run` existing posts without
/// generating anything.
#[instrument(skip_all)]
pub async fn announce_latest(
    config: &AppConfig,
    announcer: &Announcer,
    progress: &dyn ProgressReporter,
) -> Result<Vec<Announcement>> {
    progress.phase("Reading latest posts");
    let mut posts = Vec::new();
    for path in list_posts(&config.site)?
        .into_iter()
        .take(config.site.items_per_run)
    {
        posts.push(read_post(&config.site.base_url, &path)?);
    }

    if posts.is_empty() {
        info!("no posts to announce");
        return Ok(Vec::new());
    }

    progress.phase("Announcing posts");
    Ok(announce(announcer, &posts, progress).await)
}
