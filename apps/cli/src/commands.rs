//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use autoniche_core::pipeline::{
    self, Announcement, GenerateSummary, ProgressReporter, SilentProgress,
};
use autoniche_core::selector::Rotation;
use autoniche_shared::{AppConfig, Entity, init_config, load_config, resolve_config_path};
use autoniche_site::PublishedPost;
use autoniche_social::Announcer;
use autoniche_storage::StateStore;
use autoniche_wikidata::WikidataClient;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// AutoNiche: turn a Wikidata niche into a steady stream of posts.
#[derive(Parser)]
#[command(
    name = "autoniche",
    version,
    about = "Publish posts about Wikidata entities from a niche query and announce them.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./autoniche.toml, then ~/.autoniche/autoniche.toml).
    #[arg(long, global = true, env = "AUTONICHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Hide the progress spinner.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Defaults to `run-all`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate the next batch of posts, then announce them.
    RunAll,

    /// Generate the next batch of posts, index and feed.
    Generate,

    /// Announce the newest existing posts again.
    Post,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "autoniche=info",
        1 => "autoniche=debug",
        _ => "autoniche=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let show_progress = !cli.quiet && matches!(cli.log_format, LogFormat::Text);

    match cli.command.unwrap_or(Command::RunAll) {
        Command::RunAll => cmd_run_all(config_path, show_progress).await,
        Command::Generate => cmd_generate(config_path, show_progress).await,
        Command::Post => cmd_post(config_path, show_progress).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn reporter(show_progress: bool) -> Box<dyn ProgressReporter> {
    if show_progress {
        Box::new(CliProgress::new())
    } else {
        Box::new(SilentProgress)
    }
}

fn state_store(config: &AppConfig) -> StateStore {
    StateStore::new(&config.state.path)
}

async fn cmd_run_all(config_path: Option<&Path>, show_progress: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let graph = WikidataClient::new(&config.wikidata)?;
    let announcer = Announcer::new(&config)?;
    let today = autoniche_site::today(&config.site)?;

    info!(%today, niche = config.niche.name.as_deref().unwrap_or("-"), "starting run");

    let progress = reporter(show_progress);
    let summary = pipeline::run_all(
        &config,
        &graph,
        &state_store(&config),
        &announcer,
        today,
        progress.as_ref(),
    )
    .await?;
    drop(progress);

    print_generate_summary(&summary.generate);
    print_announcements(&summary.announcements);
    Ok(())
}

async fn cmd_generate(config_path: Option<&Path>, show_progress: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let graph = WikidataClient::new(&config.wikidata)?;
    let today = autoniche_site::today(&config.site)?;

    info!(%today, niche = config.niche.name.as_deref().unwrap_or("-"), "starting generate");

    let progress = reporter(show_progress);
    let summary = pipeline::generate(
        &config,
        &graph,
        &state_store(&config),
        today,
        progress.as_ref(),
    )
    .await?;
    drop(progress);

    print_generate_summary(&summary);
    Ok(())
}

async fn cmd_post(config_path: Option<&Path>, show_progress: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let announcer = Announcer::new(&config)?;

    let progress = reporter(show_progress);
    let announcements = pipeline::announce_latest(&config, &announcer, progress.as_ref()).await?;
    drop(progress);

    if announcements.is_empty() {
        println!("No posts to announce in {}", config.site.output_dir);
    } else {
        print_announcements(&announcements);
    }
    Ok(())
}

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = init_config(config_path)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    match resolve_config_path(config_path) {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config file found, showing defaults"),
    }
    let config = load_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config).wrap_err("failed to render config")?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_generate_summary(summary: &GenerateSummary) {
    println!();
    if summary.rotation == Rotation::Restarted {
        println!("  All candidates covered; started a new rotation.");
    }
    println!(
        "  Published {} post(s) from {} candidate(s)",
        summary.published.len(),
        summary.candidates
    );
    for post in &summary.published {
        println!("    {}", post.path.display());
    }
    println!("  Index:  {}", summary.index.display());
    if let Some(feed) = &summary.feed {
        println!("  Feed:   {}", feed.display());
    }
    println!("  Time:   {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

fn print_announcements(announcements: &[Announcement]) {
    for a in announcements {
        println!("  {}", a.post.title);
        println!("    Bluesky:  {}", a.report.bluesky);
        println!("    Telegram: {}", a.report.telegram);
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn entity_resolved(&self, entity: &Entity, current: usize, total: usize) {
        self.spinner.set_message(format!(
            "Resolved [{current}/{total}] {} ({})",
            entity.title, entity.qid
        ));
    }

    fn post_written(&self, post: &PublishedPost, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Wrote [{current}/{total}] {}", post.file_name));
    }

    fn announced(&self, announcement: &Announcement) {
        self.spinner
            .set_message(format!("Announced {}", announcement.post.title));
    }

    fn done(&self, summary: &GenerateSummary) {
        self.spinner
            .set_message(format!("Generated {} post(s)", summary.published.len()));
    }
}
