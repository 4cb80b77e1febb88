//! AutoNiche CLI: scheduled niche content pipeline.
//!
//! Picks entities from a Wikidata niche query, publishes them as Markdown
//! posts with an index and RSS feed, and announces them on social channels.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
