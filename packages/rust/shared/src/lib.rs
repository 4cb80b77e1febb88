//! Shared types, error model, and configuration for AutoNiche.
//!
//! This crate is the foundation depended on by all other AutoNiche crates.
//! It provides:
//! - [`AutoNicheError`], the unified error type
//! - Domain types ([`Entity`], [`ImageRef`], [`ImageLookup`])
//! - Configuration ([`AppConfig`], [`SiteConfig`], config loading)

pub mod config;
pub mod error;
pub mod markup;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AffiliateConfig, AffiliateLink, AppConfig, BlueskyConfig, NicheConfig, SiteConfig,
    SocialConfig, StateConfig, TelegramConfig, WikidataConfig, config_file_path, init_config,
    load_config, load_config_from, read_env_secret, resolve_config_path, user_config_path,
};
pub use error::{AutoNicheError, Result};
pub use markup::escape_html;
pub use types::{Coordinates, Entity, ImageLookup, ImageMeta, ImageRef};
