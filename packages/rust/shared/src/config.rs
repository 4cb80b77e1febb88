//! Application configuration for AutoNiche.
//!
//! The config file is `autoniche.toml`, looked up in this order:
//! an explicit `--config` path, `./autoniche.toml`, then
//! `~/.autoniche/autoniche.toml`. Missing sections fall back to defaults.
//!
//! Secrets never live in the file. Each credential is named by the
//! environment variable that holds it (e.g. `handle_env = "BLUESKY_HANDLE"`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AutoNicheError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "autoniche.toml";

/// Per-user config directory name under the home directory.
const CONFIG_DIR_NAME: &str = ".autoniche";

// ---------------------------------------------------------------------------
// Config structs (matching autoniche.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site identity and publishing switches.
    #[serde(default)]
    pub site: SiteConfig,

    /// The niche query.
    #[serde(default)]
    pub niche: NicheConfig,

    /// Persisted run state location.
    #[serde(default)]
    pub state: StateConfig,

    /// Knowledge-graph endpoints.
    #[serde(default)]
    pub wikidata: WikidataConfig,

    /// Affiliate block appended to every post.
    #[serde(default)]
    pub affiliate: AffiliateConfig,

    /// Social announcement settings.
    #[serde(default)]
    pub social: SocialConfig,
}

impl AppConfig {
    /// Check the settings a generate run cannot do without.
    pub fn validate(&self) -> Result<()> {
        if self.site.base_url.trim().is_empty() {
            return Err(AutoNicheError::config("site.base_url must be set"));
        }
        if self.niche.sparql.trim().is_empty() {
            return Err(AutoNicheError::config("niche.sparql must be set"));
        }
        if self.site.items_per_run == 0 {
            return Err(AutoNicheError::config("site.items_per_run must be at least 1"));
        }
        Ok(())
    }
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name, used as the feed title.
    #[serde(default = "default_site_name")]
    pub name: String,

    /// Public base URL without a trailing slash (e.g. `https://example.com`).
    #[serde(default)]
    pub base_url: String,

    /// Directory that receives `posts/`, `index.html` and `rss.xml`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Language code for labels, descriptions and the feed.
    #[serde(default = "default_language")]
    pub language: String,

    /// IANA timezone used to stamp post dates.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Maximum number of new posts per run.
    #[serde(default = "default_items_per_run")]
    pub items_per_run: usize,

    /// Embed the entity image in posts.
    #[serde(default)]
    pub enable_images: bool,

    /// Write `rss.xml`.
    #[serde(default = "default_true")]
    pub enable_rss: bool,

    /// Announce new posts on Bluesky.
    #[serde(default)]
    pub enable_bluesky: bool,

    /// Announce new posts on Telegram.
    #[serde(default)]
    pub enable_telegram: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            base_url: String::new(),
            output_dir: default_output_dir(),
            language: default_language(),
            timezone: default_timezone(),
            items_per_run: default_items_per_run(),
            enable_images: false,
            enable_rss: true,
            enable_bluesky: false,
            enable_telegram: false,
        }
    }
}

impl SiteConfig {
    /// Base URL with any trailing slash removed.
    pub fn base_url_trimmed(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn default_site_name() -> String {
    "AutoNiche".into()
}
fn default_output_dir() -> String {
    "docs".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_timezone() -> String {
    "Europe/Warsaw".into()
}
fn default_items_per_run() -> usize {
    3
}
fn default_true() -> bool {
    true
}

/// `[niche]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NicheConfig {
    /// Optional human-readable niche name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// SPARQL query selecting candidate items (bound to `?item`).
    #[serde(default)]
    pub sparql: String,
}

/// `[state]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    /// Path to the JSON file recording processed identifiers.
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_state_path() -> String {
    "data/state.json".into()
}

/// `[wikidata]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikidataConfig {
    /// SPARQL endpoint.
    #[serde(default = "default_sparql_endpoint")]
    pub endpoint: String,

    /// Wikimedia Commons API endpoint for image metadata.
    #[serde(default = "default_commons_api")]
    pub commons_api: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            endpoint: default_sparql_endpoint(),
            commons_api: default_commons_api(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_sparql_endpoint() -> String {
    "https://query.wikidata.org/sparql".into()
}
fn default_commons_api() -> String {
    "https://commons.wikimedia.org/w/api.php".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[affiliate]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffiliateConfig {
    /// Paragraph inserted near the end of every post.
    #[serde(default)]
    pub insert_paragraph: String,

    /// Links listed under the paragraph.
    #[serde(default)]
    pub links: Vec<AffiliateLink>,
}

/// `[[affiliate.links]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateLink {
    pub label: String,
    pub url: String,
}

/// `[social]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    /// Per-request timeout in seconds for social APIs.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub bluesky: BlueskyConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,
}

impl Default for SocialConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            bluesky: BlueskyConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

/// `[social.bluesky]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// Post text; supports `{{ title }}` and `{{ url }}`.
    #[serde(default = "default_bluesky_template")]
    pub post_template: String,

    /// PDS base URL.
    #[serde(default = "default_bluesky_service")]
    pub service: String,

    /// Name of the env var holding the account handle.
    #[serde(default = "default_bluesky_handle_env")]
    pub handle_env: String,

    /// Name of the env var holding the app password.
    #[serde(default = "default_bluesky_password_env")]
    pub password_env: String,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            post_template: default_bluesky_template(),
            service: default_bluesky_service(),
            handle_env: default_bluesky_handle_env(),
            password_env: default_bluesky_password_env(),
        }
    }
}

fn default_bluesky_template() -> String {
    "New post: {{ title }} - {{ url }}".into()
}
fn default_bluesky_service() -> String {
    "https://bsky.social".into()
}
fn default_bluesky_handle_env() -> String {
    "BLUESKY_HANDLE".into()
}
fn default_bluesky_password_env() -> String {
    "BLUESKY_PASSWORD".into()
}

/// `[social.telegram]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Message text (Telegram HTML); supports `{{ title }}` and `{{ url }}`.
    #[serde(default = "default_telegram_template")]
    pub post_template: String,

    /// Bot API base URL.
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Name of the env var holding the bot token.
    #[serde(default = "default_telegram_token_env")]
    pub token_env: String,

    /// Name of the env var holding the target channel or chat id.
    #[serde(default = "default_telegram_channel_env")]
    pub channel_env: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            post_template: default_telegram_template(),
            api_base: default_telegram_api_base(),
            token_env: default_telegram_token_env(),
            channel_env: default_telegram_channel_env(),
        }
    }
}

fn default_telegram_template() -> String {
    "New post: <b>{{ title }}</b>\n{{ url }}".into()
}
fn default_telegram_api_base() -> String {
    "https://api.telegram.org".into()
}
fn default_telegram_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".into()
}
fn default_telegram_channel_env() -> String {
    "TELEGRAM_CHANNEL".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Path of the working-directory config file (`./autoniche.toml`).
pub fn config_file_path() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Path of the per-user config file (`~/.autoniche/autoniche.toml`).
pub fn user_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AutoNicheError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Pick the config file to load, if any.
///
/// An explicit path is returned as-is (existence is checked by the loader).
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = config_file_path();
    if local.exists() {
        return Some(local);
    }

    user_config_path().ok().filter(|p| p.exists())
}

/// Load the application config. Returns defaults if no config file is found
/// and no explicit path was given.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match resolve_config_path(explicit) {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AutoNicheError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        AutoNicheError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Write a default config file. Refuses to overwrite an existing file.
/// Returns the path to the created file.
pub fn init_config(path: Option<&Path>) -> Result<PathBuf> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);

    if path.exists() {
        return Err(AutoNicheError::config(format!(
            "{} already exists; remove it first to regenerate defaults",
            path.display()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| AutoNicheError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| AutoNicheError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AutoNicheError::io(&path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path)
}

/// Read a secret from the environment variable named `var_name`.
///
/// Unset and empty variables are both treated as missing.
pub fn read_env_secret(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("an-config-test-{}", uuid::Uuid::now_v7()))
            .join(name)
    }

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("BLUESKY_HANDLE"));
        assert!(toml_str.contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.site.items_per_run, 3);
        assert_eq!(parsed.state.path, "data/state.json");
        assert_eq!(parsed.wikidata.endpoint, "https://query.wikidata.org/sparql");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[site]
name = "Parki"
base_url = "https://parki.example.com/"
language = "pl"
enable_telegram = true

[niche]
name = "National parks"
sparql = "SELECT ?item WHERE { ?item wdt:P31 wd:Q46169 }"

[[affiliate.links]]
label = "Guidebook"
url = "https://shop.example.com/guide"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.site.name, "Parki");
        assert_eq!(config.site.base_url_trimmed(), "https://parki.example.com");
        assert_eq!(config.site.output_dir, "docs");
        assert!(config.site.enable_rss);
        assert!(config.site.enable_telegram);
        assert!(!config.site.enable_bluesky);
        assert_eq!(config.affiliate.links.len(), 1);
        assert_eq!(config.social.telegram.token_env, "TELEGRAM_BOT_TOKEN");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_essentials() {
        let mut config = AppConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base_url"));

        config.site.base_url = "https://example.com".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("niche.sparql"));

        config.niche.sparql = "SELECT ?item WHERE {}".into();
        config.site.items_per_run = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_path_wins_resolution() {
        let path = Path::new("/definitely/not/here/autoniche.toml");
        assert_eq!(resolve_config_path(Some(path)), Some(path.to_path_buf()));
        assert!(load_config(Some(path)).is_err());
    }

    #[test]
    fn init_config_writes_defaults_once() {
        let path = temp_path("autoniche.toml");

        let written = init_config(Some(&path)).expect("init config");
        assert_eq!(written, path);

        let loaded = load_config_from(&path).expect("load written config");
        assert_eq!(loaded.site.timezone, "Europe/Warsaw");

        let again = init_config(Some(&path));
        assert!(again.unwrap_err().to_string().contains("already exists"));

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn missing_env_secret_is_none() {
        // Use a unique env var name to avoid interfering with other tests
        assert!(read_env_secret("AN_TEST_NONEXISTENT_SECRET_12345").is_none());
    }
}
