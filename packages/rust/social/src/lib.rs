//! Social announcements for newly published posts.
//!
//! Each channel is independent and best effort: a disabled channel, missing
//! credentials, or an API failure is reported as an [`AnnounceOutcome`] and
//! never fails the run.

mod bluesky;
mod telegram;
mod template;

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use tracing::{info, instrument, warn};

use autoniche_shared::{
    AppConfig, AutoNicheError, BlueskyConfig, Result, TelegramConfig, escape_html,
    read_env_secret,
};

pub use bluesky::BlueskyCredentials;
pub use telegram::TelegramCredentials;
pub use template::render_template;

/// User-Agent string for social API requests.
const USER_AGENT: &str = concat!("AutoNiche/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of announcing one post on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// The channel is switched off in the config.
    Disabled,
    /// The channel is on but could not be attempted.
    Skipped(String),
    /// The post was published.
    Posted,
    /// The API call failed.
    Failed(String),
}

impl fmt::Display for AnnounceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Skipped(reason) => f.write_str(reason),
            Self::Posted => f.write_str("posted"),
            Self::Failed(message) => write!(f, "error: {message}"),
        }
    }
}

/// Per-channel outcomes for one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceReport {
    pub bluesky: AnnounceOutcome,
    pub telegram: AnnounceOutcome,
}

impl fmt::Display for AnnounceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bluesky: {}, telegram: {}", self.bluesky, self.telegram)
    }
}

// ---------------------------------------------------------------------------
// Announcer
// ---------------------------------------------------------------------------

/// Posts announcements to the enabled channels.
#[derive(Debug, Clone)]
pub struct Announcer {
    client: Client,
    enable_bluesky: bool,
    enable_telegram: bool,
    bluesky: BlueskyConfig,
    telegram: TelegramConfig,
}

impl Announcer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.social.timeout_secs))
            .build()
            .map_err(|e| AutoNicheError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            enable_bluesky: config.site.enable_bluesky,
            enable_telegram: config.site.enable_telegram,
            bluesky: config.social.bluesky.clone(),
            telegram: config.social.telegram.clone(),
        })
    }

    /// Announce one post on every channel, sequentially.
    ///
    /// Credentials are read from the environment variables named in the
    /// config at call time.
    #[instrument(skip(self))]
    pub async fn announce(&self, title: &str, url: &str) -> AnnounceReport {
        let bluesky_credentials = match (
            read_env_secret(&self.bluesky.handle_env),
            read_env_secret(&self.bluesky.password_env),
        ) {
            (Some(handle), Some(password)) => Some(BlueskyCredentials { handle, password }),
            _ => None,
        };
        let telegram_credentials = match (
            read_env_secret(&self.telegram.token_env),
            read_env_secret(&self.telegram.channel_env),
        ) {
            (Some(token), Some(chat_id)) => Some(TelegramCredentials { token, chat_id }),
            _ => None,
        };

        let report = AnnounceReport {
            bluesky: self
                .announce_bluesky(bluesky_credentials.as_ref(), title, url)
                .await,
            telegram: self
                .announce_telegram(telegram_credentials.as_ref(), title, url)
                .await,
        };

        info!(%report, "announcement finished");
        report
    }

    /// Bluesky channel with explicitly supplied credentials.
    pub async fn announce_bluesky(
        &self,
        credentials: Option<&BlueskyCredentials>,
        title: &str,
        url: &str,
    ) -> AnnounceOutcome {
        if !self.enable_bluesky {
            return AnnounceOutcome::Disabled;
        }
        let Some(credentials) = credentials else {
            return AnnounceOutcome::Skipped("Bluesky creds missing; skipped".into());
        };

        let text = render_template(&self.bluesky.post_template, title, url);
        match bluesky::post(&self.client, &self.bluesky.service, credentials, &text, url).await {
            Ok(()) => AnnounceOutcome::Posted,
            Err(e) => {
                warn!(error = %e, "bluesky announcement failed");
                AnnounceOutcome::Failed(e.to_string())
            }
        }
    }

    /// Telegram channel with explicitly supplied credentials. The title is
    /// HTML-escaped before templating.
    pub async fn announce_telegram(
        &self,
        credentials: Option<&TelegramCredentials>,
        title: &str,
        url: &str,
    ) -> AnnounceOutcome {
        if !self.enable_telegram {
            return AnnounceOutcome::Disabled;
        }
        let Some(credentials) = credentials else {
            return AnnounceOutcome::Skipped("Telegram creds missing; skipped".into());
        };

        let text = render_template(&self.telegram.post_template, &escape_html(title), url);
        match telegram::send(&self.client, &self.telegram.api_base, credentials, &text).await {
            Ok(()) => AnnounceOutcome::Posted,
            Err(e) => {
                warn!(error = %e, "telegram announcement failed");
                AnnounceOutcome::Failed(e.to_string())
            }
        }
    }
}
