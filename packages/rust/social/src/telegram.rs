//! Telegram Bot API `sendMessage`.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use autoniche_shared::{AutoNicheError, Result};

/// Bot token and target chat (channel username or numeric id).
#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Send `text` (Telegram HTML) to the configured chat.
pub(crate) async fn send(
    client: &Client,
    api_base: &str,
    credentials: &TelegramCredentials,
    text: &str,
) -> Result<()> {
    let url = format!(
        "{}/bot{}/sendMessage",
        api_base.trim_end_matches('/'),
        credentials.token
    );

    // Error messages must not carry the URL: it contains the bot token.
    let response = client
        .post(url)
        .json(&SendMessage {
            chat_id: &credentials.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: false,
        })
        .send()
        .await
        .map_err(|e| AutoNicheError::Network(format!("telegram: {}", e.without_url())))?;

    let status = response.status();
    let body: Option<ApiResponse> = response.json().await.ok();

    match body {
        Some(ApiResponse { ok: true, .. }) if status.is_success() => Ok(()),
        Some(ApiResponse {
            description: Some(description),
            ..
        }) => Err(AutoNicheError::Network(format!(
            "telegram: HTTP {status}: {description}"
        ))),
        _ => Err(AutoNicheError::Network(format!("telegram: HTTP {status}"))),
    }
}
