//! Bluesky (AT Protocol) posting over XRPC.
//!
//! Two calls per announcement: `com.atproto.server.createSession` to log in
//! with an app password, then `com.atproto.repo.createRecord` to write an
//! `app.bsky.feed.post` record. The post URL is attached as a link facet so
//! it renders as a clickable link.

use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use autoniche_shared::{AutoNicheError, Result};

const CREATE_SESSION: &str = "xrpc/com.atproto.server.createSession";
const CREATE_RECORD: &str = "xrpc/com.atproto.repo.createRecord";
const POST_COLLECTION: &str = "app.bsky.feed.post";
const LINK_FACET: &str = "app.bsky.richtext.facet#link";

/// Account handle and app password.
#[derive(Debug, Clone)]
pub struct BlueskyCredentials {
    pub handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: Value,
}

/// Log in and publish `text`. `link`, if found inside `text`, becomes a
/// link facet.
pub(crate) async fn post(
    client: &Client,
    service: &str,
    credentials: &BlueskyCredentials,
    text: &str,
    link: &str,
) -> Result<()> {
    let base = service.trim_end_matches('/');

    let response = client
        .post(format!("{base}/{CREATE_SESSION}"))
        .json(&SessionRequest {
            identifier: &credentials.handle,
            password: &credentials.password,
        })
        .send()
        .await
        .map_err(|e| AutoNicheError::Network(format!("bluesky login: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AutoNicheError::Network(format!(
            "bluesky login: HTTP {status}: {body}"
        )));
    }

    let session: Session = response
        .json()
        .await
        .map_err(|e| AutoNicheError::parse(format!("bluesky session: {e}")))?;
    debug!(did = %session.did, "bluesky session created");

    let response = client
        .post(format!("{base}/{CREATE_RECORD}"))
        .bearer_auth(&session.access_jwt)
        .json(&CreateRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: post_record(text, link),
        })
        .send()
        .await
        .map_err(|e| AutoNicheError::Network(format!("bluesky post: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AutoNicheError::Network(format!(
            "bluesky post: HTTP {status}: {body}"
        )));
    }

    Ok(())
}

/// The `app.bsky.feed.post` record for `text`.
fn post_record(text: &str, link: &str) -> Value {
    let mut record = json!({
        "$type": POST_COLLECTION,
        "text": text,
        "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });

    // Facet offsets are UTF-8 byte offsets.
    if let Some(start) = (!link.is_empty()).then(|| text.find(link)).flatten() {
        record["facets"] = json!([{
            "index": { "byteStart": start, "byteEnd": start + link.len() },
            "features": [{ "$type": LINK_FACET, "uri": link }],
        }]);
    }

    record
}
