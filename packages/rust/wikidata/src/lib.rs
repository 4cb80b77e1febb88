//! Wikidata knowledge-graph client.
//!
//! Two roles in the pipeline:
//! - **candidate source**: run the niche SPARQL query and return a shuffled
//!   list of entity identifiers;
//! - **entity resolver**: fetch the publishable attributes of one identifier,
//!   then enrich its image with Wikimedia Commons attribution (best effort).

mod commons;
mod sparql;

use std::time::Duration;

use rand::seq::SliceRandom;
use reqwest::{Client, header};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use autoniche_shared::{AutoNicheError, Entity, ImageLookup, Result, WikidataConfig};

pub use sparql::extract_qids;

/// User-Agent string for knowledge-graph requests (required by Wikimedia policy).
const USER_AGENT: &str = concat!("AutoNiche/", env!("CARGO_PKG_VERSION"));

/// Media type of SPARQL JSON result sets.
const SPARQL_JSON: &str = "application/sparql-results+json";

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the SPARQL endpoint and the Commons API.
#[derive(Debug, Clone)]
pub struct WikidataClient {
    client: Client,
    endpoint: String,
    commons_api: String,
}

impl WikidataClient {
    /// Build a client from the `[wikidata]` config section.
    pub fn new(config: &WikidataConfig) -> Result<Self> {
        for (name, value) in [
            ("wikidata.endpoint", &config.endpoint),
            ("wikidata.commons_api", &config.commons_api),
        ] {
            Url::parse(value)
                .map_err(|e| AutoNicheError::config(format!("invalid {name} '{value}': {e}")))?;
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AutoNicheError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            commons_api: config.commons_api.clone(),
        })
    }

    /// Run the niche query and return candidate identifiers in random order.
    ///
    /// An empty list is a valid result here; the caller decides whether that
    /// is fatal.
    #[instrument(skip_all)]
    pub async fn candidate_ids(&self, query: &str) -> Result<Vec<String>> {
        let body = self.run_query(query).await?;
        let mut ids = extract_qids(&body);
        ids.shuffle(&mut rand::thread_rng());

        info!(candidates = ids.len(), "niche query returned candidates");
        Ok(ids)
    }

    /// Resolve one identifier into an [`Entity`].
    ///
    /// Missing attributes leave the corresponding fields empty. An item the
    /// endpoint knows nothing about yields a bare entity titled by its id.
    #[instrument(skip(self))]
    pub async fn resolve(&self, qid: &str, lang: &str) -> Result<Entity> {
        let body = self.run_query(&sparql::item_query(qid, lang)).await?;

        let Some(row) = sparql::bindings(&body).into_iter().next() else {
            warn!(qid, "item query returned no rows, publishing bare entity");
            return Ok(Entity::bare(qid));
        };

        let mut entity = sparql::entity_from_row(qid, row);

        if let Some(image) = entity.image.as_mut() {
            match self.lookup_image(&image.file).await {
                ImageLookup::Found(meta) => image.apply(meta),
                ImageLookup::Ignored(reason) => {
                    debug!(qid, file = %image.file, %reason, "image metadata unavailable");
                }
            }
        }

        debug!(qid, title = %entity.title, "entity resolved");
        Ok(entity)
    }

    /// Fetch attribution for a Commons file. Never fails; problems are
    /// reported as [`ImageLookup::Ignored`].
    pub async fn lookup_image(&self, file: &str) -> ImageLookup {
        let response = match self
            .client
            .get(&self.commons_api)
            .query(&commons::imageinfo_params(file))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ImageLookup::Ignored(format!("request failed: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return ImageLookup::Ignored(format!("HTTP {status}"));
        }

        match response.json::<Value>().await {
            Ok(body) => match commons::parse_imageinfo(&body) {
                Some(meta) => ImageLookup::Found(meta),
                None => ImageLookup::Ignored("no imageinfo in response".into()),
            },
            Err(e) => ImageLookup::Ignored(format!("invalid JSON: {e}")),
        }
    }

    /// POST a SPARQL query and decode the JSON result set.
    async fn run_query(&self, query: &str) -> Result<Value> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, SPARQL_JSON)
            .form(&[("query", query)])
            .send()
            .await
            .map_err(|e| AutoNicheError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AutoNicheError::Network(format!(
                "{}: HTTP {status}",
                self.endpoint
            )));
        }

        response.json::<Value>().await.map_err(|e| {
            AutoNicheError::parse(format!("{}: invalid SPARQL JSON: {e}", self.endpoint))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/json")
            .join(name);
        std::fs::read_to_string(&path)
            .unwrap_or_else(|_| panic!("missing fixture: {}", path.display()))
    }

    fn client_for(server: &MockServer) -> WikidataClient {
        let config = WikidataConfig {
            endpoint: format!("{}/sparql", server.uri()),
            commons_api: format!("{}/w/api.php", server.uri()),
            timeout_secs: 5,
        };
        WikidataClient::new(&config).unwrap()
    }

    #[test]
    fn rejects_invalid_endpoint() {
        let config = WikidataConfig {
            endpoint: "not a url".into(),
            ..WikidataConfig::default()
        };
        let err = WikidataClient::new(&config).unwrap_err();
        assert!(err.to_string().contains("wikidata.endpoint"));
    }

    #[tokio::test]
    async fn candidate_ids_parses_and_shuffles() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sparql"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(fixture("sparql-candidates.json"), SPARQL_JSON),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut ids = client.candidate_ids("SELECT ?item WHERE {}").await.unwrap();
        ids.sort();
        assert_eq!(ids, vec!["Q1", "Q2", "Q3"]);
    }

    #[tokio::test]
    async fn candidate_ids_propagates_http_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sparql"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.candidate_ids("SELECT ?item WHERE {}").await.unwrap_err();
        assert!(matches!(err, AutoNicheError::Network(_)));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn resolve_fills_fields_and_image_attribution() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sparql"))
            .and(body_string_contains("Q999"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(fixture("sparql-item.json"), SPARQL_JSON),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .and(query_param("titles", "File:Example.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(fixture("commons-imageinfo.json"), "application/json"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entity = client.resolve("Q999", "pl").await.unwrap();

        assert_eq!(entity.title, "Test Park");
        assert_eq!(entity.description.as_deref(), Some("Opis"));
        assert_eq!(entity.inception_year, Some(1980));
        let coords = entity.coordinates.unwrap();
        assert!((coords.lat - 50.06).abs() < 1e-9);
        assert!((coords.lon - 19.94).abs() < 1e-9);
        assert_eq!(entity.website.as_deref(), Some("https://example.org"));

        let image = entity.image.unwrap();
        assert_eq!(image.file, "Example.jpg");
        assert!(image.page.unwrap().contains("File:Example.jpg"));
        assert_eq!(image.license.as_deref(), Some("CC BY-SA"));
        assert_eq!(image.author.as_deref(), Some("Autor"));
    }

    #[tokio::test]
    async fn resolve_survives_commons_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sparql"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(fixture("sparql-item.json"), SPARQL_JSON),
            )
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entity = client.resolve("Q999", "pl").await.unwrap();

        let image = entity.image.unwrap();
        assert_eq!(image.file, "Example.jpg");
        assert!(image.page.is_none());
        assert!(image.license.is_none());
    }

    #[tokio::test]
    async fn resolve_empty_result_gives_bare_entity() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sparql"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"results": {"bindings": []}}"#, SPARQL_JSON),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let entity = client.resolve("Q5", "en").await.unwrap();
        assert_eq!(entity, Entity::bare("Q5"));
    }

    #[tokio::test]
    async fn lookup_image_reports_garbage_as_ignored() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let lookup = client.lookup_image("Example.jpg").await;
        assert!(matches!(lookup, ImageLookup::Ignored(_)));
    }
}
