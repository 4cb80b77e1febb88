//! Core domain types for AutoNiche entities.

use serde::{Deserialize, Serialize};

/// Base URL for human-facing Wikidata item pages.
const WIKIDATA_ITEM_BASE: &str = "https://www.wikidata.org/wiki/";

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A resolved knowledge-graph item, ready to be published.
///
/// Every attribute except the identifier and title is optional; a sparse
/// upstream record produces a sparse entity rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Knowledge-graph identifier (e.g. `Q1`).
    pub qid: String,
    /// Display title (falls back to the identifier).
    pub title: String,
    /// Short description in the site language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Year of inception/founding. Negative for BCE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inception_year: Option<i32>,
    /// Geographic location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Official website.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Representative image and its attribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

impl Entity {
    /// An entity with nothing but its identifier, used when the item query
    /// comes back empty.
    pub fn bare(qid: impl Into<String>) -> Self {
        let qid = qid.into();
        Self {
            title: qid.clone(),
            qid,
            description: None,
            inception_year: None,
            coordinates: None,
            website: None,
            image: None,
        }
    }

    /// Public Wikidata page for this entity.
    pub fn wikidata_url(&self) -> String {
        format!("{WIKIDATA_ITEM_BASE}{}", self.qid)
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// A Wikimedia Commons image reference with optional attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Commons file name (without the `File:` prefix).
    pub file: String,
    /// Commons description page URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Short license name (e.g. `CC BY-SA 4.0`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Author, as plain text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ImageRef {
    /// A reference with no attribution metadata yet.
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            page: None,
            license: None,
            author: None,
        }
    }

    /// Fill attribution fields from a successful metadata lookup.
    pub fn apply(&mut self, meta: ImageMeta) {
        self.page = meta.page;
        self.license = meta.license;
        self.author = meta.author;
    }
}

/// Attribution metadata returned by the image metadata service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMeta {
    pub page: Option<String>,
    pub license: Option<String>,
    pub author: Option<String>,
}

/// Outcome of the best-effort image metadata lookup.
///
/// Lookups never fail a run; a failure is carried as `Ignored` so callers
/// decide explicitly what to do with it.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageLookup {
    /// Metadata was retrieved.
    Found(ImageMeta),
    /// The lookup failed or returned nothing usable; the reason is kept for logs.
    Ignored(String),
}
