//! SPARQL result-set parsing.
//!
//! Works on the `application/sparql-results+json` shape:
//! `{"results": {"bindings": [{"var": {"type": "...", "value": "..."}}]}}`.
//! Bindings are read loosely as JSON objects so a malformed row is skipped
//! instead of failing the whole response.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};

use autoniche_shared::{Coordinates, Entity, ImageRef};

/// Entity URI prefixes accepted as candidate identifiers.
const ENTITY_PREFIXES: [&str; 2] = [
    "http://www.wikidata.org/entity/",
    "https://www.wikidata.org/entity/",
];

/// Binding variables tried, in order, when `?item` is absent.
const FALLBACK_KEYS: [&str; 3] = ["s", "x", "entity"];

type Binding = Map<String, Value>;

/// All binding rows of a result set. Non-object rows are dropped.
pub(crate) fn bindings(body: &Value) -> Vec<&Binding> {
    body.get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(Value::as_array)
        .map(|rows| rows.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

/// The string `value` of one variable in a binding row.
fn binding_value<'a>(binding: &'a Binding, key: &str) -> Option<&'a str> {
    binding.get(key)?.get("value")?.as_str()
}

/// Extract entity identifiers from a candidate result set.
///
/// Reads `?item`, falling back to the first present of `?s`, `?x`,
/// `?entity`. Values that are not Wikidata entity URIs are skipped.
/// Duplicates are collapsed, keeping the first occurrence.
pub fn extract_qids(body: &Value) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for row in bindings(body) {
        let uri = binding_value(row, "item")
            .filter(|v| !v.is_empty())
            .or_else(|| {
                FALLBACK_KEYS
                    .iter()
                    .find(|k| row.contains_key(**k))
                    .and_then(|k| binding_value(row, k))
            });

        let Some(qid) = uri.and_then(qid_from_uri) else {
            continue;
        };

        if seen.insert(qid.to_string()) {
            ids.push(qid.to_string());
        }
    }

    ids
}

/// `http://www.wikidata.org/entity/Q42` → `Q42`.
fn qid_from_uri(uri: &str) -> Option<&str> {
    let rest = ENTITY_PREFIXES.iter().find_map(|p| uri.strip_prefix(p))?;
    let qid = rest.rsplit('/').next()?;
    (!qid.is_empty()).then_some(qid)
}

/// SPARQL query fetching the publishable attributes of one item.
pub(crate) fn item_query(qid: &str, lang: &str) -> String {
    format!(
        r#"SELECT ?item ?itemLabel ?desc ?inception ?coord ?website ?image WHERE {{
  VALUES ?item {{ wd:{qid} }}
  OPTIONAL {{ ?item schema:description ?desc FILTER(LANG(?desc) = '{lang}'). }}
  OPTIONAL {{ ?item wdt:P571 ?inception. }}
  OPTIONAL {{ ?item wdt:P625 ?coord. }}
  OPTIONAL {{ ?item wdt:P856 ?website. }}
  OPTIONAL {{ ?item wdt:P18 ?image. }}
  SERVICE wikibase:label {{ bd:serviceParam wikibase:language '{lang},en'. }}
}}
LIMIT 1"#
    )
}

/// Build an entity from the first row of an item query.
///
/// The image, if any, carries only its file name; attribution is filled in by
/// the Commons lookup.
pub(crate) fn entity_from_row(qid: &str, row: &Binding) -> Entity {
    let non_empty = |key: &str| {
        binding_value(row, key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Entity {
        qid: qid.to_string(),
        title: non_empty("itemLabel").unwrap_or_else(|| qid.to_string()),
        description: non_empty("desc"),
        inception_year: binding_value(row, "inception").and_then(parse_year),
        coordinates: binding_value(row, "coord").and_then(parse_wkt_point),
        website: non_empty("website"),
        image: binding_value(row, "image")
            .and_then(image_file_name)
            .map(ImageRef::new),
    }
}

/// Year from an `xsd:dateTime` literal such as `1980-01-01T00:00:00Z` or
/// `-0499-01-01T00:00:00Z`.
pub(crate) fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    let (sign, rest) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let digits = rest.split('-').next()?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse::<i32>().ok().map(|year| sign * year)
}

/// Coordinates from a WKT literal `Point(lon lat)`, optionally prefixed by a
/// globe IRI.
pub(crate) fn parse_wkt_point(raw: &str) -> Option<Coordinates> {
    let start = raw.find("Point(")? + "Point(".len();
    let end = start + raw[start..].find(')')?;

    let mut parts = raw[start..end].split_whitespace();
    let lon = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(Coordinates { lat, lon })
}

/// Commons file name from a `Special:FilePath` URL, percent-decoded.
pub(crate) fn image_file_name(raw: &str) -> Option<String> {
    let segment = raw.trim().rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    Some(percent_decode_str(segment).decode_utf8_lossy().into_owned())
}
