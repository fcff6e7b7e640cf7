//! # In-Memory Search Index
//!
//! [`SearchIndex`] backed by a `DashMap`, for tests and local runs without a
//! cluster. Relevance is not modelled: every hit scores equally, so ordering
//! falls back to `primary_url`.

use super::index::{BlockQueryResults, MapQueryResults, QueryResults, SearchIndex};
use super::pagination;
use super::query::{BlockQuery, NodeQuery};
use crate::error::{NodeIndexError, Result};
use crate::state_machine::NodeStatus;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    documents: DashMap<String, Map<String, Value>>,
    fail_operations: AtomicBool,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.fail_operations.store(failing, AtomicOrdering::SeqCst);
    }

    pub fn get(&self, id: &str) -> Option<Map<String, Value>> {
        self.documents.get(id).map(|doc| doc.value().clone())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_available(&self) -> Result<()> {
        if self.fail_operations.load(AtomicOrdering::SeqCst) {
            return Err(NodeIndexError::SearchIndex(
                "in-memory search index is unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn matching(&self, predicate: impl Fn(&Map<String, Value>) -> bool) -> Vec<Map<String, Value>> {
        self.documents
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn ensure_index(&self) -> Result<()> {
        self.check_available()
    }

    async fn index_by_id(&self, id: &str, document: &Map<String, Value>) -> Result<()> {
        self.check_available()?;
        self.documents.insert(id.to_string(), document.clone());
        Ok(())
    }

    async fn update(&self, id: &str, fields: &Map<String, Value>) -> Result<()> {
        self.check_available()?;
        if let Some(mut document) = self.documents.get_mut(id) {
            for (key, value) in fields {
                document.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.check_available()?;
        self.documents.remove(id);
        Ok(())
    }

    async fn search(&self, query: &NodeQuery) -> Result<QueryResults> {
        self.check_available()?;
        let mut hits = self.matching(|doc| matches_query(doc, query));
        hits.sort_by(|a, b| text(a, "primary_url").cmp(text(b, "primary_url")));

        let number_of_results = hits.len() as i64;
        let result = page(hits, query.page, pagination::size(query.page_size), query.page_size);

        Ok(QueryResults {
            result,
            number_of_results,
            total_pages: pagination::total_pages(number_of_results, query.page_size),
        })
    }

    async fn export(&self, query: &BlockQuery) -> Result<BlockQueryResults> {
        self.check_available()?;
        let mut hits = self.matching(|doc| matches_schema(doc, query.schema.as_deref()));
        hits.sort_by(compare_export_key);

        let cursor = query.search_after.as_ref().map(|after| cursor_key(after));
        let result: Vec<_> = hits
            .into_iter()
            .filter(|doc| match &cursor {
                Some((last_updated, profile_url)) => {
                    export_key(doc) > (*last_updated, profile_url.as_str())
                }
                None => true,
            })
            .take(pagination::size(query.page_size) as usize)
            .collect();

        let sort = result.last().map(|doc| {
            let (last_updated, profile_url) = export_key(doc);
            vec![json!(last_updated), json!(profile_url)]
        });

        Ok(BlockQueryResults { result, sort })
    }

    async fn get_nodes(&self, query: &NodeQuery) -> Result<MapQueryResults> {
        self.check_available()?;
        let mut hits =
            self.matching(|doc| doc.contains_key("geolocation") && matches_query(doc, query));
        hits.sort_by(|a, b| text(a, "primary_url").cmp(text(b, "primary_url")));

        let number_of_results = hits.len() as i64;
        let result = page(
            hits,
            query.page,
            pagination::maximum_size(query.page_size),
            query.page_size,
        )
        .iter()
        .filter_map(super::elasticsearch::map_row)
        .collect();

        Ok(MapQueryResults {
            result,
            number_of_results,
            total_pages: pagination::total_pages(number_of_results, query.page_size),
        })
    }

    async fn remove_updated_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        self.check_available()?;
        let before_len = self.documents.len();
        self.documents.retain(|_, doc| {
            !(text(doc, "status") == status.as_str()
                && doc.get("last_updated").and_then(Value::as_i64).unwrap_or(0) < before)
        });
        Ok((before_len - self.documents.len()) as u64)
    }
}

fn page(
    hits: Vec<Map<String, Value>>,
    page: i64,
    size: i64,
    page_size: i64,
) -> Vec<Map<String, Value>> {
    hits.into_iter()
        .skip(pagination::from(page, page_size) as usize)
        .take(size as usize)
        .collect()
}

fn text<'a>(doc: &'a Map<String, Value>, field: &str) -> &'a str {
    doc.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn export_key(doc: &Map<String, Value>) -> (i64, &str) {
    (
        doc.get("last_updated").and_then(Value::as_i64).unwrap_or(0),
        text(doc, "profile_url"),
    )
}

fn compare_export_key(a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
    export_key(a).cmp(&export_key(b))
}

fn cursor_key(after: &[Value]) -> (i64, String) {
    let last_updated = after.first().and_then(Value::as_i64).unwrap_or(i64::MIN);
    let profile_url = after
        .get(1)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (last_updated, profile_url)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_text(doc: &Map<String, Value>, field: &str, value: Option<&str>) -> bool {
    value.map_or(true, |needle| contains_ignore_case(text(doc, field), needle))
}

fn matches_schema(doc: &Map<String, Value>, schema: Option<&str>) -> bool {
    let Some(prefix) = schema.map(str::to_lowercase) else {
        return true;
    };
    match doc.get("linked_schemas") {
        Some(Value::Array(schemas)) => schemas
            .iter()
            .filter_map(Value::as_str)
            .any(|s| s.to_lowercase().starts_with(&prefix)),
        Some(Value::String(s)) => s.to_lowercase().starts_with(&prefix),
        _ => false,
    }
}

fn matches_tags(doc: &Map<String, Value>, query: &NodeQuery) -> bool {
    let Some(tags) = query.tags.as_deref() else {
        return true;
    };
    let doc_tags: Vec<&str> = match doc.get("tags") {
        Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    let term_matches = |term: &str| {
        doc_tags.iter().any(|tag| {
            if query.tags_exact() {
                tag.split_whitespace().any(|word| word.eq_ignore_ascii_case(term))
            } else {
                contains_ignore_case(tag, term)
            }
        })
    };

    let mut terms = tags.split_whitespace();
    if query.tags_all() {
        terms.all(term_matches)
    } else {
        terms.any(term_matches)
    }
}

fn matches_geo(doc: &Map<String, Value>, query: &NodeQuery) -> bool {
    let (Some(lat), Some(lon), Some(range)) = (query.lat, query.lon, query.range.as_deref()) else {
        return true;
    };
    let Some(radius) = parse_distance(range) else {
        return false;
    };
    let Some(geolocation) = doc.get("geolocation") else {
        return false;
    };
    match (
        geolocation.get("lat").and_then(Value::as_f64),
        geolocation.get("lon").and_then(Value::as_f64),
    ) {
        (Some(doc_lat), Some(doc_lon)) => haversine_meters(lat, lon, doc_lat, doc_lon) <= radius,
        _ => false,
    }
}

fn matches_query(doc: &Map<String, Value>, query: &NodeQuery) -> bool {
    matches_text(doc, "name", query.name.as_deref())
        && matches_schema(doc, query.schema.as_deref())
        && query.last_updated.map_or(true, |gte| {
            doc.get("last_updated").and_then(Value::as_i64).unwrap_or(i64::MIN) >= gte
        })
        && matches_text(doc, "locality", query.locality.as_deref())
        && matches_text(doc, "region", query.region.as_deref())
        && matches_text(doc, "country", query.country.as_deref())
        && query.status.as_deref().map_or(true, |s| text(doc, "status") == s)
        && query.primary_url.as_deref().map_or(true, |u| text(doc, "primary_url") == u)
        && matches_geo(doc, query)
        && matches_tags(doc, query)
}

/// Distance strings such as `25km`, `500m` or `10mi`, in meters
fn parse_distance(range: &str) -> Option<f64> {
    let range = range.trim();
    let split = range
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(range.len());
    let (number, unit) = range.split_at(split);
    let value: f64 = number.parse().ok()?;
    let factor = match unit.trim() {
        "" | "m" => 1.0,
        "km" => 1_000.0,
        "mi" => 1_609.344,
        _ => return None,
    };
    Some(value * factor)
}

fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
}
