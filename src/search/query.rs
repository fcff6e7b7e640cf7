//! # Search Query Builder
//!
//! Translates [`NodeQuery`] and [`BlockQuery`] into Elasticsearch query DSL
//! (plain `serde_json` values). Relevance-bearing clauses go into `bool.must`;
//! the geo-distance clause goes into `bool.filter` so it never affects the score.

use super::pagination;
use crate::constants::pagination::{DEFAULT_PAGE, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Result shape requested from the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Full documents with offset pagination
    List,
    /// Geolocated nodes only, projected for map rendering
    Map,
}

/// Directory search parameters (`GET /nodes?...`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeQuery {
    pub name: Option<String>,
    pub schema: Option<String>,
    pub last_updated: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Radius with unit, e.g. `25km`
    pub range: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
    /// `and` requires every tag to match
    pub tags_filter: Option<String>,
    /// `true` disables fuzzy tag matching
    pub tags_exact: Option<String>,
    pub primary_url: Option<String>,
    pub page: i64,
    pub page_size: i64,
}

impl Default for NodeQuery {
    fn default() -> Self {
        Self {
            name: None,
            schema: None,
            last_updated: None,
            lat: None,
            lon: None,
            range: None,
            locality: None,
            region: None,
            country: None,
            status: None,
            tags: None,
            tags_filter: None,
            tags_exact: None,
            primary_url: None,
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Export parameters; `search_after` is the cursor returned by the previous block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for BlockQuery {
    fn default() -> Self {
        Self {
            schema: None,
            page_size: DEFAULT_PAGE_SIZE,
            search_after: None,
        }
    }
}

/// Query plus offset/limit, ready to be embedded in a `_search` body
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Value,
    pub from: i64,
    pub size: i64,
}

#[derive(Debug, Default)]
pub struct QueryBuilder {
    sub_queries: Vec<Value>,
    filters: Vec<Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sub_query(&mut self, query: Value) -> &mut Self {
        self.sub_queries.push(query);
        self
    }

    pub fn add_filter(&mut self, query: Value) -> &mut Self {
        self.filters.push(query);
        self
    }

    /// Fuzzy match OR case-insensitive substring
    pub fn build_text_query(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(text) = value {
            let pattern = format!(".*{}.*", escape_regexp(&text.to_lowercase()));
            self.add_sub_query(json!({
                "bool": {
                    "should": [
                        { "match": { field: { "query": text, "fuzziness": "AUTO" } } },
                        { "regexp": { field: pattern } }
                    ]
                }
            }));
        }
        self
    }

    /// Case-insensitive prefix match
    pub fn build_wildcard_query(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(prefix) = value {
            self.add_sub_query(json!({
                "wildcard": { field: { "value": format!("{prefix}*"), "case_insensitive": true } }
            }));
        }
        self
    }

    pub fn build_range_query(&mut self, field: &str, gte: Option<i64>) -> &mut Self {
        if let Some(gte) = gte {
            self.add_sub_query(json!({ "range": { field: { "gte": gte } } }));
        }
        self
    }

    pub fn build_match_query(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.add_sub_query(json!({ "match": { field: { "query": value } } }));
        }
        self
    }

    /// Only applied when latitude, longitude and distance are all present
    pub fn build_geo_query(
        &mut self,
        lat: Option<f64>,
        lon: Option<f64>,
        distance: Option<&str>,
    ) -> &mut Self {
        if let (Some(lat), Some(lon), Some(distance)) = (lat, lon, distance) {
            self.add_filter(json!({
                "geo_distance": {
                    "distance": distance,
                    "geolocation": { "lat": lat, "lon": lon }
                }
            }));
        }
        self
    }

    pub fn build_exists_query(&mut self, field: &str) -> &mut Self {
        self.add_sub_query(json!({ "exists": { "field": field } }));
        self
    }

    /// `bool.must(sub_queries).filter(filters)`, or `match_all` when empty
    pub fn build(&self) -> Value {
        if self.sub_queries.is_empty() && self.filters.is_empty() {
            return json!({ "match_all": {} });
        }

        let mut bool_query = serde_json::Map::new();
        if !self.sub_queries.is_empty() {
            bool_query.insert("must".to_string(), Value::Array(self.sub_queries.clone()));
        }
        if !self.filters.is_empty() {
            bool_query.insert("filter".to_string(), Value::Array(self.filters.clone()));
        }
        json!({ "bool": bool_query })
    }
}

impl NodeQuery {
    pub fn tags_exact(&self) -> bool {
        self.tags_exact.as_deref() == Some("true")
    }

    pub fn tags_all(&self) -> bool {
        self.tags_filter.as_deref() == Some("and")
    }

    pub fn build(&self, mode: SearchMode, tags_fuzziness: &str) -> SearchRequest {
        let mut builder = QueryBuilder::new();

        builder
            .build_text_query("name", self.name.as_deref())
            .build_wildcard_query("linked_schemas", self.schema.as_deref())
            .build_range_query("last_updated", self.last_updated)
            .build_text_query("locality", self.locality.as_deref())
            .build_text_query("region", self.region.as_deref())
            .build_text_query("country", self.country.as_deref())
            .build_match_query("status", self.status.as_deref())
            .build_match_query("primary_url", self.primary_url.as_deref())
            .build_geo_query(self.lat, self.lon, self.range.as_deref());

        if let Some(tags) = self.tags.as_deref() {
            let fuzziness = if self.tags_exact() { "0" } else { tags_fuzziness };
            let operator = if self.tags_all() { "and" } else { "or" };
            builder.add_sub_query(json!({
                "match": {
                    "tags": { "query": tags, "operator": operator, "fuzziness": fuzziness }
                }
            }));
        }

        let size = match mode {
            SearchMode::List => pagination::size(self.page_size),
            SearchMode::Map => {
                builder.build_exists_query("geolocation");
                pagination::maximum_size(self.page_size)
            }
        };

        SearchRequest {
            query: builder.build(),
            from: pagination::from(self.page, self.page_size),
            size,
        }
    }
}

impl BlockQuery {
    pub fn build(&self) -> SearchRequest {
        let mut builder = QueryBuilder::new();
        builder.build_wildcard_query("linked_schemas", self.schema.as_deref());

        SearchRequest {
            query: builder.build(),
            from: 0,
            size: pagination::size(self.page_size),
        }
    }
}

/// Escape Lucene regexp operators so user text only matches literally
fn escape_regexp(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '.' | '?' | '+' | '*' | '|' | '{' | '}' | '[' | ']' | '(' | ')' | '"' | '\\' | '#'
                | '@' | '&' | '<' | '>' | '~'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_is_match_all_with_default_paging() {
        let request = NodeQuery::default().build(SearchMode::List, "AUTO");
        assert_eq!(request.query, json!({ "match_all": {} }));
        assert_eq!(request.from, 0);
        assert_eq!(request.size, 30);
    }

    #[test]
    fn test_text_query_shape() {
        let query = NodeQuery {
            name: Some("Open Data".into()),
            ..Default::default()
        };
        let request = query.build(SearchMode::List, "AUTO");
        let should = &request.query["bool"]["must"][0]["bool"]["should"];
        assert_eq!(should[0]["match"]["name"]["fuzziness"], "AUTO");
        assert_eq!(should[1]["regexp"]["name"], ".*open data.*");
    }

    #[test]
    fn test_tag_clause_fuzziness_and_operator() {
        let mut query = NodeQuery {
            tags: Some("rust search".into()),
            ..Default::default()
        };
        let clause = query.build(SearchMode::List, "1").query["bool"]["must"][0].clone();
        assert_eq!(clause["match"]["tags"]["fuzziness"], "1");
        assert_eq!(clause["match"]["tags"]["operator"], "or");

        query.tags_exact = Some("true".into());
        query.tags_filter = Some("and".into());
        let clause = query.build(SearchMode::List, "1").query["bool"]["must"][0].clone();
        assert_eq!(clause["match"]["tags"]["fuzziness"], "0");
        assert_eq!(clause["match"]["tags"]["operator"], "and");
    }

    #[test]
    fn test_geo_filter_requires_all_parts() {
        let partial = NodeQuery {
            lat: Some(1.0),
            lon: Some(2.0),
            ..Default::default()
        };
        assert_eq!(
            partial.build(SearchMode::List, "AUTO").query,
            json!({ "match_all": {} })
        );

        let full = NodeQuery {
            range: Some("25km".into()),
            ..partial
        };
        let query = full.build(SearchMode::List, "AUTO").query;
        assert!(query["bool"].get("must").is_none());
        assert_eq!(query["bool"]["filter"][0]["geo_distance"]["distance"], "25km");
        assert_eq!(query["bool"]["filter"][0]["geo_distance"]["geolocation"]["lat"], 1.0);
    }

    #[test]
    fn test_map_mode_requires_geolocation() {
        let query = NodeQuery {
            page_size: 50_000,
            ..Default::default()
        };
        let request = query.build(SearchMode::Map, "AUTO");
        assert_eq!(
            request.query["bool"]["must"][0],
            json!({ "exists": { "field": "geolocation" } })
        );
        assert_eq!(request.size, 10_000);
    }

    #[test]
    fn test_schema_wildcard_and_exact_matches() {
        let query = NodeQuery {
            schema: Some("organizations_schema".into()),
            status: Some("posted".into()),
            primary_url: Some("ic3.dev".into()),
            last_updated: Some(1_700_000_000),
            page: 3,
            page_size: 10,
            ..Default::default()
        };
        let request = query.build(SearchMode::List, "AUTO");
        let must = request.query["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 4);
        assert_eq!(
            must[0]["wildcard"]["linked_schemas"],
            json!({ "value": "organizations_schema*", "case_insensitive": true })
        );
        assert_eq!(must[1]["range"]["last_updated"]["gte"], 1_700_000_000);
        assert_eq!(must[2]["match"]["status"]["query"], "posted");
        assert_eq!(must[3]["match"]["primary_url"]["query"], "ic3.dev");
        assert_eq!(request.from, 20);
        assert_eq!(request.size, 10);
    }

    #[test]
    fn test_block_query() {
        let block = BlockQuery {
            schema: Some("people".into()),
            page_size: 1000,
            search_after: Some(vec![json!(1), json!("https://a")]),
        };
        let request = block.build();
        assert_eq!(request.size, 500);
        assert_eq!(request.from, 0);
        assert_eq!(
            request.query["bool"]["must"][0]["wildcard"]["linked_schemas"]["value"],
            "people*"
        );
    }

    #[test]
    fn test_regexp_escaping() {
        assert_eq!(escape_regexp("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regexp("plain"), "plain");
    }
}
