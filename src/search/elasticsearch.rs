//! # Elasticsearch REST Client
//!
//! [`SearchIndex`] over the Elasticsearch HTTP API using `reqwest`.

use super::index::{BlockQueryResults, MapQueryResults, QueryResults, SearchIndex};
use super::pagination;
use super::query::{BlockQuery, NodeQuery, SearchMode};
use crate::config::SearchConfig;
use crate::error::{NodeIndexError, Result};
use crate::state_machine::NodeStatus;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

/// ES 7+ reports `{"value": n, "relation": "eq"}`, older clusters a bare number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: i64 },
    Count(i64),
}

impl TotalHits {
    fn value(&self) -> i64 {
        match self {
            Self::Object { value } | Self::Count(value) => *value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
    #[serde(default)]
    sort: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct DeleteByQueryResponse {
    #[serde(default)]
    deleted: u64,
}

#[derive(Debug, Clone)]
pub struct ElasticsearchIndex {
    client: Client,
    base_url: String,
    index_name: String,
    tags_fuzziness: String,
}

impl ElasticsearchIndex {
    pub fn new(config: &SearchConfig, tags_fuzziness: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| NodeIndexError::http("failed to build search client", e))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index_name: config.index_name.clone(),
            tags_fuzziness: tags_fuzziness.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.index_name, path)
    }

    /// Cluster reachability check used during startup
    pub async fn ping(&self) -> Result<()> {
        let response = self
            .client
            .get(self.base_url.as_str())
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;
        Self::check(response, "ping").await.map(|_| ())
    }

    pub fn mapping() -> Value {
        json!({
            "mappings": {
                "dynamic": false,
                "properties": {
                    "country": { "type": "text" },
                    "expires": { "type": "long" },
                    "geolocation": { "type": "geo_point" },
                    "last_updated": { "type": "long" },
                    "linked_schemas": { "type": "keyword" },
                    "locality": { "type": "text" },
                    "name": { "type": "text" },
                    "primary_url": { "type": "keyword" },
                    "profile_url": { "type": "keyword" },
                    "region": { "type": "text" },
                    "status": { "type": "keyword" },
                    "tags": { "type": "text" }
                }
            }
        })
    }

    async fn check(response: Response, operation: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(NodeIndexError::SearchIndex(format!(
            "{operation} failed with status {status}: {body}"
        )))
    }

    async fn run_search(&self, body: Value) -> Result<SearchResponse> {
        let response = self
            .client
            .post(self.url("_search"))
            .json(&body)
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;
        let response = Self::check(response, "search").await?;
        response
            .json::<SearchResponse>()
            .await
            .map_err(NodeIndexError::search_index)
    }

    fn relevance_sort() -> Value {
        json!([
            { "_score": { "order": "desc" } },
            { "primary_url": { "order": "asc" } }
        ])
    }

    fn export_sort() -> Value {
        json!([
            { "last_updated": { "order": "asc" } },
            { "profile_url": { "order": "asc" } }
        ])
    }
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn ensure_index(&self) -> Result<()> {
        let index_url = format!("{}/{}", self.base_url, self.index_name);
        let response = self
            .client
            .head(index_url.as_str())
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;

        if response.status().is_success() {
            debug!(index = %self.index_name, "Search index already exists");
            return Ok(());
        }

        let response = self
            .client
            .put(index_url.as_str())
            .json(&Self::mapping())
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;
        Self::check(response, "create index").await?;

        info!(index = %self.index_name, "🗂️ SEARCH: Created index with node mapping");
        Ok(())
    }

    #[instrument(skip(self, document), fields(index = %self.index_name))]
    async fn index_by_id(&self, id: &str, document: &Map<String, Value>) -> Result<()> {
        let response = self
            .client
            .put(self.url(&format!("_doc/{id}")))
            .json(document)
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;
        Self::check(response, "index").await?;
        Ok(())
    }

    #[instrument(skip(self, fields), fields(index = %self.index_name))]
    async fn update(&self, id: &str, fields: &Map<String, Value>) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("_update/{id}")))
            .json(&json!({ "doc": fields }))
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(node_id = %id, "Update skipped, document not indexed");
            return Ok(());
        }
        Self::check(response, "update").await?;
        Ok(())
    }

    #[instrument(skip(self), fields(index = %self.index_name))]
    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("_doc/{id}")))
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(node_id = %id, "Delete skipped, document not indexed");
            return Ok(());
        }
        Self::check(response, "delete").await?;
        Ok(())
    }

    async fn search(&self, query: &NodeQuery) -> Result<QueryResults> {
        let request = query.build(SearchMode::List, &self.tags_fuzziness);
        let body = json!({
            "query": request.query,
            "from": request.from,
            "size": request.size,
            "sort": Self::relevance_sort(),
            "track_total_hits": true
        });

        let response = self.run_search(body).await?;
        let number_of_results = response.hits.total.as_ref().map_or(0, TotalHits::value);

        Ok(QueryResults {
            result: response.hits.hits.into_iter().map(|hit| hit.source).collect(),
            number_of_results,
            total_pages: pagination::total_pages(number_of_results, query.page_size),
        })
    }

    async fn export(&self, query: &BlockQuery) -> Result<BlockQueryResults> {
        let request = query.build();
        let mut body = json!({
            "query": request.query,
            "size": request.size,
            "sort": Self::export_sort(),
            "track_total_hits": true
        });
        if let Some(search_after) = &query.search_after {
            body["search_after"] = json!(search_after);
        }

        let response = self.run_search(body).await?;
        let sort = response.hits.hits.last().and_then(|hit| hit.sort.clone());

        Ok(BlockQueryResults {
            result: response.hits.hits.into_iter().map(|hit| hit.source).collect(),
            sort,
        })
    }

    async fn get_nodes(&self, query: &NodeQuery) -> Result<MapQueryResults> {
        let request = query.build(SearchMode::Map, &self.tags_fuzziness);
        let body = json!({
            "query": request.query,
            "from": request.from,
            "size": request.size,
            "sort": Self::relevance_sort(),
            "track_total_hits": true,
            "_source": { "includes": ["geolocation", "profile_url"] }
        });

        let response = self.run_search(body).await?;
        let number_of_results = response.hits.total.as_ref().map_or(0, TotalHits::value);

        let mut result = Vec::with_capacity(response.hits.hits.len());
        for hit in &response.hits.hits {
            match map_row(&hit.source) {
                Some(row) => result.push(row),
                None => warn!(source = ?hit.source, "Skipping map hit without usable geolocation"),
            }
        }

        Ok(MapQueryResults {
            result,
            number_of_results,
            total_pages: pagination::total_pages(number_of_results, query.page_size),
        })
    }

    async fn remove_updated_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        let body = json!({
            "query": {
                "bool": {
                    "filter": [
                        { "term": { "status": status.as_str() } },
                        { "range": { "last_updated": { "lt": before } } }
                    ]
                }
            }
        });
        let response = self
            .client
            .post(self.url("_delete_by_query"))
            .json(&body)
            .send()
            .await
            .map_err(NodeIndexError::search_index)?;
        let response = Self::check(response, "delete by query").await?;
        let outcome = response
            .json::<DeleteByQueryResponse>()
            .await
            .map_err(NodeIndexError::search_index)?;
        Ok(outcome.deleted)
    }
}

/// `[lon, lat, profile_url]` from a projected `_source`
pub(crate) fn map_row(source: &Map<String, Value>) -> Option<Value> {
    let geolocation = source.get("geolocation")?;
    let lat = geolocation.get("lat")?.as_f64()?;
    let lon = geolocation.get("lon")?.as_f64()?;
    let profile_url = source.get("profile_url")?.as_str()?;
    Some(MapQueryResults::row(lon, lat, profile_url))
}
