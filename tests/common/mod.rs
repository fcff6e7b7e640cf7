#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use node_index::config::FeatureToggles;
use node_index::database::{InMemoryNodeRepository, Lookup, NodeRepository};
use node_index::error::{NodeIndexError, Result};
use node_index::messaging::{EventPublisher, InMemoryMessagingService, Subject};
use node_index::models::Node;
use node_index::orchestration::{NodeService, NodeServiceSettings};
use node_index::search::InMemorySearchIndex;
use node_index::services::{CountryResolver, ProbeOutcome, ProfileProbe};
use node_index::NodeStatus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PROFILE_URL: &str = "https://ic3.dev/test.json";

/// Probe returning a configurable outcome and counting calls
pub struct StubProbe {
    outcome: Mutex<ProbeOutcome>,
    calls: AtomicUsize,
}

impl StubProbe {
    pub fn gone() -> Self {
        Self {
            outcome: Mutex::new(ProbeOutcome::Gone {
                reason: "profile returned 404".to_string(),
            }),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, outcome: ProbeOutcome) {
        *self.outcome.lock() = outcome;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileProbe for StubProbe {
    async fn probe(&self, _profile_url: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.lock().clone()
    }
}

/// Resolves a handful of names without the library service
pub struct FixedCountries;

#[async_trait]
impl CountryResolver for FixedCountries {
    async fn find_alpha2(&self, country_name: &str) -> Result<Option<String>> {
        Ok(match country_name.to_lowercase().as_str() {
            "germany" => Some("DE".to_string()),
            "france" => Some("FR".to_string()),
            "united kingdom" | "uk" => Some("GB".to_string()),
            _ => None,
        })
    }
}

/// In-memory store whose writes of one status can be made to fail
pub struct InterruptibleRepository {
    inner: Arc<InMemoryNodeRepository>,
    failing_status: Mutex<Option<NodeStatus>>,
}

impl InterruptibleRepository {
    pub fn new(inner: Arc<InMemoryNodeRepository>) -> Self {
        Self {
            inner,
            failing_status: Mutex::new(None),
        }
    }

    pub fn fail_writes_of(&self, status: Option<NodeStatus>) {
        *self.failing_status.lock() = status;
    }
}

#[async_trait]
impl NodeRepository for InterruptibleRepository {
    async fn add(&self, node: &mut Node) -> Result<()> {
        self.inner.add(node).await
    }

    async fn get(&self, id: &str) -> Lookup<Node> {
        self.inner.get(id).await
    }

    async fn compare_and_swap(
        &self,
        node: &Node,
        expected_version: Option<i32>,
    ) -> Result<Option<i32>> {
        if *self.failing_status.lock() == Some(node.status) {
            return Err(NodeIndexError::database(
                "failed to update node",
                "connection reset",
            ));
        }
        self.inner.compare_and_swap(node, expected_version).await
    }

    async fn delete(&self, node: &Node) -> Result<()> {
        self.inner.delete(node).await
    }

    async fn remove_created_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        self.inner.remove_created_before(status, before).await
    }

    async fn remove_updated_before(&self, status: NodeStatus, before: i64) -> Result<u64> {
        self.inner.remove_updated_before(status, before).await
    }
}

/// Node service wired to in-memory backends
pub struct TestHarness {
    pub repository: Arc<InMemoryNodeRepository>,
    pub writes: Arc<InterruptibleRepository>,
    pub search_index: Arc<InMemorySearchIndex>,
    pub messaging: Arc<InMemoryMessagingService>,
    pub probe: Arc<StubProbe>,
    pub toggles: Arc<FeatureToggles>,
    pub service: Arc<NodeService>,
}

impl TestHarness {
    pub async fn new() -> Self {
        let harness = Self::without_queues();
        harness
            .service_publisher()
            .ensure_queues()
            .await
            .expect("queues should be created");
        harness
    }

    /// Queues are not created, so every publish fails
    pub fn without_queues() -> Self {
        let repository = Arc::new(InMemoryNodeRepository::new());
        let writes = Arc::new(InterruptibleRepository::new(repository.clone()));
        let search_index = Arc::new(InMemorySearchIndex::new());
        let messaging = Arc::new(InMemoryMessagingService::new());
        let probe = Arc::new(StubProbe::gone());
        let toggles = Arc::new(FeatureToggles::new(HashMap::new()));

        let service = Arc::new(NodeService::new(
            writes.clone(),
            search_index.clone(),
            EventPublisher::new(messaging.clone()),
            probe.clone(),
            Arc::new(FixedCountries),
            toggles.clone(),
            NodeServiceSettings::default(),
        ));

        Self {
            repository,
            writes,
            search_index,
            messaging,
            probe,
            toggles,
            service,
        }
    }

    pub fn service_publisher(&self) -> EventPublisher {
        EventPublisher::new(self.messaging.clone())
    }

    pub async fn stored(&self, profile_url: &str) -> Node {
        self.service
            .get_node(&Node::new(profile_url).id)
            .await
            .expect("node should be stored")
    }

    pub async fn queued(&self, subject: Subject) -> Vec<serde_json::Value> {
        self.messaging.peek(&subject.queue_name()).await
    }

    /// Add a node and feed it a successful validation of `profile`
    pub async fn post(&self, profile_url: &str, profile: &str, last_updated: i64) -> Node {
        let node = self.service.add_node(profile_url).await.expect("add_node");
        self.service
            .set_node_valid(validated(profile_url, profile, last_updated, node.version))
            .await
            .expect("set_node_valid");
        self.stored(profile_url).await
    }
}

/// A node as the `node:validated` handler builds it
pub fn validated(
    profile_url: &str,
    profile: &str,
    last_updated: i64,
    version: Option<i32>,
) -> Node {
    let mut node = Node::new(profile_url);
    node.profile_str = Some(profile.to_string());
    node.last_updated = Some(last_updated);
    node.version = version;
    node
}

/// A node as the `node:validation-failed` handler builds it
pub fn invalidated(profile_url: &str, reasons: &[&str], version: Option<i32>) -> Node {
    let mut node = Node::new(profile_url);
    node.failure_reasons = Some(reasons.iter().map(|r| r.to_string()).collect());
    node.version = version;
    node
}

pub fn sample_profile(name: &str) -> String {
    serde_json::json!({
        "linked_schemas": ["organizations_schema-v1.0.0"],
        "name": name,
        "primary_url": format!("https://www.{}.org/", name.to_lowercase().replace(' ', "-")),
        "geolocation": "52.52,13.405",
        "locality": "Berlin",
        "country_name": "Germany",
        "tags": ["Solidarity Economy", "cooperative"],
        "description": "kept out of the index"
    })
    .to_string()
}
