use node_index::state_machine::{NodeEvent, NodeStatus};
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for generating plausible profile URLs
pub fn profile_url_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{1,12}", "[a-z]{2,3}", "[a-z0-9_-]{1,20}")
        .prop_map(|(host, tld, path)| format!("https://{host}.{tld}/{path}.json"))
}

pub fn node_status_strategy() -> impl Strategy<Value = NodeStatus> {
    prop::sample::select(NodeStatus::ALL.to_vec())
}

pub fn node_event_strategy() -> impl Strategy<Value = NodeEvent> {
    prop_oneof![
        Just(NodeEvent::Submit),
        Just(NodeEvent::ValidationSucceeded),
        prop::collection::vec("[a-z ]{1,20}", 0..3).prop_map(NodeEvent::ValidationFailed),
        Just(NodeEvent::IndexSucceeded),
        "[a-z ]{1,20}".prop_map(NodeEvent::IndexFailed),
        Just(NodeEvent::Delete),
    ]
}

/// Tag arrays mixing strings of any length with non-string values
pub fn tags_strategy() -> impl Strategy<Value = Value> {
    prop::collection::vec(
        prop_oneof![
            3 => "[a-zA-Z ]{0,120}".prop_map(Value::String),
            1 => any::<i64>().prop_map(Value::from),
            1 => Just(Value::Null),
        ],
        0..12,
    )
    .prop_map(Value::Array)
}
