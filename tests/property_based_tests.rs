mod common;

use common::strategies::*;
use node_index::database::{InMemoryNodeRepository, NodeRepository};
use node_index::models::{node_id_for, Node};
use node_index::search::pagination;
use node_index::state_machine::{NodeEvent, NodeStateMachine, NodeStatus, TargetState};
use node_index::utils::filter_tags;
use proptest::prelude::*;

proptest! {
    /// Property: node identity depends on the profile URL only
    #[test]
    fn node_id_is_derived_from_profile_url(url in profile_url_strategy()) {
        let mut node = Node::new(url.clone());
        prop_assert_eq!(node.id.len(), 64);
        prop_assert!(node.id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        node.id = "caller supplied".to_string();
        node.refresh_id();
        prop_assert_eq!(node.id, node_id_for(&url));
    }

    /// Property: page sizes are clamped and offsets never go negative
    #[test]
    fn pagination_stays_in_bounds(page in -10i64..1_000, page_size in -100i64..20_000) {
        let size = pagination::size(page_size);
        prop_assert!((1..=500).contains(&size));

        let map_size = pagination::maximum_size(page_size);
        prop_assert!((1..=10_000).contains(&map_size));

        prop_assert!(pagination::from(page, page_size) >= 0);
    }

    /// Property: total pages cover every result without an empty trailing page
    #[test]
    fn total_pages_cover_results(results in 0i64..100_000, page_size in 1i64..500) {
        let pages = pagination::total_pages(results, page_size);
        prop_assert!(pages * page_size >= results);
        if results > 0 {
            prop_assert!((pages - 1) * page_size < results);
        } else {
            prop_assert_eq!(pages, 0);
        }
    }

    /// Property: filtered tags respect both limits and keep only strings
    #[test]
    fn filtered_tags_respect_limits(
        tags in tags_strategy(),
        array_size in 1usize..8,
        string_length in 1usize..100,
    ) {
        let filtered = filter_tags(&tags, array_size, string_length);
        prop_assert!(filtered.len() <= array_size);
        for tag in &filtered {
            prop_assert!(tag.chars().count() <= string_length);
        }

        let string_count = tags
            .as_array()
            .map_or(0, |a| a.iter().filter(|v| v.is_string()).count());
        prop_assert_eq!(filtered.len(), string_count.min(array_size));
    }

    /// Property: submission restarts the lifecycle from any state
    #[test]
    fn submit_always_leads_to_received(status in node_status_strategy()) {
        prop_assert_eq!(
            NodeStateMachine::determine_target_state(Some(status), &NodeEvent::Submit),
            Ok(TargetState::Status(NodeStatus::Received))
        );
    }

    /// Property: index outcomes are only accepted right after validation
    #[test]
    fn index_outcomes_require_validated(
        status in node_status_strategy(),
        event in node_event_strategy(),
    ) {
        let is_index_event = matches!(event, NodeEvent::IndexSucceeded | NodeEvent::IndexFailed(_));
        if is_index_event {
            prop_assert_eq!(
                NodeStateMachine::can_transition(Some(status), &event),
                status == NodeStatus::Validated
            );
        }
    }

    /// Property: a deleted node only reacts to resubmission and deletion
    #[test]
    fn deleted_nodes_ignore_validation_results(event in node_event_strategy()) {
        let allowed = NodeStateMachine::can_transition(Some(NodeStatus::Deleted), &event);
        prop_assert_eq!(allowed, matches!(event, NodeEvent::Submit | NodeEvent::Delete));
    }

    /// Property: a write carrying any version but the stored one changes nothing
    #[test]
    fn stale_compare_and_swap_is_a_no_op(url in profile_url_strategy(), stale in 2i32..1_000) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repository = InMemoryNodeRepository::new();
            let mut node = Node::new(url);
            repository.add(&mut node).await.unwrap();

            let mut writer = node.clone();
            writer.status = NodeStatus::ValidationFailed;
            writer.profile_hash = Some(String::new());
            let applied = repository.compare_and_swap(&writer, Some(stale)).await.unwrap();
            assert_eq!(applied, None);

            let stored = repository.get(&node.id).await.optional().unwrap().unwrap();
            assert_eq!(stored.status, NodeStatus::Received);
            assert_eq!(stored.version, Some(1));
            assert!(stored.profile_hash.is_none());
        });
    }
}
