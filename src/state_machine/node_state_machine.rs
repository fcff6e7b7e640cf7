use super::errors::{StateMachineError, StateMachineResult};
use super::events::NodeEvent;
use super::states::NodeStatus;
use crate::models::Node;
use tracing::debug;

/// Where a transition leaves the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// The node keeps existing with this status
    Status(NodeStatus),
    /// The node is physically removed from both stores
    Removed,
}

/// Pure transition table for node lifecycles.
///
/// Side effects (persistence, index writes, event publication) belong to the
/// orchestration layer; this type only decides whether an event is legal in
/// the current state and where it leads.
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeStateMachine;

impl NodeStateMachine {
    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: Option<NodeStatus>,
        event: &NodeEvent,
    ) -> StateMachineResult<TargetState> {
        use NodeStatus::*;

        let target = match (current_state, event) {
            // Submission always (re)starts the lifecycle
            (_, NodeEvent::Submit) => TargetState::Status(Received),

            // Validation results
            (
                Some(Received | Validated | Posted | PostFailed | ValidationFailed),
                NodeEvent::ValidationSucceeded,
            ) => TargetState::Status(Validated),
            (
                Some(Received | Validated | Posted | PostFailed | ValidationFailed),
                NodeEvent::ValidationFailed(_),
            ) => TargetState::Status(ValidationFailed),

            // Index outcome is only meaningful right after validation
            (Some(Validated), NodeEvent::IndexSucceeded) => TargetState::Status(Posted),
            (Some(Validated), NodeEvent::IndexFailed(_)) => TargetState::Status(PostFailed),

            // Deletion
            (Some(Posted | Deleted), NodeEvent::Delete) => TargetState::Status(Deleted),
            (Some(Received | Validated | ValidationFailed | PostFailed), NodeEvent::Delete) => {
                TargetState::Removed
            }

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.map(|s| s.to_string()),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    /// Whether the event is accepted in the given state
    pub fn can_transition(current_state: Option<NodeStatus>, event: &NodeEvent) -> bool {
        Self::determine_target_state(current_state, event).is_ok()
    }

    /// Apply an event to the node, updating its status when it survives the transition
    pub fn transition(node: &mut Node, event: &NodeEvent) -> StateMachineResult<TargetState> {
        let target = Self::determine_target_state(Some(node.status), event)?;

        debug!(
            node_id = %node.id,
            from = %node.status,
            event = event.event_type(),
            to = ?target,
            "Node transition"
        );

        if let TargetState::Status(status) = target {
            node.status = status;
        }
        Ok(target)
    }
}
