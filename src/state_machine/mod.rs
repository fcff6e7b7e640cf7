// Node lifecycle state machine
//
// Pure state and transition definitions; persistence and index side effects
// are driven by the orchestration layer.

pub mod errors;
pub mod events;
pub mod node_state_machine;
pub mod states;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::NodeEvent;
pub use node_state_machine::{NodeStateMachine, TargetState};
pub use states::NodeStatus;
