use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from:?} on {event}")]
    InvalidTransition { from: Option<String>, event: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
