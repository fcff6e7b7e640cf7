//! # Resilience Module
//!
//! Connection-level retries for startup dependencies. The document store,
//! the event bus and the search index are retried with exponential backoff
//! until a total elapsed budget runs out; steady-state requests are never
//! retried here.

pub mod retry;

pub use retry::{retry_with_backoff, RetryPolicy};
