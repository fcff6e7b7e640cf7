//! # Search
//!
//! Query model, pagination and the [`SearchIndex`] backends.

pub mod elasticsearch;
pub mod in_memory;
pub mod index;
pub mod pagination;
pub mod query;

pub use elasticsearch::ElasticsearchIndex;
pub use in_memory::InMemorySearchIndex;
pub use index::{BlockQueryResults, MapQueryResults, QueryResults, SearchIndex};
pub use query::{BlockQuery, NodeQuery, QueryBuilder, SearchMode, SearchRequest};
