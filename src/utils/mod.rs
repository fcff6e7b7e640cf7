//! Small pure helpers shared across the crate.

pub mod hashing;
pub mod tags;
pub mod time;
pub mod url;

pub use hashing::{sha256_hex, short_hash};
pub use tags::filter_tags;
pub use time::now_unix;
pub use url::canonicalize_primary_url;
