//! # External Collaborators
//!
//! HTTP-backed helpers the orchestration layer consults: the live profile
//! probe used before deletions and the country-name library used during
//! profile normalization. Both sit behind traits so tests can inject doubles.

pub mod country_resolver;
pub mod profile_probe;

pub use country_resolver::{CountryResolver, LibraryCountryResolver};
pub use profile_probe::{HttpProfileProbe, ProbeOutcome, ProfileProbe};
