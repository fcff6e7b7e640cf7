//! Country name to ISO 3166-1 alpha-2 resolution backed by the library service.

use crate::error::{NodeIndexError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

#[async_trait]
pub trait CountryResolver: Send + Sync {
    /// Resolve a free-form country name; `None` when no alias matches
    async fn find_alpha2(&self, country_name: &str) -> Result<Option<String>>;
}

/// Reads `GET {library_url}/v2/countries`, a JSON map of
/// `alpha-2 code -> [aliases]`, once per process.
pub struct LibraryCountryResolver {
    http_client: reqwest::Client,
    countries_url: String,
    countries: OnceCell<BTreeMap<String, Vec<String>>>,
}

impl LibraryCountryResolver {
    pub fn new(library_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeIndexError::http("failed to build library client", e))?;

        Ok(Self {
            http_client,
            countries_url: format!("{}/v2/countries", library_url.trim_end_matches('/')),
            countries: OnceCell::new(),
        })
    }

    async fn countries(&self) -> Result<&BTreeMap<String, Vec<String>>> {
        self.countries
            .get_or_try_init(|| async {
                debug!(url = %self.countries_url, "Fetching country aliases");
                let response = self
                    .http_client
                    .get(self.countries_url.as_str())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| NodeIndexError::http("country list request failed", e))?;

                response
                    .json::<BTreeMap<String, Vec<String>>>()
                    .await
                    .map_err(|e| NodeIndexError::http("country list is not valid JSON", e))
            })
            .await
    }
}

#[async_trait]
impl CountryResolver for LibraryCountryResolver {
    #[instrument(skip(self))]
    async fn find_alpha2(&self, country_name: &str) -> Result<Option<String>> {
        let wanted = country_name.trim().to_lowercase();
        let countries = self.countries().await?;

        Ok(countries
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|alias| alias.to_lowercase() == wanted))
            .map(|(code, _)| code.clone()))
    }
}
