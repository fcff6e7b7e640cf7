//! Live reachability check of a node's profile URL.

use crate::error::{NodeIndexError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// What the probe learned about a profile URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The URL still serves a JSON document
    Reachable { status: u16 },
    /// The profile is gone: transport failure, 404, redirect or non-JSON body
    Gone { reason: String },
}

impl ProbeOutcome {
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Gone { .. })
    }
}

#[async_trait]
pub trait ProfileProbe: Send + Sync {
    async fn probe(&self, profile_url: &str) -> ProbeOutcome;
}

/// `reqwest` backed probe. Redirects are not followed; a moved profile counts as gone.
pub struct HttpProfileProbe {
    http_client: reqwest::Client,
}

impl HttpProfileProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| NodeIndexError::http("failed to build probe client", e))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ProfileProbe for HttpProfileProbe {
    async fn probe(&self, profile_url: &str) -> ProbeOutcome {
        let response = match self.http_client.get(profile_url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(profile_url = %profile_url, error = %e, "Profile probe request failed");
                return ProbeOutcome::Gone {
                    reason: format!("request failed: {e}"),
                };
            }
        };

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return ProbeOutcome::Gone {
                reason: "profile returned 404".to_string(),
            };
        }
        if status.is_redirection() {
            return ProbeOutcome::Gone {
                reason: format!("profile redirected ({})", status.as_u16()),
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return ProbeOutcome::Gone {
                    reason: format!("unreadable body: {e}"),
                }
            }
        };
        if serde_json::from_str::<serde_json::Value>(&body).is_err() {
            return ProbeOutcome::Gone {
                reason: "profile body is not JSON".to_string(),
            };
        }

        debug!(profile_url = %profile_url, status = status.as_u16(), "Profile still reachable");
        ProbeOutcome::Reachable {
            status: status.as_u16(),
        }
    }
}
