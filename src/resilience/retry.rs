use crate::config::RetryConfig;
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Exponential backoff with jitter and a cap on total elapsed time
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Each delay is scaled by a random factor in `1 ± randomization_factor`
    pub randomization_factor: f64,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier,
            randomization_factor: config.randomization_factor,
            max_elapsed: Duration::from_secs(config.max_elapsed_seconds),
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_backoff
            .mul_f64(self.multiplier.powi(attempt.saturating_sub(1) as i32));

        let jittered = if self.randomization_factor > 0.0 {
            let jitter = (fastrand::f64() * 2.0 - 1.0) * self.randomization_factor;
            delay.mul_f64((1.0 + jitter).max(0.0))
        } else {
            delay
        };

        jittered.min(self.max_backoff)
    }
}

/// Run `operation` until it succeeds or the next wait would exceed the elapsed budget.
///
/// The last error is returned once the budget is exhausted.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    description: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = description, attempts = attempt, "✅ Connected after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                let delay = policy.backoff_for(attempt);
                if started.elapsed() + delay > policy.max_elapsed {
                    warn!(
                        operation = description,
                        attempts = attempt,
                        error = %error,
                        "❌ Giving up after exhausting retry budget"
                    );
                    return Err(error);
                }

                warn!(
                    operation = description,
                    attempt = attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %error,
                    "🔄 Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
