use crate::config::DatabaseConfig;
use crate::error::{NodeIndexError, Result};
use crate::resilience::{retry_with_backoff, RetryPolicy};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Open the document store pool, retrying with backoff until the policy gives up
pub async fn connect_with_retry(config: &DatabaseConfig, policy: &RetryPolicy) -> Result<PgPool> {
    let url = config.url.as_str();
    let max_connections = config.max_connections;
    let acquire_timeout = config.acquire_timeout();

    let pool = retry_with_backoff(policy, "document store connection", move || {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
    })
    .await
    .map_err(|e| NodeIndexError::database("failed to connect to document store", e))?;

    info!(max_connections = config.max_connections, "💾 Document store connected");
    Ok(pool)
}

/// Apply the embedded `migrations/` directory
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| NodeIndexError::database("failed to run migrations", e))?;
    info!("✅ Database migrations applied");
    Ok(())
}
