//! Relational store bootstrap (Postgres).

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::bootstrap::{bootstrap, RetryPolicy};
use crate::connection::redact_url;
use crate::error::Result;

/// Open the shared store handle, retrying per `policy` until Postgres answers a ping.
///
/// A store-backed service bootstraps once at startup and treats failure as fatal:
///
/// ```rust,no_run
/// use courier::store::connect_store;
/// use courier::Settings;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let settings = Settings::new()?;
///     let pool = match connect_store(&settings.store.dsn, &settings.store_retry()).await {
///         Ok(pool) => pool,
///         Err(e) => {
///             tracing::error!("Postgres never became ready: {}", e);
///             std::process::exit(1);
///         }
///     };
///
///     sqlx::query("SELECT 1").execute(&pool).await?;
///     Ok(())
/// }
/// ```
pub async fn connect_store(dsn: &str, policy: &RetryPolicy) -> Result<PgPool> {
    tracing::debug!("Connecting to Postgres at {}", redact_url(dsn));

    bootstrap("postgres", policy, || async move {
        let pool = PgPoolOptions::new().max_connections(1).connect(dsn).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok::<_, sqlx::Error>(pool)
    })
    .await
}
