use anyhow::Result;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres, Transaction};
use std::str::FromStr;
use tracing::warn;

use crate::config::AppConfig;
use crate::error::TrackingError;

pub mod queries;

pub type DbPool = Pool<Postgres>;

/// Opens the pool. `statement_timeout` makes every statement, including
/// those inside a transaction, abort server-side once the deadline passes.
pub async fn init_pool(config: &AppConfig) -> Result<DbPool> {
    let options = PgConnectOptions::from_str(&config.database_url)?.options([(
        "statement_timeout",
        config.db_statement_timeout_ms.to_string(),
    )]);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Ends a unit of work: commits when `result` is `Ok`, rolls back otherwise.
/// A transaction dropped before reaching here (cancelled future) is rolled
/// back by sqlx when the connection returns to the pool.
pub async fn settle<T>(
    tx: Transaction<'_, Postgres>,
    result: crate::error::Result<T>,
) -> crate::error::Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await.map_err(TrackingError::step("commit"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback().await {
                warn!("Rollback failed after '{}': {}", err, e);
            }
            Err(err)
        }
    }
}
