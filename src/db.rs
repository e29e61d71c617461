use std::time::Duration;

use futures::future::BoxFuture;
use metrics::counter;
use rand::Rng;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbBackend,
    DbErr, IsolationLevel, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::errors::{ServiceError, ServiceResult};

/// Retry policy for serialization conflicts on the inventory ledger.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(25),
            max_delay: Duration::from_millis(500),
        }
    }
}

/// Open a connection pool and log the backend in use. An in-memory
/// sqlite url is pinned to a single connection; every pooled connection
/// would otherwise see its own empty database.
pub async fn connect(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opts = ConnectOptions::new(config.database_url.clone());
    if config.database_url.contains(":memory:") {
        opts.max_connections(1).min_connections(1);
    } else {
        opts.max_connections(20).min_connections(2);
    }
    opts.connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;
    if db.get_database_backend() == DbBackend::Postgres {
        // Bound runaway transactions at the session level.
        db.execute_unprepared(&format!(
            "SET statement_timeout = {}",
            config.db_txn_timeout_secs * 1000
        ))
        .await?;
    }
    info!(backend = ?db.get_database_backend(), "database connected");
    Ok(db)
}

/// Apply all pending migrations.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrations::Migrator::up(db, None).await
}

/// Begin a transaction with the strongest isolation the backend offers.
/// Postgres gets an explicit SERIALIZABLE level; sqlite transactions are
/// serializable by construction and reject the explicit statement.
pub async fn begin_serializable(
    db: &DatabaseConnection,
) -> Result<DatabaseTransaction, DbErr> {
    match db.get_database_backend() {
        DbBackend::Postgres => {
            db.begin_with_config(Some(IsolationLevel::Serializable), None)
                .await
        }
        _ => db.begin().await,
    }
}

/// Serialization failures and writer contention are retryable; everything
/// else surfaces immediately.
pub fn is_serialization_conflict(err: &DbErr) -> bool {
    let msg = err.to_string().to_lowercase();
    msg.contains("serialization")
        || msg.contains("could not serialize")
        || msg.contains("deadlock")
        || msg.contains("database is locked")
}

/// Run `op` in a serializable transaction, retrying serialization losers
/// with exponential backoff + jitter. After the retry budget the caller
/// sees `SerializationRetry` (first-committer-wins, loser retries).
pub async fn with_serializable_retry<T, F>(
    db: &DatabaseConnection,
    retry: &RetryConfig,
    operation_name: &str,
    mut op: F,
) -> ServiceResult<T>
where
    F: for<'c> FnMut(&'c DatabaseTransaction) -> BoxFuture<'c, ServiceResult<T>>,
{
    let mut attempts = 0;
    let mut delay = retry.initial_delay;

    loop {
        attempts += 1;

        let txn = begin_serializable(db).await.map_err(ServiceError::Database)?;
        match op(&txn).await {
            Ok(value) => match txn.commit().await {
                Ok(()) => {
                    if attempts > 1 {
                        counter!("wms_ledger.retry.recovered", 1, "operation" => operation_name.to_string());
                    }
                    return Ok(value);
                }
                Err(err) if is_serialization_conflict(&err) && attempts <= retry.max_retries => {
                    warn!(
                        operation = operation_name,
                        attempts, "commit lost serialization race, retrying"
                    );
                    counter!("wms_ledger.retry.attempt", 1, "operation" => operation_name.to_string());
                    sleep(jittered(delay)).await;
                    delay = (delay * 2).min(retry.max_delay);
                }
                Err(err) => return Err(classify_commit_error(err, operation_name)),
            },
            Err(op_err) => {
                let _ = txn.rollback().await;
                match op_err {
                    ServiceError::Database(err) if is_serialization_conflict(&err) => {
                        if attempts > retry.max_retries {
                            return Err(classify_commit_error(err, operation_name));
                        }
                        warn!(
                            operation = operation_name,
                            attempts, "serialization conflict, retrying"
                        );
                        counter!("wms_ledger.retry.attempt", 1, "operation" => operation_name.to_string());
                        sleep(jittered(delay)).await;
                        delay = (delay * 2).min(retry.max_delay);
                    }
                    other => return Err(other),
                }
            }
        }
    }
}

fn classify_commit_error(err: DbErr, operation_name: &str) -> ServiceError {
    if is_serialization_conflict(&err) {
        counter!("wms_ledger.retry.exhausted", 1, "operation" => operation_name.to_string());
        ServiceError::SerializationRetry(operation_name.to_string())
    } else {
        ServiceError::Database(err)
    }
}

fn jittered(base: Duration) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=base.as_millis() as u64 / 2 + 1);
    base + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_errors_are_classified() {
        let err = DbErr::Custom("could not serialize access due to concurrent update".into());
        assert!(is_serialization_conflict(&err));
        let err = DbErr::Custom("database is locked".into());
        assert!(is_serialization_conflict(&err));
        let err = DbErr::Custom("relation does not exist".into());
        assert!(!is_serialization_conflict(&err));
    }
}
