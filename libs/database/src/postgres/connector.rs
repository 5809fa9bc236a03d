use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use super::PostgresConfig;
use crate::common::{DatabaseError, RetryPolicy, retry_with_backoff};

/// Open a pool without retrying.
pub async fn connect_from_config(config: PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.into_connect_options()).await?;
    info!("Connected to PostgreSQL");
    Ok(db)
}

/// Open a pool, retrying with backoff while the database comes up.
///
/// `None` uses `RetryPolicy::default()`.
pub async fn connect_from_config_with_retry(
    config: PostgresConfig,
    policy: Option<RetryPolicy>,
) -> Result<DatabaseConnection, DatabaseError> {
    let policy = policy.unwrap_or_default();
    let options = config.into_connect_options();

    retry_with_backoff("postgres connect", &policy, || {
        Database::connect(options.clone())
    })
    .await
    .map(|db| {
        info!("Connected to PostgreSQL");
        db
    })
    .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))
}

/// Apply every pending migration of `M`.
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> Result<(), DatabaseError> {
    info!(app = app_name, "Running database migrations");
    M::up(db, None)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!(app = app_name, "Migrations complete");
    Ok(())
}
