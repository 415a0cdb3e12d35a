//! Versioned schema migrations (SQLx)

use sqlx::sqlite::SqlitePool;
use tracing::info;

use super::constants::CURRENT_SCHEMA_VERSION;
use super::sql::{
    CREATE_CLIENT_STATE_TABLE_SQL, CREATE_MIGRATIONS_TABLE_SQL, INSERT_MIGRATION_SQL,
    SELECT_SCHEMA_VERSION_SQL,
};
use crate::error::StoreError;

struct Migration {
    version: i32,
    description: &'static str,
    statements: &'static [&'static str],
}

/// Applied in order; versions are consecutive starting at 1.
const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Client state key-value table",
    statements: &[CREATE_CLIENT_STATE_TABLE_SQL],
}];

/// Bring the schema up to [`CURRENT_SCHEMA_VERSION`].
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(CREATE_MIGRATIONS_TABLE_SQL)
        .execute(pool)
        .await?;

    let current = get_current_version(pool).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > current).collect();
    if pending.is_empty() {
        info!("Store schema up to date at version {}", current);
        return Ok(());
    }

    for migration in pending {
        apply(pool, migration).await?;
    }
    info!("Store schema migrated to version {}", CURRENT_SCHEMA_VERSION);
    Ok(())
}

pub async fn get_current_version(pool: &SqlitePool) -> Result<i32, StoreError> {
    let version: Option<i32> = sqlx::query_scalar(SELECT_SCHEMA_VERSION_SQL)
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

async fn apply(pool: &SqlitePool, migration: &Migration) -> Result<(), StoreError> {
    info!(
        "Applying migration v{}: {}",
        migration.version, migration.description
    );

    let mut tx = pool.begin().await?;
    for statement in migration.statements {
        sqlx::query(*statement).execute(&mut *tx).await?;
    }
    sqlx::query(INSERT_MIGRATION_SQL)
        .bind(migration.version)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(migration.description)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
