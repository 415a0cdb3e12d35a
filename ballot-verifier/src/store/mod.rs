//! Durable client-side state: the voter session and the last verified
//! election state snapshot.

pub mod constants;
pub mod migrator;
pub mod path;
pub mod sql;

use std::str::FromStr;

use serde::{de::DeserializeOwned, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::types::{ElectionStateSnapshot, VoterSession};
use constants::{ELECTION_STATE_KEY, MEMORY_DB_PATH, VOTER_SESSION_KEY};
use sql::{SELECT_CLIENT_STATE_SQL, UPSERT_CLIENT_STATE_SQL};

pub use migrator::run_migrations;
pub use path::validate_db_path;

/// Key-value store holding one JSON record per fixed key.
///
/// Cloning is cheap and every clone shares the same pool.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    /// Open (creating if needed) the database at `db_path` and run migrations
    pub async fn open(db_path: &str) -> Result<Self, StoreError> {
        info!("Initializing store at {:?}", db_path);
        validate_db_path(db_path)?;

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
            .create_if_missing(true);

        // Each connection to `:memory:` is its own database, so pin one.
        let pool = if db_path == MEMORY_DB_PATH {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<std::time::Duration>)
                .max_lifetime(None::<std::time::Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(4)
                .connect_with(options)
                .await?
        };

        run_migrations(&pool).await?;
        info!("Store initialized successfully");

        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(MEMORY_DB_PATH).await
    }

    /// Wait for in-flight writes and close every connection. Later calls on
    /// any clone fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn load_session(&self) -> Result<Option<VoterSession>, StoreError> {
        self.get(VOTER_SESSION_KEY).await
    }

    pub async fn save_session(&self, session: &VoterSession) -> Result<(), StoreError> {
        debug!(
            "Saving voter session: voter_id={} voted={}",
            session.voter_id, session.voted
        );
        self.put(VOTER_SESSION_KEY, session).await
    }

    pub async fn load_snapshot(&self) -> Result<Option<ElectionStateSnapshot>, StoreError> {
        self.get(ELECTION_STATE_KEY).await
    }

    pub async fn save_snapshot(&self, snapshot: &ElectionStateSnapshot) -> Result<(), StoreError> {
        debug!("Saving election state snapshot at tx {}", snapshot.tx_id);
        self.put(ELECTION_STATE_KEY, snapshot).await
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let value: Option<String> = sqlx::query_scalar(SELECT_CLIENT_STATE_SQL)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        sqlx::query(UPSERT_CLIENT_STATE_SQL)
            .bind(key)
            .bind(serde_json::to_string(value)?)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
