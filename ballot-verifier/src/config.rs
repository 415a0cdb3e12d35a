//! Runtime configuration read from the environment

use std::time::Duration;

use tracing::warn;

use crate::store::constants::DEFAULT_DB_PATH;
use crate::utils::env_parse;

pub const DEFAULT_LEDGER_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

pub const DEFAULT_STATS_PERIOD_SECS: u64 = 10;
pub const DEFAULT_BALLOT_STATUS_PERIOD_SECS: u64 = 15;
pub const DEFAULT_CONSISTENCY_PERIOD_SECS: u64 = 5;
pub const DEFAULT_RANDOM_AUDIT_PERIOD_SECS: u64 = 8;

/// How to reach the ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub request_timeout: Duration,
}

impl LedgerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: None,
            password: None,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }

    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("LEDGER_URL")
                .unwrap_or_else(|_| DEFAULT_LEDGER_URL.to_string()),
            username: std::env::var("LEDGER_USER").ok(),
            password: std::env::var("LEDGER_PASSWORD").ok(),
            request_timeout: Duration::from_millis(env_parse(
                "REQUEST_TIMEOUT_MS",
                DEFAULT_REQUEST_TIMEOUT_MS,
            )),
        }
    }
}

/// Periods of the recurring polling tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPeriods {
    pub stats: Duration,
    pub ballot_status: Duration,
    pub consistency: Duration,
    pub random_audit: Duration,
}

impl Default for TaskPeriods {
    fn default() -> Self {
        Self {
            stats: Duration::from_secs(DEFAULT_STATS_PERIOD_SECS),
            ballot_status: Duration::from_secs(DEFAULT_BALLOT_STATUS_PERIOD_SECS),
            consistency: Duration::from_secs(DEFAULT_CONSISTENCY_PERIOD_SECS),
            random_audit: Duration::from_secs(DEFAULT_RANDOM_AUDIT_PERIOD_SECS),
        }
    }
}

impl TaskPeriods {
    pub fn from_env() -> Self {
        Self {
            stats: period_from_env("STATS_PERIOD_SECS", DEFAULT_STATS_PERIOD_SECS),
            ballot_status: period_from_env(
                "BALLOT_STATUS_PERIOD_SECS",
                DEFAULT_BALLOT_STATUS_PERIOD_SECS,
            ),
            consistency: period_from_env("CONSISTENCY_PERIOD_SECS", DEFAULT_CONSISTENCY_PERIOD_SECS),
            random_audit: period_from_env(
                "RANDOM_AUDIT_PERIOD_SECS",
                DEFAULT_RANDOM_AUDIT_PERIOD_SECS,
            ),
        }
    }

    /// Same period for every task.
    pub fn uniform(period: Duration) -> Self {
        Self {
            stats: period,
            ballot_status: period,
            consistency: period,
            random_audit: period,
        }
    }
}

fn period_from_env(key: &str, default_secs: u64) -> Duration {
    let secs = env_parse(key, default_secs);
    if secs == 0 {
        warn!("{} must be positive, using default of {}s", key, default_secs);
        return Duration::from_secs(default_secs);
    }
    Duration::from_secs(secs)
}

/// Everything the long-running verifier needs.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    pub ledger: LedgerConfig,
    pub db_path: String,
    pub periods: TaskPeriods,
}

impl VerifierConfig {
    pub fn from_env() -> Self {
        Self {
            ledger: LedgerConfig::from_env(),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            periods: TaskPeriods::from_env(),
        }
    }
}
