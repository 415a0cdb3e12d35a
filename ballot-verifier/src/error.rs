//! Error types shared across the verifier

use thiserror::Error;

/// Failure of a single ledger request.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No response was obtained (connection refused, DNS, timeout).
    #[error("error executing HTTP request {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The ledger answered with a non-success status. `message` is the
    /// response body as sent by the server.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The ledger answered 2xx but the payload did not parse.
    #[error("error decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid ledger url: {0}")]
    InvalidUrl(String),
}

impl LedgerError {
    /// HTTP status of a rejection, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            LedgerError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Failure of the durable client-side store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("error (de)serializing stored record: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid database path: {0}")]
    InvalidPath(String),
}

/// Failure of a user-triggered registration or vote flow.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("voter id and ballot id are both required")]
    MissingIdentifiers,

    #[error("{0}")]
    InvalidRegistration(String),

    #[error("this client already holds a voter registration")]
    AlreadyRegistered,

    #[error("a vote has already been cast from this session")]
    AlreadyVoted,

    #[error("another attempt is still in flight")]
    InFlight,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of one invocation of a polling task.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Failed(String),
}
