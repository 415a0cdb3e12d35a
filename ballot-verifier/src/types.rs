//! Types for ledger requests, responses and client-side records

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::vote_code::{Candidate, VoteCode};

/// Point-in-time read of the ledger head and aggregate election counts.
///
/// Every field is optional on the wire. Top-level fields this client does not
/// know are collected into `metadata` and handed to the proof checker
/// untouched. Counts are signed so that a negative value reaches the
/// consistency checks instead of failing to decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectionStateSnapshot {
    #[serde(default)]
    pub tx_id: u64,
    #[serde(default)]
    pub tx_hash: String,
    #[serde(default)]
    pub results: BTreeMap<i64, i64>,
    #[serde(default)]
    pub registered: i64,
    #[serde(default)]
    pub voted: i64,
    #[serde(default)]
    pub ballots: i64,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

const SNAPSHOT_FIELDS: &[&str] = &[
    "tx_id",
    "tx_hash",
    "results",
    "registered",
    "voted",
    "ballots",
    "metadata",
];

impl ElectionStateSnapshot {
    /// Build a snapshot from a raw `/state` payload.
    pub fn from_ledger_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut snapshot: Self = serde_json::from_value(value.clone())?;
        if let serde_json::Value::Object(fields) = value {
            snapshot.metadata.extend(
                fields
                    .into_iter()
                    .filter(|(key, _)| !SNAPSHOT_FIELDS.contains(&key.as_str())),
            );
        }
        Ok(snapshot)
    }

    /// Tally for a candidate code; absent keys count as zero.
    pub fn tally(&self, code: i64) -> i64 {
        self.results.get(&code).copied().unwrap_or(0)
    }

    pub fn tally_sum(&self) -> i64 {
        self.results
            .values()
            .fold(0i64, |acc, count| acc.saturating_add(*count))
    }
}

/// Response of `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElectionStats {
    #[serde(default)]
    pub results: BTreeMap<u16, u64>,
    #[serde(default)]
    pub registered: u64,
    #[serde(default)]
    pub voted: u64,
    #[serde(default)]
    pub ballots: u64,
}

impl ElectionStats {
    pub fn count_for(&self, candidate: Candidate) -> u64 {
        self.results.get(&candidate.code()).copied().unwrap_or(0)
    }
}

/// A ballot as stored on the ledger: its current value and every value it
/// has held, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BallotRecord {
    #[serde(default)]
    pub ballot_id: String,
    pub vote: i64,
    #[serde(default)]
    pub history: Vec<i64>,
}

impl BallotRecord {
    pub fn current(&self) -> VoteCode {
        VoteCode::from(self.vote)
    }

    pub fn entries(&self) -> impl Iterator<Item = VoteCode> + '_ {
        self.history.iter().map(|code| VoteCode::from(*code))
    }
}

/// The voter's own registration, persisted across restarts.
///
/// Holds identifiers only, never the vote value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterSession {
    pub voter_id: String,
    pub ballot_id: String,
    #[serde(default)]
    pub voted: bool,
}

impl VoterSession {
    pub fn new(voter_id: impl Into<String>, ballot_id: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            ballot_id: ballot_id.into(),
            voted: false,
        }
    }

    pub fn matches(&self, voter_id: &str, ballot_id: &str) -> bool {
        self.voter_id == voter_id && self.ballot_id == ballot_id
    }
}

/// Body of `POST /register-voter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub citizen_id: String,
    pub name: String,
    pub address: String,
    pub email: String,
}

impl Registration {
    /// Check the fields the way the ledger does before accepting them.
    pub fn validate(&self) -> Result<(), String> {
        let mut errs = Vec::new();
        if self.citizen_id.trim().is_empty() {
            errs.push("citizen ID is missing");
        }
        if self.name.trim().is_empty() {
            errs.push("name is missing");
        }
        if self.address.trim().is_empty() {
            errs.push("address is missing");
        }
        if !is_email_valid(&self.email) {
            errs.push("email is invalid");
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(errs.join(", "))
        }
    }
}

fn is_email_valid(email: &str) -> bool {
    if email.len() < 3 || email.len() > 254 {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RegisterVoterResponse {
    pub voter_id: String,
    pub ballot_id: String,
}

/// Body of `POST /vote`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct VoteRequest<'a> {
    pub voter_id: &'a str,
    pub ballot_id: &'a str,
    pub vote: u16,
}

/// Response of `GET /voter-status`. The ledger reports unset timestamps as
/// the zero time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoterStatus {
    #[serde(default)]
    pub approved: DateTime<Utc>,
    #[serde(default)]
    pub voted: DateTime<Utc>,
}

impl VoterStatus {
    pub fn is_approved(&self) -> bool {
        is_set(&self.approved)
    }

    pub fn has_voted(&self) -> bool {
        is_set(&self.voted)
    }
}

fn is_set(ts: &DateTime<Utc>) -> bool {
    ts.year() > 1970
}
