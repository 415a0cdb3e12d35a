//! Ballot history audit
//!
//! A valid ballot is registered once and cast at most once, so its history
//! holds at most two entries. Anything longer means a committed vote was
//! rewritten on the ledger.

use serde::Serialize;

use crate::error::LedgerError;
use crate::ledger::LedgerClient;
use crate::types::BallotRecord;

/// Longest history a valid ballot can have.
pub const MAX_VALID_HISTORY_LEN: usize = 2;

/// Which ballot to audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditTarget {
    Ballot(String),
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub ballot_id: String,
    pub ok: bool,
    /// One display label per history entry, oldest first.
    pub transcript: Vec<String>,
    pub record: BallotRecord,
}

impl AuditReport {
    /// Label of the ballot's current value.
    pub fn current_label(&self) -> String {
        self.record.current().status_label()
    }
}

/// Builds an [`AuditReport`] from a ballot record.
///
/// Unknown vote codes never fail the audit; they show up as "Invalid" and
/// still count toward the history length.
pub fn audit_record(record: BallotRecord) -> AuditReport {
    let transcript = record
        .entries()
        .map(|code| code.label())
        .collect::<Vec<_>>();
    AuditReport {
        ballot_id: record.ballot_id.clone(),
        ok: record.history.len() <= MAX_VALID_HISTORY_LEN,
        transcript,
        record,
    }
}

#[derive(Clone)]
pub struct AuditTrailVerifier {
    ledger: LedgerClient,
}

impl AuditTrailVerifier {
    pub fn new(ledger: LedgerClient) -> Self {
        Self { ledger }
    }

    pub async fn audit(&self, target: &AuditTarget) -> Result<AuditReport, LedgerError> {
        let record = match target {
            AuditTarget::Ballot(ballot_id) => self.ledger.fetch_ballot(ballot_id).await?,
            AuditTarget::Random => self.ledger.fetch_random_ballot().await?.0,
        };
        Ok(audit_record(record))
    }
}
