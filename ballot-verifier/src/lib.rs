//! Client-side verification for a tamper-evident ballot ledger.
//!
//! Registers a voter and casts a vote through [`session::SessionController`],
//! and keeps auditing the ledger through the recurring tasks driven by
//! [`scheduler::PollingScheduler`].

pub mod audit;
pub mod config;
pub mod consistency;
pub mod dashboard;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod proof;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod tasks;
pub mod types;
pub mod utils;
pub mod vote_code;

pub use audit::{audit_record, AuditReport, AuditTarget, AuditTrailVerifier};
pub use config::{LedgerConfig, TaskPeriods, VerifierConfig};
pub use consistency::{ConsistencyOutcome, ConsistencyVerifier, Divergence};
pub use dashboard::{Dashboard, StatsView};
pub use error::{LedgerError, SessionError, StoreError, TaskError};
pub use ledger::LedgerClient;
pub use notify::{MemoryNotifier, Notice, Notifier, Severity, TracingNotifier};
pub use proof::{HeadChainChecker, ProofCapability, ProofChecker, ProofVerdict};
pub use scheduler::{run_task, PollTask, PollingScheduler, SchedulerHandle, SingleFlight};
pub use session::{RegistrationState, SessionController, VotingState};
pub use store::SnapshotStore;
pub use tasks::{build_scheduler, PollContext};
pub use types::{
    BallotRecord, ElectionStateSnapshot, ElectionStats, Registration, VoterSession, VoterStatus,
};
pub use vote_code::{Candidate, VoteCode};
