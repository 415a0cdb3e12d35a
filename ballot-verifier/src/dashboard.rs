//! Rendered state written by the polling tasks and read by whatever displays it

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::audit::AuditReport;
use crate::consistency::ConsistencyOutcome;
use crate::types::ElectionStats;
use crate::vote_code::Candidate;

/// Stats as displayed: every count is a string, absent tallies read "0".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsView {
    stats: ElectionStats,
}

impl StatsView {
    pub fn new(stats: ElectionStats) -> Self {
        Self { stats }
    }

    pub fn count_for(&self, candidate: Candidate) -> String {
        self.stats.count_for(candidate).to_string()
    }

    pub fn registered(&self) -> String {
        self.stats.registered.to_string()
    }

    pub fn voted(&self) -> String {
        self.stats.voted.to_string()
    }

    pub fn ballots(&self) -> String {
        self.stats.ballots.to_string()
    }
}

/// Result of the most recent consistency check that actually ran.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyView {
    pub outcome: ConsistencyOutcome,
    pub at: DateTime<Utc>,
}

impl ConsistencyView {
    pub fn label(&self) -> String {
        let at = self.at.to_rfc3339_opts(SecondsFormat::Secs, true);
        match &self.outcome {
            ConsistencyOutcome::Consistent => format!("OK @ {}", at),
            ConsistencyOutcome::Divergent(_) => format!("Tampered! @ {}", at),
            ConsistencyOutcome::Skipped => format!("Skipped @ {}", at),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub stats: Option<StatsView>,
    pub ballot_status: Option<String>,
    pub own_audit: Option<AuditReport>,
    pub consistency: Option<ConsistencyView>,
    pub random_audit: Option<AuditReport>,
}

/// Shared handle; clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    state: Arc<RwLock<DashboardState>>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stats(&self, stats: ElectionStats) {
        self.write().stats = Some(StatsView::new(stats));
    }

    pub fn set_ballot_status(&self, report: AuditReport) {
        let mut state = self.write();
        state.ballot_status = Some(report.current_label());
        state.own_audit = Some(report);
    }

    pub fn set_consistency(&self, outcome: ConsistencyOutcome, at: DateTime<Utc>) {
        self.write().consistency = Some(ConsistencyView { outcome, at });
    }

    pub fn set_random_audit(&self, report: AuditReport) {
        self.write().random_audit = Some(report);
    }

    pub fn snapshot(&self) -> DashboardState {
        self.read().clone()
    }

    pub fn stats(&self) -> Option<StatsView> {
        self.read().stats.clone()
    }

    pub fn ballot_status(&self) -> Option<String> {
        self.read().ballot_status.clone()
    }

    pub fn consistency_label(&self) -> Option<String> {
        self.read().consistency.as_ref().map(ConsistencyView::label)
    }

    pub fn random_audit(&self) -> Option<AuditReport> {
        self.read().random_audit.clone()
    }

    // A panicking writer leaves plain data behind; keep serving it.
    fn read(&self) -> RwLockReadGuard<'_, DashboardState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, DashboardState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
