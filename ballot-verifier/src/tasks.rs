//! The four recurring verification tasks and what each one writes

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::audit::{AuditReport, AuditTarget, AuditTrailVerifier};
use crate::config::TaskPeriods;
use crate::consistency::{ConsistencyOutcome, ConsistencyVerifier};
use crate::dashboard::Dashboard;
use crate::error::{LedgerError, TaskError};
use crate::ledger::LedgerClient;
use crate::metrics::{record_alert, AlertKind};
use crate::notify::Notifier;
use crate::proof::ProofCapability;
use crate::scheduler::{PollTask, PollingScheduler};
use crate::store::SnapshotStore;

pub const STATS_TASK: &str = "stats_refresh";
pub const BALLOT_STATUS_TASK: &str = "ballot_status_refresh";
pub const CONSISTENCY_TASK: &str = "consistency_check";
pub const RANDOM_AUDIT_TASK: &str = "random_ballot_audit";

/// Everything the polling tasks share.
#[derive(Clone)]
pub struct PollContext {
    pub ledger: LedgerClient,
    pub store: SnapshotStore,
    pub verifier: ConsistencyVerifier,
    pub auditor: AuditTrailVerifier,
    pub dashboard: Dashboard,
    pub notifier: Arc<dyn Notifier>,
}

impl PollContext {
    pub fn new(
        ledger: LedgerClient,
        store: SnapshotStore,
        capability: ProofCapability,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            auditor: AuditTrailVerifier::new(ledger.clone()),
            verifier: ConsistencyVerifier::new(capability),
            dashboard: Dashboard::new(),
            ledger,
            store,
            notifier,
        }
    }
}

pub async fn refresh_stats(ctx: &PollContext) -> Result<(), TaskError> {
    let stats = ctx.ledger.fetch_stats().await?;
    debug!(
        registered = stats.registered,
        ballots = stats.ballots,
        "Fetched election stats"
    );
    ctx.dashboard.set_stats(stats);
    Ok(())
}

/// Audit the stored session's own ballot. Without a session there is
/// nothing to do.
pub async fn refresh_ballot_status(ctx: &PollContext) -> Result<Option<AuditReport>, TaskError> {
    let Some(session) = ctx.store.load_session().await? else {
        debug!("No voter session, skipping ballot status");
        return Ok(None);
    };

    let report = ctx
        .auditor
        .audit(&AuditTarget::Ballot(session.ballot_id.clone()))
        .await?;
    if !report.ok {
        raise_tamper_alert(ctx, &report);
    }
    ctx.dashboard.set_ballot_status(report.clone());
    Ok(Some(report))
}

/// One consistency cycle against the last trusted snapshot.
///
/// Only a consistent snapshot replaces the stored one, so after a divergence
/// later cycles keep comparing against the last trusted state. A `/state`
/// payload that does not decode as a snapshot is divergent.
pub async fn check_consistency(ctx: &PollContext) -> Result<ConsistencyOutcome, TaskError> {
    let prior = ctx.store.load_snapshot().await?;
    let (outcome, fresh) = match ctx.ledger.fetch_state().await {
        Ok(fresh) => (ctx.verifier.check(prior.as_ref(), &fresh), Some(fresh)),
        Err(LedgerError::Decode { url, source }) => {
            warn!(%url, error = %source, "Ledger state payload is malformed");
            (ctx.verifier.malformed(source.to_string()), None)
        }
        Err(e) => return Err(e.into()),
    };
    let now = Utc::now();

    match &outcome {
        ConsistencyOutcome::Skipped => return Ok(outcome),
        ConsistencyOutcome::Consistent => {
            if let Some(fresh) = &fresh {
                if prior.as_ref() != Some(fresh) {
                    ctx.store.save_snapshot(fresh).await?;
                }
                debug!(tx_id = fresh.tx_id, "Ledger state consistent");
            }
        }
        ConsistencyOutcome::Divergent(reason) => {
            record_alert(AlertKind::Divergent);
            ctx.notifier.alert(&format!(
                "Tampered! @ {}: {}",
                now.to_rfc3339_opts(SecondsFormat::Secs, true),
                reason
            ));
        }
    }

    ctx.dashboard.set_consistency(outcome.clone(), now);
    Ok(outcome)
}

/// Audit whichever ballot the ledger hands out. A ledger without ballots
/// answers 404, which is not a failure.
pub async fn audit_random_ballot(ctx: &PollContext) -> Result<Option<AuditReport>, TaskError> {
    let report = match ctx.auditor.audit(&AuditTarget::Random).await {
        Ok(report) => report,
        Err(e) if e.is_not_found() => {
            debug!("Ledger has no ballots yet");
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    if !report.ok {
        raise_tamper_alert(ctx, &report);
    }
    ctx.dashboard.set_random_audit(report.clone());
    Ok(Some(report))
}

fn raise_tamper_alert(ctx: &PollContext, report: &AuditReport) {
    record_alert(AlertKind::TamperDetected);
    ctx.notifier.alert(&format!(
        "Ballot {} was altered after being cast: {}",
        report.ballot_id,
        report.transcript.join(" -> ")
    ));
}

/// The standard task set with the given periods.
pub fn default_tasks(ctx: &PollContext, periods: &TaskPeriods) -> Vec<PollTask> {
    let stats_ctx = ctx.clone();
    let status_ctx = ctx.clone();
    let consistency_ctx = ctx.clone();
    let audit_ctx = ctx.clone();

    vec![
        PollTask::new(STATS_TASK, periods.stats, move || {
            let ctx = stats_ctx.clone();
            async move { refresh_stats(&ctx).await }
        }),
        PollTask::new(BALLOT_STATUS_TASK, periods.ballot_status, move || {
            let ctx = status_ctx.clone();
            async move { refresh_ballot_status(&ctx).await.map(|_| ()) }
        }),
        PollTask::new(CONSISTENCY_TASK, periods.consistency, move || {
            let ctx = consistency_ctx.clone();
            async move { check_consistency(&ctx).await.map(|_| ()) }
        }),
        PollTask::new(RANDOM_AUDIT_TASK, periods.random_audit, move || {
            let ctx = audit_ctx.clone();
            async move { audit_random_ballot(&ctx).await.map(|_| ()) }
        }),
    ]
}

pub fn build_scheduler(ctx: &PollContext, periods: &TaskPeriods) -> PollingScheduler {
    let mut scheduler = PollingScheduler::new();
    for task in default_tasks(ctx, periods) {
        scheduler.register(task);
    }
    info!(tasks = scheduler.tasks().len(), "Polling scheduler configured");
    scheduler
}
