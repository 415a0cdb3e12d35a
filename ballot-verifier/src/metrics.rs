use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::OnceCell;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RunOutcome {
    Completed,
    Failed,
    /// The previous invocation was still in flight.
    Skipped,
}

impl RunOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Failed => "failed",
            RunOutcome::Skipped => "skipped",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AlertKind {
    Divergent,
    TamperDetected,
}

pub struct Metrics {
    task_runs_total: HashMap<(&'static str, RunOutcome), u64>,
    alerts_total: HashMap<AlertKind, u64>,
}

static METRICS: OnceCell<Mutex<Metrics>> = OnceCell::new();

fn get() -> &'static Mutex<Metrics> {
    METRICS.get_or_init(|| {
        Mutex::new(Metrics {
            task_runs_total: HashMap::new(),
            alerts_total: HashMap::new(),
        })
    })
}

pub fn record_task_outcome(task: &'static str, outcome: RunOutcome) {
    let mut m = get().lock().unwrap_or_else(|e| e.into_inner());
    *m.task_runs_total.entry((task, outcome)).or_insert(0) += 1;
}

pub fn record_alert(kind: AlertKind) {
    let mut m = get().lock().unwrap_or_else(|e| e.into_inner());
    *m.alerts_total.entry(kind).or_insert(0) += 1;
}

pub fn task_outcome_count(task: &str, outcome: RunOutcome) -> u64 {
    let m = get().lock().unwrap_or_else(|e| e.into_inner());
    m.task_runs_total
        .iter()
        .filter(|((name, o), _)| *name == task && *o == outcome)
        .map(|(_, count)| *count)
        .sum()
}

pub fn snapshot_as_json() -> serde_json::Value {
    use serde_json::json;
    let m = get().lock().unwrap_or_else(|e| e.into_inner());

    let mut runs: Vec<serde_json::Value> = m
        .task_runs_total
        .iter()
        .map(|((task, outcome), count)| {
            json!({
                "task": task,
                "outcome": outcome.as_str(),
                "count": count
            })
        })
        .collect();
    runs.sort_by(|a, b| {
        (a["task"].as_str(), a["outcome"].as_str()).cmp(&(b["task"].as_str(), b["outcome"].as_str()))
    });

    let alerts: Vec<serde_json::Value> = m
        .alerts_total
        .iter()
        .map(|(kind, count)| {
            json!({
                "kind": match kind {
                    AlertKind::Divergent => "divergent",
                    AlertKind::TamperDetected => "tamper_detected",
                },
                "count": count
            })
        })
        .collect();

    json!({
        "task_runs_total": runs,
        "alerts_total": alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_counts_show_up_in_snapshot() {
        let before = task_outcome_count("metrics_test_task", RunOutcome::Failed);
        record_task_outcome("metrics_test_task", RunOutcome::Failed);
        record_alert(AlertKind::TamperDetected);
        assert_eq!(
            task_outcome_count("metrics_test_task", RunOutcome::Failed),
            before + 1
        );

        let json = snapshot_as_json();
        let runs = json["task_runs_total"].as_array().unwrap();
        assert!(runs
            .iter()
            .any(|r| r["task"] == "metrics_test_task" && r["outcome"] == "failed"));
        assert!(json["alerts_total"]
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["kind"] == "tamper_detected"));
    }
}
