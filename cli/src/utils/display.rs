use ballot_verifier::dashboard::DashboardState;
use ballot_verifier::{AuditReport, Candidate, StatsView, VoterSession, VoterStatus};

pub fn render_stats(stats: &StatsView) -> String {
    let mut lines: Vec<String> = Candidate::ALL
        .iter()
        .map(|c| format!("{}: {}", c, stats.count_for(*c)))
        .collect();
    lines.push(format!("Registered: {}", stats.registered()));
    lines.push(format!("Voted: {}", stats.voted()));
    lines.push(format!("Ballots: {}", stats.ballots()));
    lines.join("\n")
}

pub fn render_audit(report: &AuditReport) -> String {
    let verdict = if report.ok { "OK" } else { "TAMPERED" };
    let mut out = format!(
        "Ballot {}: {} (current: {})",
        report.ballot_id,
        verdict,
        report.current_label()
    );
    for (i, label) in report.transcript.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, label));
    }
    out
}

pub fn render_session(session: &VoterSession, status: Option<&VoterStatus>) -> String {
    let mut out = format!(
        "Voter ID: {}\nBallot ID: {}\nVoted: {}",
        session.voter_id,
        session.ballot_id,
        if session.voted { "yes" } else { "no" }
    );
    if let Some(status) = status {
        let at = |set: bool, ts: &chrono::DateTime<chrono::Utc>| {
            if set {
                ts.to_rfc3339()
            } else {
                "not yet".to_string()
            }
        };
        out.push_str(&format!(
            "\nApproved: {}\nVote recorded: {}",
            at(status.is_approved(), &status.approved),
            at(status.has_voted(), &status.voted)
        ));
    }
    out
}

pub fn render_dashboard(state: &DashboardState) -> String {
    let mut sections = Vec::new();
    if let Some(stats) = &state.stats {
        sections.push(render_stats(stats));
    }
    if let Some(status) = &state.ballot_status {
        sections.push(format!("Your ballot: {}", status));
    }
    if let Some(consistency) = &state.consistency {
        sections.push(format!("Ledger state: {}", consistency.label()));
    }
    if let Some(report) = &state.random_audit {
        sections.push(format!("Random audit: {}", render_audit(report)));
    }
    if sections.is_empty() {
        return "No data yet".to_string();
    }
    sections.join("\n")
}
