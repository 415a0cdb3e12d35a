//! Detects divergence between a previously trusted snapshot and a fresh one

use thiserror::Error;
use tracing::debug;

use crate::proof::{ProofCapability, ProofVerdict};
use crate::types::ElectionStateSnapshot;

/// Why a snapshot was judged divergent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Divergence {
    #[error("tally for vote code {code} moved backward from {prior} to {fresh}")]
    TallyRegressed { code: i64, prior: i64, fresh: i64 },

    #[error("{field} count moved backward from {prior} to {fresh}")]
    CountRegressed {
        field: &'static str,
        prior: i64,
        fresh: i64,
    },

    #[error("malformed snapshot: {0}")]
    InvalidStructure(String),

    #[error("proof checker rejected snapshot: {0}")]
    ProofRejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyOutcome {
    Consistent,
    Divergent(Divergence),
    /// The proof checker is not initialized yet; nothing was checked.
    Skipped,
}

impl ConsistencyOutcome {
    pub fn is_consistent(&self) -> bool {
        matches!(self, ConsistencyOutcome::Consistent)
    }

    pub fn is_divergent(&self) -> bool {
        matches!(self, ConsistencyOutcome::Divergent(_))
    }
}

/// Stateless: callers pass both snapshots on every call.
#[derive(Clone)]
pub struct ConsistencyVerifier {
    capability: ProofCapability,
}

impl ConsistencyVerifier {
    pub fn new(capability: ProofCapability) -> Self {
        Self { capability }
    }

    /// Compare against `prior` when there is one, otherwise validate `fresh`
    /// on its own.
    pub fn check(
        &self,
        prior: Option<&ElectionStateSnapshot>,
        fresh: &ElectionStateSnapshot,
    ) -> ConsistencyOutcome {
        match prior {
            Some(prior) => self.verify(prior, fresh),
            None => self.verify_structural(fresh),
        }
    }

    /// `fresh` must hold no negative count, must not move any count or tally
    /// below `prior`, and the proof checker must accept it as a successor of
    /// `prior`.
    pub fn verify(
        &self,
        prior: &ElectionStateSnapshot,
        fresh: &ElectionStateSnapshot,
    ) -> ConsistencyOutcome {
        let Some(checker) = self.capability.checker() else {
            debug!("Proof checker not ready, skipping consistency check");
            return ConsistencyOutcome::Skipped;
        };

        if let Err(reason) = check_non_negative(fresh) {
            return ConsistencyOutcome::Divergent(Divergence::InvalidStructure(reason));
        }
        if let Some(divergence) = find_regression(prior, fresh) {
            return ConsistencyOutcome::Divergent(divergence);
        }

        match checker.check(Some(prior), fresh) {
            ProofVerdict::Pass => ConsistencyOutcome::Consistent,
            ProofVerdict::Reject(reason) => {
                ConsistencyOutcome::Divergent(Divergence::ProofRejected(reason))
            }
        }
    }

    /// Outcome for a `/state` payload that could not be read as a snapshot at
    /// all.
    pub fn malformed(&self, reason: impl Into<String>) -> ConsistencyOutcome {
        if !self.capability.is_ready() {
            debug!("Proof checker not ready, skipping malformed snapshot");
            return ConsistencyOutcome::Skipped;
        }
        ConsistencyOutcome::Divergent(Divergence::InvalidStructure(reason.into()))
    }

    /// Well-formedness of a single snapshot, used when there is nothing
    /// trusted to compare against yet.
    pub fn verify_structural(&self, fresh: &ElectionStateSnapshot) -> ConsistencyOutcome {
        let Some(checker) = self.capability.checker() else {
            debug!("Proof checker not ready, skipping structural check");
            return ConsistencyOutcome::Skipped;
        };

        if let Err(reason) = check_structure(fresh) {
            return ConsistencyOutcome::Divergent(Divergence::InvalidStructure(reason));
        }

        match checker.check(None, fresh) {
            ProofVerdict::Pass => ConsistencyOutcome::Consistent,
            ProofVerdict::Reject(reason) => {
                ConsistencyOutcome::Divergent(Divergence::ProofRejected(reason))
            }
        }
    }
}

fn find_regression(
    prior: &ElectionStateSnapshot,
    fresh: &ElectionStateSnapshot,
) -> Option<Divergence> {
    let counts = [
        ("registered", prior.registered, fresh.registered),
        ("voted", prior.voted, fresh.voted),
        ("ballots", prior.ballots, fresh.ballots),
    ];
    for (field, prior, fresh) in counts {
        if fresh < prior {
            return Some(Divergence::CountRegressed {
                field,
                prior,
                fresh,
            });
        }
    }

    // A key missing from the fresh results counts as zero.
    prior.results.iter().find_map(|(code, prior_tally)| {
        let fresh_tally = fresh.tally(*code);
        (fresh_tally < *prior_tally).then_some(Divergence::TallyRegressed {
            code: *code,
            prior: *prior_tally,
            fresh: fresh_tally,
        })
    })
}

fn check_non_negative(snapshot: &ElectionStateSnapshot) -> Result<(), String> {
    let counts = [
        ("registered", snapshot.registered),
        ("voted", snapshot.voted),
        ("ballots", snapshot.ballots),
    ];
    if let Some((field, count)) = counts.into_iter().find(|(_, count)| *count < 0) {
        return Err(format!("negative {} count {}", field, count));
    }
    if let Some((code, tally)) = snapshot.results.iter().find(|(_, tally)| **tally < 0) {
        return Err(format!("negative tally {} for vote code {}", tally, code));
    }
    Ok(())
}

fn check_structure(snapshot: &ElectionStateSnapshot) -> Result<(), String> {
    check_non_negative(snapshot)?;
    let tallied = snapshot.tally_sum();
    if tallied > snapshot.ballots {
        return Err(format!(
            "{} votes tallied but only {} ballots cast",
            tallied, snapshot.ballots
        ));
    }
    if snapshot.ballots > snapshot.registered {
        return Err(format!(
            "{} ballots cast but only {} voters registered",
            snapshot.ballots, snapshot.registered
        ));
    }
    if snapshot.voted > snapshot.registered {
        return Err(format!(
            "{} voters voted but only {} registered",
            snapshot.voted, snapshot.registered
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::{HeadChainChecker, ProofChecker};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::Arc;

    struct RejectAll;

    impl ProofChecker for RejectAll {
        fn check(
            &self,
            _prior: Option<&ElectionStateSnapshot>,
            _fresh: &ElectionStateSnapshot,
        ) -> ProofVerdict {
            ProofVerdict::Reject("bad proof".to_string())
        }
    }

    fn verifier() -> ConsistencyVerifier {
        ConsistencyVerifier::new(ProofCapability::ready(Arc::new(HeadChainChecker)))
    }

    fn snapshot(a: i64, b: i64, ballots: i64, registered: i64) -> ElectionStateSnapshot {
        let mut snapshot = ElectionStateSnapshot {
            registered,
            voted: ballots,
            ballots,
            ..Default::default()
        };
        snapshot.results.insert(1, a);
        snapshot.results.insert(2, b);
        snapshot
    }

    fn random_snapshot(rng: &mut StdRng) -> ElectionStateSnapshot {
        let a = rng.gen_range(0..50);
        let b = rng.gen_range(0..50);
        let ballots = a + b + rng.gen_range(0..5);
        let registered = ballots + rng.gen_range(0..20);
        let mut s = snapshot(a, b, ballots, registered);
        s.tx_id = rng.gen_range(0..1_000);
        s.tx_hash = format!("h{}", s.tx_id);
        s
    }

    fn grow(rng: &mut StdRng, prior: &ElectionStateSnapshot) -> ElectionStateSnapshot {
        let mut fresh = prior.clone();
        for tally in fresh.results.values_mut() {
            *tally += rng.gen_range(0..3);
        }
        fresh.registered += rng.gen_range(0..3);
        fresh.voted += rng.gen_range(0..3);
        fresh.ballots += rng.gen_range(0..3);
        let advance = rng.gen_range(0..3);
        if advance > 0 {
            fresh.tx_id += advance;
            fresh.tx_hash = format!("h{}", fresh.tx_id);
        }
        fresh
    }

    #[test]
    fn test_non_decreasing_snapshots_are_consistent() {
        let verifier = verifier();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let prior = random_snapshot(&mut rng);
            let fresh = grow(&mut rng, &prior);
            assert_eq!(
                verifier.verify(&prior, &fresh),
                ConsistencyOutcome::Consistent,
                "prior={:?} fresh={:?}",
                prior,
                fresh
            );
        }
    }

    #[test]
    fn test_any_regression_is_divergent() {
        let verifier = verifier();
        let mut rng = StdRng::seed_from_u64(11);
        for i in 0..500 {
            let prior = random_snapshot(&mut rng);
            let mut fresh = grow(&mut rng, &prior);
            match i % 5 {
                0 => fresh.registered = prior.registered.saturating_sub(1).min(fresh.registered),
                1 => fresh.voted = prior.voted.saturating_sub(1).min(fresh.voted),
                2 => fresh.ballots = prior.ballots.saturating_sub(1).min(fresh.ballots),
                3 => {
                    fresh.results.insert(1, prior.tally(1).saturating_sub(1));
                }
                _ => {
                    fresh.results.remove(&2);
                }
            }
            let regressed = fresh.registered < prior.registered
                || fresh.voted < prior.voted
                || fresh.ballots < prior.ballots
                || fresh.tally(1) < prior.tally(1)
                || fresh.tally(2) < prior.tally(2);
            if regressed {
                assert!(verifier.verify(&prior, &fresh).is_divergent());
            }
        }
    }

    #[test]
    fn test_reports_which_tally_regressed() {
        let outcome = verifier().verify(&snapshot(3, 2, 5, 9), &snapshot(3, 1, 5, 9));
        assert_eq!(
            outcome,
            ConsistencyOutcome::Divergent(Divergence::TallyRegressed {
                code: 2,
                prior: 2,
                fresh: 1
            })
        );
    }

    #[test]
    fn test_reports_count_regression() {
        let outcome = verifier().verify(&snapshot(1, 1, 2, 9), &snapshot(1, 1, 2, 8));
        assert_eq!(
            outcome,
            ConsistencyOutcome::Divergent(Divergence::CountRegressed {
                field: "registered",
                prior: 9,
                fresh: 8
            })
        );
    }

    #[test]
    fn test_proof_rejection_is_divergent() {
        let verifier = ConsistencyVerifier::new(ProofCapability::ready(Arc::new(RejectAll)));
        let s = snapshot(1, 1, 2, 3);
        assert_eq!(
            verifier.verify(&s, &s),
            ConsistencyOutcome::Divergent(Divergence::ProofRejected("bad proof".to_string()))
        );
        assert!(verifier.verify_structural(&s).is_divergent());
    }

    #[test]
    fn test_unready_checker_skips() {
        let verifier = ConsistencyVerifier::new(ProofCapability::new());
        let s = snapshot(1, 1, 2, 3);
        assert_eq!(verifier.verify(&s, &s), ConsistencyOutcome::Skipped);
        assert_eq!(verifier.check(None, &s), ConsistencyOutcome::Skipped);

        // Skipping takes precedence over an obvious regression.
        assert_eq!(
            verifier.verify(&s, &snapshot(0, 0, 0, 0)),
            ConsistencyOutcome::Skipped
        );
        assert_eq!(verifier.malformed("not an object"), ConsistencyOutcome::Skipped);
    }

    #[test]
    fn test_structural_checks() {
        let verifier = verifier();
        assert!(verifier.verify_structural(&snapshot(2, 3, 5, 10)).is_consistent());
        assert!(verifier.verify_structural(&ElectionStateSnapshot::default()).is_consistent());
        assert_eq!(
            verifier.malformed("not an object"),
            ConsistencyOutcome::Divergent(Divergence::InvalidStructure(
                "not an object".to_string()
            ))
        );

        // More tallies than ballots.
        assert!(matches!(
            verifier.verify_structural(&snapshot(4, 3, 5, 10)),
            ConsistencyOutcome::Divergent(Divergence::InvalidStructure(_))
        ));
        // More ballots than registered voters.
        assert!(matches!(
            verifier.verify_structural(&snapshot(2, 3, 5, 4)),
            ConsistencyOutcome::Divergent(Divergence::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_negative_counts_are_malformed() {
        let verifier = verifier();
        let prior = snapshot(0, 0, 0, 0);

        let mut negative_tally = snapshot(0, 0, 0, 0);
        negative_tally.results.insert(1, -1);
        // A new key is not covered by the regression check against `prior`.
        let mut negative_new_key = snapshot(0, 0, 0, 0);
        negative_new_key.results.insert(7, -2);
        let mut negative_count = snapshot(0, 0, 0, 0);
        negative_count.voted = -3;

        for fresh in [negative_tally, negative_new_key, negative_count] {
            for outcome in [verifier.verify(&prior, &fresh), verifier.verify_structural(&fresh)] {
                assert!(
                    matches!(
                        outcome,
                        ConsistencyOutcome::Divergent(Divergence::InvalidStructure(_))
                    ),
                    "fresh={:?} outcome={:?}",
                    fresh,
                    outcome
                );
            }
        }
    }

    #[test]
    fn test_check_dispatches_on_prior() {
        let verifier = verifier();
        let bad_alone = snapshot(4, 3, 5, 10);
        assert!(verifier.check(None, &bad_alone).is_divergent());
        // Against a prior, only movement is judged.
        assert!(verifier.check(Some(&bad_alone), &bad_alone).is_consistent());
    }
}
