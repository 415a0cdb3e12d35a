//! Proof-checking capability consumed by the consistency verifier
//!
//! The checker itself is opaque: it receives one or two snapshots and
//! answers pass or reject. It is initialized independently of the rest of
//! the client, so it is held behind a [`ProofCapability`] that reports
//! "not ready" until [`ProofCapability::signal_ready`] has been called.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::info;

use crate::types::ElectionStateSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofVerdict {
    Pass,
    Reject(String),
}

pub trait ProofChecker: Send + Sync {
    /// Check `fresh` on its own (`prior == None`) or as a successor of `prior`.
    fn check(
        &self,
        prior: Option<&ElectionStateSnapshot>,
        fresh: &ElectionStateSnapshot,
    ) -> ProofVerdict;
}

/// Shared handle to a checker that may not be initialized yet.
#[derive(Clone, Default)]
pub struct ProofCapability {
    checker: Arc<OnceCell<Arc<dyn ProofChecker>>>,
}

impl ProofCapability {
    /// A capability that is not ready yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A capability that is ready from the start.
    pub fn ready(checker: Arc<dyn ProofChecker>) -> Self {
        let capability = Self::new();
        capability.signal_ready(checker);
        capability
    }

    /// Install the checker. Only the first call has an effect; returns
    /// whether this call was it.
    pub fn signal_ready(&self, checker: Arc<dyn ProofChecker>) -> bool {
        let installed = self.checker.set(checker).is_ok();
        if installed {
            info!("Proof checker ready");
        }
        installed
    }

    pub fn is_ready(&self) -> bool {
        self.checker.get().is_some()
    }

    pub fn checker(&self) -> Option<Arc<dyn ProofChecker>> {
        self.checker.get().cloned()
    }
}

/// Checks that the ledger head only ever moves forward.
///
/// A head at the same transaction id as the prior one must carry the same
/// hash; anything past genesis must carry a hash at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadChainChecker;

impl ProofChecker for HeadChainChecker {
    fn check(
        &self,
        prior: Option<&ElectionStateSnapshot>,
        fresh: &ElectionStateSnapshot,
    ) -> ProofVerdict {
        if fresh.tx_id > 0 && fresh.tx_hash.is_empty() {
            return ProofVerdict::Reject(format!("ledger head at tx {} has no hash", fresh.tx_id));
        }

        let Some(prior) = prior else {
            return ProofVerdict::Pass;
        };

        if fresh.tx_id < prior.tx_id {
            return ProofVerdict::Reject(format!(
                "ledger head moved backward from tx {} to tx {}",
                prior.tx_id, fresh.tx_id
            ));
        }
        if fresh.tx_id == prior.tx_id && fresh.tx_hash != prior.tx_hash {
            return ProofVerdict::Reject(format!(
                "hash of tx {} changed from {} to {}",
                fresh.tx_id, prior.tx_hash, fresh.tx_hash
            ));
        }

        ProofVerdict::Pass
    }
}
