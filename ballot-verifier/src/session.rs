//! User-triggered registration and vote casting
//!
//! Registration: `Unregistered -> Registering -> Registered`, or back to
//! `Unregistered` on rejection. Voting: `NotVoted -> Casting -> Voted`, or
//! back to `NotVoted` on rejection. Both flows are guarded against running
//! twice at once, and both end for good after one success.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{SessionError, StoreError};
use crate::ledger::LedgerClient;
use crate::notify::Notifier;
use crate::scheduler::SingleFlight;
use crate::store::SnapshotStore;
use crate::types::{Registration, VoterSession, VoterStatus};
use crate::vote_code::Candidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registering,
    Registered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotingState {
    /// No session yet, so nothing to vote with.
    Unavailable,
    NotVoted,
    Casting,
    Voted,
}

impl VotingState {
    /// Whether the vote affordance should be offered.
    pub fn can_vote(self) -> bool {
        self == VotingState::NotVoted
    }
}

pub struct SessionController {
    ledger: LedgerClient,
    store: SnapshotStore,
    notifier: Arc<dyn Notifier>,
    registering: SingleFlight,
    voting: SingleFlight,
}

impl SessionController {
    pub fn new(ledger: LedgerClient, store: SnapshotStore, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            ledger,
            store,
            notifier,
            registering: SingleFlight::new(),
            voting: SingleFlight::new(),
        }
    }

    pub async fn session(&self) -> Result<Option<VoterSession>, StoreError> {
        self.store.load_session().await
    }

    pub async fn registration_state(&self) -> Result<RegistrationState, StoreError> {
        if self.registering.is_held() {
            return Ok(RegistrationState::Registering);
        }
        Ok(match self.store.load_session().await? {
            Some(_) => RegistrationState::Registered,
            None => RegistrationState::Unregistered,
        })
    }

    pub async fn voting_state(&self) -> Result<VotingState, StoreError> {
        if self.voting.is_held() {
            return Ok(VotingState::Casting);
        }
        Ok(match self.store.load_session().await? {
            None => VotingState::Unavailable,
            Some(session) if session.voted => VotingState::Voted,
            Some(_) => VotingState::NotVoted,
        })
    }

    /// Register with the ledger and persist the returned identifiers.
    pub async fn register(&self, registration: &Registration) -> Result<VoterSession, SessionError> {
        let Some(_permit) = self.registering.try_acquire() else {
            return Err(SessionError::InFlight);
        };

        if self.store.load_session().await?.is_some() {
            return Err(self.surface(SessionError::AlreadyRegistered));
        }
        if let Err(problems) = registration.validate() {
            return Err(self.surface(SessionError::InvalidRegistration(problems)));
        }

        let session = match self.ledger.register_voter(registration).await {
            Ok(session) => session,
            Err(e) => return Err(self.surface(e.into())),
        };
        if let Err(e) = self.store.save_session(&session).await {
            error!(
                voter_id = %session.voter_id,
                error = %e,
                "Ledger accepted the registration but the session could not be saved"
            );
            return Err(self.surface(e.into()));
        }

        info!(voter_id = %session.voter_id, "Voter registered");
        self.notifier.success(&format!(
            "Registered. Voter ID: {}, Ballot ID: {}",
            session.voter_id, session.ballot_id
        ));
        Ok(session)
    }

    /// Cast a vote for `candidate`. Empty identifiers fail before any
    /// request is made.
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        ballot_id: &str,
        candidate: Candidate,
    ) -> Result<VoterSession, SessionError> {
        let voter_id = voter_id.trim();
        let ballot_id = ballot_id.trim();
        if voter_id.is_empty() || ballot_id.is_empty() {
            return Err(self.surface(SessionError::MissingIdentifiers));
        }

        let Some(_permit) = self.voting.try_acquire() else {
            return Err(SessionError::InFlight);
        };

        let stored = self.store.load_session().await?;
        if stored.as_ref().is_some_and(|session| session.voted) {
            return Err(self.surface(SessionError::AlreadyVoted));
        }

        if let Err(e) = self.ledger.cast_vote(voter_id, ballot_id, candidate).await {
            return Err(self.surface(e.into()));
        }

        let mut session = VoterSession::new(voter_id, ballot_id);
        session.voted = true;
        match stored {
            Some(stored) if !stored.matches(voter_id, ballot_id) => {
                warn!(
                    stored_voter_id = %stored.voter_id,
                    "Vote cast with identifiers other than the stored session, leaving it unchanged"
                );
            }
            _ => {
                if let Err(e) = self.store.save_session(&session).await {
                    error!(
                        voter_id = %voter_id,
                        error = %e,
                        "Ledger accepted the vote but the session could not be saved"
                    );
                    return Err(self.surface(e.into()));
                }
            }
        }

        info!(voter_id = %voter_id, "Vote cast");
        self.notifier.success(&format!("Vote cast for {}", candidate));
        Ok(session)
    }

    /// Approval and vote timestamps of the stored session's voter.
    pub async fn voter_status(&self) -> Result<Option<VoterStatus>, SessionError> {
        let Some(session) = self.store.load_session().await? else {
            return Ok(None);
        };
        Ok(Some(self.ledger.fetch_voter_status(&session.voter_id).await?))
    }

    fn surface(&self, err: SessionError) -> SessionError {
        self.notifier.error(&err.to_string());
        err
    }
}
