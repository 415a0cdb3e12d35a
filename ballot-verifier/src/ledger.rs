//! Typed HTTP client for the remote ballot ledger

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::types::{
    BallotRecord, ElectionStateSnapshot, ElectionStats, RegisterVoterResponse, Registration,
    VoteRequest, VoterSession, VoterStatus,
};
use crate::utils::normalize_base_url;
use crate::vote_code::Candidate;

/// One request per call, no retries. Cloning shares the connection pool.
#[derive(Clone)]
pub struct LedgerClient {
    http: Client,
    base_url: String,
    credentials: Option<(String, Option<String>)>,
}

impl LedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let base_url = normalize_base_url(&config.base_url)?;
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| LedgerError::Transport {
                url: base_url.clone(),
                source,
            })?;

        Ok(Self {
            http,
            base_url,
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    /// `GET /state`
    pub async fn fetch_state(&self) -> Result<ElectionStateSnapshot, LedgerError> {
        let url = self.url("/state");
        let value: serde_json::Value = self.get_json(&url, &[]).await?;
        ElectionStateSnapshot::from_ledger_value(value)
            .map_err(|source| LedgerError::Decode { url, source })
    }

    /// `GET /stats`
    pub async fn fetch_stats(&self) -> Result<ElectionStats, LedgerError> {
        self.get_json(&self.url("/stats"), &[]).await
    }

    /// `GET /ballot?ballot_id=ID`. An unknown ballot is a 404 rejection.
    pub async fn fetch_ballot(&self, ballot_id: &str) -> Result<BallotRecord, LedgerError> {
        let mut record: BallotRecord = self
            .get_json(&self.url("/ballot"), &[("ballot_id", ballot_id)])
            .await?;
        if record.ballot_id.is_empty() {
            record.ballot_id = ballot_id.to_string();
        }
        Ok(record)
    }

    /// `GET /random-ballot`. A ledger without ballots answers 404.
    pub async fn fetch_random_ballot(&self) -> Result<(BallotRecord, String), LedgerError> {
        let record: BallotRecord = self.get_json(&self.url("/random-ballot"), &[]).await?;
        let ballot_id = record.ballot_id.clone();
        Ok((record, ballot_id))
    }

    /// `GET /voter-status?voter_id=ID`
    pub async fn fetch_voter_status(&self, voter_id: &str) -> Result<VoterStatus, LedgerError> {
        self.get_json(&self.url("/voter-status"), &[("voter_id", voter_id)])
            .await
    }

    /// `POST /register-voter`. The returned session has `voted == false`.
    pub async fn register_voter(
        &self,
        registration: &Registration,
    ) -> Result<VoterSession, LedgerError> {
        let url = self.url("/register-voter");
        let response = self
            .send(&url, self.http.post(&url).json(registration))
            .await?;
        let body: RegisterVoterResponse = decode(&url, response).await?;
        Ok(VoterSession::new(body.voter_id, body.ballot_id))
    }

    /// `POST /vote`. Success carries no payload.
    pub async fn cast_vote(
        &self,
        voter_id: &str,
        ballot_id: &str,
        candidate: Candidate,
    ) -> Result<(), LedgerError> {
        let url = self.url("/vote");
        let request = VoteRequest {
            voter_id,
            ballot_id,
            vote: candidate.code(),
        };
        self.send(&url, self.http.post(&url).json(&request)).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, LedgerError> {
        let response = self.send(url, self.http.get(url).query(query)).await?;
        decode(url, response).await
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, LedgerError> {
        let request = match &self.credentials {
            Some((user, password)) => request.basic_auth(user, password.as_ref()),
            None => request,
        };

        let response = request.send().await.map_err(|source| LedgerError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!("{} responded {}", url, status);
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match body.trim() {
            "" => format!("{} responded with non-200 range code {}", url, status.as_u16()),
            text => text.to_string(),
        };
        Err(LedgerError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, LedgerError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| LedgerError::Transport {
            url: url.to_string(),
            source,
        })?;
    serde_json::from_slice(&bytes).map_err(|source| LedgerError::Decode {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_rejects_bad_base_url() {
        let config = LedgerConfig::new("not a url");
        assert!(matches!(
            LedgerClient::new(&config),
            Err(LedgerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_urls_are_joined_without_double_slash() {
        let client = LedgerClient::new(&LedgerConfig::new("http://localhost:8080/")).unwrap();
        assert_eq!(client.url("/state"), "http://localhost:8080/state");
    }

    #[tokio::test]
    async fn test_unreachable_ledger_is_transport_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let mut config = LedgerConfig::new("http://127.0.0.1:9");
        config.request_timeout = Duration::from_millis(500);
        let client = LedgerClient::new(&config).unwrap();

        let err = client.fetch_stats().await.unwrap_err();
        assert!(matches!(err, LedgerError::Transport { .. }));
        assert_eq!(err.status(), None);
        assert!(!err.is_not_found());
    }
}
