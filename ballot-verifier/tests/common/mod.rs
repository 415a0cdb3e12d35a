#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use ballot_verifier::{LedgerClient, LedgerConfig, SnapshotStore};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

const APPROVED_AT: &str = "2024-03-01T09:00:00Z";
const VOTED_AT: &str = "2024-03-02T10:00:00Z";
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// What the mock ledger serves and what it has seen.
#[derive(Default)]
pub struct LedgerState {
    pub requests: usize,
    pub state: Value,
    pub stats: Value,
    /// ballot id -> (current vote, history)
    pub ballots: HashMap<String, (i64, Vec<i64>)>,
    pub random_ballot: Option<String>,
    /// voter id -> (ballot id, voted)
    pub voters: HashMap<String, (String, bool)>,
    pub reject_register: Option<(StatusCode, String)>,
    pub reject_vote: Option<(StatusCode, String)>,
    pub votes: Vec<Value>,
}

type Shared = Arc<Mutex<LedgerState>>;

/// In-process ledger on an ephemeral localhost port, stopped on drop.
pub struct MockLedger {
    pub base_url: String,
    state: Shared,
    server: JoinHandle<()>,
}

impl MockLedger {
    pub fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap()
    }

    pub fn requests(&self) -> usize {
        self.state().requests
    }

    pub fn client(&self) -> LedgerClient {
        let mut config = LedgerConfig::new(&self.base_url);
        config.request_timeout = Duration::from_secs(2);
        LedgerClient::new(&config).unwrap()
    }

    pub fn add_ballot(&self, ballot_id: &str, history: &[i64]) {
        let vote = history.last().copied().unwrap_or(0);
        self.state()
            .ballots
            .insert(ballot_id.to_string(), (vote, history.to_vec()));
    }
}

impl Drop for MockLedger {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub async fn spawn_ledger() -> MockLedger {
    let state: Shared = Arc::new(Mutex::new(LedgerState {
        state: json!({}),
        stats: json!({"results": {}, "registered": 0, "ballots": 0}),
        ..Default::default()
    }));

    let app = Router::new()
        .route("/state", get(get_state))
        .route("/stats", get(get_stats))
        .route("/ballot", get(get_ballot))
        .route("/random-ballot", get(get_random_ballot))
        .route("/voter-status", get(get_voter_status))
        .route("/register-voter", post(register_voter))
        .route("/vote", post(vote))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockLedger {
        base_url,
        state,
        server,
    }
}

pub async fn memory_store() -> SnapshotStore {
    SnapshotStore::in_memory().await.unwrap()
}

type Reply = Result<Json<Value>, (StatusCode, String)>;

fn hit(state: &Shared) -> MutexGuard<'_, LedgerState> {
    let mut guard = state.lock().unwrap();
    guard.requests += 1;
    guard
}

fn ballot_json(ballot_id: &str, (vote, history): &(i64, Vec<i64>)) -> Value {
    json!({"ballot_id": ballot_id, "vote": vote, "history": history})
}

async fn get_state(State(state): State<Shared>) -> Json<Value> {
    Json(hit(&state).state.clone())
}

async fn get_stats(State(state): State<Shared>) -> Json<Value> {
    Json(hit(&state).stats.clone())
}

async fn get_ballot(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let ledger = hit(&state);
    let ballot_id = params.get("ballot_id").cloned().unwrap_or_default();
    match ledger.ballots.get(&ballot_id) {
        Some(ballot) => Ok(Json(ballot_json(&ballot_id, ballot))),
        None => Err((StatusCode::NOT_FOUND, "ballot not found".to_string())),
    }
}

async fn get_random_ballot(State(state): State<Shared>) -> Reply {
    let ledger = hit(&state);
    let found = ledger
        .random_ballot
        .as_ref()
        .and_then(|id| ledger.ballots.get(id).map(|ballot| ballot_json(id, ballot)));
    found
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "no ballots".to_string()))
}

async fn get_voter_status(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let ledger = hit(&state);
    let voter_id = params.get("voter_id").cloned().unwrap_or_default();
    match ledger.voters.get(&voter_id) {
        Some((_, voted)) => {
            let voted_at = if *voted { VOTED_AT } else { ZERO_TIME };
            Ok(Json(json!({"approved": APPROVED_AT, "voted": voted_at})))
        }
        None => Err((StatusCode::NOT_FOUND, "voter not found".to_string())),
    }
}

async fn register_voter(State(state): State<Shared>, Json(body): Json<Value>) -> Reply {
    let mut ledger = hit(&state);
    if let Some(rejection) = ledger.reject_register.clone() {
        return Err(rejection);
    }
    if body["citizen_id"].as_str().unwrap_or_default().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "invalid citizen id".to_string()));
    }

    let n = ledger.voters.len() + 1;
    let voter_id = format!("voter-{}", n);
    let ballot_id = format!("ballot-{}", n);
    ledger
        .voters
        .insert(voter_id.clone(), (ballot_id.clone(), false));
    ledger.ballots.insert(ballot_id.clone(), (0, vec![0]));
    Ok(Json(json!({"voter_id": voter_id, "ballot_id": ballot_id})))
}

async fn vote(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut ledger = hit(&state);
    if let Some(rejection) = ledger.reject_vote.clone() {
        return Err(rejection);
    }

    let voter_id = body["voter_id"].as_str().unwrap_or_default().to_string();
    let ballot_id = body["ballot_id"].as_str().unwrap_or_default().to_string();
    let code = body["vote"].as_i64().unwrap_or_default();

    match ledger.voters.get_mut(&voter_id) {
        Some((expected, voted)) if *expected == ballot_id => {
            if *voted {
                return Err((StatusCode::CONFLICT, "voter has already voted".to_string()));
            }
            *voted = true;
        }
        _ => return Err((StatusCode::BAD_REQUEST, "invalid voter or ballot id".to_string())),
    }
    if let Some((current, history)) = ledger.ballots.get_mut(&ballot_id) {
        *current = code;
        history.push(code);
    }
    ledger.votes.push(body);
    Ok(StatusCode::OK)
}
