//! Store migration constants and record keys

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Default database file name
pub const DEFAULT_DB_PATH: &str = "ballot-verifier.db";

/// In-memory database, lost on exit
pub const MEMORY_DB_PATH: &str = ":memory:";

/// Key of the persisted voter session
pub const VOTER_SESSION_KEY: &str = "ballot-verifier:voter-session";

/// Key of the last verified election state snapshot
pub const ELECTION_STATE_KEY: &str = "ballot-verifier:election-state";
