//! SQL statement constants for store operations

pub const CREATE_MIGRATIONS_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL,
    description TEXT NOT NULL
)
"#;

pub const SELECT_SCHEMA_VERSION_SQL: &str = "SELECT MAX(version) FROM schema_migrations";

pub const INSERT_MIGRATION_SQL: &str =
    "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?, ?, ?)";

pub const CREATE_CLIENT_STATE_TABLE_SQL: &str = r#"
CREATE TABLE client_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL, -- JSON document
    updated_at TEXT NOT NULL
)
"#;

pub const SELECT_CLIENT_STATE_SQL: &str = "SELECT value FROM client_state WHERE key = ?";

pub const UPSERT_CLIENT_STATE_SQL: &str = r#"
INSERT INTO client_state (key, value, updated_at) VALUES (?, ?, ?)
ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
"#;
