//! Journal schema definitions and migrations.

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 2;

/// Full DDL for the cycle journal.
pub const CREATE_SCHEMA: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

-- One row per completed wake cycle
CREATE TABLE IF NOT EXISTS cycles (
    id           TEXT PRIMARY KEY,
    cycle_index  INTEGER NOT NULL,
    health_score INTEGER NOT NULL,
    chosen       TEXT NOT NULL,
    recorded     TEXT NOT NULL,
    description  TEXT NOT NULL DEFAULT '',
    summary      TEXT NOT NULL DEFAULT '',
    success      INTEGER NOT NULL DEFAULT 1,
    finished_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_cycles_index ON cycles(cycle_index);
"#;

/// v1 journals lacked the index on cycle_index.
pub const MIGRATE_V1_TO_V2: &str = r#"
CREATE INDEX IF NOT EXISTS idx_cycles_index ON cycles(cycle_index);
"#;
