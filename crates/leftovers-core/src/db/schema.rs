//! SQLite schema definition.

/// Schema for the local fallback store: one whole-value snapshot per key.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Local Snapshots
-- ============================================================================

CREATE TABLE IF NOT EXISTS local_snapshots (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,                          -- JSON array of records
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
