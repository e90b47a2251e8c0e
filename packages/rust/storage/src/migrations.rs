//! SQL migration definitions for the RosterLens cache database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: roster_cache key/value store",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Expiring key/value cache. stored_at_ms is the entry's write timestamp
-- (epoch milliseconds); freshness is judged by callers, never here.
CREATE TABLE IF NOT EXISTS roster_cache (
    key          TEXT PRIMARY KEY,
    value_json   TEXT NOT NULL,
    stored_at_ms INTEGER NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
