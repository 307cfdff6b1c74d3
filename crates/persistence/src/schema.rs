//! Database schema definitions

/// SQL to create all tables
/// NOTE: final_score is REAL; non-finite scores are rejected before they reach the store
pub const CREATE_TABLES: &str = r#"
-- Completed simulation runs
CREATE TABLE IF NOT EXISTS leaderboard_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    starting_point TEXT NOT NULL,
    parental_income_tier TEXT NOT NULL,
    final_score REAL NOT NULL,
    created_at INTEGER DEFAULT (strftime('%s', 'now'))
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_leaderboard_starting_point ON leaderboard_entries(starting_point);
CREATE INDEX IF NOT EXISTS idx_leaderboard_tier ON leaderboard_entries(parental_income_tier);
CREATE INDEX IF NOT EXISTS idx_leaderboard_score ON leaderboard_entries(final_score DESC, id ASC)
"#;

/// ALTER TABLE migrations for databases created before a column existed.
/// Re-running them fails with "duplicate column name", which the runner tolerates.
pub const MIGRATIONS: &[&str] = &[
    // Player display name (passthrough, never used for ranking)
    "ALTER TABLE leaderboard_entries ADD COLUMN player_name TEXT",
];
