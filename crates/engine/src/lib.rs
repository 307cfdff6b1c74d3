//! Simulation leaderboard engine — ranking and recording completed runs
//!
//! Provides:
//! - `get_leaderboard`: equality filters, score-descending sort, limit
//! - a `LeaderboardStore` seam with in-memory and SQLite backends
//! - a validated write path (`submit_entry`, `import_entries`)
//! - collection stats for the filter pickers

pub mod leaderboard;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use leaderboard::{
    compute_stats, get_leaderboard, import_entries, leaderboard_stats, rank_entries,
    submit_entry, validate_entry,
};
pub use store::{InMemoryStore, LeaderboardError, LeaderboardResult, LeaderboardStore, SqliteStore};
pub use types::*;
