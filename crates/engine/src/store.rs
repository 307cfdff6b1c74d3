//! Storage seam for leaderboard entries
//!
//! The query only needs "give me every record"; writes go through
//! [`LeaderboardStore::insert`]. Two backends: an in-process vector and
//! the SQLite repository from the persistence crate.

use crate::leaderboard::rank_entries;
use crate::types::{LeaderboardEntry, LeaderboardQuery, NewEntry};
use async_trait::async_trait;
use persistence::repository::{LeaderboardEntryRecord, LeaderboardRepository};
use persistence::{Database, DbError};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),
}

pub type LeaderboardResult<T> = Result<T, LeaderboardError>;

#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Snapshot of every entry, in the store's natural (insertion) order
    async fn collect_all(&self) -> LeaderboardResult<Vec<LeaderboardEntry>>;

    /// Persist one entry and return it with its assigned id
    async fn insert(&self, entry: NewEntry) -> LeaderboardResult<LeaderboardEntry>;

    /// Persist many entries; returns how many were written
    async fn insert_many(&self, entries: Vec<NewEntry>) -> LeaderboardResult<usize> {
        let n = entries.len();
        for entry in entries {
            self.insert(entry).await?;
        }
        Ok(n)
    }

    /// Number of stored entries
    async fn count(&self) -> LeaderboardResult<usize> {
        Ok(self.collect_all().await?.len())
    }

    /// Ranked, filtered, truncated entries.
    ///
    /// Defaults to a full scan plus in-process ranking; backends that can
    /// evaluate the query themselves override this.
    async fn top_entries(
        &self,
        query: &LeaderboardQuery,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        Ok(rank_entries(self.collect_all().await?, query))
    }
}

/// Vector-backed store (tests, `serve --memory`)
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<Vec<LeaderboardEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with already-formed entries, ids assigned in order when missing
    pub fn with_entries(entries: Vec<LeaderboardEntry>) -> Self {
        let entries = entries
            .into_iter()
            .enumerate()
            .map(|(i, mut e)| {
                if e.id.is_none() {
                    e.id = Some(i as i64 + 1);
                }
                e
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl LeaderboardStore for InMemoryStore {
    async fn collect_all(&self) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn insert(&self, entry: NewEntry) -> LeaderboardResult<LeaderboardEntry> {
        let mut entries = self.entries.write().await;
        let next_id = entries.iter().filter_map(|e| e.id).max().unwrap_or(0) + 1;
        let stored = LeaderboardEntry {
            id: Some(next_id),
            player_name: entry.player_name,
            starting_point: entry.starting_point,
            parental_income_tier: entry.parental_income_tier,
            final_score: entry.final_score,
            created_at: Some(
                entry
                    .created_at
                    .unwrap_or_else(|| chrono::Utc::now().timestamp()),
            ),
        };
        entries.push(stored.clone());
        Ok(stored)
    }
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LeaderboardStore for SqliteStore {
    async fn collect_all(&self) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        let repo = LeaderboardRepository::new(self.db.pool());
        let records = repo.get_all_entries().await?;
        Ok(records.into_iter().map(LeaderboardEntry::from).collect())
    }

    async fn insert(&self, entry: NewEntry) -> LeaderboardResult<LeaderboardEntry> {
        let repo = LeaderboardRepository::new(self.db.pool());
        let stored = repo
            .insert_entry(&LeaderboardEntryRecord::from(entry))
            .await?;
        Ok(stored.into())
    }

    async fn insert_many(&self, entries: Vec<NewEntry>) -> LeaderboardResult<usize> {
        let records: Vec<LeaderboardEntryRecord> =
            entries.into_iter().map(LeaderboardEntryRecord::from).collect();
        let repo = LeaderboardRepository::new(self.db.pool());
        Ok(repo.insert_entries(&records).await?)
    }

    async fn count(&self) -> LeaderboardResult<usize> {
        let repo = LeaderboardRepository::new(self.db.pool());
        let total = repo.count().await?;
        Ok(usize::try_from(total).unwrap_or(0))
    }

    async fn top_entries(
        &self,
        query: &LeaderboardQuery,
    ) -> LeaderboardResult<Vec<LeaderboardEntry>> {
        let repo = LeaderboardRepository::new(self.db.pool());
        let records = repo
            .get_top_entries(
                query.starting_point_filter(),
                query.parental_income_tier_filter(),
                query.effective_limit(),
            )
            .await?;
        Ok(records.into_iter().map(LeaderboardEntry::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry(sp: &str, tier: &str, score: f64) -> NewEntry {
        NewEntry {
            player_name: None,
            starting_point: sp.into(),
            parental_income_tier: tier.into(),
            final_score: score,
            created_at: None,
        }
    }

    fn sample() -> Vec<NewEntry> {
        let sps = ["Rural", "Urban", "Suburban"];
        let tiers = ["low", "middle", "high"];
        (0..60)
            .map(|i| {
                // Deterministic spread with repeated scores to exercise ties
                let score = ((i * 37) % 23) as f64 - 8.0;
                new_entry(sps[i % 3], tiers[(i / 3) % 3], score)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_in_memory_insert_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let a = store.insert(new_entry("A", "t", 1.0)).await.unwrap();
        let b = store.insert(new_entry("B", "t", 2.0)).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert!(a.created_at.is_some());

        let all = store.collect_all().await.unwrap();
        assert_eq!(all, vec![a, b]);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_with_entries_keeps_existing_ids() {
        let store = InMemoryStore::with_entries(vec![LeaderboardEntry {
            id: Some(42),
            player_name: None,
            starting_point: "A".into(),
            parental_income_tier: "t".into(),
            final_score: 1.0,
            created_at: None,
        }]);
        let next = store.insert(new_entry("A", "t", 2.0)).await.unwrap();
        assert_eq!(next.id, Some(43));
    }

    #[tokio::test]
    async fn test_sqlite_round_trip_preserves_order() {
        let store = SqliteStore::new(Database::in_memory().await.unwrap());
        assert_eq!(store.insert_many(sample()).await.unwrap(), 60);
        assert_eq!(store.count().await.unwrap(), 60);

        let all = store.collect_all().await.unwrap();
        assert_eq!(all.len(), 60);
        let ids: Vec<i64> = all.iter().filter_map(|e| e.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_sqlite_pushdown_matches_full_scan() {
        let sqlite = SqliteStore::new(Database::in_memory().await.unwrap());
        let memory = InMemoryStore::new();
        sqlite.insert_many(sample()).await.unwrap();
        memory.insert_many(sample()).await.unwrap();

        let queries = [
            LeaderboardQuery::default(),
            LeaderboardQuery {
                limit: Some(5),
                ..Default::default()
            },
            LeaderboardQuery {
                starting_point: Some("Rural".into()),
                ..Default::default()
            },
            LeaderboardQuery {
                starting_point: Some("all".into()),
                parental_income_tier: Some("middle".into()),
                limit: Some(4),
            },
            LeaderboardQuery {
                starting_point: Some("Urban".into()),
                parental_income_tier: Some("high".into()),
                limit: Some(0),
            },
            LeaderboardQuery {
                limit: Some(-2),
                ..Default::default()
            },
        ];

        for query in &queries {
            let pushed = sqlite.top_entries(query).await.unwrap();
            let scanned = rank_entries(sqlite.collect_all().await.unwrap(), query);
            let in_memory = memory.top_entries(query).await.unwrap();

            let key = |v: &[LeaderboardEntry]| -> Vec<(Option<i64>, f64)> {
                v.iter().map(|e| (e.id, e.final_score)).collect()
            };
            assert_eq!(key(&pushed), key(&scanned), "query {query:?}");
            assert_eq!(key(&pushed), key(&in_memory), "query {query:?}");
        }
    }
}
