//! Leaderboard repository — completed simulation runs

use crate::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

/// A persisted simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LeaderboardEntryRecord {
    pub id: Option<i64>,
    pub player_name: Option<String>,
    pub starting_point: String,
    pub parental_income_tier: String,
    pub final_score: f64,
    /// Unix seconds; filled with the current time on insert when absent
    pub created_at: Option<i64>,
}

const SELECT_COLUMNS: &str =
    "id, player_name, starting_point, parental_income_tier, final_score, created_at";

/// Repository for leaderboard entries
pub struct LeaderboardRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> LeaderboardRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert one entry, returning it with its assigned id and timestamp
    pub async fn insert_entry(
        &self,
        record: &LeaderboardEntryRecord,
    ) -> DbResult<LeaderboardEntryRecord> {
        if !record.final_score.is_finite() {
            return Err(DbError::Query(format!(
                "final_score must be finite, got {}",
                record.final_score
            )));
        }

        let created_at = record
            .created_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp());

        let result = sqlx::query(
            r#"INSERT INTO leaderboard_entries
                (player_name, starting_point, parental_income_tier, final_score, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(&record.player_name)
        .bind(&record.starting_point)
        .bind(&record.parental_income_tier)
        .bind(record.final_score)
        .bind(created_at)
        .execute(self.pool)
        .await?;

        Ok(LeaderboardEntryRecord {
            id: Some(result.last_insert_rowid()),
            created_at: Some(created_at),
            ..record.clone()
        })
    }

    /// Insert a batch of entries in one transaction (all or nothing)
    pub async fn insert_entries(&self, records: &[LeaderboardEntryRecord]) -> DbResult<usize> {
        if let Some(bad) = records.iter().find(|r| !r.final_score.is_finite()) {
            return Err(DbError::Query(format!(
                "final_score must be finite, got {}",
                bad.final_score
            )));
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for record in records {
            sqlx::query(
                r#"INSERT INTO leaderboard_entries
                    (player_name, starting_point, parental_income_tier, final_score, created_at)
                   VALUES (?1, ?2, ?3, ?4, ?5)"#,
            )
            .bind(&record.player_name)
            .bind(&record.starting_point)
            .bind(&record.parental_income_tier)
            .bind(record.final_score)
            .bind(record.created_at.unwrap_or(now))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = records.len(), "Inserted leaderboard entries");
        Ok(records.len())
    }

    /// Every entry in insertion order (the full-collection read)
    pub async fn get_all_entries(&self) -> DbResult<Vec<LeaderboardEntryRecord>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM leaderboard_entries ORDER BY id ASC");
        let records = sqlx::query_as::<_, LeaderboardEntryRecord>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(records)
    }

    /// Top entries by score with equality filters evaluated inside SQLite.
    ///
    /// Filters are taken literally: callers strip the "all" sentinel first.
    /// Ties are broken by insertion order (`id ASC`). A negative limit
    /// returns nothing (SQLite would read `LIMIT -1` as unbounded).
    pub async fn get_top_entries(
        &self,
        starting_point: Option<&str>,
        parental_income_tier: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<LeaderboardEntryRecord>> {
        if limit < 0 {
            return Ok(Vec::new());
        }

        let mut where_clauses = vec!["1=1"];
        let mut binds: Vec<&str> = Vec::new();

        if let Some(sp) = starting_point {
            where_clauses.push("starting_point = ?");
            binds.push(sp);
        }
        if let Some(tier) = parental_income_tier {
            where_clauses.push("parental_income_tier = ?");
            binds.push(tier);
        }

        let where_sql = where_clauses.join(" AND ");
        let sql = format!(
            r#"SELECT {SELECT_COLUMNS}
               FROM leaderboard_entries
               WHERE {where_sql}
               ORDER BY final_score DESC, id ASC
               LIMIT ?"#
        );

        let mut query = sqlx::query_as::<_, LeaderboardEntryRecord>(&sql);
        for b in &binds {
            query = query.bind(*b);
        }
        query = query.bind(limit);

        let records = query.fetch_all(self.pool).await?;
        Ok(records)
    }

    /// Total number of stored entries
    pub async fn count(&self) -> DbResult<i64> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM leaderboard_entries")
            .fetch_one(self.pool)
            .await?;

        Ok(total)
    }
}
