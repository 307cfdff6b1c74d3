//! Leaderboard — rank completed simulation runs by final score
//!
//! `get_leaderboard` reads the whole collection on every call and ranks it
//! in process, so its cost grows with the collection, not with `limit`.
//! [`LeaderboardStore::top_entries`] is the pushdown alternative once that
//! stops being cheap.

use crate::store::{LeaderboardError, LeaderboardResult, LeaderboardStore};
use crate::types::{LeaderboardEntry, LeaderboardQuery, LeaderboardStats, NewEntry, ALL_SENTINEL};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Longest accepted tag or player name, in characters
pub const MAX_TAG_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Filter, sort by score descending, truncate.
///
/// The sort is stable: equal scores keep the order of `entries`.
/// A negative limit yields an empty list.
pub fn rank_entries(
    entries: Vec<LeaderboardEntry>,
    query: &LeaderboardQuery,
) -> Vec<LeaderboardEntry> {
    let limit = usize::try_from(query.effective_limit()).unwrap_or(0);

    let mut ranked: Vec<LeaderboardEntry> =
        entries.into_iter().filter(|e| query.matches(e)).collect();
    ranked.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
    ranked.truncate(limit);
    ranked
}

/// Top entries for `query`, read from `store`. Never writes.
pub async fn get_leaderboard<S>(
    store: &S,
    query: &LeaderboardQuery,
) -> LeaderboardResult<Vec<LeaderboardEntry>>
where
    S: LeaderboardStore + ?Sized,
{
    let entries = store.collect_all().await?;
    let scanned = entries.len();
    let ranked = rank_entries(entries, query);

    debug!(
        starting_point = ?query.starting_point,
        parental_income_tier = ?query.parental_income_tier,
        limit = query.effective_limit(),
        scanned,
        returned = ranked.len(),
        "Leaderboard query"
    );

    Ok(ranked)
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

/// Normalise and check an entry before it is stored
pub fn validate_entry(entry: NewEntry) -> LeaderboardResult<NewEntry> {
    let starting_point = validate_tag("startingPoint", &entry.starting_point)?;
    let parental_income_tier = validate_tag("parentalIncomeTier", &entry.parental_income_tier)?;

    if !entry.final_score.is_finite() {
        return Err(LeaderboardError::InvalidEntry(format!(
            "finalScore must be a finite number, got {}",
            entry.final_score
        )));
    }

    let player_name = match entry.player_name.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(name) if name.chars().count() > MAX_TAG_LEN => {
            return Err(LeaderboardError::InvalidEntry(format!(
                "playerName longer than {MAX_TAG_LEN} characters"
            )));
        }
        Some(name) => Some(name.to_string()),
    };

    // -0.0 and 0.0 rank differently under total_cmp but equal in SQL
    let final_score = if entry.final_score == 0.0 {
        0.0
    } else {
        entry.final_score
    };

    Ok(NewEntry {
        player_name,
        starting_point,
        parental_income_tier,
        final_score,
        created_at: entry.created_at,
    })
}

fn validate_tag(field: &str, value: &str) -> LeaderboardResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LeaderboardError::InvalidEntry(format!("{field} is empty")));
    }
    if value == ALL_SENTINEL {
        // Stored "all" could never be filtered for
        return Err(LeaderboardError::InvalidEntry(format!(
            "{field} may not be the reserved value \"{ALL_SENTINEL}\""
        )));
    }
    if value.chars().count() > MAX_TAG_LEN {
        return Err(LeaderboardError::InvalidEntry(format!(
            "{field} longer than {MAX_TAG_LEN} characters"
        )));
    }
    Ok(value.to_string())
}

/// Validate and store one completed run
pub async fn submit_entry<S>(store: &S, entry: NewEntry) -> LeaderboardResult<LeaderboardEntry>
where
    S: LeaderboardStore + ?Sized,
{
    let entry = validate_entry(entry)?;
    let stored = store.insert(entry).await?;

    info!(
        id = ?stored.id,
        starting_point = %stored.starting_point,
        parental_income_tier = %stored.parental_income_tier,
        final_score = stored.final_score,
        "Leaderboard entry recorded"
    );

    Ok(stored)
}

/// Validate every entry, then store them together. Nothing is written if any is invalid.
pub async fn import_entries<S>(store: &S, entries: Vec<NewEntry>) -> LeaderboardResult<usize>
where
    S: LeaderboardStore + ?Sized,
{
    let validated = entries
        .into_iter()
        .enumerate()
        .map(|(i, e)| {
            validate_entry(e).map_err(|err| match err {
                LeaderboardError::InvalidEntry(msg) => {
                    LeaderboardError::InvalidEntry(format!("entry #{i}: {msg}"))
                }
                other => other,
            })
        })
        .collect::<LeaderboardResult<Vec<_>>>()?;

    let written = store.insert_many(validated).await?;
    info!(written, "Leaderboard import complete");
    Ok(written)
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

pub fn compute_stats(entries: &[LeaderboardEntry]) -> LeaderboardStats {
    let starting_points: BTreeSet<&str> =
        entries.iter().map(|e| e.starting_point.as_str()).collect();
    let tiers: BTreeSet<&str> = entries
        .iter()
        .map(|e| e.parental_income_tier.as_str())
        .collect();

    let best_score = entries
        .iter()
        .map(|e| e.final_score)
        .max_by(|a, b| a.total_cmp(b));
    let worst_score = entries
        .iter()
        .map(|e| e.final_score)
        .min_by(|a, b| a.total_cmp(b));

    LeaderboardStats {
        total_entries: entries.len(),
        starting_points: starting_points.into_iter().map(String::from).collect(),
        parental_income_tiers: tiers.into_iter().map(String::from).collect(),
        best_score,
        worst_score,
    }
}

pub async fn leaderboard_stats<S>(store: &S) -> LeaderboardResult<LeaderboardStats>
where
    S: LeaderboardStore + ?Sized,
{
    Ok(compute_stats(&store.collect_all().await?))
}
