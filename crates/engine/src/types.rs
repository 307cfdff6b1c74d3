//! Types for the leaderboard

use persistence::repository::LeaderboardEntryRecord;
use serde::{Deserialize, Serialize};

/// Filter value that disables a tag filter
pub const ALL_SENTINEL: &str = "all";

/// Limit applied when the caller gives none (or zero)
pub const DEFAULT_LIMIT: i64 = 100;

/// One completed simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    pub starting_point: String,
    pub parental_income_tier: String,
    pub final_score: f64,
    /// Unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// An entry on its way into the store (no id yet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    #[serde(default)]
    pub player_name: Option<String>,
    pub starting_point: String,
    pub parental_income_tier: String,
    pub final_score: f64,
    /// Kept when importing historical runs; the store fills it otherwise
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// Arguments of a leaderboard query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardQuery {
    pub starting_point: Option<String>,
    pub parental_income_tier: Option<String>,
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    /// Active starting-point filter (`None` when absent, empty or "all")
    pub fn starting_point_filter(&self) -> Option<&str> {
        active_filter(self.starting_point.as_deref())
    }

    /// Active income-tier filter (`None` when absent, empty or "all")
    pub fn parental_income_tier_filter(&self) -> Option<&str> {
        active_filter(self.parental_income_tier.as_deref())
    }

    /// Absent and zero both fall back to [`DEFAULT_LIMIT`]; negatives pass through
    pub fn effective_limit(&self) -> i64 {
        match self.limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(n) => n,
        }
    }

    /// Whether `entry` passes both tag filters (exact, case-sensitive)
    pub fn matches(&self, entry: &LeaderboardEntry) -> bool {
        self.starting_point_filter()
            .map_or(true, |sp| entry.starting_point == sp)
            && self
                .parental_income_tier_filter()
                .map_or(true, |tier| entry.parental_income_tier == tier)
    }
}

fn active_filter(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != ALL_SENTINEL)
}

/// Aggregates over the whole collection, used to populate filter pickers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardStats {
    pub total_entries: usize,
    pub starting_points: Vec<String>,
    pub parental_income_tiers: Vec<String>,
    pub best_score: Option<f64>,
    pub worst_score: Option<f64>,
}

impl From<LeaderboardEntryRecord> for LeaderboardEntry {
    fn from(r: LeaderboardEntryRecord) -> Self {
        Self {
            id: r.id,
            player_name: r.player_name,
            starting_point: r.starting_point,
            parental_income_tier: r.parental_income_tier,
            final_score: r.final_score,
            created_at: r.created_at,
        }
    }
}

impl From<NewEntry> for LeaderboardEntryRecord {
    fn from(e: NewEntry) -> Self {
        Self {
            id: None,
            player_name: e.player_name,
            starting_point: e.starting_point,
            parental_income_tier: e.parental_income_tier,
            final_score: e.final_score,
            created_at: e.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(sp: &str, tier: &str) -> LeaderboardEntry {
        LeaderboardEntry {
            id: None,
            player_name: None,
            starting_point: sp.into(),
            parental_income_tier: tier.into(),
            final_score: 0.0,
            created_at: None,
        }
    }

    #[test]
    fn test_effective_limit() {
        let mut q = LeaderboardQuery::default();
        assert_eq!(q.effective_limit(), 100);
        q.limit = Some(0);
        assert_eq!(q.effective_limit(), 100);
        q.limit = Some(7);
        assert_eq!(q.effective_limit(), 7);
        q.limit = Some(-3);
        assert_eq!(q.effective_limit(), -3);
    }

    #[test]
    fn test_all_and_empty_disable_filters() {
        let q = LeaderboardQuery {
            starting_point: Some("all".into()),
            parental_income_tier: Some(String::new()),
            limit: None,
        };
        assert_eq!(q.starting_point_filter(), None);
        assert_eq!(q.parental_income_tier_filter(), None);
        assert!(q.matches(&entry("anything", "whatever")));
    }

    #[test]
    fn test_filters_are_case_sensitive_and_conjunctive() {
        let q = LeaderboardQuery {
            starting_point: Some("Rural".into()),
            parental_income_tier: Some("low".into()),
            limit: None,
        };
        assert!(q.matches(&entry("Rural", "low")));
        assert!(!q.matches(&entry("rural", "low")));
        assert!(!q.matches(&entry("Rural", "high")));
        // "ALL" is not the sentinel
        let upper = LeaderboardQuery {
            starting_point: Some("ALL".into()),
            ..Default::default()
        };
        assert!(!upper.matches(&entry("Rural", "low")));
    }

    #[test]
    fn test_entry_json_shape() {
        let e = LeaderboardEntry {
            id: Some(4),
            player_name: Some("Ada".into()),
            starting_point: "Urban".into(),
            parental_income_tier: "middle".into(),
            final_score: -2.5,
            created_at: None,
        };
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["startingPoint"], "Urban");
        assert_eq!(json["parentalIncomeTier"], "middle");
        assert_eq!(json["finalScore"], -2.5);
        assert_eq!(json["playerName"], "Ada");
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_query_deserializes_camel_case() {
        let q: LeaderboardQuery = serde_json::from_str(
            r#"{"startingPoint":"A","parentalIncomeTier":"tier1","limit":5}"#,
        )
        .unwrap();
        assert_eq!(q.starting_point.as_deref(), Some("A"));
        assert_eq!(q.parental_income_tier.as_deref(), Some("tier1"));
        assert_eq!(q.limit, Some(5));

        let empty: LeaderboardQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, LeaderboardQuery::default());
    }
}
