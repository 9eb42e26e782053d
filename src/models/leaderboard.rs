// src/models/leaderboard.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::user::UserId;

/// One user's cumulative score as read from storage.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserScore {
    pub user_id: UserId,
    pub display_name: String,
    pub total_score: i64,
    /// Registration time. Demo rows have none.
    pub created_at: Option<DateTime<Utc>>,
}

/// Visual tier of a ranked row. Only ranks 1, 2 and 3 get a medal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
    Gold,
    Silver,
    Bronze,
    Standard,
}

impl RankTier {
    pub fn for_rank(rank: u32) -> Self {
        match rank {
            1 => RankTier::Gold,
            2 => RankTier::Silver,
            3 => RankTier::Bronze,
            _ => RankTier::Standard,
        }
    }

    pub fn is_top_three(self) -> bool {
        self != RankTier::Standard
    }
}

/// A ranked leaderboard row. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: UserId,
    pub display_name: String,
    pub total_score: i64,
    pub tier: RankTier,
    /// When the user registered; `None` renders as "recently".
    pub created_at: Option<DateTime<Utc>>,
}

/// What the leaderboard page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardView {
    pub entries: Vec<LeaderboardEntry>,
    /// True when `entries` is demo data rather than real scores.
    pub placeholder: bool,
    /// Non-fatal message for the reader, set together with `placeholder`.
    pub advisory: Option<String>,
}
