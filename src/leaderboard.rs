// src/leaderboard.rs

//! Ranked top-N view over users' cumulative scores.
//!
//! [`project`] is a pure function of a snapshot. [`LeaderboardService`] pulls
//! snapshots from a [`LeaderboardSource`], falls back to demo rows when the
//! source is down or empty, and publishes every changed view on a watch channel.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    models::leaderboard::{LeaderboardEntry, LeaderboardView, RankTier, UserScore},
    store::{LeaderboardSource, StoreError},
};

const ANONYMOUS_NAME: &str = "Anonymous";

pub const UNAVAILABLE_ADVISORY: &str =
    "Leaderboard is temporarily unavailable. Showing example data.";
pub const EMPTY_ADVISORY: &str = "Nobody has completed a quiz yet. Showing example data.";

/// Demo rows shown when there is nothing real to rank. Ids are negative so
/// they never collide with real users.
const PLACEHOLDER_ROWS: [(i64, &str, i64); 5] = [
    (-1, "Demo student A", 42),
    (-2, "Demo student B", 35),
    (-3, "Demo student C", 27),
    (-4, "Demo student D", 18),
    (-5, "Demo student E", 9),
];

/// Ranks `snapshot` by score, highest first, and keeps the top `limit`.
///
/// Sorting is stable: equal scores keep their order in `snapshot`. No other
/// tie-break is applied.
pub fn project(snapshot: &[UserScore], limit: usize) -> Vec<LeaderboardEntry> {
    let mut ordered: Vec<&UserScore> = snapshot.iter().collect();
    ordered.sort_by(|a, b| b.total_score.cmp(&a.total_score));

    ordered
        .into_iter()
        .take(limit)
        .zip(1u32..)
        .map(|(score, rank)| LeaderboardEntry {
            rank,
            user_id: score.user_id,
            display_name: display_name_or_anonymous(&score.display_name),
            total_score: score.total_score,
            tier: RankTier::for_rank(rank),
            created_at: score.created_at,
        })
        .collect()
}

pub fn placeholder_entries() -> Vec<LeaderboardEntry> {
    let snapshot: Vec<UserScore> = PLACEHOLDER_ROWS
        .iter()
        .map(|&(user_id, name, total_score)| UserScore {
            user_id,
            display_name: name.to_string(),
            total_score,
            created_at: None,
        })
        .collect();
    project(&snapshot, PLACEHOLDER_ROWS.len())
}

/// Turns a source read into a view, substituting placeholder rows on failure
/// or an empty result.
pub fn build_view(read: Result<Vec<UserScore>, StoreError>, limit: usize) -> LeaderboardView {
    match read {
        Ok(snapshot) if !snapshot.is_empty() => LeaderboardView {
            entries: project(&snapshot, limit),
            placeholder: false,
            advisory: None,
        },
        Ok(_) => placeholder_view(EMPTY_ADVISORY),
        Err(e) => {
            tracing::warn!("Leaderboard source failed, serving placeholder: {}", e);
            placeholder_view(UNAVAILABLE_ADVISORY)
        }
    }
}

fn placeholder_view(advisory: &str) -> LeaderboardView {
    LeaderboardView {
        entries: placeholder_entries(),
        placeholder: true,
        advisory: Some(advisory.to_string()),
    }
}

fn display_name_or_anonymous(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        ANONYMOUS_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pull-based leaderboard with change notification.
pub struct LeaderboardService {
    source: Arc<dyn LeaderboardSource>,
    limit: usize,
    tx: watch::Sender<LeaderboardView>,
}

impl LeaderboardService {
    pub fn new(source: Arc<dyn LeaderboardSource>, limit: usize) -> Self {
        let (tx, _rx) = watch::channel(placeholder_view(EMPTY_ADVISORY));
        Self { source, limit, tx }
    }

    /// Reads the source, projects it and notifies subscribers if the view changed.
    pub async fn current(&self) -> LeaderboardView {
        let view = build_view(self.source.top_scores(self.limit).await, self.limit);
        self.tx.send_if_modified(|published| {
            if *published == view {
                return false;
            }
            *published = view.clone();
            true
        });
        view
    }

    pub async fn refresh(&self) {
        self.current().await;
    }

    /// Receives every view that differs from the previous one.
    pub fn subscribe(&self) -> watch::Receiver<LeaderboardView> {
        self.tx.subscribe()
    }
}
