// src/store/mod.rs

//! Storage collaborators: user accounts, the score ledger and the leaderboard feed.
//!
//! The quiz core never touches these directly. Handlers and the session registry
//! reach them through the traits below, which Postgres and in-memory backends
//! both implement.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    leaderboard::UserScore,
    score_record::ScoreRecord,
    user::{NewUser, User, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend failed to read or write.
    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Persistence(err.to_string())
    }
}

/// User accounts and per-user history.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user with a zero score. Fails with `Conflict` on a taken email.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Recorded attempts for a user, newest first.
    async fn attempts_for_user(&self, id: UserId) -> Result<Vec<ScoreRecord>, StoreError>;
}

/// Durable destination of completed attempts.
///
/// Delivery is at-least-once. `persist_attempt` makes retries safe by keying the
/// ledger row on `attempt_id` and only crediting the score when that row is new.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Appends a record. Returns `false` if the attempt was already recorded.
    async fn record_attempt(&self, record: &ScoreRecord) -> Result<bool, StoreError>;

    /// Atomically adds `delta` to the user's cumulative score.
    async fn increment_user_score(&self, user_id: UserId, delta: u32) -> Result<(), StoreError>;

    /// Records the attempt and credits its score as one unit.
    async fn persist_attempt(&self, record: &ScoreRecord) -> Result<(), StoreError>;
}

/// Read side of the leaderboard.
#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    /// Up to `limit` users ordered by cumulative score, highest first.
    async fn top_scores(&self, limit: usize) -> Result<Vec<UserScore>, StoreError>;
}
