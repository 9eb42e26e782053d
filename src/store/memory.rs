// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    models::{
        leaderboard::UserScore,
        score_record::ScoreRecord,
        user::{NewUser, User, UserId},
    },
    store::{LeaderboardSource, ResultSink, StoreError, UserStore},
};

#[derive(Default)]
struct Inner {
    /// Registration order; doubles as the leaderboard's observation order.
    users: Vec<User>,
    records: Vec<ScoreRecord>,
    recorded: HashMap<Uuid, usize>,
}

impl Inner {
    fn user_mut(&mut self, id: UserId) -> Result<&mut User, StoreError> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("User {id} not found")))
    }

    fn append(&mut self, record: &ScoreRecord) -> bool {
        if self.recorded.contains_key(&record.attempt_id) {
            return false;
        }
        self.recorded.insert(record.attempt_id, self.records.len());
        self.records.push(record.clone());
        true
    }
}

/// In-process store for development and tests. Same semantics as `PgStore`,
/// nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict(format!(
                "Email '{}' is already registered",
                new_user.email
            )));
        }

        let id = UserId::try_from(inner.users.len() + 1)
            .map_err(|_| StoreError::Persistence("user id space exhausted".to_string()))?;
        let user = User {
            id,
            email: new_user.email,
            display_name: new_user.display_name,
            password: new_user.password_hash,
            total_score: 0,
            created_at: Utc::now(),
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn attempts_for_user(&self, id: UserId) -> Result<Vec<ScoreRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut records: Vec<ScoreRecord> = inner
            .records
            .iter()
            .filter(|r| r.user_id == id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(records)
    }
}

#[async_trait]
impl ResultSink for MemoryStore {
    async fn record_attempt(&self, record: &ScoreRecord) -> Result<bool, StoreError> {
        record
            .validate()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;
        Ok(self.inner.write().await.append(record))
    }

    async fn increment_user_score(&self, user_id: UserId, delta: u32) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.user_mut(user_id)?.total_score += i64::from(delta);
        Ok(())
    }

    async fn persist_attempt(&self, record: &ScoreRecord) -> Result<(), StoreError> {
        record
            .validate()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        let mut inner = self.inner.write().await;
        // Check the user first so a failed credit leaves no orphan ledger row.
        inner.user_mut(record.user_id)?;
        if inner.append(record) {
            inner.user_mut(record.user_id)?.total_score += i64::from(record.correct_count);
        }
        Ok(())
    }
}

#[async_trait]
impl LeaderboardSource for MemoryStore {
    async fn top_scores(&self, limit: usize) -> Result<Vec<UserScore>, StoreError> {
        let inner = self.inner.read().await;
        let mut scores: Vec<UserScore> = inner
            .users
            .iter()
            .map(|u| UserScore {
                user_id: u.id,
                display_name: u.display_name.clone(),
                total_score: u.total_score,
                created_at: Some(u.created_at),
            })
            .collect();
        // Stable, so equal scores keep registration order.
        scores.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        scores.truncate(limit);
        Ok(scores)
    }
}
