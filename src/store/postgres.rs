// src/store/postgres.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres, Row, postgres::PgRow};

use crate::{
    models::{
        leaderboard::UserScore,
        score_record::ScoreRecord,
        user::{NewUser, User, UserId},
    },
    store::{LeaderboardSource, ResultSink, StoreError, UserStore},
};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn score_record_from_row(row: &PgRow) -> Result<ScoreRecord, StoreError> {
    let to_u32 = |column: &str| -> Result<u32, StoreError> {
        let value: i64 = row.try_get(column)?;
        u32::try_from(value)
            .map_err(|_| StoreError::Persistence(format!("{column} out of range: {value}")))
    };

    Ok(ScoreRecord {
        attempt_id: row.try_get("attempt_id")?,
        user_id: row.try_get("user_id")?,
        lesson_id: row.try_get("lesson_id")?,
        correct_count: to_u32("correct_count")?,
        total_questions: to_u32("total_questions")?,
        time_spent_seconds: to_u32("time_spent_seconds")?,
        completed_at: row.try_get("completed_at")?,
    })
}

/// Appends a ledger row. Returns `false` when the attempt is already stored.
async fn insert_score_record<'e, E>(executor: E, record: &ScoreRecord) -> Result<bool, StoreError>
where
    E: Executor<'e, Database = Postgres>,
{
    let inserted = sqlx::query(
        r#"
        INSERT INTO score_records
            (attempt_id, user_id, lesson_id, correct_count, total_questions,
             time_spent_seconds, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (attempt_id) DO NOTHING
        "#,
    )
    .bind(record.attempt_id)
    .bind(record.user_id)
    .bind(record.lesson_id)
    .bind(i64::from(record.correct_count))
    .bind(i64::from(record.total_questions))
    .bind(i64::from(record.time_spent_seconds))
    .bind(record.completed_at)
    .execute(executor)
    .await?
    .rows_affected();

    Ok(inserted == 1)
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, display_name, password)
            VALUES ($1, $2, $3)
            RETURNING id, email, display_name, password, total_score, created_at
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.display_name)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let is_unique = e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation());
            if is_unique {
                StoreError::Conflict(format!("Email '{}' is already registered", new_user.email))
            } else {
                tracing::error!("Failed to insert user: {:?}", e);
                StoreError::from(e)
            }
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, password, total_score, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, display_name, password, total_score, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn attempts_for_user(&self, id: UserId) -> Result<Vec<ScoreRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT attempt_id, user_id, lesson_id, correct_count, total_questions,
                   time_spent_seconds, completed_at
            FROM score_records
            WHERE user_id = $1
            ORDER BY completed_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(score_record_from_row).collect()
    }
}

#[async_trait]
impl ResultSink for PgStore {
    async fn record_attempt(&self, record: &ScoreRecord) -> Result<bool, StoreError> {
        record
            .validate()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        insert_score_record(&self.pool, record).await
    }

    async fn increment_user_score(&self, user_id: UserId, delta: u32) -> Result<(), StoreError> {
        let updated = sqlx::query("UPDATE users SET total_score = total_score + $1 WHERE id = $2")
            .bind(i64::from(delta))
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if updated == 0 {
            return Err(StoreError::NotFound(format!("User {user_id} not found")));
        }
        Ok(())
    }

    async fn persist_attempt(&self, record: &ScoreRecord) -> Result<(), StoreError> {
        record
            .validate()
            .map_err(|e| StoreError::Persistence(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        // 1. Append the ledger row; a retry of a stored attempt inserts nothing
        let inserted = insert_score_record(&mut *tx, record).await?;

        // 2. Credit the score only for a newly recorded attempt
        if inserted {
            let updated =
                sqlx::query("UPDATE users SET total_score = total_score + $1 WHERE id = $2")
                    .bind(i64::from(record.correct_count))
                    .bind(record.user_id)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected();

            if updated == 0 {
                return Err(StoreError::NotFound(format!(
                    "User {} not found",
                    record.user_id
                )));
            }
        } else {
            tracing::info!(attempt_id = %record.attempt_id, "Attempt already recorded, skipping score credit");
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl LeaderboardSource for PgStore {
    async fn top_scores(&self, limit: usize) -> Result<Vec<UserScore>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let scores = sqlx::query_as::<_, UserScore>(
            r#"
            SELECT id AS user_id, display_name, total_score, created_at
            FROM users
            ORDER BY total_score DESC, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(scores)
    }
}
