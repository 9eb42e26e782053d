// src/models/score_record.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::user::UserId,
    quiz::{QuizError, scoring},
};

/// Outcome of one completed attempt.
/// Built once at finalize and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Identifies the attempt; the sink deduplicates retried writes by it.
    pub attempt_id: Uuid,
    pub user_id: UserId,
    pub lesson_id: i64,
    pub correct_count: u32,
    pub total_questions: u32,
    pub time_spent_seconds: u32,
    pub completed_at: DateTime<Utc>,
}

impl ScoreRecord {
    /// Checks `correct_count` lies in `[0, total_questions]` for a non-empty lesson.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.total_questions == 0 {
            return Err(QuizError::InvalidArgument(
                "score record has no questions".to_string(),
            ));
        }
        if self.correct_count > self.total_questions {
            return Err(QuizError::InvalidArgument(format!(
                "correct count {} exceeds total questions {}",
                self.correct_count, self.total_questions
            )));
        }
        Ok(())
    }

    pub fn percentage(&self) -> u32 {
        scoring::percentage(self.correct_count, self.total_questions)
    }

    pub fn passed(&self) -> bool {
        scoring::is_passing(self.percentage())
    }
}

/// Completed-attempt summary returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub record: ScoreRecord,
    pub percentage: u32,
    pub passed: bool,
}

impl From<&ScoreRecord> for ResultView {
    fn from(record: &ScoreRecord) -> Self {
        Self {
            record: record.clone(),
            percentage: record.percentage(),
            passed: record.passed(),
        }
    }
}
