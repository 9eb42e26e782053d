// src/quiz/session.rs

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{
        lesson::{Lesson, Question},
        score_record::ScoreRecord,
        user::UserId,
    },
    quiz::QuizError,
};

/// Lifecycle of a quiz session. There is no way back out of `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::NotStarted => "not started",
            SessionStatus::InProgress => "in progress",
            SessionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Answers "who is signed in?". A session cannot start without a user.
pub trait Identity: Send + Sync {
    fn current_user(&self) -> Option<UserId>;
}

/// Receives the score record of a finished attempt.
///
/// Called exactly once per attempt, synchronously, from inside the transition
/// that completed it. Implementations must not block; persistence belongs on
/// another task.
pub trait ResultEmitter: Send + Sync {
    fn emit(&self, record: ScoreRecord);
}

/// Mutable state of one attempt. Exists from `start()` onwards.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub lesson_id: i64,
    pub user_id: UserId,
    /// Index of the question being answered. Equals `submitted.len()` while in progress.
    pub current_index: usize,
    /// Submitted option indices, in question order.
    pub submitted: Vec<usize>,
    /// Selected but not yet submitted option for the current question.
    pub pending: Option<usize>,
    pub correct_count: u32,
    pub remaining_seconds: u32,
    pub started_at: DateTime<Utc>,
}

/// State machine driving one user through one timed attempt of a lesson.
///
/// Transitions are the only way to mutate it. A failed call returns a
/// [`QuizError`] and leaves the session exactly as it was.
pub struct QuizSession {
    lesson: Arc<Lesson>,
    identity: Arc<dyn Identity>,
    emitter: Arc<dyn ResultEmitter>,
    status: SessionStatus,
    attempt: Option<QuizAttempt>,
    result: Option<ScoreRecord>,
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("lesson_id", &self.lesson.id)
            .field("status", &self.status)
            .field("attempt", &self.attempt)
            .field("result", &self.result)
            .finish()
    }
}

impl QuizSession {
    pub fn new(
        lesson: Arc<Lesson>,
        identity: Arc<dyn Identity>,
        emitter: Arc<dyn ResultEmitter>,
    ) -> Self {
        Self {
            lesson,
            identity,
            emitter,
            status: SessionStatus::NotStarted,
            attempt: None,
            result: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn attempt(&self) -> Option<&QuizAttempt> {
        self.attempt.as_ref()
    }

    /// The finished attempt's record. Kept after emission so a failed write can be retried.
    pub fn result(&self) -> Option<&ScoreRecord> {
        self.result.as_ref()
    }

    /// The question awaiting an answer, if the session is in progress.
    pub fn current_question(&self) -> Option<(usize, &Question)> {
        if self.status != SessionStatus::InProgress {
            return None;
        }
        let attempt = self.attempt.as_ref()?;
        self.lesson
            .questions
            .get(attempt.current_index)
            .map(|q| (attempt.current_index, q))
    }

    pub fn start(&mut self) -> Result<(), QuizError> {
        self.require(SessionStatus::NotStarted, "start")?;
        let user_id = self
            .identity
            .current_user()
            .ok_or(QuizError::AuthRequired)?;

        self.attempt = Some(QuizAttempt {
            id: Uuid::new_v4(),
            lesson_id: self.lesson.id,
            user_id,
            current_index: 0,
            submitted: Vec::with_capacity(self.lesson.question_count()),
            pending: None,
            correct_count: 0,
            remaining_seconds: self.lesson.time_limit_seconds,
            started_at: Utc::now(),
        });
        self.status = SessionStatus::InProgress;
        Ok(())
    }

    /// Advances the countdown. Running out of time completes the attempt,
    /// scoring unanswered questions as incorrect.
    pub fn tick(&mut self, elapsed_seconds: u32) -> Result<SessionStatus, QuizError> {
        self.require(SessionStatus::InProgress, "tick")?;
        let attempt = self.attempt_mut("tick")?;
        attempt.remaining_seconds = attempt.remaining_seconds.saturating_sub(elapsed_seconds);

        if attempt.remaining_seconds == 0 {
            self.finalize()?;
        }
        Ok(self.status)
    }

    /// Marks `option_index` as the pending answer for the current question.
    /// Selecting again before submitting replaces the previous choice.
    pub fn select_answer(&mut self, option_index: usize) -> Result<(), QuizError> {
        self.require(SessionStatus::InProgress, "select an answer")?;
        let option_count = self
            .current_question()
            .map(|(_, q)| q.options.len())
            .ok_or(QuizError::InvalidState {
                operation: "select an answer",
                status: self.status,
            })?;

        if option_index >= option_count {
            return Err(QuizError::InvalidArgument(format!(
                "option index {option_index} is out of range for a question with {option_count} options"
            )));
        }

        self.attempt_mut("select an answer")?.pending = Some(option_index);
        Ok(())
    }

    /// Commits the pending answer and moves on. Submitting the last question
    /// completes the attempt.
    pub fn submit_current_answer(&mut self) -> Result<SessionStatus, QuizError> {
        self.require(SessionStatus::InProgress, "submit an answer")?;
        let is_correct = {
            let attempt = self.attempt.as_ref().ok_or(QuizError::InvalidState {
                operation: "submit an answer",
                status: self.status,
            })?;
            let pending = attempt.pending.ok_or(QuizError::InvalidState {
                operation: "submit without a selected answer",
                status: self.status,
            })?;
            self.lesson
                .questions
                .get(attempt.current_index)
                .is_some_and(|q| q.is_correct(pending))
        };

        let question_count = self.lesson.question_count();
        let attempt = self.attempt_mut("submit an answer")?;
        if let Some(pending) = attempt.pending.take() {
            attempt.submitted.push(pending);
        }
        if is_correct {
            attempt.correct_count += 1;
        }
        attempt.current_index += 1;

        if attempt.current_index >= question_count {
            self.finalize()?;
        }
        Ok(self.status)
    }

    /// Builds the score record, completes the session and hands the record to
    /// the emitter. Runs at most once per attempt.
    fn finalize(&mut self) -> Result<&ScoreRecord, QuizError> {
        if self.status == SessionStatus::Completed {
            return Err(QuizError::AlreadyCompleted);
        }
        let attempt = self.attempt.as_mut().ok_or(QuizError::InvalidState {
            operation: "finalize",
            status: self.status,
        })?;
        attempt.pending = None;

        let total_questions = u32::try_from(self.lesson.question_count()).unwrap_or(u32::MAX);
        let record = ScoreRecord {
            attempt_id: attempt.id,
            user_id: attempt.user_id,
            lesson_id: attempt.lesson_id,
            correct_count: attempt.correct_count.min(total_questions),
            total_questions,
            time_spent_seconds: self
                .lesson
                .time_limit_seconds
                .saturating_sub(attempt.remaining_seconds),
            completed_at: Utc::now(),
        };

        self.status = SessionStatus::Completed;
        self.emitter.emit(record.clone());
        Ok(self.result.insert(record))
    }

    fn require(&self, expected: SessionStatus, operation: &'static str) -> Result<(), QuizError> {
        if self.status != expected {
            return Err(QuizError::InvalidState {
                operation,
                status: self.status,
            });
        }
        Ok(())
    }

    fn attempt_mut(&mut self, operation: &'static str) -> Result<&mut QuizAttempt, QuizError> {
        let status = self.status;
        self.attempt
            .as_mut()
            .ok_or(QuizError::InvalidState { operation, status })
    }
}
