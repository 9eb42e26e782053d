// src/sessions.rs

//! Runtime home of quiz sessions: one active session per user, a wall-clock
//! driver for `tick`, and the bridge from finished attempts to the result sink.

use std::{collections::HashMap, sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    config::{SESSION_RETENTION_SECS, TICK_INTERVAL_SECS},
    error::AppError,
    leaderboard::LeaderboardService,
    models::{
        lesson::{Lesson, PublicQuestion},
        score_record::{ResultView, ScoreRecord},
        user::UserId,
    },
    quiz::{Identity, QuizError, QuizSession, ResultEmitter, SessionStatus},
    store::ResultSink,
};

/// Where a completed attempt's write to the sink stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PersistState {
    Pending,
    Persisted,
    Failed { error: String },
}

/// Observable state of a session, as rendered by the client.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub attempt_id: Option<Uuid>,
    pub lesson_id: i64,
    pub lesson_title: String,
    pub status: SessionStatus,
    pub question_index: usize,
    pub question_count: usize,
    /// The question to answer next; absent once completed.
    pub question: Option<PublicQuestion>,
    pub pending_answer: Option<usize>,
    pub remaining_seconds: u32,
    pub correct_count: u32,
    pub result: Option<ResultView>,
    /// Sink write status; only present once completed.
    pub persistence: Option<PersistState>,
}

/// Hands finished attempts to the sink on a separate task.
struct SinkEmitter {
    sink: Arc<dyn ResultSink>,
    leaderboard: Arc<LeaderboardService>,
    state: Arc<Mutex<PersistState>>,
}

impl ResultEmitter for SinkEmitter {
    fn emit(&self, record: ScoreRecord) {
        tracing::info!(
            attempt_id = %record.attempt_id,
            user_id = record.user_id,
            lesson_id = record.lesson_id,
            correct = record.correct_count,
            total = record.total_questions,
            "Quiz attempt completed"
        );
        tokio::spawn(persist(
            self.sink.clone(),
            self.leaderboard.clone(),
            self.state.clone(),
            record,
        ));
    }
}

/// Writes the record, stores the outcome and refreshes the leaderboard on success.
async fn persist(
    sink: Arc<dyn ResultSink>,
    leaderboard: Arc<LeaderboardService>,
    state: Arc<Mutex<PersistState>>,
    record: ScoreRecord,
) -> PersistState {
    let outcome = match sink.persist_attempt(&record).await {
        Ok(()) => PersistState::Persisted,
        Err(e) => {
            tracing::warn!(
                attempt_id = %record.attempt_id,
                user_id = record.user_id,
                "Failed to persist quiz result: {}",
                e
            );
            PersistState::Failed {
                error: e.to_string(),
            }
        }
    };

    *state.lock().await = outcome.clone();
    if outcome == PersistState::Persisted {
        leaderboard.refresh().await;
    }
    outcome
}

struct ActiveSession {
    session: QuizSession,
    persistence: Arc<Mutex<PersistState>>,
    last_tick: Instant,
    completed_at: Option<Instant>,
}

impl ActiveSession {
    /// Feeds whole elapsed seconds since the last tick into the session.
    /// Sub-second remainders carry over to the next call.
    fn catch_up(&mut self, now: Instant) {
        if self.session.status() != SessionStatus::InProgress {
            return;
        }
        let elapsed = now.saturating_duration_since(self.last_tick).as_secs();
        if elapsed == 0 {
            return;
        }
        self.last_tick += Duration::from_secs(elapsed);

        let seconds = u32::try_from(elapsed).unwrap_or(u32::MAX);
        if let Err(e) = self.session.tick(seconds) {
            tracing::warn!("Tick rejected: {}", e);
        }
        self.note_completion(now);
    }

    fn note_completion(&mut self, now: Instant) {
        if self.session.status() == SessionStatus::Completed && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    /// The completed record if its last write failed. Flips the state back to
    /// pending so only one writer picks it up.
    async fn take_unsaved(&self) -> Option<(ScoreRecord, Arc<Mutex<PersistState>>)> {
        let record = self.session.result()?.clone();
        let mut state = self.persistence.lock().await;
        if !matches!(*state, PersistState::Failed { .. }) {
            return None;
        }
        *state = PersistState::Pending;
        Some((record, self.persistence.clone()))
    }

    async fn view(&self) -> SessionView {
        let session = &self.session;
        let lesson = session.lesson();
        let attempt = session.attempt();
        let persistence = if session.status() == SessionStatus::Completed {
            Some(self.persistence.lock().await.clone())
        } else {
            None
        };

        SessionView {
            attempt_id: attempt.map(|a| a.id),
            lesson_id: lesson.id,
            lesson_title: lesson.title.clone(),
            status: session.status(),
            question_index: attempt.map_or(0, |a| a.current_index),
            question_count: lesson.question_count(),
            question: session
                .current_question()
                .map(|(i, q)| PublicQuestion::from_question(i, q)),
            pending_answer: attempt.and_then(|a| a.pending),
            remaining_seconds: attempt.map_or(lesson.time_limit_seconds, |a| a.remaining_seconds),
            correct_count: attempt.map_or(0, |a| a.correct_count),
            result: session.result().map(ResultView::from),
            persistence,
        }
    }
}

/// One quiz session per user, shared by all request handlers.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<UserId, ActiveSession>>>,
    sink: Arc<dyn ResultSink>,
    leaderboard: Arc<LeaderboardService>,
}

impl SessionRegistry {
    pub fn new(sink: Arc<dyn ResultSink>, leaderboard: Arc<LeaderboardService>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            sink,
            leaderboard,
        }
    }

    /// Starts `lesson` for the signed-in user. Any session the user already had
    /// is dropped without a record.
    pub async fn start(
        &self,
        identity: Arc<dyn Identity>,
        lesson: Arc<Lesson>,
    ) -> Result<SessionView, AppError> {
        let user_id = identity.current_user().ok_or(QuizError::AuthRequired)?;
        self.flush_unsaved(user_id).await?;

        let persistence = Arc::new(Mutex::new(PersistState::Pending));
        let emitter = Arc::new(SinkEmitter {
            sink: self.sink.clone(),
            leaderboard: self.leaderboard.clone(),
            state: persistence.clone(),
        });

        let mut session = QuizSession::new(lesson, identity, emitter);
        session.start()?;

        let active = ActiveSession {
            session,
            persistence,
            last_tick: Instant::now(),
            completed_at: None,
        };
        let view = active.view().await;

        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = sessions.insert(user_id, active) {
            if previous.session.status() == SessionStatus::InProgress {
                tracing::info!(user_id, "Abandoned unfinished quiz session");
            }
        }
        tracing::info!(user_id, lesson_id = view.lesson_id, "Quiz session started");

        Ok(view)
    }

    pub async fn view(&self, user_id: UserId) -> Result<SessionView, AppError> {
        self.with_session(user_id, |_| Ok(())).await
    }

    pub async fn select_answer(
        &self,
        user_id: UserId,
        option_index: usize,
    ) -> Result<SessionView, AppError> {
        self.with_session(user_id, |s| s.select_answer(option_index))
            .await
    }

    pub async fn submit_answer(&self, user_id: UserId) -> Result<SessionView, AppError> {
        self.with_session(user_id, |s| s.submit_current_answer().map(|_| ()))
            .await
    }

    /// Drops the user's session. Nothing is recorded for an unfinished attempt.
    /// Returns `Ok(false)` if there was no session.
    ///
    /// A completed result that was never saved is written first; if that fails
    /// the session is kept and `Conflict` returned.
    pub async fn abandon(&self, user_id: UserId) -> Result<bool, AppError> {
        self.flush_unsaved(user_id).await?;

        let removed = self.sessions.lock().await.remove(&user_id);
        Ok(match removed {
            Some(active) => {
                if active.session.status() == SessionStatus::InProgress {
                    tracing::info!(user_id, "Abandoned unfinished quiz session");
                }
                true
            }
            None => false,
        })
    }

    /// Makes one more write of the user's unsaved result before the session goes away.
    async fn flush_unsaved(&self, user_id: UserId) -> Result<(), AppError> {
        let unsaved = match self.sessions.lock().await.get(&user_id) {
            Some(active) => active.take_unsaved().await,
            None => None,
        };
        let Some((record, state)) = unsaved else {
            return Ok(());
        };

        tracing::info!(user_id, attempt_id = %record.attempt_id, "Saving quiz result before closing its session");
        match persist(self.sink.clone(), self.leaderboard.clone(), state, record).await {
            PersistState::Failed { error } => Err(AppError::Conflict(format!(
                "Previous quiz result is not saved yet ({error}). Retry saving it first."
            ))),
            _ => Ok(()),
        }
    }

    /// Re-sends a completed attempt whose earlier write failed.
    pub async fn retry_persist(&self, user_id: UserId) -> Result<SessionView, AppError> {
        let (record, state) = {
            let sessions = self.sessions.lock().await;
            let active = sessions.get(&user_id).ok_or_else(no_session)?;
            let record = active
                .session
                .result()
                .cloned()
                .ok_or_else(|| AppError::Conflict("Quiz is not completed yet".to_string()))?;

            let mut state = active.persistence.lock().await;
            match *state {
                PersistState::Persisted => {
                    return Err(AppError::Conflict("Result is already saved".to_string()));
                }
                PersistState::Pending => {
                    return Err(AppError::Conflict(
                        "Result is still being saved".to_string(),
                    ));
                }
                PersistState::Failed { .. } => {}
            }
            *state = PersistState::Pending;
            (record, active.persistence.clone())
        };

        tracing::info!(user_id, attempt_id = %record.attempt_id, "Retrying quiz result persistence");
        persist(self.sink.clone(), self.leaderboard.clone(), state, record).await;
        self.view(user_id).await
    }

    /// Advances every running session to the current time and evicts
    /// completed sessions past their retention window.
    pub async fn tick_all(&self) {
        let now = Instant::now();
        let retention = Duration::from_secs(SESSION_RETENTION_SECS);
        let mut sessions = self.sessions.lock().await;

        let mut expired = Vec::new();
        for (user_id, active) in sessions.iter_mut() {
            active.catch_up(now);
            if active
                .completed_at
                .is_some_and(|done| now.saturating_duration_since(done) >= retention)
            {
                expired.push(*user_id);
            }
        }

        for user_id in expired {
            let Some(active) = sessions.remove(&user_id) else {
                continue;
            };
            if let Some((record, state)) = active.take_unsaved().await {
                tracing::warn!(
                    user_id,
                    attempt_id = %record.attempt_id,
                    "Evicting quiz result that was never saved, trying once more"
                );
                tokio::spawn(persist(
                    self.sink.clone(),
                    self.leaderboard.clone(),
                    state,
                    record,
                ));
            }
        }
    }

    /// Drives `tick_all` on a fixed interval for the life of the process.
    pub fn spawn_ticker(&self) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut interval = time::interval(Duration::from_secs(TICK_INTERVAL_SECS));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                registry.tick_all().await;
            }
        })
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn with_session<F>(&self, user_id: UserId, op: F) -> Result<SessionView, AppError>
    where
        F: FnOnce(&mut QuizSession) -> Result<(), QuizError>,
    {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        let active = sessions.get_mut(&user_id).ok_or_else(no_session)?;

        active.catch_up(now);
        op(&mut active.session)?;
        active.note_completion(now);

        Ok(active.view().await)
    }
}

fn no_session() -> AppError {
    AppError::NotFound("No active quiz session".to_string())
}
