// src/quiz/error.rs

use thiserror::Error;

use crate::quiz::session::SessionStatus;

/// Quiz session errors. All of them leave the session unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// Operation called from a state that does not allow it.
    #[error("cannot {operation} while the session is {status}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("attempt is already completed")]
    AlreadyCompleted,

    #[error("an authenticated user is required to start a quiz")]
    AuthRequired,
}
