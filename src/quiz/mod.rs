// src/quiz/mod.rs

//! Timed quiz attempts: the session state machine and its scoring rules.
//!
//! Everything here is synchronous and in-memory. Time is fed in through
//! [`QuizSession::tick`] and finished attempts leave through a [`ResultEmitter`],
//! so the module can be driven without a runtime, database or clock.

pub mod error;
pub mod scoring;
pub mod session;

pub use error::QuizError;
pub use session::{Identity, QuizAttempt, QuizSession, ResultEmitter, SessionStatus};
