// src/handlers/attempt.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::{
    catalog::Catalog, error::AppError, sessions::SessionRegistry, utils::jwt::Claims,
};

/// DTO for choosing an option on the current question.
#[derive(Debug, Deserialize)]
pub struct SelectAnswerRequest {
    pub option_index: usize,
}

/// Starts a timed attempt of a lesson for the current user.
///
/// An unfinished attempt the user already had is abandoned without a record.
pub async fn start_attempt(
    State(catalog): State<Arc<Catalog>>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = catalog
        .get(lesson_id)
        .ok_or(AppError::NotFound(format!("Lesson {lesson_id} not found")))?;

    let view = sessions.start(Arc::new(claims), lesson).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Current state of the user's attempt: question, remaining time, score.
pub async fn get_attempt(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.view(claims.user_id()?).await?))
}

pub async fn select_answer(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = sessions
        .select_answer(claims.user_id()?, req.option_index)
        .await?;
    Ok(Json(view))
}

/// Submits the selected answer and advances to the next question.
pub async fn submit_answer(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.submit_answer(claims.user_id()?).await?))
}

/// Retries saving a completed attempt whose first save failed.
pub async fn retry_persist(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(sessions.retry_persist(claims.user_id()?).await?))
}

/// Abandons the current attempt. Nothing is recorded for an unfinished one.
///
/// 409 if a completed result could not be saved; the session is kept for a retry.
pub async fn abandon_attempt(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    if !sessions.abandon(claims.user_id()?).await? {
        return Err(AppError::NotFound("No active quiz session".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
