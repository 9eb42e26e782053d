// src/handlers/lessons.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    catalog::Catalog,
    error::AppError,
    models::lesson::{LessonDetail, LessonSummary},
};

/// Lists all lessons in catalog order.
pub async fn list_lessons(State(catalog): State<Arc<Catalog>>) -> impl IntoResponse {
    let lessons: Vec<LessonSummary> = catalog
        .lessons()
        .iter()
        .map(|l| LessonSummary::from(l.as_ref()))
        .collect();

    Json(lessons)
}

/// Retrieves one lesson with its questions. Correct answers are not included.
pub async fn get_lesson(
    State(catalog): State<Arc<Catalog>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = catalog
        .get(id)
        .ok_or(AppError::NotFound(format!("Lesson {id} not found")))?;

    Ok(Json(LessonDetail::from(lesson.as_ref())))
}
