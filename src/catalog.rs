// src/catalog.rs

use std::{collections::HashSet, fs, path::Path, sync::Arc};

use thiserror::Error;
use validator::Validate;

use crate::models::lesson::Lesson;

/// Lessons shipped with the binary.
const BUILTIN_LESSONS: &str = include_str!("../data/lessons.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read lesson catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse lesson catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid lesson catalog: {0}")]
    Invalid(String),
}

/// Read-only set of lessons, in catalog order.
#[derive(Debug, Clone)]
pub struct Catalog {
    lessons: Vec<Arc<Lesson>>,
}

impl Catalog {
    /// Parses and validates a JSON array of lessons.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let lessons: Vec<Lesson> = serde_json::from_str(json)?;
        Self::new(lessons)
    }

    pub fn new(lessons: Vec<Lesson>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for lesson in &lessons {
            validate_lesson(lesson)?;
            if !seen.insert(lesson.id) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate lesson id {}",
                    lesson.id
                )));
            }
        }

        Ok(Self {
            lessons: lessons.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_LESSONS)
    }

    /// Loads `path` when given, otherwise the built-in lessons.
    pub fn load(path: Option<&str>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => {
                tracing::info!("Loading lesson catalog from {}", path);
                Self::from_json(&fs::read_to_string(Path::new(path))?)
            }
            None => Self::builtin(),
        }
    }

    pub fn lessons(&self) -> &[Arc<Lesson>] {
        &self.lessons
    }

    pub fn get(&self, id: i64) -> Option<Arc<Lesson>> {
        self.lessons.iter().find(|l| l.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

fn validate_lesson(lesson: &Lesson) -> Result<(), CatalogError> {
    lesson
        .validate()
        .map_err(|e| CatalogError::Invalid(format!("lesson {}: {}", lesson.id, e)))?;

    for (i, question) in lesson.questions.iter().enumerate() {
        if question.correct_index >= question.options.len() {
            return Err(CatalogError::Invalid(format!(
                "lesson {} question {}: correct index {} is out of range for {} options",
                lesson.id,
                i,
                question.correct_index,
                question.options.len()
            )));
        }
    }
    Ok(())
}
