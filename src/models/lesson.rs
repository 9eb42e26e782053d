// src/models/lesson.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A lesson from the catalog. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Lesson {
    pub id: i64,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Whole-attempt time limit, in seconds.
    #[validate(range(min = 1))]
    pub time_limit_seconds: u32,

    /// Questions in presentation order.
    #[validate(length(min = 1), nested)]
    pub questions: Vec<Question>,
}

impl Lesson {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Question {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,

    /// Answer options, shown in this order.
    #[validate(length(min = 2))]
    pub options: Vec<String>,

    /// 0-based index into `options`.
    pub correct_index: usize,
}

impl Question {
    pub fn is_correct(&self, option_index: usize) -> bool {
        option_index == self.correct_index
    }
}

/// DTO for sending a question to the client (excludes the correct index).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub index: usize,
    pub prompt: String,
    pub options: Vec<String>,
}

impl PublicQuestion {
    pub fn from_question(index: usize, question: &Question) -> Self {
        Self {
            index,
            prompt: question.prompt.clone(),
            options: question.options.clone(),
        }
    }
}

/// Catalog listing entry.
#[derive(Debug, Serialize)]
pub struct LessonSummary {
    pub id: i64,
    pub title: String,
    pub question_count: usize,
    pub time_limit_seconds: u32,
}

impl From<&Lesson> for LessonSummary {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title.clone(),
            question_count: lesson.question_count(),
            time_limit_seconds: lesson.time_limit_seconds,
        }
    }
}

/// Lesson detail with its questions, answers hidden.
#[derive(Debug, Serialize)]
pub struct LessonDetail {
    pub id: i64,
    pub title: String,
    pub time_limit_seconds: u32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Lesson> for LessonDetail {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id,
            title: lesson.title.clone(),
            time_limit_seconds: lesson.time_limit_seconds,
            questions: lesson
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| PublicQuestion::from_question(i, q))
                .collect(),
        }
    }
}
