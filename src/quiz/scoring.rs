// src/quiz/scoring.rs

use crate::config::PASSING_SCORE_PERCENTAGE;

/// Percentage of correct answers, rounded half up.
/// Returns 0 for an empty lesson.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    // round(100 * c / t) == floor((200 * c + t) / (2 * t))
    ((200 * correct + total) / (2 * total)) as u32
}

pub fn is_passing(percentage: u32) -> bool {
    percentage >= PASSING_SCORE_PERCENTAGE
}
