// src/utils/score.rs

use std::collections::HashMap;

/// Counts answers whose selected option text equals the stored correct answer.
/// Answers for unknown question ids are ignored.
pub fn count_correct(user_answers: &HashMap<i64, String>, answer_key: &HashMap<i64, String>) -> usize {
    user_answers
        .iter()
        .filter(|(q_id, selected)| {
            answer_key
                .get(q_id)
                .is_some_and(|correct| correct == *selected)
        })
        .count()
}

/// `round(correct / total * 100)`, or 0 for an empty attempt.
pub fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}
