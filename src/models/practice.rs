// src/models/practice.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::{error::AppError, utils::score::percentage};

/// Coarse generation parameter. Not enforced anywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Parses a stored column value. Anything else means the row is corrupt.
    pub fn from_column(raw: &str) -> Result<Self, AppError> {
        Self::parse(raw)
            .ok_or_else(|| AppError::InternalServerError(format!("Unknown difficulty '{raw}'")))
    }
}

/// Question snapshot stored inside an attempt when it is generated.
/// Later edits to the course bank do not change running attempts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// One selected option, keyed by question id and carrying the option text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: i64,
    pub selected: String,
}

/// Represents the 'practice_attempts' table.
#[derive(Debug, Clone, FromRow)]
pub struct PracticeAttempt {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub difficulty: String,
    pub questions: Json<Vec<PracticeQuestion>>,
    pub time_limit: i32,
    pub time_remaining: Option<i32>,
    pub is_completed: bool,
    pub correct_answers: Option<i32>,
    pub answers: Option<Json<Vec<SubmittedAnswer>>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Question as sent over the wire. The answer is only present on completed attempts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptQuestion {
    pub id: i64,
    pub text: String,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

/// Typed response contract for a single attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttemptView {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub difficulty: Difficulty,
    pub questions: Vec<AttemptQuestion>,
    #[serde(default)]
    pub time_limit: Option<i32>,
    #[serde(default)]
    pub time_remaining: Option<i32>,
    pub is_completed: bool,
    #[serde(default)]
    pub correct_answers: Option<i32>,
    #[serde(default)]
    pub answers: Vec<SubmittedAnswer>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AttemptView {
    /// Stored score for a completed attempt.
    pub fn score(&self) -> Option<u32> {
        if !self.is_completed {
            return None;
        }
        let correct = self.correct_answers.unwrap_or(0).max(0) as usize;
        Some(percentage(correct, self.questions.len()))
    }
}

impl TryFrom<PracticeAttempt> for AttemptView {
    type Error = AppError;

    fn try_from(row: PracticeAttempt) -> Result<Self, AppError> {
        let difficulty = Difficulty::from_column(&row.difficulty)?;
        let reveal = row.is_completed;
        let questions = row
            .questions
            .0
            .into_iter()
            .map(|q| AttemptQuestion {
                id: q.id,
                text: q.text,
                options: q.options,
                correct_answer: reveal.then_some(q.correct_answer),
            })
            .collect();

        Ok(AttemptView {
            id: row.id,
            user_id: row.user_id,
            course_id: row.course_id,
            difficulty,
            questions,
            time_limit: Some(row.time_limit),
            time_remaining: row.time_remaining,
            is_completed: row.is_completed,
            correct_answers: row.correct_answers,
            answers: row.answers.map(|a| a.0).unwrap_or_default(),
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(range(min = 1, message = "course_id is required"))]
    pub course_id: i64,
    pub difficulty: Difficulty,
    #[validate(range(min = 1, max = 50, message = "question_count must be between 1 and 50"))]
    pub question_count: Option<i64>,
}

/// Response of the start/resume call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResponse {
    pub attempt: AttemptView,
    pub time_remaining: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TimeUpdateRequest {
    #[validate(range(min = 0))]
    pub time_remaining: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub correct_answers: i32,
    pub total_questions: i32,
    pub score: u32,
}

/// Row of the history listing.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub difficulty: String,
    pub total_questions: i32,
    pub correct_answers: Option<i32>,
    pub is_completed: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub difficulty: Difficulty,
    pub total_questions: i32,
    pub correct_answers: Option<i32>,
    pub is_completed: bool,
    pub score: Option<u32>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = AppError;

    fn try_from(row: HistoryRow) -> Result<Self, AppError> {
        let score = row.is_completed.then(|| {
            percentage(
                row.correct_answers.unwrap_or(0).max(0) as usize,
                row.total_questions.max(0) as usize,
            )
        });
        Ok(HistoryEntry {
            id: row.id,
            course_id: row.course_id,
            course_title: row.course_title,
            difficulty: Difficulty::from_column(&row.difficulty)?,
            total_questions: row.total_questions,
            correct_answers: row.correct_answers,
            is_completed: row.is_completed,
            score,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}
