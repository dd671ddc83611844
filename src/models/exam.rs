// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::{Validate, ValidationError};

use crate::models::course::validate_options;

/// Represents the 'exams' table. Questions are stored inline as JSONB.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub duration_minutes: i32,
    pub questions: Json<Vec<ExamQuestion>>,
    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = validate_exam_answer))]
pub struct ExamQuestion {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[validate(range(min = 1, max = 100))]
    pub marks: i32,
}

/// What a student sees: no correct answers.
#[derive(Debug, Clone, Serialize)]
pub struct PublicExamQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub marks: i32,
}

#[derive(Debug, Serialize)]
pub struct ExamResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub questions: serde_json::Value,
}

impl Exam {
    pub fn total_marks(&self) -> i32 {
        self.questions.iter().map(|q| q.marks).sum()
    }

    /// Staff receive answer keys, everyone else the public view.
    pub fn into_view(self, include_answers: bool) -> Result<ExamResponse, serde_json::Error> {
        let total_marks = self.total_marks();
        let questions = if include_answers {
            serde_json::to_value(&self.questions.0)?
        } else {
            let public: Vec<PublicExamQuestion> = self
                .questions
                .0
                .into_iter()
                .map(|q| PublicExamQuestion {
                    text: q.text,
                    options: q.options,
                    marks: q.marks,
                })
                .collect();
            serde_json::to_value(public)?
        };

        Ok(ExamResponse {
            id: self.id,
            course_id: self.course_id,
            title: self.title,
            duration_minutes: self.duration_minutes,
            total_marks,
            questions,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExamRequest {
    #[validate(range(min = 1, message = "course_id is required"))]
    pub course_id: i64,
    #[validate(length(min = 1, max = 200, message = "Exam title is required"))]
    pub title: String,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[validate(length(min = 1, message = "An exam needs at least one question"), nested)]
    pub questions: Vec<ExamQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct ExamListParams {
    pub course_id: Option<i64>,
}

fn validate_exam_answer(q: &ExamQuestion) -> Result<(), ValidationError> {
    if !q.options.contains(&q.correct_answer) {
        return Err(ValidationError::new("correct_answer_not_in_options"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam_question(marks: i32) -> ExamQuestion {
        ExamQuestion {
            text: "Capital of France?".to_string(),
            options: vec!["Paris".to_string(), "Rome".to_string()],
            correct_answer: "Paris".to_string(),
            marks,
        }
    }

    #[test]
    fn test_total_marks() {
        let exam = Exam {
            id: 1,
            course_id: 1,
            title: "Midterm".to_string(),
            duration_minutes: 60,
            questions: Json(vec![exam_question(2), exam_question(3)]),
            created_by: 1,
            created_at: None,
        };
        assert_eq!(exam.total_marks(), 5);

        let public = exam.into_view(false).unwrap();
        assert_eq!(public.total_marks, 5);
        assert!(public.questions[0].get("correct_answer").is_none());
    }

    #[test]
    fn test_nested_question_validation() {
        let req = ExamRequest {
            course_id: 1,
            title: "Final".to_string(),
            duration_minutes: 90,
            questions: vec![exam_question(0)],
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_exam_rejected() {
        let req = ExamRequest {
            course_id: 1,
            title: "Final".to_string(),
            duration_minutes: 90,
            questions: vec![],
        };
        assert!(req.validate().is_err());
    }
}
