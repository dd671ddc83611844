// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::{Validate, ValidationError};

use crate::models::practice::Difficulty;

/// Represents the 'courses' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub semester_id: i64,
    pub title: String,
    /// Sanitised HTML.
    pub description: String,
    /// 'public', 'mandatory' or 'optional'.
    pub visibility: String,
    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Course {
    pub fn visibility(&self) -> Visibility {
        Visibility::parse(&self.visibility).unwrap_or(Visibility::Public)
    }
}

/// Course-level access policy for enrolment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Anyone may self-enrol.
    Public,
    /// Enrolled by staff; students cannot join or leave on their own.
    Mandatory,
    /// Elective; students may join and leave.
    Optional,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Mandatory => "mandatory",
            Visibility::Optional => "optional",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "public" => Some(Visibility::Public),
            "mandatory" => Some(Visibility::Mandatory),
            "optional" => Some(Visibility::Optional),
            _ => None,
        }
    }

    pub fn allows_self_enrollment(&self) -> bool {
        !matches!(self, Visibility::Mandatory)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CourseRequest {
    #[validate(range(min = 1, message = "semester_id is required"))]
    pub semester_id: i64,
    #[validate(length(min = 1, max = 200, message = "Course title is required"))]
    pub title: String,
    #[validate(length(max = 20000))]
    #[serde(default)]
    pub description: String,
    pub visibility: Visibility,
}

/// Query parameters for listing courses.
#[derive(Debug, Deserialize)]
pub struct CourseListParams {
    pub semester_id: Option<i64>,
    pub visibility: Option<Visibility>,
}

/// Represents the 'course_questions' table: the practice question bank.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseQuestion {
    pub id: i64,
    pub course_id: i64,
    pub difficulty: String,
    pub text: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = validate_answer_in_options))]
pub struct CreateCourseQuestionRequest {
    pub difficulty: Difficulty,
    #[validate(length(min = 1, max = 2000, message = "Question text is required"))]
    pub text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
}

/// At least two options, none empty or oversized.
pub fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < 2 {
        return Err(ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    // Answers are matched by option text.
    let mut seen = std::collections::HashSet::new();
    if !options.iter().all(|opt| seen.insert(opt.trim())) {
        return Err(ValidationError::new("duplicate_option"));
    }
    Ok(())
}

fn validate_answer_in_options(req: &CreateCourseQuestionRequest) -> Result<(), ValidationError> {
    if !req.options.contains(&req.correct_answer) {
        return Err(ValidationError::new("correct_answer_not_in_options"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], answer: &str) -> CreateCourseQuestionRequest {
        CreateCourseQuestionRequest {
            difficulty: Difficulty::Easy,
            text: "2 + 2?".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: answer.to_string(),
        }
    }

    #[test]
    fn test_answer_must_be_an_option() {
        assert!(question(&["3", "4"], "4").validate().is_ok());
        assert!(question(&["3", "4"], "5").validate().is_err());
    }

    #[test]
    fn test_single_option_rejected() {
        assert!(question(&["4"], "4").validate().is_err());
    }

    #[test]
    fn test_duplicate_options_rejected() {
        assert!(question(&["4", "4 "], "4").validate().is_err());
    }

    #[test]
    fn test_mandatory_blocks_self_enrollment() {
        assert!(!Visibility::Mandatory.allows_self_enrollment());
        assert!(Visibility::Optional.allows_self_enrollment());
        assert!(Visibility::Public.allows_self_enrollment());
    }
}
