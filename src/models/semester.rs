// src/models/semester.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'semesters' table. Many semesters share one branch.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Semester {
    pub id: i64,
    pub branch_id: i64,
    pub number: i32,
    pub name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SemesterRequest {
    #[validate(range(min = 1, message = "branch_id is required"))]
    pub branch_id: i64,
    #[validate(range(min = 1, max = 12, message = "Semester number must be between 1 and 12"))]
    pub number: i32,
    #[validate(length(min = 1, max = 100, message = "Semester name is required"))]
    pub name: String,
}

/// Query parameters for listing semesters.
#[derive(Debug, Deserialize)]
pub struct SemesterListParams {
    pub branch_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_bounds() {
        let req = SemesterRequest {
            branch_id: 1,
            number: 13,
            name: "Thirteenth".to_string(),
        };
        assert!(req.validate().is_err());

        let req = SemesterRequest {
            branch_id: 1,
            number: 3,
            name: "Third".to_string(),
        };
        assert!(req.validate().is_ok());
    }
}
