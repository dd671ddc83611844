// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'enrollments' table. (user_id, course_id) is unique.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A course row joined with the caller's enrolment date.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EnrolledCourse {
    pub course_id: i64,
    pub title: String,
    pub visibility: String,
    pub semester_id: i64,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub course_id: i64,
}

/// Staff enrolling another user, e.g. into a mandatory course.
#[derive(Debug, Deserialize)]
pub struct StaffEnrollRequest {
    pub user_id: i64,
    pub course_id: i64,
}
