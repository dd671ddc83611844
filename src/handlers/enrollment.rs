// src/handlers/enrollment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::course::fetch_course,
    models::enrollment::{EnrollRequest, EnrolledCourse, Enrollment, StaffEnrollRequest},
    utils::jwt::Claims,
};

/// Lists the courses the caller is enrolled in.
pub async fn list_my_courses(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, EnrolledCourse>(
        r#"
        SELECT c.id AS course_id, c.title, c.visibility, c.semester_id, e.enrolled_at
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.user_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await?;

    Ok(Json(courses))
}

async fn insert_enrollment(pool: &PgPool, user_id: i64, course_id: i64) -> Result<Enrollment, AppError> {
    sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (user_id, course_id)
        VALUES ($1, $2)
        RETURNING id, user_id, course_id, enrolled_at
        "#,
    )
    .bind(user_id)
    .bind(course_id)
    .fetch_one(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Already enrolled in this course".to_string()),
        other => other,
    })
}

/// Self-enrolment. Mandatory courses are assigned by staff instead.
pub async fn enroll(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, payload.course_id).await?;

    if !course.visibility().allows_self_enrollment() && !claims.is_staff() {
        return Err(AppError::Forbidden(
            "Mandatory courses are assigned by staff".to_string(),
        ));
    }

    let enrollment = insert_enrollment(&pool, claims.user_id()?, course.id).await?;
    tracing::info!(user_id = enrollment.user_id, course_id = course.id, "User enrolled");

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Enrols another user into any course. Staff only.
pub async fn staff_enroll(
    State(pool): State<PgPool>,
    Json(payload): Json<StaffEnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, payload.course_id).await?;
    let enrollment = insert_enrollment(&pool, payload.user_id, course.id).await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Leaves a course. Students cannot leave mandatory courses.
pub async fn unenroll(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, course_id).await?;

    if !course.visibility().allows_self_enrollment() && !claims.is_staff() {
        return Err(AppError::Forbidden(
            "Cannot leave a mandatory course".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM enrollments WHERE user_id = $1 AND course_id = $2")
        .bind(claims.user_id()?)
        .bind(course_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Not enrolled in this course".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Whether `user_id` is enrolled in `course_id`.
pub(crate) async fn is_enrolled(pool: &PgPool, user_id: i64, course_id: i64) -> Result<bool, AppError> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT id FROM enrollments WHERE user_id = $1 AND course_id = $2")
            .bind(user_id)
            .bind(course_id)
            .fetch_optional(pool)
            .await?;
    Ok(found.is_some())
}
