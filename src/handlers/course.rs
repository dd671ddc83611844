// src/handlers/course.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        course::{Course, CourseListParams, CourseQuestion, CourseRequest, CreateCourseQuestionRequest},
        user::Role,
    },
    utils::{html::clean_html, jwt::Claims},
};

const COURSE_COLUMNS: &str = "id, semester_id, title, description, visibility, created_by, created_at";

/// Lists courses, optionally filtered by semester and visibility.
pub async fn list_courses(
    State(pool): State<PgPool>,
    Query(params): Query<CourseListParams>,
) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(&format!(
        r#"
        SELECT {COURSE_COLUMNS}
        FROM courses
        WHERE ($1::BIGINT IS NULL OR semester_id = $1)
          AND ($2::TEXT IS NULL OR visibility = $2)
        ORDER BY title
        "#
    ))
    .bind(params.semester_id)
    .bind(params.visibility.map(|v| v.as_str()))
    .fetch_all(&pool)
    .await?;

    Ok(Json(courses))
}

pub(crate) async fn fetch_course(pool: &PgPool, id: i64) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>(&format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))
}

/// Retrieves a single course by ID.
pub async fn get_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(fetch_course(&pool, id).await?))
}

/// Admins may edit any course, instructors only their own.
pub(crate) fn ensure_can_edit(course: &Course, claims: &Claims) -> Result<(), AppError> {
    match claims.role() {
        Some(Role::Admin) => Ok(()),
        Some(Role::Instructor) if course.created_by == claims.user_id()? => Ok(()),
        _ => Err(AppError::Forbidden(
            "Only the course author or an admin may modify this course".to_string(),
        )),
    }
}

/// Creates a course. Staff only.
pub async fn create_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        INSERT INTO courses (semester_id, title, description, visibility, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(payload.semester_id)
    .bind(payload.title.trim())
    .bind(clean_html(&payload.description))
    .bind(payload.visibility.as_str())
    .bind(claims.user_id()?)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create course: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(course_id = course.id, "Created course");

    Ok((StatusCode::CREATED, Json(course)))
}

/// Updates a course. Staff only.
pub async fn update_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<CourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let existing = fetch_course(&pool, id).await?;
    ensure_can_edit(&existing, &claims)?;

    let course = sqlx::query_as::<_, Course>(&format!(
        r#"
        UPDATE courses
        SET semester_id = $1, title = $2, description = $3, visibility = $4
        WHERE id = $5
        RETURNING {COURSE_COLUMNS}
        "#
    ))
    .bind(payload.semester_id)
    .bind(payload.title.trim())
    .bind(clean_html(&payload.description))
    .bind(payload.visibility.as_str())
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(course))
}

/// Deletes a course with its question bank, exams and enrolments.
/// Staff only.
pub async fn delete_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let existing = fetch_course(&pool, id).await?;
    ensure_can_edit(&existing, &claims)?;

    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Lists the practice question bank of a course. Staff only.
pub async fn list_course_questions(
    State(pool): State<PgPool>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_course(&pool, course_id).await?;

    let questions = sqlx::query_as::<_, CourseQuestion>(
        r#"
        SELECT id, course_id, difficulty, text, options, correct_answer, created_at
        FROM course_questions
        WHERE course_id = $1
        ORDER BY id
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(questions))
}

/// Adds a question to a course bank. Staff only.
pub async fn create_course_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateCourseQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let course = fetch_course(&pool, course_id).await?;
    ensure_can_edit(&course, &claims)?;

    let question = sqlx::query_as::<_, CourseQuestion>(
        r#"
        INSERT INTO course_questions (course_id, difficulty, text, options, correct_answer)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, course_id, difficulty, text, options, correct_answer, created_at
        "#,
    )
    .bind(course_id)
    .bind(payload.difficulty.as_str())
    .bind(clean_html(&payload.text))
    .bind(SqlJson(&payload.options))
    .bind(&payload.correct_answer)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Removes a question from a course bank. Attempts keep their snapshot.
/// Staff only.
pub async fn delete_course_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, question_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, course_id).await?;
    ensure_can_edit(&course, &claims)?;

    let result = sqlx::query("DELETE FROM course_questions WHERE id = $1 AND course_id = $2")
        .bind(question_id)
        .bind(course_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
