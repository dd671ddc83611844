// src/handlers/exam.rs

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
    handlers::course::{ensure_can_edit, fetch_course},
    models::exam::{Exam, ExamListParams, ExamQuestion, ExamRequest, ExamResponse},
    utils::{html::clean_html, jwt::Claims},
};

const EXAM_COLUMNS: &str = "id, course_id, title, duration_minutes, questions, created_by, created_at";

/// Lists exams, optionally for one course. Answer keys are only shown to staff.
pub async fn list_exams(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ExamListParams>,
) -> Result<impl IntoResponse, AppError> {
    let exams = sqlx::query_as::<_, Exam>(&format!(
        r#"
        SELECT {EXAM_COLUMNS}
        FROM exams
        WHERE ($1::BIGINT IS NULL OR course_id = $1)
        ORDER BY created_at DESC
        "#
    ))
    .bind(params.course_id)
    .fetch_all(&pool)
    .await?;

    let staff = claims.is_staff();
    let exams = exams
        .into_iter()
        .map(|exam| exam.into_view(staff))
        .collect::<Result<Vec<ExamResponse>, _>>()?;

    Ok(Json(exams))
}

async fn fetch_exam(pool: &PgPool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>(&format!("SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Retrieves one exam.
pub async fn get_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;
    Ok(Json(exam.into_view(claims.is_staff())?))
}

fn sanitized_questions(questions: Vec<ExamQuestion>) -> Vec<ExamQuestion> {
    questions
        .into_iter()
        .map(|q| ExamQuestion {
            text: clean_html(&q.text),
            ..q
        })
        .collect()
}

/// Loads the course an exam is written for and checks the caller may edit it.
/// A missing course is reported as a bad request.
async fn authorize_course(pool: &PgPool, course_id: i64, claims: &Claims) -> Result<(), AppError> {
    let course = fetch_course(pool, course_id).await.map_err(|e| match e {
        AppError::NotFound(_) => AppError::BadRequest(format!("Course {course_id} does not exist")),
        other => other,
    })?;
    ensure_can_edit(&course, claims)
}

/// Creates an exam for an existing course. Course author or admin only.
pub async fn create_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    authorize_course(&pool, payload.course_id, &claims).await?;

    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        INSERT INTO exams (course_id, title, duration_minutes, questions, created_by)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {EXAM_COLUMNS}
        "#
    ))
    .bind(payload.course_id)
    .bind(payload.title.trim())
    .bind(payload.duration_minutes)
    .bind(SqlJson(sanitized_questions(payload.questions)))
    .bind(claims.user_id()?)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(exam_id = exam.id, total_marks = exam.total_marks(), "Created exam");

    Ok((StatusCode::CREATED, Json(exam.into_view(true)?)))
}

/// Replaces an exam's definition. Both the current and the target course
/// must be editable by the caller.
pub async fn update_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<ExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let current = fetch_exam(&pool, id).await?;
    authorize_course(&pool, current.course_id, &claims).await?;
    if payload.course_id != current.course_id {
        authorize_course(&pool, payload.course_id, &claims).await?;
    }

    let exam = sqlx::query_as::<_, Exam>(&format!(
        r#"
        UPDATE exams
        SET course_id = $1, title = $2, duration_minutes = $3, questions = $4
        WHERE id = $5
        RETURNING {EXAM_COLUMNS}
        "#
    ))
    .bind(payload.course_id)
    .bind(payload.title.trim())
    .bind(payload.duration_minutes)
    .bind(SqlJson(sanitized_questions(payload.questions)))
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    Ok(Json(exam.into_view(true)?))
}

/// Deletes an exam. Course author or admin only.
pub async fn delete_exam(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = fetch_exam(&pool, id).await?;
    authorize_course(&pool, exam.course_id, &claims).await?;

    let result = sqlx::query("DELETE FROM exams WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
