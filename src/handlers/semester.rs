// src/handlers/semester.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::semester::{Semester, SemesterListParams, SemesterRequest},
};

/// Lists semesters, optionally restricted to one branch.
pub async fn list_semesters(
    State(pool): State<PgPool>,
    Query(params): Query<SemesterListParams>,
) -> Result<impl IntoResponse, AppError> {
    let semesters = sqlx::query_as::<_, Semester>(
        r#"
        SELECT id, branch_id, number, name, created_at
        FROM semesters
        WHERE ($1::BIGINT IS NULL OR branch_id = $1)
        ORDER BY branch_id, number
        "#,
    )
    .bind(params.branch_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(semesters))
}

async fn ensure_branch_exists(pool: &PgPool, branch_id: i64) -> Result<(), AppError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM branches WHERE id = $1")
        .bind(branch_id)
        .fetch_optional(pool)
        .await?;

    exists
        .map(|_| ())
        .ok_or(AppError::BadRequest(format!("Branch {} does not exist", branch_id)))
}

/// Creates a semester under an existing branch. Admin only.
pub async fn create_semester(
    State(pool): State<PgPool>,
    Json(payload): Json<SemesterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_branch_exists(&pool, payload.branch_id).await?;

    let semester = sqlx::query_as::<_, Semester>(
        r#"
        INSERT INTO semesters (branch_id, number, name)
        VALUES ($1, $2, $3)
        RETURNING id, branch_id, number, name, created_at
        "#,
    )
    .bind(payload.branch_id)
    .bind(payload.number)
    .bind(payload.name.trim())
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(semester)))
}

/// Updates a semester. Admin only.
pub async fn update_semester(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<SemesterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_branch_exists(&pool, payload.branch_id).await?;

    let semester = sqlx::query_as::<_, Semester>(
        r#"
        UPDATE semesters SET branch_id = $1, number = $2, name = $3
        WHERE id = $4
        RETURNING id, branch_id, number, name, created_at
        "#,
    )
    .bind(payload.branch_id)
    .bind(payload.number)
    .bind(payload.name.trim())
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Semester not found".to_string()))?;

    Ok(Json(semester))
}

/// Deletes a semester. Admin only.
pub async fn delete_semester(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM semesters WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Semester not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
