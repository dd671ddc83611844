// src/handlers/branch.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::branch::{Branch, BranchRequest},
};

/// Lists all branches ordered by code.
pub async fn list_branches(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let branches = sqlx::query_as::<_, Branch>(
        "SELECT id, name, code, created_at FROM branches ORDER BY code",
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(branches))
}

/// Creates a branch. Admin only.
pub async fn create_branch(
    State(pool): State<PgPool>,
    Json(payload): Json<BranchRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let branch = sqlx::query_as::<_, Branch>(
        r#"
        INSERT INTO branches (name, code)
        VALUES ($1, $2)
        RETURNING id, name, code, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.code)
    .fetch_one(&pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => {
            AppError::Conflict(format!("Branch code '{}' already exists", payload.code))
        }
        other => other,
    })?;

    tracing::info!(branch_id = branch.id, code = %branch.code, "Created branch");

    Ok((StatusCode::CREATED, Json(branch)))
}

/// Replaces a branch's name and code. Admin only.
pub async fn update_branch(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<BranchRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let branch = sqlx::query_as::<_, Branch>(
        r#"
        UPDATE branches SET name = $1, code = $2
        WHERE id = $3
        RETURNING id, name, code, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.code)
    .bind(id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Branch not found".to_string()))?;

    Ok(Json(branch))
}

/// Deletes a branch. Semesters under it are removed by the FK cascade.
/// Admin only.
pub async fn delete_branch(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM branches WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete branch: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Branch not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
