// src/handlers/practice.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    config::{DEFAULT_PRACTICE_QUESTIONS, MAX_PRACTICE_QUESTIONS, SECONDS_PER_QUESTION},
    error::AppError,
    handlers::{course::fetch_course, enrollment::is_enrolled},
    models::{
        course::CourseQuestion,
        practice::{
            AttemptView, GenerateRequest, HistoryEntry, HistoryRow, PracticeAttempt, PracticeQuestion,
            StartResponse, SubmitRequest, SubmitResponse, SubmittedAnswer, TimeUpdateRequest,
        },
    },
    utils::{
        jwt::Claims,
        score::{count_correct, percentage},
    },
};

const ATTEMPT_COLUMNS: &str = "id, user_id, course_id, difficulty, questions, time_limit, time_remaining, \
     is_completed, correct_answers, answers, created_at, started_at, completed_at";

/// Loads an attempt owned by `user_id`. Other users' attempts are reported as missing.
async fn fetch_owned(pool: &PgPool, id: i64, user_id: i64) -> Result<PracticeAttempt, AppError> {
    sqlx::query_as::<_, PracticeAttempt>(&format!(
        "SELECT {ATTEMPT_COLUMNS} FROM practice_attempts WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Practice attempt not found".to_string()))
}

/// Generates a new attempt from the course question bank.
///
/// * The caller must be enrolled in the course.
/// * Questions are drawn at random for the requested difficulty and frozen
///   into the attempt.
/// * The time limit is one minute per question.
pub async fn generate_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let course = fetch_course(&pool, payload.course_id).await?;
    if !is_enrolled(&pool, user_id, course.id).await? {
        return Err(AppError::Forbidden(
            "Enroll in the course before practicing".to_string(),
        ));
    }

    let count = payload
        .question_count
        .unwrap_or(DEFAULT_PRACTICE_QUESTIONS)
        .min(MAX_PRACTICE_QUESTIONS);

    let bank = sqlx::query_as::<_, CourseQuestion>(
        r#"
        SELECT id, course_id, difficulty, text, options, correct_answer, created_at
        FROM course_questions
        WHERE course_id = $1 AND difficulty = $2
        ORDER BY RANDOM()
        LIMIT $3
        "#,
    )
    .bind(course.id)
    .bind(payload.difficulty.as_str())
    .bind(count)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to draw practice questions: {:?}", e);
        AppError::from(e)
    })?;

    if bank.is_empty() {
        return Err(AppError::BadRequest(format!(
            "No {} questions available for this course",
            payload.difficulty.as_str()
        )));
    }

    let questions: Vec<PracticeQuestion> = bank
        .into_iter()
        .map(|q| PracticeQuestion {
            id: q.id,
            text: q.text,
            options: q.options.0,
            correct_answer: q.correct_answer,
        })
        .collect();
    let time_limit = questions.len() as i32 * SECONDS_PER_QUESTION;

    let attempt = sqlx::query_as::<_, PracticeAttempt>(&format!(
        r#"
        INSERT INTO practice_attempts (user_id, course_id, difficulty, questions, time_limit)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(course.id)
    .bind(payload.difficulty.as_str())
    .bind(SqlJson(&questions))
    .bind(time_limit)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        attempt_id = attempt.id,
        user_id,
        questions = questions.len(),
        "Generated practice attempt"
    );

    Ok((StatusCode::CREATED, Json(AttemptView::try_from(attempt)?)))
}

/// Returns one attempt. Correct answers are only included once completed.
pub async fn get_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = fetch_owned(&pool, id, claims.user_id()?).await?;
    Ok(Json(AttemptView::try_from(attempt)?))
}

/// Starts or resumes an attempt.
///
/// The first call stamps `started_at` and sets the remaining time to the full
/// limit; later calls return the last synced remaining time unchanged.
pub async fn start_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let started = sqlx::query_as::<_, PracticeAttempt>(&format!(
        r#"
        UPDATE practice_attempts
        SET started_at = COALESCE(started_at, NOW()),
            time_remaining = COALESCE(time_remaining, time_limit)
        WHERE id = $1 AND user_id = $2 AND is_completed = FALSE
        RETURNING {ATTEMPT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&pool)
    .await?;

    // Completed (or foreign) attempts fall through to a plain read.
    let attempt = match started {
        Some(attempt) => attempt,
        None => fetch_owned(&pool, id, user_id).await?,
    };

    let time_remaining = if attempt.is_completed {
        attempt.time_remaining.unwrap_or(0)
    } else {
        attempt.time_remaining.unwrap_or(attempt.time_limit)
    };

    Ok(Json(StartResponse {
        attempt: AttemptView::try_from(attempt)?,
        time_remaining,
    }))
}

/// Records the client's remaining time. Stored time never increases.
pub async fn update_time(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<TimeUpdateRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user_id = claims.user_id()?;

    let stored: Option<i32> = sqlx::query_scalar(
        r#"
        UPDATE practice_attempts
        SET time_remaining = LEAST(COALESCE(time_remaining, time_limit), $3)
        WHERE id = $1 AND user_id = $2 AND is_completed = FALSE
        RETURNING time_remaining
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(payload.time_remaining)
    .fetch_optional(&pool)
    .await?;

    match stored {
        Some(time_remaining) => Ok(Json(serde_json::json!({ "time_remaining": time_remaining }))),
        None => {
            fetch_owned(&pool, id, user_id).await?;
            Err(AppError::Conflict("Practice attempt is already completed".to_string()))
        }
    }
}

/// Keeps the last answer per known question, in question order.
fn normalize_answers(questions: &[PracticeQuestion], answers: Vec<SubmittedAnswer>) -> Vec<SubmittedAnswer> {
    let mut by_question: HashMap<i64, String> = HashMap::new();
    for answer in answers {
        by_question.insert(answer.question_id, answer.selected);
    }

    questions
        .iter()
        .filter_map(|q| {
            by_question.remove(&q.id).map(|selected| SubmittedAnswer {
                question_id: q.id,
                selected,
            })
        })
        .collect()
}

/// Scores normalised answers against an attempt snapshot.
fn grade(questions: &[PracticeQuestion], answers: &[SubmittedAnswer]) -> SubmitResponse {
    let answer_key: HashMap<i64, String> = questions
        .iter()
        .map(|q| (q.id, q.correct_answer.clone()))
        .collect();
    let selected: HashMap<i64, String> = answers
        .iter()
        .map(|a| (a.question_id, a.selected.clone()))
        .collect();

    let correct = count_correct(&selected, &answer_key);
    SubmitResponse {
        correct_answers: correct as i32,
        total_questions: questions.len() as i32,
        score: percentage(correct, questions.len()),
    }
}

/// Submits an attempt and scores it.
///
/// * Answers are matched to the snapshot by value.
/// * Unanswered questions simply count as wrong.
/// * The completion update is conditional, so racing submissions score once.
pub async fn submit_attempt(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let attempt = fetch_owned(&pool, id, user_id).await?;

    if attempt.is_completed {
        return Err(AppError::Conflict("Practice attempt is already completed".to_string()));
    }

    let answers = normalize_answers(&attempt.questions, payload.answers);
    let result = grade(&attempt.questions, &answers);

    let updated = sqlx::query(
        r#"
        UPDATE practice_attempts
        SET is_completed = TRUE,
            correct_answers = $3,
            answers = $4,
            completed_at = NOW()
        WHERE id = $1 AND user_id = $2 AND is_completed = FALSE
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(result.correct_answers)
    .bind(SqlJson(&answers))
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to store practice submission: {:?}", e);
        AppError::from(e)
    })?;

    if updated.rows_affected() == 0 {
        return Err(AppError::Conflict("Practice attempt is already completed".to_string()));
    }

    tracing::info!(
        attempt_id = id,
        user_id,
        correct = result.correct_answers,
        total = result.total_questions,
        "Practice attempt submitted"
    );

    Ok(Json(result))
}

/// Lists the caller's attempts, newest first.
pub async fn list_history(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, HistoryRow>(
        r#"
        SELECT
            p.id,
            p.course_id,
            c.title AS course_title,
            p.difficulty,
            jsonb_array_length(p.questions) AS total_questions,
            p.correct_answers,
            p.is_completed,
            p.created_at,
            p.completed_at
        FROM practice_attempts p
        JOIN courses c ON c.id = p.course_id
        WHERE p.user_id = $1
        ORDER BY p.created_at DESC, p.id DESC
        "#,
    )
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await?;

    let history = rows
        .into_iter()
        .map(HistoryEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(history))
}
