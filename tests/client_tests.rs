// tests/client_tests.rs

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use learnhub::{
    client::{AuthSession, ClientError, HttpPracticeClient, PracticeApi},
    models::{
        practice::{Difficulty, SubmitRequest, SubmittedAnswer},
        user::Role,
    },
};
use serde_json::json;

/// Requests the stub has seen, as "METHOD path".
type Seen = Arc<Mutex<Vec<String>>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some("Bearer stub-token")
}

fn attempt_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": 1,
        "course_id": 3,
        "difficulty": "medium",
        "questions": [
            { "id": 10, "text": "Q1", "options": ["A", "B"] },
            { "id": 11, "text": "Q2", "options": ["A", "B"] }
        ],
        "time_limit": 120,
        "time_remaining": null,
        "is_completed": false,
        "correct_answers": null,
        "answers": [],
        "created_at": "2024-05-01T10:00:00Z",
        "started_at": null,
        "completed_at": null
    })
}

async fn get_attempt(State(seen): State<Seen>, headers: HeaderMap, Path(id): Path<i64>) -> impl IntoResponse {
    seen.lock().unwrap().push(format!("GET /api/practice/{}", id));
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Invalid token" })));
    }
    if id == 404 {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Practice attempt not found" })),
        );
    }
    (StatusCode::OK, Json(attempt_json(id)))
}

async fn start_attempt(State(seen): State<Seen>, Path(id): Path<i64>) -> impl IntoResponse {
    seen.lock().unwrap().push(format!("POST /api/practice/{}", id));
    Json(json!({ "attempt": attempt_json(id), "time_remaining": 95 }))
}

async fn update_time(
    State(seen): State<Seen>,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    seen.lock()
        .unwrap()
        .push(format!("POST /api/practice/{}/time {}", id, body["time_remaining"]));
    Json(json!({ "time_remaining": body["time_remaining"] }))
}

async fn submit(
    State(seen): State<Seen>,
    Path(id): Path<i64>,
    Json(body): Json<SubmitRequest>,
) -> impl IntoResponse {
    seen.lock()
        .unwrap()
        .push(format!("POST /api/practice/{}/submit {}", id, body.answers.len()));
    let correct = body.answers.iter().filter(|a| a.selected == "A").count() as i32;
    Json(json!({ "correct_answers": correct, "total_questions": 2, "score": correct * 50 }))
}

async fn generate(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    assert_eq!(body["difficulty"], "hard");
    assert_eq!(body["question_count"], 2);
    (StatusCode::CREATED, Json(attempt_json(77)))
}

/// History wrapped in an envelope instead of a bare array.
async fn enveloped_history() -> impl IntoResponse {
    Json(json!({ "data": [] }))
}

async fn enrolled_courses() -> impl IntoResponse {
    Json(json!([
        { "course_id": 3, "title": "Databases", "visibility": "public", "semester_id": 1, "enrolled_at": null }
    ]))
}

async fn spawn_stub() -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(vec![]));
    let app = Router::new()
        .route("/api/enrollments", get(enrolled_courses))
        .route("/api/practice", get(enveloped_history))
        .route("/api/practice/generate", post(generate))
        .route("/api/practice/{id}", get(get_attempt).post(start_attempt))
        .route("/api/practice/{id}/time", post(update_time))
        .route("/api/practice/{id}/submit", post(submit))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), seen)
}

fn client_for(address: &str, token: &str) -> HttpPracticeClient {
    HttpPracticeClient::new(AuthSession::new(address, token, 1, Role::Student).unwrap())
}

#[tokio::test]
async fn fetch_and_start_decode_typed_contracts() {
    let (address, seen) = spawn_stub().await;
    let client = client_for(&address, "stub-token");

    let attempt = client.fetch_attempt(5).await.unwrap();
    assert_eq!(attempt.id, 5);
    assert_eq!(attempt.difficulty, Difficulty::Medium);
    assert_eq!(attempt.questions.len(), 2);
    assert_eq!(attempt.time_remaining, None);

    let started = client.start_attempt(5).await.unwrap();
    assert_eq!(started.time_remaining, 95);

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["GET /api/practice/5".to_string(), "POST /api/practice/5".to_string()]
    );
}

#[tokio::test]
async fn error_body_becomes_status_error() {
    let (address, _seen) = spawn_stub().await;

    let err = client_for(&address, "stub-token").fetch_attempt(404).await.unwrap_err();
    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Practice attempt not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = client_for(&address, "wrong").fetch_attempt(1).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 401, .. }));
}

#[tokio::test]
async fn submit_sends_each_call_once() {
    let (address, seen) = spawn_stub().await;
    let client = client_for(&address, "stub-token");

    let stored = client.update_remaining_time(5, 60).await.unwrap();
    assert_eq!(stored, 60);

    let result = client
        .submit_attempt(
            5,
            vec![
                SubmittedAnswer {
                    question_id: 10,
                    selected: "A".to_string(),
                },
                SubmittedAnswer {
                    question_id: 11,
                    selected: "B".to_string(),
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(result.correct_answers, 1);
    assert_eq!(result.score, 50);

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "POST /api/practice/5/time 60".to_string(),
            "POST /api/practice/5/submit 2".to_string()
        ]
    );
}

#[tokio::test]
async fn generate_and_list_enrolled() {
    let (address, _seen) = spawn_stub().await;
    let client = client_for(&address, "stub-token");

    let attempt = client.generate_attempt(3, Difficulty::Hard, 2).await.unwrap();
    assert_eq!(attempt.id, 77);

    let courses = client.list_enrolled_courses().await.unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].title, "Databases");
}

#[tokio::test]
async fn envelope_instead_of_array_is_rejected() {
    let (address, _seen) = spawn_stub().await;

    let err = client_for(&address, "stub-token").list_history().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn unreachable_server_is_transport_error() {
    let client = client_for("http://127.0.0.1:1", "stub-token");
    let err = client.fetch_attempt(1).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}
