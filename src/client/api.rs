// src/client/api.rs

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use crate::{
    client::error::ClientError,
    models::{
        enrollment::EnrolledCourse,
        practice::{
            AttemptView, Difficulty, GenerateRequest, HistoryEntry, StartResponse, SubmitRequest,
            SubmitResponse, SubmittedAnswer, TimeUpdateRequest,
        },
        user::{LoginResponse, Role},
    },
};

/// Authenticated client-side session: where the API lives and who is calling.
/// Replaces any ambient token storage; pass it explicitly to API clients.
#[derive(Debug, Clone)]
pub struct AuthSession {
    base_url: Url,
    token: String,
    pub user_id: i64,
    pub role: Role,
}

impl AuthSession {
    pub fn new(base_url: &str, token: impl Into<String>, user_id: i64, role: Role) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: normalize_base(base_url)?,
            token: token.into(),
            user_id,
            role,
        })
    }

    /// Logs in with username and password and returns the resulting session.
    pub async fn login(base_url: &str, username: &str, password: &str) -> Result<Self, ClientError> {
        let base = normalize_base(base_url)?;
        let response = Client::new()
            .post(base.join("api/auth/login")?)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        let login: LoginResponse = decode(response).await?;

        Ok(Self {
            base_url: base,
            token: login.token,
            user_id: login.user_id,
            role: login.role,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }
}

/// `Url::join` drops the last path segment unless the base ends with '/'.
fn normalize_base(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct TimeSyncAck {
    time_remaining: i32,
}

/// Turns a response into the typed contract `T`, or a `ClientError`.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|body| body.error)
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Request/response operations used by the practice screens.
///
/// Each call is exactly one request. There are no retries, no caching and no
/// batching; errors go straight back to the caller.
#[async_trait]
pub trait PracticeApi: Send + Sync {
    async fn list_enrolled_courses(&self) -> Result<Vec<EnrolledCourse>, ClientError>;

    async fn generate_attempt(
        &self,
        course_id: i64,
        difficulty: Difficulty,
        question_count: i64,
    ) -> Result<AttemptView, ClientError>;

    async fn fetch_attempt(&self, id: i64) -> Result<AttemptView, ClientError>;

    /// Starts or resumes an attempt; returns its state and remaining time.
    async fn start_attempt(&self, id: i64) -> Result<StartResponse, ClientError>;

    /// Reports remaining seconds; returns what the server stored.
    async fn update_remaining_time(&self, id: i64, seconds: u32) -> Result<i32, ClientError>;

    async fn submit_attempt(
        &self,
        id: i64,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<SubmitResponse, ClientError>;

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ClientError>;
}

/// `PracticeApi` over HTTP with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpPracticeClient {
    http: Client,
    session: AuthSession,
}

impl HttpPracticeClient {
    pub fn new(session: AuthSession) -> Self {
        Self {
            http: Client::new(),
            session,
        }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.bearer_auth(&self.session.token).send().await?;
        decode(response).await
    }

    fn get(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.get(self.session.endpoint(path)?))
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.http.post(self.session.endpoint(path)?))
    }
}

#[async_trait]
impl PracticeApi for HttpPracticeClient {
    async fn list_enrolled_courses(&self) -> Result<Vec<EnrolledCourse>, ClientError> {
        self.send(self.get("api/enrollments")?).await
    }

    async fn generate_attempt(
        &self,
        course_id: i64,
        difficulty: Difficulty,
        question_count: i64,
    ) -> Result<AttemptView, ClientError> {
        let body = GenerateRequest {
            course_id,
            difficulty,
            question_count: Some(question_count),
        };
        self.send(self.post("api/practice/generate")?.json(&body)).await
    }

    async fn fetch_attempt(&self, id: i64) -> Result<AttemptView, ClientError> {
        self.send(self.get(&format!("api/practice/{}", id))?).await
    }

    async fn start_attempt(&self, id: i64) -> Result<StartResponse, ClientError> {
        self.send(self.post(&format!("api/practice/{}", id))?).await
    }

    async fn update_remaining_time(&self, id: i64, seconds: u32) -> Result<i32, ClientError> {
        let body = TimeUpdateRequest {
            time_remaining: seconds.min(i32::MAX as u32) as i32,
        };
        let ack: TimeSyncAck = self
            .send(self.post(&format!("api/practice/{}/time", id))?.json(&body))
            .await?;
        Ok(ack.time_remaining)
    }

    async fn submit_attempt(
        &self,
        id: i64,
        answers: Vec<SubmittedAnswer>,
    ) -> Result<SubmitResponse, ClientError> {
        let body = SubmitRequest { answers };
        self.send(self.post(&format!("api/practice/{}/submit", id))?.json(&body))
            .await
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
        self.send(self.get("api/practice")?).await
    }
}
