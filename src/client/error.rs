// src/client/error.rs

use std::fmt;

/// Failure of a single practice API call.
#[derive(Debug)]
pub enum ClientError {
    /// Connection, TLS or timeout failure.
    Transport(reqwest::Error),

    /// The server answered with a non-2xx status.
    Status { status: u16, message: String },

    /// The body did not match the expected response contract.
    Decode(String),

    InvalidUrl(url::ParseError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "request failed: {}", e),
            ClientError::Status { status, message } => write!(f, "server returned {}: {}", status, message),
            ClientError::Decode(msg) => write!(f, "unexpected response: {}", msg),
            ClientError::InvalidUrl(e) => write!(f, "invalid url: {}", e),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err)
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err)
    }
}

/// Errors raised by the practice session controller.
#[derive(Debug)]
pub enum SessionError {
    Client(ClientError),
    AlreadyCompleted,
    SubmissionInFlight,
    NotConfirming,
    QuestionOutOfRange(usize),
    OptionOutOfRange { question: usize, option: usize },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Client(e) => write!(f, "{}", e),
            SessionError::AlreadyCompleted => write!(f, "attempt is already completed"),
            SessionError::SubmissionInFlight => write!(f, "a submission is in progress"),
            SessionError::NotConfirming => write!(f, "submission was not requested"),
            SessionError::QuestionOutOfRange(index) => write!(f, "no question at index {}", index),
            SessionError::OptionOutOfRange { question, option } => {
                write!(f, "question {} has no option {}", question, option)
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        SessionError::Client(err)
    }
}
