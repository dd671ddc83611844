// src/client/mod.rs

//! Client side of the practice flow: a typed HTTP client for the practice
//! endpoints and the controller that runs one timed attempt on top of it.

pub mod api;
pub mod controller;
pub mod error;
pub mod session;

pub use api::{AuthSession, HttpPracticeClient, PracticeApi};
pub use controller::{SessionController, SessionEvent, SessionSnapshot};
pub use error::{ClientError, SessionError};
pub use session::{ExitDecision, PracticeSession, SessionPhase, SubmitStep, Tick};
