// src/client/session.rs

//! State machine for one timed practice attempt.
//!
//! Phases:
//!
//! ```text
//! InProgress --request--> Confirming --confirm--> Submitting --ok--> Completed
//!     ^                       |                       |
//!     +-------cancel----------+                       +--err--> Failed
//!
//! InProgress | Confirming | Failed --timeout--> Submitting
//! ```
//!
//! `Failed` behaves like `InProgress` for answering and submitting, so the
//! user can retry by hand. Nothing here performs I/O; the async driver lives
//! in `client::controller`.

use crate::{
    client::error::SessionError,
    config::{SECONDS_PER_QUESTION, TIME_SYNC_INTERVAL_SECS},
    models::practice::{AttemptQuestion, AttemptView, StartResponse, SubmitResponse, SubmittedAnswer},
    utils::score::percentage,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    InProgress,
    Confirming { unanswered: usize },
    Submitting { auto: bool },
    Completed { correct: u32, total: u32, score: u32 },
    Failed { message: String },
}

/// Result of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining: u32 },
    /// Like `Running`, and the remaining time should be reported to the server.
    SyncDue { remaining: u32 },
    /// The countdown just reached zero. Returned once per attempt.
    Expired,
    /// Countdown paused while a submission is in flight.
    Idle,
    /// Completed or expired; the timer should stop.
    Stopped,
}

/// What a submit request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStep {
    /// Ask the user to confirm; `unanswered` drives the warning.
    NeedsConfirmation { unanswered: usize },
    /// Send this payload. The session is already in `Submitting`.
    Ready(Vec<SubmittedAnswer>),
    /// A submission is in flight or done; do nothing.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// Completed attempts can be left immediately.
    Leave,
    /// Ask before leaving. Progress is kept server side.
    ConfirmLeave,
}

#[derive(Debug, Clone)]
pub struct PracticeSession {
    attempt_id: i64,
    questions: Vec<AttemptQuestion>,
    answers: Vec<Option<usize>>,
    remaining: u32,
    ticks_since_sync: u32,
    expired: bool,
    phase: SessionPhase,
}

/// Remaining time for an attempt that has not been started through the API.
fn fallback_remaining(view: &AttemptView) -> u32 {
    view.time_remaining
        .or(view.time_limit)
        .map(|secs| secs.max(0) as u32)
        .unwrap_or(SECONDS_PER_QUESTION as u32 * view.questions.len() as u32)
}

impl PracticeSession {
    /// Builds a session from a fetched attempt.
    ///
    /// Completed attempts get their stored answers mapped back to option
    /// indexes by text and their stored score; the timer never runs for them.
    pub fn from_attempt(view: AttemptView) -> Self {
        if view.is_completed {
            let answers = view
                .questions
                .iter()
                .map(|q| {
                    view.answers
                        .iter()
                        .find(|a| a.question_id == q.id)
                        .and_then(|a| q.options.iter().position(|opt| *opt == a.selected))
                })
                .collect();
            let total = view.questions.len() as u32;
            let correct = view.correct_answers.unwrap_or(0).max(0) as u32;

            return Self {
                attempt_id: view.id,
                remaining: view.time_remaining.unwrap_or(0).max(0) as u32,
                questions: view.questions,
                answers,
                ticks_since_sync: 0,
                expired: false,
                phase: SessionPhase::Completed {
                    correct,
                    total,
                    score: percentage(correct as usize, total as usize),
                },
            };
        }

        let remaining = fallback_remaining(&view);
        Self {
            attempt_id: view.id,
            answers: vec![None; view.questions.len()],
            questions: view.questions,
            remaining,
            ticks_since_sync: 0,
            expired: false,
            phase: SessionPhase::InProgress,
        }
    }

    /// Builds a session from the start/resume call, trusting its remaining time.
    pub fn from_start(start: StartResponse) -> Self {
        let mut attempt = start.attempt;
        if !attempt.is_completed {
            attempt.time_remaining = Some(start.time_remaining);
        }
        Self::from_attempt(attempt)
    }

    pub fn attempt_id(&self) -> i64 {
        self.attempt_id
    }

    pub fn questions(&self) -> &[AttemptQuestion] {
        &self.questions
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.phase, SessionPhase::Completed { .. })
    }

    pub fn score(&self) -> Option<u32> {
        match self.phase {
            SessionPhase::Completed { score, .. } => Some(score),
            _ => None,
        }
    }

    pub fn unanswered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_none()).count()
    }

    /// Whether the countdown should be running at all.
    pub fn timer_running(&self) -> bool {
        !self.expired && !self.is_completed()
    }

    fn ensure_editable(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Completed { .. } => Err(SessionError::AlreadyCompleted),
            SessionPhase::Submitting { .. } => Err(SessionError::SubmissionInFlight),
            _ => Ok(()),
        }
    }

    /// Records `option` for `question`, replacing any earlier choice.
    pub fn select_answer(&mut self, question: usize, option: usize) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let options = self
            .questions
            .get(question)
            .ok_or(SessionError::QuestionOutOfRange(question))?
            .options
            .len();
        if option >= options {
            return Err(SessionError::OptionOutOfRange { question, option });
        }

        self.answers[question] = Some(option);
        self.refresh_confirmation();
        Ok(())
    }

    pub fn clear_answer(&mut self, question: usize) -> Result<(), SessionError> {
        self.ensure_editable()?;
        let slot = self
            .answers
            .get_mut(question)
            .ok_or(SessionError::QuestionOutOfRange(question))?;
        *slot = None;
        self.refresh_confirmation();
        Ok(())
    }

    fn refresh_confirmation(&mut self) {
        if let SessionPhase::Confirming { .. } = self.phase {
            self.phase = SessionPhase::Confirming {
                unanswered: self.unanswered_count(),
            };
        }
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self) -> Tick {
        if !self.timer_running() {
            return Tick::Stopped;
        }
        if let SessionPhase::Submitting { .. } = self.phase {
            return Tick::Idle;
        }
        if let SessionPhase::Failed { .. } = self.phase {
            if self.remaining == 0 {
                return Tick::Idle;
            }
        }

        self.remaining = self.remaining.saturating_sub(1);
        self.ticks_since_sync += 1;

        if self.remaining == 0 {
            self.expired = true;
            return Tick::Expired;
        }
        if self.ticks_since_sync >= TIME_SYNC_INTERVAL_SECS {
            self.ticks_since_sync = 0;
            return Tick::SyncDue {
                remaining: self.remaining,
            };
        }
        Tick::Running {
            remaining: self.remaining,
        }
    }

    /// Manual submit: first call asks for confirmation.
    pub fn request_submit(&mut self) -> SubmitStep {
        match self.phase {
            SessionPhase::Submitting { .. } | SessionPhase::Completed { .. } => SubmitStep::Ignored,
            _ => {
                let unanswered = self.unanswered_count();
                self.phase = SessionPhase::Confirming { unanswered };
                SubmitStep::NeedsConfirmation { unanswered }
            }
        }
    }

    pub fn cancel_submit(&mut self) {
        if let SessionPhase::Confirming { .. } = self.phase {
            self.phase = SessionPhase::InProgress;
        }
    }

    /// Confirms a pending manual submission.
    pub fn confirm_submit(&mut self) -> Result<SubmitStep, SessionError> {
        match self.phase {
            SessionPhase::Confirming { .. } => Ok(self.begin_submission(false)),
            SessionPhase::Submitting { .. } | SessionPhase::Completed { .. } => Ok(SubmitStep::Ignored),
            _ => Err(SessionError::NotConfirming),
        }
    }

    /// Timeout path: skips confirmation.
    pub fn auto_submit(&mut self) -> SubmitStep {
        match self.phase {
            SessionPhase::Submitting { .. } | SessionPhase::Completed { .. } => SubmitStep::Ignored,
            _ => self.begin_submission(true),
        }
    }

    fn begin_submission(&mut self, auto: bool) -> SubmitStep {
        self.phase = SessionPhase::Submitting { auto };
        SubmitStep::Ready(self.payload())
    }

    /// Selected options as (question id, option text); unset answers are dropped.
    pub fn payload(&self) -> Vec<SubmittedAnswer> {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter_map(|(q, answer)| {
                answer.and_then(|idx| q.options.get(idx)).map(|selected| SubmittedAnswer {
                    question_id: q.id,
                    selected: selected.clone(),
                })
            })
            .collect()
    }

    /// Applies a successful submission. Score is recomputed from the
    /// returned correct count over this session's question count.
    pub fn complete(&mut self, result: SubmitResponse) {
        let total = self.questions.len() as u32;
        let correct = result.correct_answers.max(0) as u32;
        self.phase = SessionPhase::Completed {
            correct,
            total,
            score: percentage(correct as usize, total as usize),
        };
    }

    /// Applies a failed submission; the attempt stays open for a manual retry.
    pub fn fail(&mut self, message: impl Into<String>) {
        if let SessionPhase::Submitting { .. } = self.phase {
            self.phase = SessionPhase::Failed {
                message: message.into(),
            };
        }
    }

    pub fn exit(&self) -> ExitDecision {
        if self.is_completed() {
            ExitDecision::Leave
        } else {
            ExitDecision::ConfirmLeave
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::practice::Difficulty;

    fn question(id: i64) -> AttemptQuestion {
        AttemptQuestion {
            id,
            text: format!("Question {}", id),
            options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            correct_answer: None,
        }
    }

    fn attempt(questions: usize, time_limit: Option<i32>, time_remaining: Option<i32>) -> AttemptView {
        AttemptView {
            id: 9,
            user_id: 1,
            course_id: 2,
            difficulty: Difficulty::Medium,
            questions: (1..=questions as i64).map(question).collect(),
            time_limit,
            time_remaining,
            is_completed: false,
            correct_answers: None,
            answers: vec![],
            created_at: None,
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_remaining_prefers_time_remaining() {
        assert_eq!(PracticeSession::from_attempt(attempt(3, Some(180), Some(42))).remaining(), 42);
        assert_eq!(PracticeSession::from_attempt(attempt(3, Some(180), None)).remaining(), 180);
        assert_eq!(PracticeSession::from_attempt(attempt(3, None, None)).remaining(), 180);
    }

    #[test]
    fn test_countdown_decrements_to_zero_and_expires_once() {
        let mut session = PracticeSession::from_attempt(attempt(1, Some(3), None));
        assert_eq!(session.tick(), Tick::Running { remaining: 2 });
        assert_eq!(session.tick(), Tick::Running { remaining: 1 });
        assert_eq!(session.tick(), Tick::Expired);
        assert_eq!(session.tick(), Tick::Stopped);
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn test_sync_every_thirty_ticks() {
        let mut session = PracticeSession::from_attempt(attempt(2, Some(120), None));
        let syncs: Vec<u32> = (0..70)
            .filter_map(|_| match session.tick() {
                Tick::SyncDue { remaining } => Some(remaining),
                _ => None,
            })
            .collect();
        assert_eq!(syncs, vec![90, 60]);
    }

    #[test]
    fn test_payload_drops_unanswered() {
        let mut session = PracticeSession::from_attempt(attempt(4, Some(240), None));
        session.select_answer(0, 1).unwrap();
        session.select_answer(2, 0).unwrap();

        assert_eq!(
            session.payload(),
            vec![
                SubmittedAnswer {
                    question_id: 1,
                    selected: "B".to_string()
                },
                SubmittedAnswer {
                    question_id: 3,
                    selected: "A".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_answer_overwrites() {
        let mut session = PracticeSession::from_attempt(attempt(1, Some(60), None));
        session.select_answer(0, 0).unwrap();
        session.select_answer(0, 2).unwrap();
        assert_eq!(session.answers(), &[Some(2)]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut session = PracticeSession::from_attempt(attempt(1, Some(60), None));
        assert!(matches!(session.select_answer(5, 0), Err(SessionError::QuestionOutOfRange(5))));
        assert!(matches!(
            session.select_answer(0, 3),
            Err(SessionError::OptionOutOfRange { question: 0, option: 3 })
        ));
    }

    #[test]
    fn test_two_phase_submit() {
        let mut session = PracticeSession::from_attempt(attempt(3, Some(60), None));
        session.select_answer(0, 0).unwrap();

        assert_eq!(session.request_submit(), SubmitStep::NeedsConfirmation { unanswered: 2 });
        session.select_answer(1, 0).unwrap();
        assert_eq!(session.phase(), &SessionPhase::Confirming { unanswered: 1 });

        let step = session.confirm_submit().unwrap();
        assert!(matches!(step, SubmitStep::Ready(ref p) if p.len() == 2));
        assert_eq!(session.phase(), &SessionPhase::Submitting { auto: false });

        // Second submit while in flight is a no-op.
        assert_eq!(session.request_submit(), SubmitStep::Ignored);
        assert_eq!(session.confirm_submit().unwrap(), SubmitStep::Ignored);
        assert_eq!(session.auto_submit(), SubmitStep::Ignored);
        assert!(matches!(session.select_answer(2, 0), Err(SessionError::SubmissionInFlight)));
    }

    #[test]
    fn test_confirm_without_request() {
        let mut session = PracticeSession::from_attempt(attempt(1, Some(60), None));
        assert!(matches!(session.confirm_submit(), Err(SessionError::NotConfirming)));
    }

    #[test]
    fn test_cancel_returns_to_in_progress() {
        let mut session = PracticeSession::from_attempt(attempt(1, Some(60), None));
        session.request_submit();
        session.cancel_submit();
        assert_eq!(session.phase(), &SessionPhase::InProgress);
    }

    #[test]
    fn test_timeout_while_confirming() {
        let mut session = PracticeSession::from_attempt(attempt(2, Some(2), None));
        session.select_answer(0, 1).unwrap();
        assert_eq!(session.request_submit(), SubmitStep::NeedsConfirmation { unanswered: 1 });

        // The clock keeps running while the dialog is open.
        assert_eq!(session.tick(), Tick::Running { remaining: 1 });
        assert_eq!(session.tick(), Tick::Expired);

        let step = session.auto_submit();
        assert_eq!(
            step,
            SubmitStep::Ready(vec![SubmittedAnswer {
                question_id: 1,
                selected: "B".to_string()
            }])
        );
        assert_eq!(session.phase(), &SessionPhase::Submitting { auto: true });

        // The user's late confirmation loses the race.
        assert_eq!(session.confirm_submit().unwrap(), SubmitStep::Ignored);
        assert_eq!(session.phase(), &SessionPhase::Submitting { auto: true });
    }

    #[test]
    fn test_complete_four_of_five_scores_eighty() {
        let mut session = PracticeSession::from_attempt(attempt(5, Some(300), None));
        session.auto_submit();
        session.complete(SubmitResponse {
            correct_answers: 4,
            total_questions: 5,
            score: 80,
        });
        assert_eq!(session.score(), Some(80));
        assert_eq!(session.tick(), Tick::Stopped);
        assert_eq!(session.exit(), ExitDecision::Leave);
    }

    #[test]
    fn test_failure_keeps_attempt_open() {
        let mut session = PracticeSession::from_attempt(attempt(2, Some(60), None));
        session.select_answer(0, 1).unwrap();
        session.request_submit();
        session.confirm_submit().unwrap();
        session.fail("server returned 500");

        assert!(matches!(session.phase(), SessionPhase::Failed { .. }));
        assert!(!session.is_completed());
        assert_eq!(session.answers(), &[Some(1), None]);
        assert_eq!(session.exit(), ExitDecision::ConfirmLeave);
        // Countdown resumes and a manual retry is possible.
        assert_eq!(session.tick(), Tick::Running { remaining: 59 });
        assert_eq!(session.request_submit(), SubmitStep::NeedsConfirmation { unanswered: 1 });
    }

    #[test]
    fn test_completed_attempt_reconstructs_answers() {
        let mut view = attempt(5, Some(300), Some(120));
        view.is_completed = true;
        view.correct_answers = Some(4);
        view.answers = vec![
            SubmittedAnswer {
                question_id: 1,
                selected: "C".to_string(),
            },
            SubmittedAnswer {
                question_id: 4,
                selected: "A".to_string(),
            },
        ];

        let mut session = PracticeSession::from_attempt(view);
        assert_eq!(session.answers(), &[Some(2), None, None, Some(0), None]);
        assert_eq!(session.score(), Some(80));
        assert!(!session.timer_running());
        assert_eq!(session.tick(), Tick::Stopped);
        assert!(matches!(session.select_answer(1, 0), Err(SessionError::AlreadyCompleted)));
    }

    #[test]
    fn test_start_response_overrides_remaining() {
        let start = StartResponse {
            attempt: attempt(2, Some(120), None),
            time_remaining: 75,
        };
        assert_eq!(PracticeSession::from_start(start).remaining(), 75);
    }
}
