// src/client/controller.rs

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::task::JoinHandle;

use crate::{
    client::{
        api::PracticeApi,
        error::SessionError,
        session::{ExitDecision, PracticeSession, SessionPhase, SubmitStep, Tick},
    },
    models::practice::SubmitResponse,
};

/// Notifications for whatever renders the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Tick { remaining: u32 },
    TimeSynced { remaining: u32 },
    SyncFailed { message: String },
    Completed { correct: u32, total: u32, score: u32 },
    SubmitFailed { message: String },
}

/// Read-only copy of the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub attempt_id: i64,
    pub remaining: u32,
    pub phase: SessionPhase,
    pub answers: Vec<Option<usize>>,
}

/// Shared pieces the countdown task and the controller both need.
#[derive(Clone)]
struct Shared {
    api: Arc<dyn PracticeApi>,
    session: Arc<Mutex<PracticeSession>>,
    events: UnboundedSender<SessionEvent>,
}

impl Shared {
    /// The lock is never held across an await point.
    fn lock(&self) -> MutexGuard<'_, PracticeSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver only means nobody is watching.
        let _ = self.events.send(event);
    }

    /// Sends a prepared payload and applies the outcome to the session.
    async fn submit(&self, step: SubmitStep) -> Result<Option<SubmitResponse>, SessionError> {
        let payload = match step {
            SubmitStep::Ready(payload) => payload,
            SubmitStep::NeedsConfirmation { .. } | SubmitStep::Ignored => return Ok(None),
        };
        let attempt_id = self.lock().attempt_id();

        match self.api.submit_attempt(attempt_id, payload).await {
            Ok(result) => {
                let phase = {
                    let mut session = self.lock();
                    session.complete(result);
                    session.phase().clone()
                };
                if let SessionPhase::Completed { correct, total, score } = phase {
                    tracing::info!(attempt_id, correct, total, score, "Practice attempt completed");
                    self.emit(SessionEvent::Completed { correct, total, score });
                }
                Ok(Some(result))
            }
            Err(e) => {
                tracing::warn!(attempt_id, "Practice submission failed: {}", e);
                self.lock().fail(e.to_string());
                self.emit(SessionEvent::SubmitFailed {
                    message: e.to_string(),
                });
                Err(SessionError::Client(e))
            }
        }
    }

    /// Reports remaining time without blocking the countdown. Failures are logged only.
    fn spawn_sync(&self, remaining: u32) {
        let shared = self.clone();
        let attempt_id = self.lock().attempt_id();
        tokio::spawn(async move {
            match shared.api.update_remaining_time(attempt_id, remaining).await {
                Ok(_) => shared.emit(SessionEvent::TimeSynced { remaining }),
                Err(e) => {
                    tracing::warn!(attempt_id, remaining, "Time sync failed: {}", e);
                    shared.emit(SessionEvent::SyncFailed {
                        message: e.to_string(),
                    });
                }
            }
        });
    }
}

/// One tick per `period` until the session completes or the time runs out.
async fn run_countdown(shared: Shared, period: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    loop {
        interval.tick().await;
        let tick = shared.lock().tick();

        match tick {
            Tick::Running { remaining } => shared.emit(SessionEvent::Tick { remaining }),
            Tick::SyncDue { remaining } => {
                shared.emit(SessionEvent::Tick { remaining });
                shared.spawn_sync(remaining);
            }
            Tick::Expired => {
                shared.emit(SessionEvent::Tick { remaining: 0 });
                let step = shared.lock().auto_submit();
                // Errors are already logged and surfaced as events.
                let _ = shared.submit(step).await;
                break;
            }
            Tick::Idle => {}
            Tick::Stopped => break,
        }
    }
}

/// Drives one practice attempt from load to completion.
///
/// Dropping the controller aborts the countdown; server state is untouched.
pub struct SessionController {
    shared: Shared,
    countdown: Option<JoinHandle<()>>,
}

impl SessionController {
    /// Loads an attempt with a one-second countdown.
    pub async fn load(
        api: Arc<dyn PracticeApi>,
        attempt_id: i64,
    ) -> Result<(Self, UnboundedReceiver<SessionEvent>), SessionError> {
        Self::load_with_period(api, attempt_id, Duration::from_secs(1)).await
    }

    /// Completed attempts are shown as stored and never start a timer.
    /// Open attempts are started (or resumed) and the countdown begins.
    pub async fn load_with_period(
        api: Arc<dyn PracticeApi>,
        attempt_id: i64,
        period: Duration,
    ) -> Result<(Self, UnboundedReceiver<SessionEvent>), SessionError> {
        let attempt = api.fetch_attempt(attempt_id).await?;

        let session = if attempt.is_completed {
            PracticeSession::from_attempt(attempt)
        } else {
            PracticeSession::from_start(api.start_attempt(attempt_id).await?)
        };
        let timed = session.timer_running();

        let (events, receiver) = unbounded_channel();
        let shared = Shared {
            api,
            session: Arc::new(Mutex::new(session)),
            events,
        };

        let countdown = timed.then(|| tokio::spawn(run_countdown(shared.clone(), period)));
        tracing::debug!(attempt_id, timed, "Practice session loaded");

        Ok((Self { shared, countdown }, receiver))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.shared.lock();
        SessionSnapshot {
            attempt_id: session.attempt_id(),
            remaining: session.remaining(),
            phase: session.phase().clone(),
            answers: session.answers().to_vec(),
        }
    }

    pub fn has_timer(&self) -> bool {
        self.countdown.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn select_answer(&self, question: usize, option: usize) -> Result<(), SessionError> {
        self.shared.lock().select_answer(question, option)
    }

    pub fn clear_answer(&self, question: usize) -> Result<(), SessionError> {
        self.shared.lock().clear_answer(question)
    }

    /// First phase of a manual submit.
    pub fn request_submit(&self) -> SubmitStep {
        self.shared.lock().request_submit()
    }

    pub fn cancel_submit(&self) {
        self.shared.lock().cancel_submit()
    }

    /// Second phase of a manual submit. Returns `Ok(None)` when another
    /// submission is already in flight or done.
    pub async fn confirm_submit(&self) -> Result<Option<SubmitResponse>, SessionError> {
        let step = self.shared.lock().confirm_submit()?;
        self.shared.submit(step).await
    }

    pub fn exit(&self) -> ExitDecision {
        self.shared.lock().exit()
    }

    /// Stops the countdown. Used when the view is torn down.
    pub fn stop(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::error::ClientError,
        models::{
            enrollment::EnrolledCourse,
            practice::{AttemptQuestion, AttemptView, Difficulty, HistoryEntry, StartResponse, SubmittedAnswer},
        },
        utils::score::percentage,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory stand-in for the server side of one attempt.
    struct FakeApi {
        attempt: Mutex<AttemptView>,
        start_calls: AtomicUsize,
        submit_calls: AtomicUsize,
        syncs: Mutex<Vec<u32>>,
        fail_submit: AtomicBool,
        submit_delay: Duration,
    }

    impl FakeApi {
        fn new(questions: usize, time_limit: i32) -> Arc<Self> {
            Arc::new(Self {
                attempt: Mutex::new(AttemptView {
                    id: 1,
                    user_id: 1,
                    course_id: 1,
                    difficulty: Difficulty::Easy,
                    questions: (1..=questions as i64)
                        .map(|id| AttemptQuestion {
                            id,
                            text: format!("Q{}", id),
                            options: vec!["A".to_string(), "B".to_string()],
                            correct_answer: None,
                        })
                        .collect(),
                    time_limit: Some(time_limit),
                    time_remaining: None,
                    is_completed: false,
                    correct_answers: None,
                    answers: vec![],
                    created_at: None,
                    started_at: None,
                    completed_at: None,
                }),
                start_calls: AtomicUsize::new(0),
                submit_calls: AtomicUsize::new(0),
                syncs: Mutex::new(vec![]),
                fail_submit: AtomicBool::new(false),
                submit_delay: Duration::from_millis(500),
            })
        }
    }

    #[async_trait]
    impl PracticeApi for FakeApi {
        async fn list_enrolled_courses(&self) -> Result<Vec<EnrolledCourse>, ClientError> {
            Ok(vec![])
        }

        async fn generate_attempt(
            &self,
            _course_id: i64,
            _difficulty: Difficulty,
            _question_count: i64,
        ) -> Result<AttemptView, ClientError> {
            Ok(self.attempt.lock().unwrap().clone())
        }

        async fn fetch_attempt(&self, _id: i64) -> Result<AttemptView, ClientError> {
            Ok(self.attempt.lock().unwrap().clone())
        }

        async fn start_attempt(&self, _id: i64) -> Result<StartResponse, ClientError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            let mut attempt = self.attempt.lock().unwrap();
            let remaining = attempt.time_remaining.or(attempt.time_limit).unwrap_or(0);
            attempt.time_remaining = Some(remaining);
            Ok(StartResponse {
                attempt: attempt.clone(),
                time_remaining: remaining,
            })
        }

        async fn update_remaining_time(&self, _id: i64, seconds: u32) -> Result<i32, ClientError> {
            self.syncs.lock().unwrap().push(seconds);
            let mut attempt = self.attempt.lock().unwrap();
            let stored = attempt.time_remaining.unwrap_or(i32::MAX).min(seconds as i32);
            attempt.time_remaining = Some(stored);
            Ok(stored)
        }

        async fn submit_attempt(
            &self,
            _id: i64,
            answers: Vec<SubmittedAnswer>,
        ) -> Result<SubmitResponse, ClientError> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.submit_delay).await;
            if self.fail_submit.load(Ordering::SeqCst) {
                return Err(ClientError::Status {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            let mut attempt = self.attempt.lock().unwrap();
            let correct = answers.iter().filter(|a| a.selected == "A").count();
            let total = attempt.questions.len();
            attempt.is_completed = true;
            attempt.correct_answers = Some(correct as i32);
            attempt.answers = answers;
            Ok(SubmitResponse {
                correct_answers: correct as i32,
                total_questions: total as i32,
                score: percentage(correct, total),
            })
        }

        async fn list_history(&self) -> Result<Vec<HistoryEntry>, ClientError> {
            Ok(vec![])
        }
    }

    fn drain(receiver: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = vec![];
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_reaches_zero_and_submits_once() {
        let api = FakeApi::new(2, 5);
        let (controller, mut events) = SessionController::load(api.clone(), 1).await.unwrap();
        controller.select_answer(0, 0).unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        let ticks: Vec<u32> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::Tick { remaining } => Some(remaining),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![4, 3, 2, 1, 0]);
        assert_eq!(api.submit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            controller.snapshot().phase,
            SessionPhase::Completed {
                correct: 1,
                total: 2,
                score: 50
            }
        );
        assert!(!controller.has_timer());
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_is_synced_every_thirty_seconds() {
        let api = FakeApi::new(2, 120);
        let (_controller, _events) = SessionController::load(api.clone(), 1).await.unwrap();

        tokio::time::sleep(Duration::from_millis(61_500)).await;

        assert_eq!(*api.syncs.lock().unwrap(), vec![90, 60]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_attempt_never_starts_timer() {
        let api = FakeApi::new(5, 300);
        {
            let mut attempt = api.attempt.lock().unwrap();
            attempt.is_completed = true;
            attempt.correct_answers = Some(4);
            attempt.time_remaining = Some(200);
        }

        let (controller, mut events) = SessionController::load(api.clone(), 1).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(!controller.has_timer());
        assert_eq!(api.start_calls.load(Ordering::SeqCst), 0);
        assert!(drain(&mut events).is_empty());
        assert_eq!(controller.snapshot().remaining, 200);
        assert_eq!(
            controller.snapshot().phase,
            SessionPhase::Completed {
                correct: 4,
                total: 5,
                score: 80
            }
        );
        assert_eq!(controller.exit(), ExitDecision::Leave);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_while_in_flight_is_noop() {
        let api = FakeApi::new(3, 600);
        let (controller, _events) = SessionController::load(api.clone(), 1).await.unwrap();
        controller.select_answer(1, 0).unwrap();
        assert_eq!(
            controller.request_submit(),
            SubmitStep::NeedsConfirmation { unanswered: 2 }
        );

        let (first, second) = tokio::join!(controller.confirm_submit(), async {
            tokio::task::yield_now().await;
            assert_eq!(controller.request_submit(), SubmitStep::Ignored);
            controller.confirm_submit().await
        });

        assert_eq!(first.unwrap().map(|r| r.correct_answers), Some(1));
        assert!(second.unwrap().is_none());
        assert_eq!(api.submit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_submit_allows_manual_retry() {
        let api = FakeApi::new(2, 600);
        api.fail_submit.store(true, Ordering::SeqCst);
        let (controller, mut events) = SessionController::load(api.clone(), 1).await.unwrap();

        controller.request_submit();
        assert!(controller.confirm_submit().await.is_err());
        assert!(matches!(controller.snapshot().phase, SessionPhase::Failed { .. }));
        assert!(drain(&mut events)
            .iter()
            .any(|e| matches!(e, SessionEvent::SubmitFailed { .. })));

        api.fail_submit.store(false, Ordering::SeqCst);
        controller.request_submit();
        let result = controller.confirm_submit().await.unwrap();
        assert!(result.is_some());
        assert_eq!(api.submit_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exit_and_resume_keeps_synced_time() {
        let api = FakeApi::new(2, 100);
        let (controller, _events) = SessionController::load(api.clone(), 1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(31_500)).await;

        assert_eq!(controller.exit(), ExitDecision::ConfirmLeave);
        drop(controller);
        assert!(!api.attempt.lock().unwrap().is_completed);

        let (resumed, _events) = SessionController::load(api.clone(), 1).await.unwrap();
        assert_eq!(resumed.snapshot().remaining, 70);
        assert_eq!(resumed.snapshot().phase, SessionPhase::InProgress);
        assert_eq!(api.submit_calls.load(Ordering::SeqCst), 0);
    }
}
