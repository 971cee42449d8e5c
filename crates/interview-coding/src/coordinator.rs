//! Coding Hand-off Coordinator.
//!
//! Takes over once the voice adapter publishes a coding detection: generates the question,
//! collects the solution, has it evaluated, builds the context for the resumed call and hands
//! control back to the voice call.
//!
//! ```text
//! idle → generating_question → awaiting_solution → evaluating → built_resume_context
//!      → resuming_call → idle
//! ```
//!
//! Each detection opens a hand-off session. Closing the modal (clearing the detection) ends the
//! session; work still in flight for an ended session is discarded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use interview_core::{
    CodingEvaluation, CodingProblem, CodingQuestionDetected, CodingSubmission,
    GeneratedCodingQuestion, InterviewBackend, InterviewError, InterviewResult, ResumeContext,
    ResumeRequest, SessionStore, Timings,
};
use interview_voice::VoiceCallAdapter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Question text shown when generation failed.
pub const PLACEHOLDER_QUESTION: &str = "We couldn't prepare your coding question. Please retry.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffStage {
    #[default]
    Idle,
    GeneratingQuestion,
    AwaitingSolution,
    Evaluating,
    BuiltResumeContext,
    ResumingCall,
}

/// What the coding modal renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandoffState {
    pub stage: HandoffStage,
    pub question: Option<String>,
    pub generating_question: bool,
    pub submitting: bool,
    pub modal_open: bool,
    pub evaluation: Option<CodingEvaluation>,
    pub status_text: Option<String>,
}

fn problem_id(session: u64) -> String {
    format!("handoff-{}", session)
}

/// The voice call operations the coordinator needs.
#[async_trait]
pub trait CallControl: Send + Sync + 'static {
    /// Restart the paused call with the given context.
    async fn resume_with_context(&self, context: ResumeContext) -> InterviewResult<()>;

    /// Tear the paused call down for good.
    async fn end_interview(&self) -> InterviewResult<()>;
}

#[async_trait]
impl CallControl for VoiceCallAdapter {
    async fn resume_with_context(&self, context: ResumeContext) -> InterviewResult<()> {
        VoiceCallAdapter::resume_with_context(self, context).await
    }

    async fn end_interview(&self) -> InterviewResult<()> {
        let outcome = VoiceCallAdapter::end_interview(self).await;
        debug!(?outcome, "interview ended from coding hand-off");
        Ok(())
    }
}

struct Inner {
    store: SessionStore,
    backend: Arc<dyn InterviewBackend>,
    call: Arc<dyn CallControl>,
    timings: Timings,
    state: watch::Sender<HandoffState>,
    session: AtomicU64,
    /// Session whose generation is in flight, 0 when none.
    generating: AtomicU64,
    generated: AtomicBool,
}

#[derive(Clone)]
pub struct HandoffCoordinator {
    inner: Arc<Inner>,
}

impl HandoffCoordinator {
    pub fn new(
        store: SessionStore,
        backend: Arc<dyn InterviewBackend>,
        call: Arc<dyn CallControl>,
        timings: Timings,
    ) -> Self {
        let (state, _) = watch::channel(HandoffState::default());
        Self {
            inner: Arc::new(Inner {
                store,
                backend,
                call,
                timings,
                state,
                session: AtomicU64::new(0),
                generating: AtomicU64::new(0),
                generated: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> HandoffState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<HandoffState> {
        self.inner.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut HandoffState)) {
        self.inner.state.send_modify(f);
    }

    fn session(&self) -> u64 {
        self.inner.session.load(Ordering::SeqCst)
    }

    fn is_current(&self, session: u64) -> bool {
        self.session() == session && self.inner.store.read(|s| s.coding_question_detected.is_some())
    }

    /// Watch the store for detections until the store goes away.
    pub fn spawn(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.run().await })
    }

    async fn run(self) {
        let mut present = self.inner.store.watch_slice(|s| s.coding_question_detected.is_some());
        if *present.current() {
            self.on_detected();
        }
        while let Some(now_present) = present.changed().await {
            if now_present {
                self.on_detected();
            } else {
                self.on_cleared();
            }
        }
        debug!("session store closed; hand-off coordinator stopping");
    }

    fn on_detected(&self) {
        let Some(detection) = self.inner.store.read(|s| s.coding_question_detected.clone()) else {
            return;
        };
        let session = self.inner.session.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.generated.store(false, Ordering::SeqCst);
        info!(session, turns = detection.conversation.len(), "🧩 Coding hand-off opened");

        let CodingQuestionDetected { question, .. } = detection;
        match question {
            Some(text) => {
                self.inner.generated.store(true, Ordering::SeqCst);
                self.seed_problem(
                    session,
                    GeneratedCodingQuestion {
                        question: text.clone(),
                        starter_code: None,
                        language: None,
                    },
                );
                self.inner.state.send_replace(HandoffState {
                    stage: HandoffStage::AwaitingSolution,
                    question: Some(text),
                    modal_open: true,
                    ..HandoffState::default()
                });
            }
            None => {
                self.inner
                    .store
                    .set_coding_problem(Some(CodingProblem::pending(problem_id(session))));
                self.inner.state.send_replace(HandoffState {
                    stage: HandoffStage::GeneratingQuestion,
                    modal_open: true,
                    ..HandoffState::default()
                });
                let coordinator = self.clone();
                tokio::spawn(async move { coordinator.generate(session).await });
            }
        }
    }

    fn on_cleared(&self) {
        self.inner.session.fetch_add(1, Ordering::SeqCst);
        self.inner.store.set_code_editor_open(false);
        self.update(|s| {
            s.stage = HandoffStage::Idle;
            s.modal_open = false;
            s.generating_question = false;
            s.submitting = false;
        });
        debug!("coding hand-off closed");
    }

    /// Ask the backend for a question again after a failed generation.
    pub async fn retry_generation(&self) {
        self.generate(self.session()).await;
    }

    async fn generate(&self, session: u64) {
        if self.inner.generated.load(Ordering::SeqCst) {
            debug!("coding question already generated");
            return;
        }
        let Some(detection) = self.inner.store.read(|s| s.coding_question_detected.clone()) else {
            return;
        };
        if self.inner.generating.swap(session, Ordering::SeqCst) == session {
            debug!(session, "coding question generation already in flight");
            return;
        }
        self.update(|s| {
            s.stage = HandoffStage::GeneratingQuestion;
            s.generating_question = true;
            s.status_text = Some("Preparing your coding question...".to_string());
        });

        let result = match self.interview_id() {
            Ok(interview_id) => {
                self.inner
                    .backend
                    .generate_coding_question(&interview_id, &detection.conversation)
                    .await
            }
            Err(e) => Err(e),
        };
        let _ = self
            .inner
            .generating
            .compare_exchange(session, 0, Ordering::SeqCst, Ordering::SeqCst);

        if !self.is_current(session) {
            debug!(session, "hand-off closed during generation; discarding result");
            return;
        }
        match result {
            Ok(generated) => {
                self.inner.generated.store(true, Ordering::SeqCst);
                info!("📝 Coding question ready");
                let question = generated.question.clone();
                self.seed_problem(session, generated);
                self.update(|s| {
                    s.stage = HandoffStage::AwaitingSolution;
                    s.question = Some(question);
                    s.generating_question = false;
                    s.status_text = None;
                });
            }
            Err(e) => {
                warn!(error = %e, "coding question generation failed");
                self.update(|s| {
                    s.question = Some(PLACEHOLDER_QUESTION.to_string());
                    s.generating_question = false;
                    s.status_text = Some(format!("Question generation failed: {}", e));
                });
            }
        }
    }

    fn seed_problem(&self, session: u64, generated: GeneratedCodingQuestion) {
        let mut problem = CodingProblem::pending(problem_id(session));
        problem.title = "Coding question".to_string();
        problem.description = generated.question;
        problem.starter_code = generated.starter_code.unwrap_or_default();
        if let Some(language) = generated.language {
            problem.language = language;
        }
        self.inner.store.set_coding_problem(Some(problem));
    }

    fn interview_id(&self) -> InterviewResult<String> {
        self.inner
            .store
            .read(|s| s.interview_id().map(str::to_string))
            .ok_or_else(|| InterviewError::InvalidState("no interview state loaded".to_string()))
    }

    /// Evaluate the solution, then continue the voice interview with the evaluation in context.
    ///
    /// Evaluation and resume-context failures keep the modal open for another attempt. Closing
    /// the modal during the evaluation pause skips the resume and returns `Ok`.
    pub async fn submit_solution(&self, code: &str, language: &str) -> InterviewResult<()> {
        let session = self.session();
        let detection = self
            .inner
            .store
            .read(|s| s.coding_question_detected.clone())
            .ok_or_else(|| {
                InterviewError::InvalidState("no coding hand-off in progress".to_string())
            })?;
        let current = self.state();
        let question = match current.question {
            Some(q) if self.inner.generated.load(Ordering::SeqCst) => q,
            _ => {
                return Err(InterviewError::InvalidState(
                    "coding question is not ready".to_string(),
                ))
            }
        };
        if current.submitting {
            return Err(InterviewError::InvalidState(
                "a submission is already in progress".to_string(),
            ));
        }
        let interview_id = self.interview_id()?;

        self.update(|s| {
            s.stage = HandoffStage::Evaluating;
            s.submitting = true;
            s.status_text = Some("Evaluating your solution...".to_string());
        });
        let submission = CodingSubmission {
            interview_id: interview_id.clone(),
            question: question.clone(),
            solution: code.to_string(),
            language: language.to_string(),
        };
        let evaluation = match self.inner.backend.evaluate_coding_solution(&submission).await {
            Ok(evaluation) => evaluation,
            Err(e) => {
                warn!(interview_id = %interview_id, error = %e, "solution evaluation failed");
                self.back_to_solution(format!("Evaluation failed: {}. Please submit again.", e));
                return Err(e);
            }
        };
        info!(interview_id = %interview_id, score = evaluation.score, "✅ Solution evaluated");
        self.update(|s| s.evaluation = Some(evaluation.clone()));

        let request = ResumeRequest {
            interview_id: interview_id.clone(),
            question,
            solution: code.to_string(),
            evaluation: evaluation.clone(),
            conversation: detection.conversation,
        };
        let context = match self.inner.backend.build_resume_context(&request).await {
            Ok(context) => context,
            Err(e) => {
                warn!(interview_id = %interview_id, error = %e, "could not build resume context");
                self.back_to_solution(format!("Could not continue the interview: {}", e));
                return Err(e);
            }
        };
        self.update(|s| {
            s.stage = HandoffStage::BuiltResumeContext;
            s.status_text = Some(format!(
                "Score {:.1}. Returning to the interview shortly...",
                evaluation.score
            ));
        });

        tokio::time::sleep(self.inner.timings.evaluation_pause()).await;
        if !self.is_current(session) {
            info!(interview_id = %interview_id, "hand-off closed during the pause; not resuming");
            return Ok(());
        }

        self.update(|s| s.stage = HandoffStage::ResumingCall);
        if let Err(e) = self.inner.call.resume_with_context(context).await {
            warn!(interview_id = %interview_id, error = %e, "failed to resume voice call");
            self.back_to_solution(format!("Could not resume the call: {}", e));
            return Err(e);
        }
        if !self.is_current(session) {
            info!(
                interview_id = %interview_id,
                "hand-off closed while resuming; call not restarted"
            );
            return Ok(());
        }
        info!(interview_id = %interview_id, "🔁 Voice interview resumed");
        self.inner.store.set_coding_question_detected(None);
        self.on_cleared();
        Ok(())
    }

    fn back_to_solution(&self, status: String) {
        self.update(|s| {
            s.stage = HandoffStage::AwaitingSolution;
            s.submitting = false;
            s.status_text = Some(status);
        });
    }

    /// Close the modal and end the interview; a pending resume is skipped.
    pub async fn cancel(&self) -> InterviewResult<()> {
        info!("🛑 Coding hand-off cancelled; ending interview");
        self.inner.store.set_coding_question_detected(None);
        self.on_cleared();
        self.inner.call.end_interview().await
    }
}
