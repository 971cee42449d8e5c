//! Hand-off coordinator tests with a scripted backend and a recording call control.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use interview_coding::{CallControl, HandoffCoordinator, HandoffStage, PLACEHOLDER_QUESTION};
use interview_core::{
    BackendOp, CodingQuestionDetected, ConversationEntry, InterviewError, InterviewResult,
    InterviewStateSnapshot, ResumeContext, Role, RoundType, ScriptedBackend, SessionStore, Timings,
};

#[derive(Default)]
struct RecordingCall {
    resumes: Mutex<Vec<ResumeContext>>,
    ends: AtomicUsize,
    fail_resume: AtomicBool,
}

#[async_trait]
impl CallControl for RecordingCall {
    async fn resume_with_context(&self, context: ResumeContext) -> InterviewResult<()> {
        if self.fail_resume.load(Ordering::SeqCst) {
            return Err(InterviewError::Voice("resume refused".into()));
        }
        self.resumes.lock().unwrap().push(context);
        Ok(())
    }

    async fn end_interview(&self) -> InterviewResult<()> {
        self.ends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RecordingCall {
    fn resume_count(&self) -> usize {
        self.resumes.lock().unwrap().len()
    }
}

struct Harness {
    store: SessionStore,
    backend: Arc<ScriptedBackend>,
    call: Arc<RecordingCall>,
    coordinator: HandoffCoordinator,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = SessionStore::new();
    store.set_interview_state(Some(InterviewStateSnapshot::new("iv-1", RoundType::Technical)));
    let backend = Arc::new(ScriptedBackend::new());
    let call = Arc::new(RecordingCall::default());
    let coordinator =
        HandoffCoordinator::new(store.clone(), backend.clone(), call.clone(), Timings::default());
    coordinator.spawn();
    Harness {
        store,
        backend,
        call,
        coordinator,
    }
}

fn detect(h: &Harness, question: Option<&str>) {
    h.store.set_coding_question_detected(Some(CodingQuestionDetected {
        question: question.map(str::to_string),
        conversation: vec![ConversationEntry::final_now(
            Role::Assistant,
            "Let's move on to a coding problem.",
        )],
    }));
}

async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

async fn ready(h: &Harness) {
    detect(h, None);
    eventually(|| h.coordinator.state().stage == HandoffStage::AwaitingSolution).await;
}

#[tokio::test(start_paused = true)]
async fn generated_question_seeds_the_editor() {
    let h = harness();
    ready(&h).await;

    let state = h.coordinator.state();
    assert!(state.modal_open);
    assert!(!state.generating_question);
    assert_eq!(state.question.as_deref(), Some("Write a function that reverses a linked list."));

    let session = h.store.snapshot();
    let problem = session.coding_problem.expect("problem seeded");
    assert_eq!(problem.starter_code, "def solve(head):\n    pass\n");
    assert_eq!(problem.current_code, problem.starter_code);
    assert!(session.is_code_editor_open);
    assert_eq!(h.backend.count(BackendOp::GenerateCodingQuestion), 1);
}

#[tokio::test(start_paused = true)]
async fn presupplied_question_skips_generation() {
    let h = harness();
    detect(&h, Some("Implement an LRU cache."));
    eventually(|| h.coordinator.state().stage == HandoffStage::AwaitingSolution).await;

    assert_eq!(h.coordinator.state().question.as_deref(), Some("Implement an LRU cache."));
    assert_eq!(h.backend.count(BackendOp::GenerateCodingQuestion), 0);
    assert_eq!(
        h.store.read(|s| s.coding_problem.as_ref().map(|p| p.description.clone())).as_deref(),
        Some("Implement an LRU cache.")
    );
}

#[tokio::test(start_paused = true)]
async fn generation_failure_shows_placeholder_and_allows_retry() {
    let h = harness();
    h.backend.fail(BackendOp::GenerateCodingQuestion);
    detect(&h, None);
    eventually(|| h.coordinator.state().question.as_deref() == Some(PLACEHOLDER_QUESTION)).await;

    let state = h.coordinator.state();
    assert!(!state.generating_question);
    assert!(state.status_text.unwrap_or_default().contains("failed"));
    assert!(matches!(
        h.coordinator.submit_solution("pass", "python").await,
        Err(InterviewError::InvalidState(_))
    ));

    h.backend.succeed(BackendOp::GenerateCodingQuestion);
    h.coordinator.retry_generation().await;
    let state = h.coordinator.state();
    assert_eq!(state.stage, HandoffStage::AwaitingSolution);
    assert_eq!(state.question.as_deref(), Some("Write a function that reverses a linked list."));
    assert_eq!(h.backend.count(BackendOp::GenerateCodingQuestion), 2);

    // Already generated: a further retry is a no-op.
    h.coordinator.retry_generation().await;
    assert_eq!(h.backend.count(BackendOp::GenerateCodingQuestion), 2);
}

#[tokio::test(start_paused = true)]
async fn evaluation_failure_keeps_modal_open_without_resume() {
    let h = harness();
    ready(&h).await;
    h.backend.fail(BackendOp::EvaluateCodingSolution);

    assert!(h.coordinator.submit_solution("def solve(head): return head", "python").await.is_err());

    let state = h.coordinator.state();
    assert!(state.modal_open);
    assert!(!state.submitting);
    assert_eq!(state.stage, HandoffStage::AwaitingSolution);
    assert_eq!(h.backend.count(BackendOp::BuildResumeContext), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.call.resume_count(), 0);
    assert!(h.store.read(|s| s.coding_question_detected.is_some()));
}

#[tokio::test(start_paused = true)]
async fn resume_context_failure_leaves_call_stopped() {
    let h = harness();
    ready(&h).await;
    h.backend.fail(BackendOp::BuildResumeContext);

    assert!(h.coordinator.submit_solution("x", "python").await.is_err());
    let state = h.coordinator.state();
    assert!(state.modal_open);
    assert!(!state.submitting);
    assert!(state.evaluation.is_some());
    assert_eq!(h.call.resume_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn successful_submission_resumes_after_the_pause() {
    let h = harness();
    ready(&h).await;

    let coordinator = h.coordinator.clone();
    let submit = tokio::spawn(async move {
        coordinator
            .submit_solution("def solve(head): ...", "python")
            .await
    });

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(h.coordinator.state().stage, HandoffStage::BuiltResumeContext);
    assert!(h.coordinator.state().submitting);
    assert_eq!(h.call.resume_count(), 0);

    submit.await.unwrap().unwrap();
    assert_eq!(h.call.resume_count(), 1);
    let context = h.call.resumes.lock().unwrap()[0].clone();
    assert!(context.system_prompt.contains("7.0"));

    let state = h.coordinator.state();
    assert_eq!(state.stage, HandoffStage::Idle);
    assert!(!state.modal_open);
    assert!(state.evaluation.is_some());
    assert!(h.store.read(|s| s.coding_question_detected.is_none()));
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_the_pause_skips_resume_and_ends_interview() {
    let h = harness();
    ready(&h).await;

    let coordinator = h.coordinator.clone();
    let submit = tokio::spawn(async move { coordinator.submit_solution("code", "python").await });
    tokio::time::sleep(Duration::from_secs(1)).await;

    h.coordinator.cancel().await.unwrap();
    submit.await.unwrap().unwrap();

    assert_eq!(h.call.resume_count(), 0);
    assert_eq!(h.call.ends.load(Ordering::SeqCst), 1);
    assert!(!h.coordinator.state().modal_open);
}

#[tokio::test(start_paused = true)]
async fn resume_failure_keeps_modal_open() {
    let h = harness();
    ready(&h).await;
    h.call.fail_resume.store(true, Ordering::SeqCst);

    assert!(h.coordinator.submit_solution("code", "python").await.is_err());
    let state = h.coordinator.state();
    assert!(state.modal_open);
    assert!(!state.submitting);
    assert!(h.store.read(|s| s.coding_question_detected.is_some()));
}

#[tokio::test(start_paused = true)]
async fn editor_holds_an_empty_problem_while_generating() {
    let h = harness();
    h.backend.hang(BackendOp::GenerateCodingQuestion);
    detect(&h, None);
    eventually(|| h.coordinator.state().generating_question).await;

    let session = h.store.snapshot();
    let problem = session.coding_problem.expect("problem created on detection");
    assert!(problem.description.is_empty());
    assert!(problem.current_code.is_empty());
    assert!(session.is_code_editor_open);
    assert_eq!(h.coordinator.state().stage, HandoffStage::GeneratingQuestion);
}

#[tokio::test(start_paused = true)]
async fn reopened_handoff_generates_while_a_closed_one_is_still_pending() {
    let h = harness();
    h.backend.hang(BackendOp::GenerateCodingQuestion);
    detect(&h, None);
    eventually(|| h.coordinator.state().generating_question).await;

    h.coordinator.cancel().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.backend.succeed(BackendOp::GenerateCodingQuestion);
    detect(&h, None);
    eventually(|| h.coordinator.state().stage == HandoffStage::AwaitingSolution).await;

    let state = h.coordinator.state();
    assert!(state.modal_open);
    assert!(!state.generating_question);
    assert_eq!(state.question.as_deref(), Some("Write a function that reverses a linked list."));
    assert_eq!(h.backend.count(BackendOp::GenerateCodingQuestion), 2);
}
