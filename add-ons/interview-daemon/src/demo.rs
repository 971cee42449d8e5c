//! Scripted end-to-end interview against the placeholder SDK and the mock backend.

use std::sync::Arc;
use std::time::Duration;

use interview_coding::{CodingWorkspace, HandoffCoordinator, HandoffStage};
use interview_core::{
    CallStatus, ExpressionFrame, InterviewBackend, InterviewError, InterviewResult, Role, RoundType,
    SessionStore, SyncConfig,
};
use interview_realtime::RealtimeChannel;
use interview_voice::{
    ExpressionAggregator, PlaceholderSdk, SdkEvent, TranscriptDelta, VoiceCallAdapter,
};
use tracing::info;

const SCRIPT: [(Role, &str); 4] = [
    (Role::Assistant, "Welcome! Tell me about a system you built recently."),
    (Role::User, "I built a rate limiter for our public API."),
    (Role::Assistant, "Nice. Let's switch to a coding question now."),
    (Role::User, "Sure, ready."),
];

const SOLUTION: &str = "def solve(head):
    prev = None
    while head:
        head.next, prev, head = prev, head, head.next
    return prev
";

pub async fn run(
    store: SessionStore,
    backend: Arc<dyn InterviewBackend>,
    channel: RealtimeChannel,
    mut config: SyncConfig,
    interview_id: &str,
) -> InterviewResult<()> {
    if config.assistant_id.is_none() {
        config.assistant_id = Some("demo-assistant".to_string());
    }
    let timings = config.timings.clone();
    let (sdk, events) = PlaceholderSdk::new();
    let expressions = Arc::new(ExpressionAggregator::new());
    let adapter = VoiceCallAdapter::new(
        store.clone(),
        Arc::new(sdk.clone()),
        Arc::clone(&backend),
        Arc::clone(&expressions),
        config,
    );
    adapter.spawn_event_loop(events);
    let coordinator = HandoffCoordinator::new(
        store.clone(),
        Arc::clone(&backend),
        Arc::new(adapter.clone()),
        timings.clone(),
    );
    coordinator.spawn();
    let workspace = CodingWorkspace::new(store.clone(), backend, channel.clone(), &timings);

    adapter.start_interview(interview_id, Some(RoundType::Technical)).await?;
    wait_until(|| store.read(|s| s.call_status) == CallStatus::Active).await?;

    for (role, text) in SCRIPT {
        let frame = ExpressionFrame {
            neutral: 0.6,
            happy: 0.3,
            ..ExpressionFrame::default()
        };
        expressions.push(frame);
        channel.emit_expression_update(frame);
        sdk.emit(SdkEvent::Message(TranscriptDelta::final_text(role, text)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        if store.read(|s| s.coding_question_detected.is_some()) {
            break;
        }
    }

    wait_until(|| coordinator.state().stage == HandoffStage::AwaitingSolution).await?;
    info!(question = ?coordinator.state().question, "🧩 Demo received a coding question");

    workspace.edit(SOLUTION);
    let result = workspace.run_code().await?;
    info!(success = result.success, "demo run finished");
    let hint = workspace.request_hint().await?;
    info!(hint = %hint.hint, "demo hint");

    coordinator.submit_solution(SOLUTION, "python").await?;
    wait_until(|| store.read(|s| s.call_status) == CallStatus::Active).await?;
    sdk.emit(SdkEvent::Message(TranscriptDelta::final_text(
        Role::User,
        "I reversed it in place with a single pass.",
    )));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let outcome = adapter.stop_interview().await;
    info!(?outcome, turns = store.read(|s| s.transcript.len()), "✅ Demo interview finished");
    Ok(())
}

async fn wait_until(mut cond: impl FnMut() -> bool) -> InterviewResult<()> {
    for _ in 0..200 {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(InterviewError::InvalidState("demo step did not complete".to_string()))
}
