//! Full voice → coding → voice round trip through the real adapter and coordinator.

use std::sync::Arc;
use std::time::Duration;

use interview_coding::{HandoffCoordinator, HandoffStage};
use interview_core::{
    BackendCall, BackendOp, CallStatus, Role, RoundType, ScriptedBackend, SessionStore, SyncConfig,
};
use interview_voice::{
    ExpressionAggregator, PlaceholderSdk, SdkEvent, StopOutcome, TranscriptDelta, VoiceCallAdapter,
};

async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

struct Harness {
    store: SessionStore,
    sdk: PlaceholderSdk,
    backend: Arc<ScriptedBackend>,
    adapter: VoiceCallAdapter,
    coordinator: HandoffCoordinator,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = SessionStore::new();
    let (sdk, events) = PlaceholderSdk::new();
    let backend = Arc::new(ScriptedBackend::new());
    let config = SyncConfig {
        assistant_id: Some("asst-1".into()),
        ..SyncConfig::default()
    };
    let timings = config.timings.clone();
    let adapter = VoiceCallAdapter::new(
        store.clone(),
        Arc::new(sdk.clone()),
        backend.clone(),
        Arc::new(ExpressionAggregator::new()),
        config,
    );
    adapter.spawn_event_loop(events);
    let coordinator =
        HandoffCoordinator::new(store.clone(), backend.clone(), Arc::new(adapter.clone()), timings);
    coordinator.spawn();
    Harness {
        store,
        sdk,
        backend,
        adapter,
        coordinator,
    }
}

async fn hand_off(h: &Harness) {
    h.adapter.start_interview("iv-1", Some(RoundType::Technical)).await.unwrap();
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::Active).await;

    h.sdk.emit(SdkEvent::Message(TranscriptDelta::final_text(
        Role::Assistant,
        "Now let's work through a coding problem together.",
    )));
    eventually(|| h.coordinator.state().stage == HandoffStage::AwaitingSolution).await;
}

#[tokio::test(start_paused = true)]
async fn coding_handoff_round_trip() {
    let h = harness();
    let Harness {
        store,
        sdk,
        backend,
        adapter,
        coordinator,
    } = &h;
    hand_off(&h).await;
    assert_eq!(store.read(|s| s.call_status), CallStatus::HandedOff);
    assert!(store.read(|s| s.is_code_editor_open));

    coordinator
        .submit_solution("def solve(head):\n    return head\n", "python")
        .await
        .unwrap();
    eventually(|| store.read(|s| s.call_status) == CallStatus::Active).await;

    assert_eq!(sdk.start_count(), 2);
    assert_eq!(adapter.snapshot().interview_id.as_deref(), Some("iv-1"));
    assert!(store.read(|s| s.coding_question_detected.is_none()));
    assert!(!coordinator.state().modal_open);

    sdk.emit(SdkEvent::Message(TranscriptDelta::final_text(Role::User, "I used a single pass.")));
    eventually(|| adapter.snapshot().turns == 2).await;

    assert_eq!(adapter.stop_interview().await, StopOutcome::Ended);
    let saved: Vec<usize> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::SaveTranscript { transcript, .. } => Some(transcript.len()),
            _ => None,
        })
        .collect();
    assert_eq!(saved, vec![2]);
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_the_resume_pause_leaves_no_call_running() {
    let h = harness();
    hand_off(&h).await;

    let coordinator = h.coordinator.clone();
    let submit = tokio::spawn(async move {
        coordinator
            .submit_solution("def solve(head):\n    return head\n", "python")
            .await
    });
    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert_eq!(h.coordinator.state().stage, HandoffStage::ResumingCall);

    h.coordinator.cancel().await.unwrap();
    submit.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(h.sdk.start_count(), 1);
    assert_eq!(h.store.read(|s| s.call_status), CallStatus::Idle);
    assert_eq!(h.adapter.snapshot().interview_id, None);
    assert!(!h.coordinator.state().modal_open);
    assert_eq!(h.backend.count(BackendOp::SaveTranscript), 1);
}
