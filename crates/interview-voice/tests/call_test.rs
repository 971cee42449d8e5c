//! Call lifecycle tests for the voice adapter against the placeholder SDK and scripted backend.

use std::sync::Arc;
use std::time::Duration;

use interview_core::{
    BackendCall, BackendOp, CallStatus, ExpressionFrame, InterviewError, ResumeContext, Role,
    RoundType, ScriptedBackend, SessionStore, SyncConfig,
};
use interview_voice::{
    ExpressionAggregator, PlaceholderSdk, SdkCall, SdkEvent, StopOutcome, TranscriptDelta,
    VoiceCallAdapter,
};

struct Harness {
    store: SessionStore,
    sdk: PlaceholderSdk,
    backend: Arc<ScriptedBackend>,
    adapter: VoiceCallAdapter,
}

fn harness_with(assistant_id: Option<&str>) -> Harness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let store = SessionStore::new();
    let (sdk, events) = PlaceholderSdk::new();
    let backend = Arc::new(ScriptedBackend::new());
    let config = SyncConfig {
        assistant_id: assistant_id.map(str::to_string),
        ..SyncConfig::default()
    };
    let adapter = VoiceCallAdapter::new(
        store.clone(),
        Arc::new(sdk.clone()),
        backend.clone(),
        Arc::new(ExpressionAggregator::new()),
        config,
    );
    adapter.spawn_event_loop(events);
    Harness {
        store,
        sdk,
        backend,
        adapter,
    }
}

fn harness() -> Harness {
    harness_with(Some("asst-1"))
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

async fn start_active(h: &Harness, round: RoundType) {
    h.adapter.start_interview("iv-1", Some(round)).await.unwrap();
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::Active).await;
}

fn say(h: &Harness, role: Role, text: &str) {
    h.sdk.emit(SdkEvent::Message(TranscriptDelta::final_text(role, text)));
}

fn saved_transcripts(backend: &ScriptedBackend) -> Vec<Vec<String>> {
    backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::SaveTranscript { transcript, .. } => {
                Some(transcript.into_iter().map(|e| e.text).collect())
            }
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn call_end_without_handoff_persists_and_clears_refs() {
    let h = harness();
    start_active(&h, RoundType::Behavioral).await;

    let turns = [
        "Tell me about yourself.",
        "I build backend systems.",
        "What drives you?",
        "Shipping.",
    ];
    for (i, text) in turns.iter().enumerate() {
        let role = if i % 2 == 0 { Role::Assistant } else { Role::User };
        say(&h, role, text);
    }
    h.adapter.expressions().push(ExpressionFrame {
        happy: 0.8,
        ..Default::default()
    });
    h.adapter.expressions().push(ExpressionFrame {
        happy: 0.4,
        ..Default::default()
    });
    eventually(|| h.adapter.snapshot().turns == turns.len()).await;
    assert!(h.adapter.snapshot().call_started_at.is_some());

    h.sdk.emit(SdkEvent::CallEnd);
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::Idle).await;

    let snap = h.adapter.snapshot();
    assert_eq!(snap.interview_id, None);
    assert_eq!(snap.call_id, None);
    assert_eq!(snap.call_started_at, None);

    let expected: Vec<String> = turns.iter().map(|t| t.to_string()).collect();
    assert_eq!(saved_transcripts(&h.backend), vec![expected]);
    let metadata = h
        .backend
        .calls()
        .into_iter()
        .find_map(|call| match call {
            BackendCall::SaveCallMetadata(m) => Some(m),
            _ => None,
        })
        .expect("call metadata saved");
    assert_eq!(metadata.interview_id, "iv-1");
    assert_eq!(metadata.call_id.as_deref(), Some("call-1"));
    assert!((metadata.expressions.0.happy - 0.6).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn call_end_with_handoff_pending_keeps_interview() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;

    say(&h, Role::Assistant, "Great. Now let's move to a coding question.");
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::HandedOff).await;

    let snap = h.adapter.snapshot();
    assert_eq!(snap.interview_id.as_deref(), Some("iv-1"));
    assert!(snap.call_started_at.is_some());
    let detected = h
        .store
        .read(|s| s.coding_question_detected.clone())
        .expect("detection published");
    assert_eq!(detected.question, None);
    assert_eq!(detected.conversation.len(), 1);
    assert_eq!(h.backend.count(BackendOp::SaveTranscript), 0);
    assert_eq!(h.backend.count(BackendOp::SaveCallMetadata), 0);
}

#[tokio::test(start_paused = true)]
async fn two_trigger_utterances_detect_once() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;

    say(&h, Role::Assistant, "Here is a coding problem for you.");
    say(&h, Role::Assistant, "Take your time with this coding challenge.");
    eventually(|| h.adapter.snapshot().turns == 2).await;

    assert_eq!(h.sdk.stop_count(), 1);
    let detected = h
        .store
        .read(|s| s.coding_question_detected.clone())
        .expect("detection published");
    assert_eq!(detected.conversation.len(), 1, "second utterance must not re-publish");
}

#[tokio::test(start_paused = true)]
async fn trigger_ignored_outside_technical_rounds() {
    let h = harness();
    start_active(&h, RoundType::Behavioral).await;

    say(&h, Role::Assistant, "No coding question today, just stories.");
    say(&h, Role::User, "Sounds good, a coding problem would scare me.");
    eventually(|| h.adapter.snapshot().turns == 2).await;

    assert_eq!(h.sdk.stop_count(), 0);
    assert!(h.store.read(|s| s.coding_question_detected.is_none()));
}

#[tokio::test(start_paused = true)]
async fn user_saying_the_phrase_does_not_trigger() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;

    say(&h, Role::User, "Will there be a coding question?");
    eventually(|| h.adapter.snapshot().turns == 1).await;
    assert_eq!(h.sdk.stop_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_without_call_end_resolves_at_timeout() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;
    say(&h, Role::User, "I am done.");
    eventually(|| h.adapter.snapshot().turns == 1).await;
    h.sdk.echo_call_end(false);

    let started = tokio::time::Instant::now();
    let outcome = h.adapter.stop_interview().await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, StopOutcome::TimedOut);
    assert!(
        elapsed >= Duration::from_secs(15) && elapsed < Duration::from_secs(16),
        "{:?}",
        elapsed
    );
    assert_eq!(h.store.read(|s| s.call_status), CallStatus::Idle);
    assert_eq!(h.adapter.snapshot().interview_id, None);

    // The forced teardown still persists what it has.
    eventually(|| h.backend.count(BackendOp::SaveCallMetadata) == 1).await;
    assert_eq!(saved_transcripts(&h.backend), vec![vec!["I am done.".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn hung_persistence_is_bounded_by_watchdog() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;
    say(&h, Role::User, "Thanks!");
    eventually(|| h.adapter.snapshot().turns == 1).await;
    h.backend.hang(BackendOp::SaveTranscript);

    let outcome = h.adapter.stop_interview().await;
    assert_eq!(outcome, StopOutcome::TimedOut);
    assert_eq!(h.store.read(|s| s.call_status), CallStatus::Idle);
    assert_eq!(h.adapter.snapshot().call_started_at, None);
}

#[tokio::test(start_paused = true)]
async fn stop_with_call_end_reports_ended() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;

    assert_eq!(h.adapter.stop_interview().await, StopOutcome::Ended);
    assert_eq!(h.store.read(|s| s.call_status), CallStatus::Idle);
    assert_eq!(h.adapter.stop_interview().await, StopOutcome::AlreadyIdle);
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_surfaces_error_and_still_cleans_up() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;
    say(&h, Role::User, "Bye.");
    eventually(|| h.adapter.snapshot().turns == 1).await;
    h.backend.fail(BackendOp::SaveTranscript);

    assert_eq!(h.adapter.stop_interview().await, StopOutcome::Ended);
    let state = h.store.snapshot();
    assert_eq!(state.call_status, CallStatus::Idle);
    assert!(state.error.as_deref().unwrap_or_default().contains("transcript"));
    assert_eq!(h.backend.count(BackendOp::SaveCallMetadata), 1);
    assert_eq!(h.adapter.snapshot().interview_id, None);
}

#[tokio::test]
async fn missing_assistant_id_fails_before_side_effects() {
    let h = harness_with(None);
    h.store.set_error(Some("previous".into()));

    let result = h.adapter.start_interview("iv-1", None).await;
    assert!(matches!(result, Err(InterviewError::Config(_))));
    assert!(h.backend.calls().is_empty());
    assert_eq!(h.sdk.start_count(), 0);
    assert_eq!(h.store.read(|s| s.error.clone()).as_deref(), Some("previous"));
}

#[tokio::test(start_paused = true)]
async fn start_loads_or_initializes_interview_state() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;

    let ops: Vec<_> = h.backend.calls().iter().map(BackendCall::op).collect();
    assert_eq!(
        ops,
        vec![
            BackendOp::StartInterview,
            BackendOp::GetInterviewState,
            BackendOp::InitializeInterviewState
        ]
    );
    assert_eq!(h.store.read(|s| s.interview_id().map(str::to_string)).as_deref(), Some("iv-1"));
}

#[tokio::test(start_paused = true)]
async fn resume_continues_same_interview_without_retriggering() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;
    say(&h, Role::Assistant, "Time for a coding question.");
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::HandedOff).await;
    let first_start = h.adapter.snapshot().call_started_at;

    h.adapter
        .resume_with_context(ResumeContext {
            system_prompt: "Discuss the candidate's solution.".into(),
            first_message: "Nice work on that problem.".into(),
        })
        .await
        .unwrap();
    h.store.set_coding_question_detected(None);
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::Active).await;

    match h.sdk.calls().last() {
        Some(SdkCall::Start { options, .. }) => {
            assert!(options.is_context_override());
            assert_eq!(options.first_message.as_deref(), Some("Nice work on that problem."));
        }
        other => panic!("expected a resume start, got {:?}", other),
    }
    let snap = h.adapter.snapshot();
    assert_eq!(snap.interview_id.as_deref(), Some("iv-1"));
    assert_eq!(snap.call_started_at, first_start);

    say(&h, Role::Assistant, "Let's revisit that coding question.");
    eventually(|| h.adapter.snapshot().turns == 2).await;
    assert_eq!(h.sdk.stop_count(), 1, "guard stays claimed across the resume");

    assert_eq!(h.adapter.stop_interview().await, StopOutcome::Ended);
    assert_eq!(
        saved_transcripts(&h.backend),
        vec![vec![
            "Time for a coding question.".to_string(),
            "Let's revisit that coding question.".to_string()
        ]]
    );
}

#[tokio::test(start_paused = true)]
async fn ending_a_handed_off_interview_persists_and_resets() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;
    say(&h, Role::Assistant, "Let's try a coding challenge.");
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::HandedOff).await;

    assert_eq!(h.adapter.end_interview().await, StopOutcome::Ended);
    let state = h.store.snapshot();
    assert_eq!(state.call_status, CallStatus::Idle);
    assert!(state.coding_question_detected.is_none());
    assert_eq!(h.backend.count(BackendOp::SaveTranscript), 1);
    assert_eq!(h.adapter.snapshot().interview_id, None);
}

#[tokio::test(start_paused = true)]
async fn ending_during_the_resume_pause_starts_no_call() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;
    say(&h, Role::Assistant, "Time for a coding question.");
    eventually(|| h.store.read(|s| s.call_status) == CallStatus::HandedOff).await;

    let adapter = h.adapter.clone();
    let resume = tokio::spawn(async move {
        adapter
            .resume_with_context(ResumeContext {
                system_prompt: "Discuss the candidate's solution.".into(),
                first_message: "Welcome back.".into(),
            })
            .await
    });
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.adapter.end_interview().await, StopOutcome::Ended);

    resume.await.unwrap().unwrap();
    assert_eq!(h.sdk.start_count(), 1);
    assert_eq!(h.store.read(|s| s.call_status), CallStatus::Idle);
    assert_eq!(h.adapter.snapshot().interview_id, None);
}

#[tokio::test(start_paused = true)]
async fn resume_without_a_pending_handoff_is_rejected() {
    let h = harness();
    start_active(&h, RoundType::Technical).await;

    let resumed = h
        .adapter
        .resume_with_context(ResumeContext {
            system_prompt: "p".into(),
            first_message: "m".into(),
        })
        .await;
    assert!(matches!(resumed, Err(InterviewError::InvalidState(_))));
    assert_eq!(h.sdk.start_count(), 1);
}
