//! Voice call SDK surface the adapter depends on.
//!
//! The third-party SDK is reached through [`VoiceSdk`] for commands and an inbound stream of
//! [`SdkEvent`]s for callbacks. [`PlaceholderSdk`] records commands and can echo lifecycle events.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use interview_core::{InterviewError, InterviewResult, Role};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

/// Options passed to `start`. The override fields drive the context-override (resume) path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOptions {
    pub variable_values: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_message: Option<String>,
    pub metadata: serde_json::Value,
}

impl CallOptions {
    pub fn is_context_override(&self) -> bool {
        self.system_prompt.is_some() || self.first_message.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptKind {
    Partial,
    Final,
}

/// A transcript delta from the SDK's `message` callback.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptDelta {
    pub role: Role,
    pub text: String,
    pub kind: TranscriptKind,
}

impl TranscriptDelta {
    pub fn final_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            kind: TranscriptKind::Final,
        }
    }

    pub fn partial_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            kind: TranscriptKind::Partial,
        }
    }
}

/// SDK callbacks: `call-start`, `call-end`, `speech-start/end`, `message`, `error`.
#[derive(Debug, Clone, PartialEq)]
pub enum SdkEvent {
    CallStart { call_id: Option<String> },
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Message(TranscriptDelta),
    Error(String),
}

/// Commands sent to the voice SDK.
#[async_trait]
pub trait VoiceSdk: Send + Sync + 'static {
    async fn start(&self, assistant_id: &str, options: CallOptions) -> InterviewResult<()>;

    async fn stop(&self) -> InterviewResult<()>;
}

/// A command recorded by [`PlaceholderSdk`].
#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    Start { assistant_id: String, options: CallOptions },
    Stop,
}

struct PlaceholderState {
    calls: Vec<SdkCall>,
    echo_call_start: bool,
    echo_call_end: bool,
    fail_start: bool,
    started: u32,
}

/// Stand-in SDK: records commands and, by default, answers `start` with `CallStart` and `stop`
/// with `CallEnd` on its event stream.
#[derive(Clone)]
pub struct PlaceholderSdk {
    state: Arc<Mutex<PlaceholderState>>,
    events: mpsc::UnboundedSender<SdkEvent>,
}

impl PlaceholderSdk {
    /// Create the SDK together with the receiver the adapter's event loop consumes.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SdkEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let sdk = Self {
            state: Arc::new(Mutex::new(PlaceholderState {
                calls: Vec::new(),
                echo_call_start: true,
                echo_call_end: true,
                fail_start: false,
                started: 0,
            })),
            events,
        };
        (sdk, rx)
    }

    /// When `false`, `stop` never produces `CallEnd` (a silent backend).
    pub fn echo_call_end(&self, echo: bool) {
        self.lock().echo_call_end = echo;
    }

    pub fn echo_call_start(&self, echo: bool) {
        self.lock().echo_call_start = echo;
    }

    pub fn fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    /// Inject an SDK callback.
    pub fn emit(&self, event: SdkEvent) {
        let _ = self.events.send(event);
    }

    pub fn calls(&self) -> Vec<SdkCall> {
        self.lock().calls.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.lock().calls.iter().filter(|c| matches!(c, SdkCall::Stop)).count()
    }

    pub fn start_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, SdkCall::Start { .. }))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlaceholderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl VoiceSdk for PlaceholderSdk {
    async fn start(&self, assistant_id: &str, options: CallOptions) -> InterviewResult<()> {
        let echo = {
            let mut state = self.lock();
            state.calls.push(SdkCall::Start {
                assistant_id: assistant_id.to_string(),
                options,
            });
            if state.fail_start {
                return Err(InterviewError::Voice("placeholder start refused".to_string()));
            }
            state.started += 1;
            state.echo_call_start.then(|| format!("call-{}", state.started))
        };
        info!(assistant_id, "📞 Placeholder call started");
        if let Some(call_id) = echo {
            self.emit(SdkEvent::CallStart { call_id: Some(call_id) });
        }
        Ok(())
    }

    async fn stop(&self) -> InterviewResult<()> {
        let echo = {
            let mut state = self.lock();
            state.calls.push(SdkCall::Stop);
            state.echo_call_end
        };
        if echo {
            self.emit(SdkEvent::CallEnd);
        }
        Ok(())
    }
}
