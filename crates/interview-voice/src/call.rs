//! Voice Call Client Adapter.
//!
//! Bridges the voice SDK into the [`SessionStore`]: call lifecycle, final transcript turns,
//! coding trigger detection, and call-end persistence.
//!
//! Call-scoped refs (interview id, call id, start time, conversation buffer) live behind a
//! mutex and are never held across an await. Each call lifecycle carries an epoch; the stop
//! watchdog and the call-end persistence both tear down through [`VoiceCallAdapter::cleanup`],
//! and only the first one for a given epoch takes effect.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use interview_core::{
    CallMetadata, CallStatus, CodingQuestionDetected, ConversationBuffer, ConversationEntry,
    InterviewBackend, InterviewError, InterviewResult, OneShotGuard, ResumeContext, Role, RoundType,
    SessionStore, SyncConfig,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::expressions::ExpressionAggregator;
use crate::sdk::{CallOptions, SdkEvent, TranscriptDelta, TranscriptKind, VoiceSdk};
use crate::trigger::TriggerDetector;

/// How a `stop_interview` request resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The call ended and call-end handling finished.
    Ended,
    /// No call-end within the stop timeout; the adapter tore the call down itself.
    TimedOut,
    /// Nothing was running.
    AlreadyIdle,
}

/// Read-only view of the call-scoped refs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallSnapshot {
    pub interview_id: Option<String>,
    pub call_id: Option<String>,
    pub call_started_at: Option<DateTime<Utc>>,
    pub round_type: RoundType,
    pub turns: usize,
}

#[derive(Default)]
struct CallRefs {
    interview_id: Option<String>,
    call_id: Option<String>,
    call_started_at: Option<DateTime<Utc>>,
    round_type: RoundType,
    conversation: ConversationBuffer,
    detector: TriggerDetector,
    epoch: u64,
    /// Call-end persistence already claimed for this epoch.
    finishing: bool,
}

struct PersistJob {
    interview_id: String,
    transcript: Vec<ConversationEntry>,
    metadata: CallMetadata,
}

struct Inner {
    store: SessionStore,
    sdk: Arc<dyn VoiceSdk>,
    backend: Arc<dyn InterviewBackend>,
    expressions: Arc<ExpressionAggregator>,
    config: SyncConfig,
    refs: Mutex<CallRefs>,
    trigger: OneShotGuard,
}

/// Handle to the voice call adapter. Clones share the same call.
#[derive(Clone)]
pub struct VoiceCallAdapter {
    inner: Arc<Inner>,
}

impl VoiceCallAdapter {
    pub fn new(
        store: SessionStore,
        sdk: Arc<dyn VoiceSdk>,
        backend: Arc<dyn InterviewBackend>,
        expressions: Arc<ExpressionAggregator>,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                sdk,
                backend,
                expressions,
                config,
                refs: Mutex::new(CallRefs::default()),
                trigger: OneShotGuard::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CallRefs> {
        self.inner.refs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn expressions(&self) -> &Arc<ExpressionAggregator> {
        &self.inner.expressions
    }

    pub fn snapshot(&self) -> CallSnapshot {
        let refs = self.lock();
        CallSnapshot {
            interview_id: refs.interview_id.clone(),
            call_id: refs.call_id.clone(),
            call_started_at: refs.call_started_at,
            round_type: refs.round_type,
            turns: refs.conversation.len(),
        }
    }

    /// Consume SDK callbacks one at a time.
    pub fn spawn_event_loop(
        &self,
        mut events: mpsc::UnboundedReceiver<SdkEvent>,
    ) -> JoinHandle<()> {
        let adapter = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                adapter.handle_event(event).await;
            }
            debug!("voice SDK event stream closed");
        })
    }

    /// Begin a voice interview. A missing assistant id fails before anything is touched.
    ///
    /// `round_type` overrides the round reported by the backend.
    pub async fn start_interview(
        &self,
        interview_id: &str,
        round_type: Option<RoundType>,
    ) -> InterviewResult<()> {
        let assistant_id = self.inner.config.require_assistant_id()?;
        let status = self.inner.store.read(|s| s.call_status);
        if status != CallStatus::Idle {
            return Err(InterviewError::InvalidState(format!(
                "cannot start a call while {:?}",
                status
            )));
        }

        info!(interview_id, "🎙️ Starting interview call");
        let store = &self.inner.store;
        store.reset();
        store.set_call_status(CallStatus::Connecting);

        let start = match self.inner.backend.start_interview(interview_id).await {
            Ok(start) => start,
            Err(e) => return Err(self.abort_start(e)),
        };
        let round_type = round_type.unwrap_or(start.round_type);
        {
            let mut refs = self.lock();
            let epoch = refs.epoch + 1;
            *refs = CallRefs {
                interview_id: Some(interview_id.to_string()),
                round_type,
                epoch,
                ..CallRefs::default()
            };
        }
        self.inner.trigger.release();
        self.load_interview_state(interview_id, round_type).await;

        let options = CallOptions {
            variable_values: start.variable_values,
            metadata: json!({ "interviewId": interview_id, "roundType": round_type }),
            ..CallOptions::default()
        };
        if let Err(e) = self.inner.sdk.start(assistant_id, options).await {
            self.clear_refs();
            return Err(self.abort_start(e));
        }
        Ok(())
    }

    fn abort_start(&self, e: InterviewError) -> InterviewError {
        error!(error = %e, "failed to start interview call");
        self.inner.store.set_error(Some(format!("Failed to start interview: {}", e)));
        self.inner.store.set_call_status(CallStatus::Idle);
        e
    }

    async fn load_interview_state(&self, interview_id: &str, round_type: RoundType) {
        let backend = &self.inner.backend;
        let loaded = match backend.get_interview_state(interview_id).await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => backend.initialize_interview_state(interview_id, round_type).await,
            Err(e) => Err(e),
        };
        match loaded {
            Ok(snapshot) => self.inner.store.set_interview_state(Some(snapshot)),
            Err(e) => warn!(
                interview_id,
                error = %e,
                "could not load interview state; waiting for realtime update"
            ),
        }
    }

    /// Apply one SDK callback.
    pub async fn handle_event(&self, event: SdkEvent) {
        match event {
            SdkEvent::CallStart { call_id } => self.on_call_start(call_id),
            SdkEvent::CallEnd => self.on_call_end(),
            SdkEvent::SpeechStart => self.inner.store.set_speaking(true),
            SdkEvent::SpeechEnd => self.inner.store.set_speaking(false),
            SdkEvent::Message(delta) => self.on_transcript(delta).await,
            SdkEvent::Error(message) => {
                error!(message = %message, "voice SDK error");
                self.inner.store.set_error(Some(message));
            }
        }
    }

    fn on_call_start(&self, call_id: Option<String>) {
        let fresh = {
            let mut refs = self.lock();
            if refs.interview_id.is_none() {
                debug!("call-start without an active interview; ignoring");
                return;
            }
            if refs.call_id.is_none() {
                refs.call_id = call_id;
            }
            // A repeated call-start (including the resumed call) does not restart the call.
            if refs.call_started_at.is_none() {
                refs.call_started_at = Some(Utc::now());
                refs.conversation.clear();
                refs.detector.reset();
                true
            } else {
                false
            }
        };
        self.inner.store.set_call_status(CallStatus::Active);
        info!(fresh, "📞 Call started");
    }

    fn on_call_end(&self) {
        let store = &self.inner.store;
        store.set_speaking(false);
        if store.read(|s| s.coding_question_detected.is_some()) {
            info!("📞 Call paused for coding hand-off; keeping interview refs");
            store.set_call_status(CallStatus::HandedOff);
            return;
        }
        self.finish_call();
    }

    async fn on_transcript(&self, delta: TranscriptDelta) {
        let store = &self.inner.store;
        if delta.kind == TranscriptKind::Partial {
            store.set_interim_transcript(Some(delta.text));
            return;
        }
        let text = delta.text.trim();
        if text.is_empty() {
            return;
        }

        let entry = ConversationEntry::final_now(delta.role, text);
        let triggered = {
            let mut refs = self.lock();
            if refs.interview_id.is_none() {
                debug!("final transcript without an active interview; ignoring");
                return;
            }
            refs.conversation.push(entry.clone());
            delta.role == Role::Assistant
                && refs.round_type == RoundType::Technical
                && refs.detector.observe(text)
        };
        store.set_interim_transcript(None);
        store.append_transcript(entry);

        if triggered {
            self.hand_off().await;
        }
    }

    /// First trigger per call: stop the SDK call, then publish the detection.
    async fn hand_off(&self) {
        if !self.inner.trigger.claim() {
            debug!("coding trigger already fired for this interview");
            return;
        }
        info!("🧩 Coding question announced; handing off to the editor");
        if let Err(e) = self.inner.sdk.stop().await {
            warn!(error = %e, "failed to stop call for coding hand-off");
        }
        let conversation = self.lock().conversation.to_vec();
        self.inner
            .store
            .set_coding_question_detected(Some(CodingQuestionDetected {
                question: None,
                conversation,
            }));
    }

    /// Claim call-end handling for this epoch and run persistence in the background.
    fn finish_call(&self) {
        let (epoch, job) = {
            let mut refs = self.lock();
            if refs.finishing {
                return;
            }
            refs.finishing = true;
            (refs.epoch, self.persist_job(&refs))
        };
        self.inner.store.set_call_status(CallStatus::Ending);
        let adapter = self.clone();
        tokio::spawn(async move {
            if let Some(job) = job {
                adapter.persist(job).await;
            }
            adapter.cleanup(epoch);
        });
    }

    fn persist_job(&self, refs: &CallRefs) -> Option<PersistJob> {
        let interview_id = refs.interview_id.clone()?;
        let ended_at = Utc::now();
        let metadata = CallMetadata {
            interview_id: interview_id.clone(),
            call_id: refs.call_id.clone(),
            started_at: refs.call_started_at,
            ended_at,
            duration_secs: refs.call_started_at.map(|t| (ended_at - t).num_seconds()),
            expressions: self.inner.expressions.get_average_expressions(),
        };
        Some(PersistJob {
            interview_id,
            transcript: refs.conversation.to_vec(),
            metadata,
        })
    }

    /// Best effort: failures are logged and surfaced, never retried.
    async fn persist(&self, job: PersistJob) {
        let store = &self.inner.store;
        let backend = &self.inner.backend;
        let interview_id = job.interview_id.as_str();

        if job.transcript.is_empty() {
            debug!(interview_id, "no final turns; skipping transcript save");
        } else {
            match backend.save_transcript(interview_id, &job.transcript).await {
                Ok(()) => info!(interview_id, turns = job.transcript.len(), "💾 Transcript saved"),
                Err(e) => {
                    error!(interview_id, error = %e, "failed to save transcript");
                    store.set_error(Some(format!("Failed to save transcript: {}", e)));
                }
            }
        }

        if let Err(e) = backend.save_call_metadata(&job.metadata).await {
            error!(interview_id, error = %e, "failed to save call metadata");
            store.set_error(Some(format!("Failed to save call metadata: {}", e)));
        }
    }

    /// Reset call-scoped refs and go idle, unless this epoch was already torn down.
    fn cleanup(&self, epoch: u64) -> bool {
        {
            let mut refs = self.lock();
            if refs.epoch != epoch {
                debug!(epoch, "call already torn down");
                return false;
            }
            *refs = CallRefs {
                epoch: epoch + 1,
                ..CallRefs::default()
            };
        }
        self.inner.trigger.release();
        let store = &self.inner.store;
        store.set_coding_question_detected(None);
        store.set_call_status(CallStatus::Idle);
        info!("📴 Call torn down");
        true
    }

    fn clear_refs(&self) {
        let mut refs = self.lock();
        let epoch = refs.epoch + 1;
        *refs = CallRefs {
            epoch,
            ..CallRefs::default()
        };
    }

    /// Stop the call and wait for call-end handling, bounded by the stop timeout.
    ///
    /// Always resolves with the call `idle`. A handed-off call is ended outright.
    pub async fn stop_interview(&self) -> StopOutcome {
        let store = &self.inner.store;
        let (epoch, active) = {
            let refs = self.lock();
            (refs.epoch, refs.interview_id.is_some())
        };
        let status = store.read(|s| s.call_status);
        if !active && status == CallStatus::Idle {
            return StopOutcome::AlreadyIdle;
        }

        let mut rx = store.subscribe();
        if status == CallStatus::HandedOff {
            info!("🛑 Ending handed-off interview");
            store.set_coding_question_detected(None);
            self.finish_call();
        } else {
            info!("🛑 Stopping interview call");
            store.set_call_status(CallStatus::Ending);
            if let Err(e) = self.inner.sdk.stop().await {
                warn!(error = %e, "voice SDK stop failed");
            }
        }

        let limit = self.inner.config.timings.stop_call_timeout();
        let ended = tokio::time::timeout(limit, rx.wait_for(|s| s.call_status == CallStatus::Idle))
            .await
            .map(|waited| waited.is_ok());
        match ended {
            Ok(_) => StopOutcome::Ended,
            Err(_) => {
                warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "⏱️ No call-end in time; forcing teardown"
                );
                self.force_teardown(epoch);
                StopOutcome::TimedOut
            }
        }
    }

    /// End a handed-off interview (the coding modal was dismissed).
    pub async fn end_interview(&self) -> StopOutcome {
        self.stop_interview().await
    }

    fn force_teardown(&self, epoch: u64) {
        let job = {
            let mut refs = self.lock();
            if refs.epoch != epoch {
                return;
            }
            if refs.finishing {
                None
            } else {
                refs.finishing = true;
                self.persist_job(&refs)
            }
        };
        if let Some(job) = job {
            let adapter = self.clone();
            tokio::spawn(async move { adapter.persist(job).await });
        }
        self.cleanup(epoch);
    }

    /// Epoch and interview id of the call paused for a pending coding hand-off.
    fn paused_call(&self) -> InterviewResult<(u64, String)> {
        let (epoch, interview_id) = {
            let refs = self.lock();
            (refs.epoch, refs.interview_id.clone())
        };
        let interview_id = interview_id.ok_or_else(|| {
            InterviewError::InvalidState("no handed-off interview to resume".to_string())
        })?;
        if self.inner.store.read(|s| s.coding_question_detected.is_none()) {
            return Err(InterviewError::InvalidState("no coding hand-off pending".to_string()));
        }
        Ok((epoch, interview_id))
    }

    /// Continue a handed-off interview with a new system prompt and opening line.
    ///
    /// The coding trigger stays claimed, so the resumed call cannot hand off again. If the
    /// hand-off is closed or the call torn down during the resume pause, nothing is started.
    pub async fn resume_with_context(&self, context: ResumeContext) -> InterviewResult<()> {
        let assistant_id = self.inner.config.require_assistant_id()?;
        let (epoch, interview_id) = self.paused_call()?;

        tokio::time::sleep(self.inner.config.timings.resume_pause()).await;
        match self.paused_call() {
            Ok((now, _)) if now == epoch => {}
            _ => {
                info!(
                    interview_id = %interview_id,
                    "hand-off closed during the resume pause; not resuming"
                );
                return Ok(());
            }
        }

        info!(interview_id = %interview_id, "🔁 Resuming call with coding context");
        let store = &self.inner.store;
        store.set_call_status(CallStatus::Connecting);
        let options = CallOptions {
            system_prompt: Some(context.system_prompt),
            first_message: Some(context.first_message),
            metadata: json!({ "interviewId": interview_id, "resumed": true }),
            ..CallOptions::default()
        };
        if let Err(e) = self.inner.sdk.start(assistant_id, options).await {
            error!(interview_id = %interview_id, error = %e, "failed to resume call");
            store.set_error(Some(format!("Failed to resume interview: {}", e)));
            store.set_call_status(CallStatus::HandedOff);
            return Err(e);
        }
        Ok(())
    }
}
