//! Interview Session Store: the single shared state container.
//!
//! All components read and write session state through [`SessionStore`] exclusively. State is
//! published over a `tokio::sync::watch` channel; consumers either subscribe to the whole state or
//! use [`SessionStore::watch_slice`] to react only when a selected slice changes. Every setter is a
//! synchronous state transition and notifies subscribers only when something actually changed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::coding::{CodeExecutionResult, CodingProblem, CodingQuestionDetected};
use crate::model::{is_coding_phase, AnswerEvaluation, InterviewQuestion, InterviewStateSnapshot};
use crate::transcript::ConversationEntry;

/// Voice call lifecycle as shown to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    #[default]
    Idle,
    Connecting,
    Active,
    Ending,
    /// Call stopped for a coding hand-off; call metadata is kept for the resume.
    HandedOff,
}

/// Everything the UI observes about the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub connected: bool,
    pub connection_error: Option<String>,
    pub interview_state: Option<InterviewStateSnapshot>,
    pub current_question: Option<InterviewQuestion>,
    pub last_evaluation: Option<AnswerEvaluation>,
    pub show_feedback: bool,
    pub coding_problem: Option<CodingProblem>,
    pub execution_result: Option<CodeExecutionResult>,
    pub transcript: Vec<ConversationEntry>,
    pub interim_transcript: Option<String>,
    pub is_code_editor_open: bool,
    pub call_status: CallStatus,
    pub assistant_speaking: bool,
    pub coding_question_detected: Option<CodingQuestionDetected>,
    pub error: Option<String>,
}

impl SessionState {
    pub fn current_code(&self) -> Option<&str> {
        self.coding_problem.as_ref().map(|p| p.current_code.as_str())
    }

    pub fn interview_id(&self) -> Option<&str> {
        self.interview_state.as_ref().map(|s| s.interview_id.as_str())
    }
}

/// Handle to the shared session state. Cloning is cheap; all clones share one state.
#[derive(Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<SessionState>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Read a value out of the current state without cloning all of it.
    pub fn read<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    /// Watch one slice of state; yields only when the selected value changes.
    pub fn watch_slice<T, F>(&self, selector: F) -> SliceWatch<T, F>
    where
        T: PartialEq + Clone,
        F: Fn(&SessionState) -> T,
    {
        let rx = self.tx.subscribe();
        let last = selector(&rx.borrow());
        SliceWatch { rx, selector, last }
    }

    fn update(&self, f: impl FnOnce(&mut SessionState) -> bool) {
        self.tx.send_if_modified(f);
    }

    /// Replace the snapshot wholesale. Opens the editor when the new phase is a coding phase
    /// and a coding problem is already present.
    pub fn set_interview_state(&self, snapshot: Option<InterviewStateSnapshot>) {
        self.update(|s| {
            let open_editor =
                snapshot.as_ref().is_some_and(is_coding_phase) && s.coding_problem.is_some();
            let changed = s.interview_state != snapshot || (open_editor && !s.is_code_editor_open);
            s.interview_state = snapshot;
            if open_editor {
                s.is_code_editor_open = true;
            }
            changed
        });
    }

    /// Install (or clear) the coding problem. A new problem gets normalized starter code, opens
    /// the editor and discards any stale execution result.
    pub fn set_coding_problem(&self, problem: Option<CodingProblem>) {
        self.update(|s| {
            match problem {
                Some(mut p) => {
                    let code = p.normalized_starter_code();
                    p.starter_code = code.clone();
                    p.current_code = code;
                    s.coding_problem = Some(p);
                    s.is_code_editor_open = true;
                }
                None => {
                    s.coding_problem = None;
                }
            }
            s.execution_result = None;
            true
        });
    }

    /// Replacing the question always invalidates the previous evaluation.
    pub fn set_current_question(&self, question: Option<InterviewQuestion>) {
        self.update(|s| {
            let changed =
                s.current_question != question || s.last_evaluation.is_some() || s.show_feedback;
            s.current_question = question;
            s.last_evaluation = None;
            s.show_feedback = false;
            changed
        });
    }

    pub fn set_last_evaluation(&self, evaluation: Option<AnswerEvaluation>) {
        self.update(|s| {
            s.show_feedback = evaluation.is_some();
            s.last_evaluation = evaluation;
            true
        });
    }

    pub fn set_show_feedback(&self, show: bool) {
        self.update(|s| {
            let changed = s.show_feedback != show;
            s.show_feedback = show;
            changed
        });
    }

    /// Editor keystroke. No-op without a problem.
    pub fn update_current_code(&self, code: &str) {
        self.update(|s| match s.coding_problem.as_mut() {
            Some(p) if p.current_code != code => {
                p.current_code = code.to_string();
                true
            }
            _ => false,
        });
    }

    /// Replace the last execution result; pass counters are folded into the problem.
    pub fn set_execution_result(&self, result: Option<CodeExecutionResult>) {
        self.update(|s| {
            if let (Some(r), Some(p)) = (result.as_ref(), s.coding_problem.as_mut()) {
                if !r.test_results.is_empty() {
                    p.tests_passed = r.tests_passed();
                    p.tests_total = r.tests_total();
                }
            }
            s.execution_result = result;
            true
        });
    }

    pub fn record_hint_used(&self, hints_remaining: u32) {
        self.update(|s| match s.coding_problem.as_mut() {
            Some(p) => {
                p.hints_used += 1;
                p.hints_available = hints_remaining;
                true
            }
            None => false,
        });
    }

    pub fn set_code_editor_open(&self, open: bool) {
        self.update(|s| {
            let changed = s.is_code_editor_open != open;
            s.is_code_editor_open = open;
            changed
        });
    }

    pub fn append_transcript(&self, entry: ConversationEntry) {
        self.update(|s| {
            s.transcript.push(entry);
            true
        });
    }

    pub fn set_interim_transcript(&self, text: Option<String>) {
        self.update(|s| {
            let changed = s.interim_transcript != text;
            s.interim_transcript = text;
            changed
        });
    }

    pub fn set_connected(&self, connected: bool) {
        self.update(|s| {
            let changed = s.connected != connected || (connected && s.connection_error.is_some());
            s.connected = connected;
            if connected {
                s.connection_error = None;
            }
            changed
        });
    }

    /// Connectivity failure: record the message and mark the transport disconnected.
    pub fn set_connection_error(&self, message: Option<String>) {
        self.update(|s| {
            if message.is_some() {
                s.connected = false;
            }
            s.connection_error = message;
            true
        });
    }

    pub fn set_call_status(&self, status: CallStatus) {
        self.update(|s| {
            let changed = s.call_status != status;
            s.call_status = status;
            if status == CallStatus::Idle {
                s.assistant_speaking = false;
                s.interim_transcript = None;
            }
            changed
        });
    }

    pub fn set_speaking(&self, speaking: bool) {
        self.update(|s| {
            let changed = s.assistant_speaking != speaking;
            s.assistant_speaking = speaking;
            changed
        });
    }

    pub fn set_coding_question_detected(&self, detected: Option<CodingQuestionDetected>) {
        self.update(|s| {
            let changed = s.coding_question_detected != detected;
            s.coding_question_detected = detected;
            changed
        });
    }

    /// User-visible error string (persistence, hand-off and SDK failures).
    pub fn set_error(&self, message: Option<String>) {
        self.update(|s| {
            let changed = s.error != message;
            s.error = message;
            changed
        });
    }

    /// Restore interview-scoped fields to their initial values. Transport connectivity belongs
    /// to the user session and survives.
    pub fn reset(&self) {
        debug!("session store reset");
        self.update(|s| {
            let fresh = SessionState {
                connected: s.connected,
                connection_error: s.connection_error.clone(),
                ..SessionState::default()
            };
            let changed = *s != fresh;
            *s = fresh;
            changed
        });
    }
}

/// Subscription to one selected slice of [`SessionState`].
pub struct SliceWatch<T, F> {
    rx: watch::Receiver<SessionState>,
    selector: F,
    last: T,
}

impl<T, F> SliceWatch<T, F>
where
    T: PartialEq + Clone,
    F: Fn(&SessionState) -> T,
{
    pub fn current(&self) -> &T {
        &self.last
    }

    /// Wait for the slice to change. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            self.rx.changed().await.ok()?;
            let next = (self.selector)(&self.rx.borrow_and_update());
            if next != self.last {
                self.last = next.clone();
                return Some(next);
            }
        }
    }
}
