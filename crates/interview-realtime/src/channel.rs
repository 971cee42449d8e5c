//! Realtime Channel Client.
//!
//! Owns exactly one transport connection per user session, independent of which interview is
//! active. Room membership is a second, independent concern keyed on the interview id, so
//! switching interviews never reconnects the transport.
//!
//! Inbound server events are dispatched into the [`SessionStore`]. Outbound UI-sync events are
//! dropped, not queued, while the transport is down.

use std::sync::{Arc, Mutex};

use interview_core::events::{CodeUpdatePayload, ExpressionUpdatePayload};
use interview_core::{
    ClientEvent, ConversationEntry, ExpressionFrame, Role, ServerEvent, SessionStore, Timings,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::transport::{Connection, Connector, TransportEvent};

#[derive(Default)]
struct ChannelState {
    enabled: bool,
    user_id: Option<String>,
    /// Room the client wants to be in.
    room: Option<String>,
    /// Room joined on the live connection.
    joined: Option<String>,
    outbound: Option<mpsc::UnboundedSender<ClientEvent>>,
    connecting: bool,
    /// Bumped whenever a connect cycle starts or the connection is torn down on purpose;
    /// background tasks from an older epoch stand down.
    epoch: u64,
}

struct Inner {
    store: SessionStore,
    connector: Arc<dyn Connector>,
    timings: Timings,
    state: Mutex<ChannelState>,
}

/// Handle to the realtime channel. Clones share one connection.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<Inner>,
}

impl RealtimeChannel {
    pub fn new(store: SessionStore, connector: Arc<dyn Connector>, timings: Timings) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                connector,
                timings,
                state: Mutex::new(ChannelState::default()),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChannelState> {
        self.inner.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.lock().outbound.is_some()
    }

    pub fn current_room(&self) -> Option<String> {
        self.lock().room.clone()
    }

    /// Enable or disable the channel. Re-enabling after the reconnect budget ran out starts a
    /// fresh connect cycle.
    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut state = self.lock();
            if state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
            if !enabled {
                self.teardown(&mut state);
            }
        }
        self.reconcile();
    }

    /// Set the authenticated user. A different user gets a different connection.
    pub fn set_user(&self, user_id: Option<String>) {
        {
            let mut state = self.lock();
            if state.user_id == user_id {
                return;
            }
            state.user_id = user_id;
            self.teardown(&mut state);
        }
        self.reconcile();
    }

    /// Move room membership to `interview_id`: leave the previous room, then join the new one.
    pub fn set_interview(&self, interview_id: Option<String>) {
        let mut state = self.lock();
        if state.room == interview_id {
            return;
        }
        state.room = interview_id.clone();

        let Some(outbound) = state.outbound.clone() else {
            debug!(room = ?interview_id, "not connected; room will be joined on connect");
            return;
        };
        if let Some(previous) = state.joined.take() {
            info!(interview_id = %previous, "🚪 Leaving interview room");
            let _ = outbound.send(ClientEvent::leave(previous));
        }
        if let Some(next) = interview_id {
            info!(interview_id = %next, "🚪 Joining interview room");
            let _ = outbound.send(ClientEvent::join(next.clone()));
            state.joined = Some(next);
        }
    }

    /// Forward an editor change. Dropped when disconnected or outside a room.
    pub fn emit_code_update(&self, code: &str, language: &str) -> bool {
        let Some(interview_id) = self.current_room() else {
            debug!("no active room; dropping code_update");
            return false;
        };
        self.emit(ClientEvent::CodeUpdate(CodeUpdatePayload {
            interview_id,
            code: code.to_string(),
            language: language.to_string(),
        }))
    }

    /// Forward one expression sample. Dropped when disconnected or outside a room.
    pub fn emit_expression_update(&self, expressions: ExpressionFrame) -> bool {
        let Some(interview_id) = self.current_room() else {
            debug!("no active room; dropping expression_update");
            return false;
        };
        self.emit(ClientEvent::ExpressionUpdate(ExpressionUpdatePayload {
            interview_id,
            expressions,
        }))
    }

    fn emit(&self, event: ClientEvent) -> bool {
        let state = self.lock();
        match state.outbound {
            Some(ref tx) => tx.send(event).is_ok(),
            None => {
                debug!(event = event.name(), "not connected; dropping event");
                false
            }
        }
    }

    /// Drop the connection for good (application shutdown).
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.enabled = false;
        self.teardown(&mut state);
    }

    fn teardown(&self, state: &mut ChannelState) {
        state.epoch += 1;
        state.connecting = false;
        state.joined = None;
        if state.outbound.take().is_some() {
            info!("🔌 Realtime channel disconnected");
        }
        self.inner.store.set_connected(false);
    }

    /// Start a connect cycle when `enabled && user_id` and nothing is connected or connecting.
    fn reconcile(&self) {
        let (epoch, user_id) = {
            let mut state = self.lock();
            if !state.enabled || state.outbound.is_some() || state.connecting {
                return;
            }
            let Some(user_id) = state.user_id.clone() else {
                return;
            };
            state.epoch += 1;
            state.connecting = true;
            (state.epoch, user_id)
        };
        let channel = self.clone();
        tokio::spawn(async move { channel.connect_cycle(epoch, user_id).await });
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.lock().epoch == epoch
    }

    /// Up to `reconnect_attempts` tries with a fixed delay; then stay down until re-enabled.
    async fn connect_cycle(self, epoch: u64, user_id: String) {
        let attempts = self.inner.timings.reconnect_attempts.max(1);
        for attempt in 1..=attempts {
            if !self.is_current(epoch) {
                return;
            }
            match self.inner.connector.connect(&user_id).await {
                Ok(conn) => {
                    self.install(epoch, conn);
                    return;
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "realtime connect failed");
                    if self.is_current(epoch) {
                        self.inner.store.set_connection_error(Some(e.to_string()));
                    }
                    if attempt < attempts {
                        tokio::time::sleep(self.inner.timings.reconnect_delay()).await;
                    }
                }
            }
        }

        let mut state = self.lock();
        if state.epoch == epoch {
            state.connecting = false;
            error!(attempts, "realtime channel giving up; waiting for re-enable");
        }
    }

    fn install(&self, epoch: u64, conn: Connection) {
        let Connection { outbound, inbound } = conn;
        {
            let mut state = self.lock();
            if state.epoch != epoch {
                debug!("stale connection attempt; discarding");
                return;
            }
            state.connecting = false;
            if let Some(ref room) = state.room {
                let _ = outbound.send(ClientEvent::join(room.clone()));
                state.joined = Some(room.clone());
            }
            state.outbound = Some(outbound);
        }
        self.inner.store.set_connected(true);
        info!("✅ Realtime channel connected");

        let channel = self.clone();
        tokio::spawn(async move { channel.read_loop(epoch, inbound).await });
    }

    async fn read_loop(self, epoch: u64, mut inbound: mpsc::UnboundedReceiver<TransportEvent>) {
        let reason = loop {
            match inbound.recv().await {
                Some(TransportEvent::Event(event)) => {
                    if !self.is_current(epoch) {
                        return;
                    }
                    dispatch(&self.inner.store, event);
                }
                Some(TransportEvent::Closed(reason)) => break reason,
                None => break None,
            }
        };

        {
            let mut state = self.lock();
            if state.epoch != epoch {
                return;
            }
            state.outbound = None;
            state.joined = None;
        }
        let message = reason.unwrap_or_else(|| "realtime connection closed".to_string());
        warn!(reason = %message, "realtime connection lost; reconnecting");
        self.inner.store.set_connection_error(Some(message));
        self.reconcile();
    }
}

/// Apply one inbound server event to the store.
pub fn dispatch(store: &SessionStore, event: ServerEvent) {
    debug!(event = event.name(), "inbound realtime event");
    match event {
        ServerEvent::StateUpdate(snapshot) => {
            store.set_interview_state(Some(snapshot));
        }
        ServerEvent::QuestionAsked(question) => {
            let entry = ConversationEntry::final_now(Role::Assistant, question.text.clone());
            store.set_current_question(Some(question));
            store.append_transcript(entry);
        }
        ServerEvent::AnswerEvaluated(payload) => {
            if let Some(answer) = payload.answer.filter(|a| !a.trim().is_empty()) {
                store.append_transcript(ConversationEntry::final_now(Role::User, answer));
            }
            store.set_last_evaluation(Some(payload.evaluation));
        }
        ServerEvent::CodingProblemAssigned(problem) => {
            info!(problem_id = %problem.problem_id, "🧩 Coding problem assigned");
            store.set_coding_problem(Some(problem));
        }
        ServerEvent::CodeExecuted(result) => {
            store.set_execution_result(Some(result));
        }
        ServerEvent::Error(payload) => {
            warn!(message = %payload.message, "server reported error");
            store.set_error(Some(payload.message));
        }
    }
}
