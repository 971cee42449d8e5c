//! Transport abstraction for the realtime channel.
//!
//! A [`Connector`] opens one duplex connection and hands back a pair of channels: an outbound
//! sender for [`ClientEvent`]s and an inbound receiver of [`TransportEvent`]s. The connection is
//! closed when the outbound sender is dropped or the peer goes away.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use interview_core::{ClientEvent, InterviewError, InterviewResult, ServerEvent};
use tokio::sync::mpsc;

/// What a live connection delivers inbound.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Event(ServerEvent),
    /// Peer closed or the socket failed. Carries the reason when known.
    Closed(Option<String>),
}

/// One established connection.
pub struct Connection {
    pub outbound: mpsc::UnboundedSender<ClientEvent>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens connections for a user session.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, user_id: &str) -> InterviewResult<Connection>;
}

#[derive(Default)]
struct LoopbackState {
    connects: u32,
    fail_remaining: u32,
    fail_always: bool,
    sent: Vec<ClientEvent>,
    outbound_rx: Vec<mpsc::UnboundedReceiver<ClientEvent>>,
    inbound_tx: Option<mpsc::UnboundedSender<TransportEvent>>,
}

/// In-process connector: records what the client sends and lets the caller inject server events.
#[derive(Clone, Default)]
pub struct LoopbackConnector {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` connection attempts.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_remaining = n;
    }

    pub fn fail_always(&self, fail: bool) {
        self.lock().fail_always = fail;
    }

    pub fn connect_count(&self) -> u32 {
        self.lock().connects
    }

    /// Everything the client has sent so far, oldest first.
    pub fn sent(&self) -> Vec<ClientEvent> {
        let mut state = self.lock();
        let mut drained = Vec::new();
        for rx in state.outbound_rx.iter_mut() {
            while let Ok(event) = rx.try_recv() {
                drained.push(event);
            }
        }
        state.sent.extend(drained);
        state.sent.clone()
    }

    /// Deliver a server event on the live connection. Returns `false` when nothing is connected.
    pub fn push(&self, event: ServerEvent) -> bool {
        match self.lock().inbound_tx {
            Some(ref tx) => tx.send(TransportEvent::Event(event)).is_ok(),
            None => false,
        }
    }

    /// Simulate the peer dropping the live connection.
    pub fn drop_connection(&self, reason: &str) {
        if let Some(tx) = self.lock().inbound_tx.take() {
            let _ = tx.send(TransportEvent::Closed(Some(reason.to_string())));
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, user_id: &str) -> InterviewResult<Connection> {
        let mut state = self.lock();
        state.connects += 1;
        if state.fail_always || state.fail_remaining > 0 {
            state.fail_remaining = state.fail_remaining.saturating_sub(1);
            return Err(InterviewError::Connection(format!("loopback refused user {}", user_id)));
        }

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        state.outbound_rx.push(out_rx);
        state.inbound_tx = Some(in_tx);
        Ok(Connection {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
