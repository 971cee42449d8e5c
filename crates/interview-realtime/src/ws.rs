//! WebSocket transport built on `tungstenite`.
//!
//! Uses a dedicated thread per connection since the socket is blocking. The thread polls the
//! socket with a short read timeout and drains the outbound queue between reads.

use std::io::ErrorKind;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use interview_core::{ClientEvent, InterviewError, InterviewResult, ServerEvent, SyncConfig};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::transport::{Connection, Connector, TransportEvent};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Connects to the interview backend's realtime endpoint.
pub struct WsConnector {
    url: String,
    api_token: Option<String>,
}

impl WsConnector {
    pub fn new(url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            api_token,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.realtime_url.clone(), config.api_token.clone())
    }

    fn endpoint(&self, user_id: &str) -> InterviewResult<url::Url> {
        let mut url = url::Url::parse(&self.url).map_err(|e| {
            InterviewError::Config(format!("invalid realtime_url {}: {}", self.url, e))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("userId", user_id);
            if let Some(ref token) = self.api_token {
                query.append_pair("token", token);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, user_id: &str) -> InterviewResult<Connection> {
        let url = self.endpoint(user_id)?;
        let (ready_tx, ready_rx) = oneshot::channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name("realtime-ws".to_string())
            .spawn(move || run_socket(url, ready_tx, out_rx, in_tx))
            .map_err(|e| {
                InterviewError::Transport(format!("failed to spawn socket thread: {}", e))
            })?;

        ready_rx.await.map_err(|_| {
            InterviewError::ChannelClosed("socket thread exited before handshake".to_string())
        })??;

        Ok(Connection {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

fn set_read_timeout(socket: &Socket, timeout: Duration) -> std::io::Result<()> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(stream) => stream.set_read_timeout(Some(timeout)),
        MaybeTlsStream::NativeTls(stream) => stream.get_ref().set_read_timeout(Some(timeout)),
        _ => Ok(()),
    }
}

fn run_socket(
    url: url::Url,
    ready: oneshot::Sender<InterviewResult<()>>,
    mut outbound: mpsc::UnboundedReceiver<ClientEvent>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
) {
    let mut socket = match tungstenite::connect(url.as_str()) {
        Ok((socket, _response)) => socket,
        Err(e) => {
            let _ = ready.send(Err(InterviewError::Connection(e.to_string())));
            return;
        }
    };
    if let Err(e) = set_read_timeout(&socket, POLL_INTERVAL) {
        let _ = ready.send(Err(InterviewError::Transport(e.to_string())));
        return;
    }
    info!(host = url.host_str().unwrap_or(""), "🔌 Realtime socket connected");
    if ready.send(Ok(())).is_err() {
        let _ = socket.close(None);
        return;
    }

    loop {
        loop {
            match outbound.try_recv() {
                Ok(event) => {
                    let frame = match event.to_json() {
                        Ok(f) => f,
                        Err(e) => {
                            warn!(
                                event = event.name(),
                                error = %e,
                                "dropping unserializable event"
                            );
                            continue;
                        }
                    };
                    if let Err(e) = socket.send(Message::text(frame)) {
                        let _ = inbound.send(TransportEvent::Closed(Some(e.to_string())));
                        return;
                    }
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    debug!("outbound closed; closing socket");
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return;
                }
            }
        }

        match socket.read() {
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| f.reason.to_string()).filter(|r| !r.is_empty());
                let _ = inbound.send(TransportEvent::Closed(reason));
                return;
            }
            Ok(msg) if msg.is_text() => {
                let Ok(text) = msg.to_text() else { continue };
                match ServerEvent::from_json(text) {
                    Ok(event) => {
                        if inbound.send(TransportEvent::Event(event)).is_err() {
                            let _ = socket.close(None);
                            return;
                        }
                    }
                    Err(e) => warn!(error = %e, "ignoring unrecognized realtime frame"),
                }
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => {
                let _ = inbound.send(TransportEvent::Closed(Some(e.to_string())));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_carries_user_and_token() {
        let connector = WsConnector::new("ws://localhost:9000/ws", Some("tok".into()));
        let url = connector.endpoint("user 1").unwrap();
        assert_eq!(url.as_str(), "ws://localhost:9000/ws?userId=user+1&token=tok");
    }

    #[test]
    fn invalid_url_is_config_error() {
        let connector = WsConnector::new("not a url", None);
        assert!(matches!(connector.endpoint("u"), Err(InterviewError::Config(_))));
    }

    #[tokio::test]
    async fn refused_connection_is_an_error() {
        // Port 9 (discard) is essentially never listening for websockets locally.
        let connector = WsConnector::new("ws://127.0.0.1:9/ws", None);
        assert!(connector.connect("u").await.is_err());
    }
}
