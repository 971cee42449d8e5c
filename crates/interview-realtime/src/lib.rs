//! # Interview Realtime - duplex event channel to the interview backend
//!
//! One persistent connection per authenticated user session; interview rooms are joined and
//! left on that connection without reconnecting the transport.

pub mod channel;
pub mod debounce;
pub mod transport;
pub mod ws;

pub use channel::{dispatch, RealtimeChannel};
pub use debounce::{CodeEdit, CodeUpdateDebouncer};
pub use transport::{Connection, Connector, LoopbackConnector, TransportEvent};
pub use ws::WsConnector;
