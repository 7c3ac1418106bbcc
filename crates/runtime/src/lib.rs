//! ubus Runtime - session, dispatch and response correlation
//!
//! This crate drives a ubus JSON-RPC session over a WebSocket bridge:
//!
//! - **Transport**: WebSocket with the `ubus-json` sub-protocol, or an
//!   in-memory pair for tests
//! - **Session**: `session.login` handshake bounded by a connect timeout
//! - **Dispatch**: id allocation and a concurrency cap with a FIFO overflow
//!   queue
//! - **Correlation**: matching responses to calls by id, including frames
//!   that are not valid JSON
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Client         public handle │
//! └──────┬───────────────────────┘
//!        │ submit / close
//! ┌──────▼───────────────────────┐
//! │ Engine        phase machine  │
//! │  ┌────────────┐ ┌──────────┐ │
//! │  │ Dispatcher │ │Correlator│ │
//! │  └────────────┘ └──────────┘ │
//! └──────┬───────────────▲───────┘
//!        │ commands      │ events
//! ┌──────▼───────────────┴───────┐
//! │ Transport  writer / reader   │
//! └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! let config = ClientConfig::for_host("192.168.1.1", 80, "root", "secret");
//! let client = Client::connect(config).await?;
//! let board = client.invoke("system", "board", json!({})).await?;
//! ```

pub mod call;
pub mod config;
pub mod connection;
mod correlator;
mod dispatcher;
mod engine;
pub mod error;
mod session;
pub mod transport;

// Re-export key types at crate root
pub use call::{CallOutcome, CloseOutcome, UbusCall};
pub use config::{ClientConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_IN_FLIGHT, UBUS_SUBPROTOCOL};
pub use connection::{Client, ResponseFuture};
pub use engine::Diagnostic;
pub use error::{Error, Result};
pub use transport::{
	ConnectTarget, Connector, MemoryConnector, MemoryPeer, TransportEvent, TransportParts, TransportSender,
	WebSocketConnector,
};
pub use ubus_protocol::{SessionInfo, UbusStatus};
