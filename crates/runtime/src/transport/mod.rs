//! Transport layer for ubus frames.
//!
//! A transport moves JSON text frames in both directions and reports what
//! happens to the underlying connection. It knows nothing about envelopes,
//! sessions or call ids.
//!
//! - [`Connector`] opens a transport. A successful connect is the "open" event.
//! - [`TransportSender`] transmits frames and closes the connection.
//! - [`TransportEvent`]s arrive on an unbounded channel, in order.
//!
//! Two implementations ship with the crate: [`WebSocketConnector`] for real
//! daemons and [`MemoryConnector`] for driving the engine in tests.

mod memory;
mod websocket;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;

pub use memory::{MemoryConnector, MemoryPeer};
pub use websocket::{WebSocketConnector, WebSocketSender};

use crate::config::ClientConfig;
use crate::error::Result;

/// Boxed future returned by transport operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
	/// A text frame from the peer.
	Message(String),
	/// The connection failed. No further events follow.
	Error(String),
	/// The connection was closed, with the close code when one was sent.
	Closed(Option<u16>),
}

/// Handshake parameters for opening a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
	pub url: String,
	pub subprotocol: String,
	pub origin: String,
}

impl From<&ClientConfig> for ConnectTarget {
	fn from(config: &ClientConfig) -> Self {
		Self {
			url: config.url.clone(),
			subprotocol: config.subprotocol.clone(),
			origin: config.origin().to_string(),
		}
	}
}

/// Sending half of an open transport.
pub trait TransportSender: Send {
	/// Transmits one text frame.
	fn send(&mut self, frame: String) -> TransportFuture<'_, ()>;

	/// Starts a graceful close. The peer's acknowledgement arrives as
	/// [`TransportEvent::Closed`].
	fn close(&mut self) -> TransportFuture<'_, ()>;
}

/// An open transport split into its sender and its event stream.
pub struct TransportParts {
	pub sender: Box<dyn TransportSender>,
	pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens transports.
pub trait Connector: Send + Sync {
	fn connect<'a>(&'a self, target: &'a ConnectTarget) -> TransportFuture<'a, TransportParts>;
}
