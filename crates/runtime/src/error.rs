//! Error types for the ubus runtime.

use std::time::Duration;

use thiserror::Error;
use ubus_protocol::UbusStatus;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the ubus bridge.
#[derive(Debug, Error)]
pub enum Error {
	/// Connect and login did not complete within the configured window.
	#[error("could not connect to websocket within {}ms", .0.as_millis())]
	ConnectTimeout(Duration),

	/// Login was answered but no session token could be extracted.
	#[error("authentication failed: {0}")]
	AuthFailed(String),

	/// Transport-level error reported by the adapter.
	#[error("transport error: {0}")]
	Transport(String),

	/// The connection was closed, locally or by the daemon.
	#[error("connection closed{}", .0.map(|code| format!(" (code {})", code)).unwrap_or_default())]
	ConnectionClosed(Option<u16>),

	/// A call was submitted before the session was established.
	#[error("not ready, perform init")]
	NotReady,

	/// The response frame could not be interpreted.
	#[error("malformed response: {0}")]
	MalformedResponse(String),

	/// The adapter failed to transmit a request frame.
	#[error("failed to send request: {0}")]
	Send(String),

	/// JSON-RPC error object returned by the bridge.
	#[error("rpc error {code}: {message}")]
	Rpc { code: i64, message: String },

	/// Non-zero ubus status, produced by [`crate::CallOutcome::into_result`].
	#[error("{0}")]
	Remote(UbusStatus),

	/// Configuration rejected before connecting.
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	/// Completion handle dropped without a result.
	#[error("Channel closed unexpectedly")]
	ChannelClosed,

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns true if this is the connect timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::ConnectTimeout(_) | Error::Remote(UbusStatus::Timeout))
	}

	/// Returns true if the error means the connection is gone.
	pub fn is_connection_lost(&self) -> bool {
		matches!(self, Error::Transport(_) | Error::ConnectionClosed(_) | Error::ChannelClosed)
	}

	/// Returns the ubus status if this is a remote failure.
	pub fn status(&self) -> Option<UbusStatus> {
		match self {
			Error::Remote(status) => Some(*status),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display() {
		assert_eq!(
			Error::ConnectTimeout(Duration::from_millis(5000)).to_string(),
			"could not connect to websocket within 5000ms"
		);
		assert_eq!(Error::ConnectionClosed(Some(1006)).to_string(), "connection closed (code 1006)");
		assert_eq!(Error::ConnectionClosed(None).to_string(), "connection closed");
		assert_eq!(Error::Remote(UbusStatus::PermissionDenied).to_string(), "Permission denied");
	}

	#[test]
	fn test_classification() {
		assert!(Error::ConnectTimeout(Duration::from_secs(1)).is_timeout());
		assert!(Error::Remote(UbusStatus::Timeout).is_timeout());
		assert!(!Error::NotReady.is_timeout());
		assert!(Error::ConnectionClosed(None).is_connection_lost());
		assert!(!Error::NotReady.is_connection_lost());
		assert_eq!(Error::Remote(UbusStatus::NotFound).status(), Some(UbusStatus::NotFound));
	}
}
