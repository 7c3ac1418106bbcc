//! Client configuration.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

/// WebSocket sub-protocol spoken by the ubus bridge.
pub const UBUS_SUBPROTOCOL: &str = "ubus-json";

/// Default window for connect + login.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default number of calls allowed in flight at once.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 5;

/// Where to connect and how to authenticate.
#[derive(Clone)]
pub struct ClientConfig {
	/// WebSocket URL of the bridge, e.g. `ws://192.168.1.1:80`.
	pub url: String,
	pub username: String,
	pub password: String,
	/// Value of `Sec-WebSocket-Protocol`.
	pub subprotocol: String,
	/// Value of the `Origin` header. Defaults to `url`.
	pub origin: Option<String>,
	/// Applies to transport open and login together.
	pub connect_timeout: Duration,
	/// Concurrency cap. Calls beyond it wait in a FIFO queue.
	pub max_in_flight: usize,
}

impl ClientConfig {
	pub fn new(url: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			username: username.into(),
			password: password.into(),
			subprotocol: UBUS_SUBPROTOCOL.to_string(),
			origin: None,
			connect_timeout: DEFAULT_CONNECT_TIMEOUT,
			max_in_flight: DEFAULT_MAX_IN_FLIGHT,
		}
	}

	/// Plain `ws://` URL from host and port.
	pub fn for_host(host: &str, port: u16, username: impl Into<String>, password: impl Into<String>) -> Self {
		Self::new(format!("ws://{}:{}", host, port), username, password)
	}

	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
		self.max_in_flight = max_in_flight;
		self
	}

	pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
		self.origin = Some(origin.into());
		self
	}

	pub fn with_subprotocol(mut self, subprotocol: impl Into<String>) -> Self {
		self.subprotocol = subprotocol.into();
		self
	}

	/// `Origin` header value sent during the handshake.
	pub fn origin(&self) -> &str {
		self.origin.as_deref().unwrap_or(&self.url)
	}

	/// Rejects configurations that could never make progress.
	pub fn validate(&self) -> Result<()> {
		if self.max_in_flight == 0 {
			return Err(Error::InvalidConfig("max_in_flight must be at least 1".into()));
		}
		if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
			return Err(Error::InvalidConfig(format!("expected a ws:// or wss:// url, got '{}'", self.url)));
		}
		Ok(())
	}
}

impl fmt::Debug for ClientConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ClientConfig")
			.field("url", &self.url)
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.field("subprotocol", &self.subprotocol)
			.field("origin", &self.origin)
			.field("connect_timeout", &self.connect_timeout)
			.field("max_in_flight", &self.max_in_flight)
			.finish()
	}
}
