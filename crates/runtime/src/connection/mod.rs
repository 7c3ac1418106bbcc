//! Client handle and the tasks that drive a connection.
//!
//! # Message Flow
//!
//! 1. [`Client::connect_with`] opens the transport, queues the login frame and
//!    spawns a writer and a reader task
//! 2. The reader feeds every transport event into the engine
//! 3. Once the login response is in, the session is active and the handle is
//!    returned
//! 4. [`Client::submit`] registers a call with the engine, which either hands
//!    its frame to the writer or queues it behind the concurrency cap
//! 5. The response is correlated by id and delivered through a oneshot
//!    channel, freeing a slot for the next queued call


use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use ubus_protocol::{LoginArgs, SessionInfo};

use crate::call::{CallOutcome, CloseOutcome, UbusCall};
use crate::config::ClientConfig;
use crate::engine::{Command, Diagnostic, Engine, Phase};
use crate::error::{Error, Result};
use crate::transport::{ConnectTarget, Connector, TransportEvent, TransportSender, WebSocketConnector};

/// Diagnostics buffered per subscriber before the oldest are dropped.
const DIAGNOSTIC_CAPACITY: usize = 64;

/// Authenticated ubus session over one transport.
///
/// Cloning is cheap and every clone drives the same connection. The
/// connection is closed when the last clone is dropped.
#[derive(Clone)]
pub struct Client {
	inner: Arc<Shared>,
}

struct Shared {
	engine: Arc<Mutex<Engine>>,
	diagnostics: broadcast::Sender<Diagnostic>,
	config: ClientConfig,
}

impl Drop for Shared {
	fn drop(&mut self) {
		self.engine.lock().close();
	}
}

impl Client {
	/// Connects over WebSocket and logs in.
	pub async fn connect(config: ClientConfig) -> Result<Self> {
		Self::connect_with(&WebSocketConnector, config).await
	}

	/// Connects through `connector` and logs in.
	///
	/// Opening the transport and the login round trip share the
	/// `connect_timeout` window. On timeout the transport is closed and a late
	/// login response is ignored.
	pub async fn connect_with<C>(connector: &C, config: ClientConfig) -> Result<Self>
	where
		C: Connector + ?Sized,
	{
		config.validate()?;
		let target = ConnectTarget::from(&config);
		tracing::info!(url = %target.url, "trying to open websocket connection");

		let (commands_tx, commands_rx) = mpsc::unbounded_channel();
		let (diagnostics, _) = broadcast::channel(DIAGNOSTIC_CAPACITY);
		let engine = Arc::new(Mutex::new(Engine::new(
			config.max_in_flight,
			commands_tx,
			diagnostics.clone(),
		)));

		let args = LoginArgs {
			username: config.username.clone(),
			password: config.password.clone(),
		};

		let handshake = {
			let engine = Arc::clone(&engine);
			async move {
				let parts = connector.connect(&target).await?;
				tracing::info!("websocket connection established");

				let login = engine.lock().begin_login(&args)?;
				tokio::spawn(write_loop(Arc::clone(&engine), commands_rx, parts.sender));
				tokio::spawn(read_loop(engine, parts.events));

				login.await.map_err(|_| Error::ChannelClosed)?
			}
		};

		match tokio::time::timeout(config.connect_timeout, handshake).await {
			Ok(Ok(info)) => {
				tracing::info!(session = %info.token(), "session established");
				Ok(Self {
					inner: Arc::new(Shared {
						engine,
						diagnostics,
						config,
					}),
				})
			}
			Ok(Err(e)) => {
				engine.lock().abandon();
				Err(e)
			}
			Err(_) => {
				tracing::info!(
					timeout_ms = config.connect_timeout.as_millis() as u64,
					"could not connect to websocket within timeout"
				);
				engine.lock().abandon();
				Err(Error::ConnectTimeout(config.connect_timeout))
			}
		}
	}

	/// Registers `call` and returns a future for its outcome.
	///
	/// Fails immediately with [`Error::NotReady`] once the session is closed.
	/// The call is sent right away if a slot is free and queued otherwise.
	pub fn submit(&self, call: UbusCall) -> Result<ResponseFuture> {
		let (id, rx) = self.inner.engine.lock().submit(&call)?;
		tracing::debug!(id, method = call.method(), "Submitted call");
		Ok(ResponseFuture { id, rx })
	}

	/// Submits `call` and waits for its outcome.
	pub async fn call(&self, call: UbusCall) -> Result<CallOutcome> {
		self.submit(call)?.await
	}

	/// Calls `method` on `object` and folds a non-zero status into the error.
	pub async fn invoke(&self, object: &str, method: &str, args: Value) -> Result<Value> {
		self.call(UbusCall::call(object, method, args)).await?.into_result()
	}

	/// Lists objects matching `pattern` with their method signatures.
	pub async fn list(&self, pattern: &str) -> Result<Value> {
		self.call(UbusCall::list(pattern)).await?.into_result()
	}

	/// Closes the session. Pending and queued calls fail with
	/// [`Error::ConnectionClosed`].
	pub fn close(&self) -> CloseOutcome {
		self.inner.engine.lock().close()
	}

	pub fn is_ready(&self) -> bool {
		self.inner.engine.lock().phase() == Phase::Active
	}

	/// The session obtained at login.
	pub fn session(&self) -> Option<SessionInfo> {
		self.inner.engine.lock().session().cloned()
	}

	/// Calls transmitted and not yet answered.
	pub fn in_flight(&self) -> usize {
		self.inner.engine.lock().dispatcher().in_flight()
	}

	/// Calls waiting for a free slot.
	pub fn queued(&self) -> usize {
		self.inner.engine.lock().dispatcher().queued()
	}

	/// Calls not yet settled, in flight or queued.
	pub fn pending(&self) -> usize {
		self.inner.engine.lock().dispatcher().pending()
	}

	/// Subscribes to connection diagnostics emitted from now on.
	pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<Diagnostic> {
		self.inner.diagnostics.subscribe()
	}

	pub fn config(&self) -> &ClientConfig {
		&self.inner.config
	}
}

impl fmt::Debug for Client {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Client")
			.field("url", &self.inner.config.url)
			.field("ready", &self.is_ready())
			.finish_non_exhaustive()
	}
}

/// Outcome of a submitted call.
///
/// Dropping it does not cancel the call; the response is still consumed and
/// its slot released.
pub struct ResponseFuture {
	id: u64,
	rx: oneshot::Receiver<Result<CallOutcome>>,
}

impl ResponseFuture {
	/// Id the call was sent with.
	pub fn id(&self) -> u64 {
		self.id
	}
}

impl Future for ResponseFuture {
	type Output = Result<CallOutcome>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.rx)
			.poll(cx)
			.map(|result| result.map_err(|_| Error::ChannelClosed).and_then(|r| r))
	}
}

impl fmt::Debug for ResponseFuture {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ResponseFuture").field("id", &self.id).finish()
	}
}

/// Drains writer commands into the transport until told to close.
async fn write_loop(
	engine: Arc<Mutex<Engine>>,
	mut commands: mpsc::UnboundedReceiver<Command>,
	mut sender: Box<dyn TransportSender>,
) {
	while let Some(command) = commands.recv().await {
		match command {
			Command::Frame { id, text } => {
				match id {
					Some(id) => tracing::debug!(id, frame = %text, "Sending frame"),
					// Carries the password.
					None => tracing::debug!("Sending login frame"),
				}

				if let Err(e) = sender.send(text).await {
					engine.lock().on_send_failed(id, e);
				}
			}
			Command::Close => {
				if let Err(e) = sender.close().await {
					tracing::warn!(error = %e, "Failed to close transport");
				}
				break;
			}
		}
	}
	tracing::debug!("Writer stopped");
}

/// Feeds transport events into the engine until the connection ends.
async fn read_loop(engine: Arc<Mutex<Engine>>, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
	while let Some(event) = events.recv().await {
		let terminal = matches!(event, TransportEvent::Error(_) | TransportEvent::Closed(_));
		engine.lock().on_event(event);
		if terminal {
			tracing::debug!("Reader stopped");
			return;
		}
	}

	engine.lock().on_event(TransportEvent::Closed(None));
	tracing::debug!("Reader stopped, event stream ended");
}
