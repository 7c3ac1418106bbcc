//! Connection state machine.
//!
//! One [`Engine`] holds all mutable state of a connection: the phase, the
//! session, and the dispatcher. Transport events enter through
//! [`Engine::on_event`], which branches on the phase so that exactly one
//! handler interprets each frame:
//!
//! ```text
//! AwaitingAuth --login ok--> Active --close/error--> Closed
//!      |                                               ^
//!      +-------------login failed / timeout------------+
//! ```
//!
//! The engine never awaits. Frames to transmit go to the writer task as
//! [`Command`]s over an unbounded channel.

use tokio::sync::{broadcast, mpsc, oneshot};
use ubus_protocol::{LoginArgs, SessionInfo};

use crate::call::{CallOutcome, CloseOutcome, UbusCall};
use crate::correlator;
use crate::dispatcher::{Dispatcher, OutboundFrame};
use crate::error::{Error, Result};
use crate::session;
use crate::transport::TransportEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
	AwaitingAuth,
	Active,
	Closed,
}

/// Instruction for the writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
	/// Transmit a frame. `id` is `None` for the login request.
	Frame { id: Option<u64>, text: String },
	/// Close the transport and stop writing.
	Close,
}

/// Connection-level events no caller could be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
	/// A frame was not valid JSON and carried no recoverable id.
	UnparseableFrame { frame: String },
	/// A response did not match any pending call. `id` is `None` when the frame
	/// had no usable id at all.
	UnmatchedResponse { id: Option<u64> },
}

pub(crate) struct Engine {
	phase: Phase,
	session: Option<SessionInfo>,
	dispatcher: Dispatcher,
	login: Option<oneshot::Sender<Result<SessionInfo>>>,
	commands: mpsc::UnboundedSender<Command>,
	diagnostics: broadcast::Sender<Diagnostic>,
}

impl Engine {
	pub fn new(
		max_in_flight: usize,
		commands: mpsc::UnboundedSender<Command>,
		diagnostics: broadcast::Sender<Diagnostic>,
	) -> Self {
		Self {
			phase: Phase::AwaitingAuth,
			session: None,
			dispatcher: Dispatcher::new(max_in_flight),
			login: None,
			commands,
			diagnostics,
		}
	}

	/// Called once the transport is open. Sends the login call unless a
	/// session already exists and returns the handle that settles with it.
	pub fn begin_login(&mut self, args: &LoginArgs) -> Result<oneshot::Receiver<Result<SessionInfo>>> {
		if self.phase == Phase::Closed {
			return Err(Error::ConnectionClosed(None));
		}

		let (sender, receiver) = oneshot::channel();
		if let Some(info) = &self.session {
			let _ = sender.send(Ok(info.clone()));
			return Ok(receiver);
		}

		let text = session::login_frame(args)?;
		self.login = Some(sender);
		tracing::debug!(username = %args.username, "Sending session login");
		self.send_command(Command::Frame { id: None, text });
		Ok(receiver)
	}

	/// Single entry point for transport events.
	pub fn on_event(&mut self, event: TransportEvent) {
		match event {
			TransportEvent::Message(text) => match self.phase {
				Phase::AwaitingAuth => self.on_login_response(&text),
				Phase::Active => self.on_call_response(&text),
				Phase::Closed => tracing::debug!("Ignoring frame received after close"),
			},
			TransportEvent::Error(reason) => {
				tracing::error!(%reason, "Transport error");
				self.shutdown(&|| Error::Transport(reason.clone()));
			}
			TransportEvent::Closed(code) => {
				tracing::info!(?code, "Connection closed");
				self.shutdown(&|| Error::ConnectionClosed(code));
			}
		}
	}

	fn on_login_response(&mut self, text: &str) {
		match session::login_outcome(text) {
			Ok(info) => {
				tracing::debug!(session = %info.token(), "Session established");
				self.session = Some(info.clone());
				self.phase = Phase::Active;
				if let Some(login) = self.login.take() {
					let _ = login.send(Ok(info));
				}
			}
			Err(e) => {
				tracing::error!(error = %e, "Login rejected");
				let login = self.login.take();
				self.shutdown(&|| Error::ConnectionClosed(None));
				if let Some(login) = login {
					let _ = login.send(Err(e));
				}
			}
		}
	}

	fn on_call_response(&mut self, text: &str) {
		match correlator::correlate(text) {
			Ok(correlated) => {
				let id = correlated.id;
				match self.dispatcher.settle(id, correlated.outcome) {
					Some(released) => self.transmit(released),
					None => {
						tracing::warn!(id, "Inconsistent response: no pending call with this id");
						self.emit(Diagnostic::UnmatchedResponse { id: Some(id) });
					}
				}
			}
			Err(diagnostic) => {
				match &diagnostic {
					Diagnostic::UnparseableFrame { frame } => {
						tracing::error!(%frame, "Unparseable frame with no recoverable id")
					}
					Diagnostic::UnmatchedResponse { .. } => tracing::warn!("Response without a usable id"),
				}
				self.emit(diagnostic);
			}
		}
	}

	/// Registers a call. Fails without side effects unless the session is
	/// active.
	pub fn submit(&mut self, call: &UbusCall) -> Result<(u64, oneshot::Receiver<Result<CallOutcome>>)> {
		let token = match (&self.phase, &self.session) {
			(Phase::Active, Some(info)) => info.token().to_string(),
			_ => return Err(Error::NotReady),
		};

		let submission = self
			.dispatcher
			.submit(|id| Ok(call.to_request(id, &token).to_text()?))?;

		match submission.transmit {
			Some(frame) => self.transmit(vec![frame]),
			None => tracing::debug!(
				id = submission.id,
				queued = self.dispatcher.queued(),
				"Concurrency cap reached, queueing call"
			),
		}

		Ok((submission.id, submission.receiver))
	}

	/// Reported by the writer when a frame could not be transmitted.
	pub fn on_send_failed(&mut self, id: Option<u64>, error: Error) {
		let reason = match error {
			Error::Send(reason) => reason,
			other => other.to_string(),
		};

		match id {
			Some(id) => {
				tracing::warn!(id, %reason, "Failed to send call");
				if let Some(released) = self.dispatcher.settle(id, Err(Error::Send(reason))) {
					self.transmit(released);
				}
			}
			None => {
				tracing::error!(%reason, "Failed to send login");
				let login = self.login.take();
				self.shutdown(&|| Error::Send(reason.clone()));
				if let Some(login) = login {
					let _ = login.send(Err(Error::Send(reason)));
				}
			}
		}
	}

	/// Closes an active session.
	pub fn close(&mut self) -> CloseOutcome {
		if self.phase != Phase::Active {
			return CloseOutcome::NotOpen;
		}

		tracing::info!("Closing connection");
		self.shutdown(&|| Error::ConnectionClosed(None));
		CloseOutcome::Closed
	}

	/// Gives up on a login that did not finish in time.
	pub fn abandon(&mut self) {
		if self.phase == Phase::AwaitingAuth {
			self.login = None;
			self.shutdown(&|| Error::ConnectionClosed(None));
		}
	}

	/// Moves to `Closed`, fails everything outstanding and stops the writer.
	fn shutdown(&mut self, error: &dyn Fn() -> Error) {
		let previous = std::mem::replace(&mut self.phase, Phase::Closed);

		if let Some(login) = self.login.take() {
			let _ = login.send(Err(error()));
		}

		let failed = self.dispatcher.fail_all(error);
		if failed > 0 {
			tracing::warn!(failed, "Failed outstanding calls on shutdown");
		}

		if previous != Phase::Closed {
			self.send_command(Command::Close);
		}
	}

	fn transmit(&self, frames: Vec<OutboundFrame>) {
		for frame in frames {
			self.send_command(Command::Frame {
				id: Some(frame.id),
				text: frame.text,
			});
		}
	}

	fn send_command(&self, command: Command) {
		if self.commands.send(command).is_err() {
			tracing::debug!("Writer is gone, dropping command");
		}
	}

	fn emit(&self, diagnostic: Diagnostic) {
		// No subscribers is fine.
		let _ = self.diagnostics.send(diagnostic);
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	pub fn session(&self) -> Option<&SessionInfo> {
		self.session.as_ref()
	}

	pub fn dispatcher(&self) -> &Dispatcher {
		&self.dispatcher
	}
}
