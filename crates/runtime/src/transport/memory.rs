//! In-process transport backed by channels.
//!
//! [`MemoryConnector`] hands the client one end; [`MemoryPeer`] plays the
//! daemon on the other. Frames the client sends show up on the peer, and the
//! peer injects replies and connection events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{ConnectTarget, Connector, TransportEvent, TransportFuture, TransportParts, TransportSender};
use crate::error::Error;

/// Normal closure code echoed when the client closes.
const NORMAL_CLOSURE: u16 = 1000;

/// Connector that yields a single pre-built in-memory transport.
pub struct MemoryConnector {
	parts: Mutex<Option<TransportParts>>,
	target: Arc<Mutex<Option<ConnectTarget>>>,
	refusal: Option<String>,
}

/// Daemon side of a [`MemoryConnector`].
pub struct MemoryPeer {
	sent: mpsc::UnboundedReceiver<String>,
	events: mpsc::UnboundedSender<TransportEvent>,
	fail_sends: Arc<AtomicBool>,
	closed: Arc<AtomicBool>,
	target: Arc<Mutex<Option<ConnectTarget>>>,
}

struct MemorySender {
	sent: mpsc::UnboundedSender<String>,
	events: mpsc::UnboundedSender<TransportEvent>,
	fail_sends: Arc<AtomicBool>,
	closed: Arc<AtomicBool>,
}

impl MemoryConnector {
	pub fn new() -> (Self, MemoryPeer) {
		let (sent_tx, sent_rx) = mpsc::unbounded_channel();
		let (events_tx, events_rx) = mpsc::unbounded_channel();
		let fail_sends = Arc::new(AtomicBool::new(false));
		let closed = Arc::new(AtomicBool::new(false));
		let target = Arc::new(Mutex::new(None));

		let sender = MemorySender {
			sent: sent_tx,
			events: events_tx.clone(),
			fail_sends: Arc::clone(&fail_sends),
			closed: Arc::clone(&closed),
		};

		let connector = Self {
			parts: Mutex::new(Some(TransportParts {
				sender: Box::new(sender),
				events: events_rx,
			})),
			target: Arc::clone(&target),
			refusal: None,
		};

		let peer = MemoryPeer {
			sent: sent_rx,
			events: events_tx,
			fail_sends,
			closed,
			target,
		};

		(connector, peer)
	}

	/// Connector whose connect attempt fails with `reason`.
	pub fn refusing(reason: impl Into<String>) -> Self {
		Self {
			parts: Mutex::new(None),
			target: Arc::new(Mutex::new(None)),
			refusal: Some(reason.into()),
		}
	}
}

impl Connector for MemoryConnector {
	fn connect<'a>(&'a self, target: &'a ConnectTarget) -> TransportFuture<'a, TransportParts> {
		Box::pin(async move {
			if let Some(reason) = &self.refusal {
				return Err(Error::Transport(reason.clone()));
			}

			*self.target.lock() = Some(target.clone());
			self.parts
				.lock()
				.take()
				.ok_or_else(|| Error::Transport("memory transport already connected".into()))
		})
	}
}

impl TransportSender for MemorySender {
	fn send(&mut self, frame: String) -> TransportFuture<'_, ()> {
		Box::pin(async move {
			if self.fail_sends.load(Ordering::SeqCst) {
				return Err(Error::Send("memory transport refused frame".into()));
			}
			if self.closed.load(Ordering::SeqCst) {
				return Err(Error::Send("memory transport is closed".into()));
			}
			self.sent.send(frame).map_err(|_| Error::Send("peer dropped".into()))
		})
	}

	fn close(&mut self) -> TransportFuture<'_, ()> {
		Box::pin(async move {
			if !self.closed.swap(true, Ordering::SeqCst) {
				let _ = self.events.send(TransportEvent::Closed(Some(NORMAL_CLOSURE)));
			}
			Ok(())
		})
	}
}

impl MemoryPeer {
	/// Waits for the next frame sent by the client.
	pub async fn next_frame(&mut self) -> Option<String> {
		self.sent.recv().await
	}

	/// Next frame if one is already buffered.
	pub fn try_next_frame(&mut self) -> Option<String> {
		self.sent.try_recv().ok()
	}

	/// Delivers a text frame to the client.
	pub fn reply(&self, frame: impl Into<String>) {
		self.inject(TransportEvent::Message(frame.into()));
	}

	/// Delivers an arbitrary connection event to the client.
	pub fn inject(&self, event: TransportEvent) {
		let _ = self.events.send(event);
	}

	/// Makes every following send fail until reset.
	pub fn fail_sends(&self, fail: bool) {
		self.fail_sends.store(fail, Ordering::SeqCst);
	}

	/// Whether the client closed the transport.
	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}

	/// Handshake parameters the client connected with.
	pub fn target(&self) -> Option<ConnectTarget> {
		self.target.lock().clone()
	}
}
