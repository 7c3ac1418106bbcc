//! Call dispatcher: id allocation, pending calls and admission control.
//!
//! The dispatcher is plain state. It never touches the transport; every
//! operation that frees capacity returns the frames that may now be sent, and
//! the caller hands them to the writer.

use std::collections::{HashMap, HashSet, VecDeque};

use tokio::sync::oneshot;

use crate::call::CallOutcome;
use crate::error::{Error, Result};

/// Single-use completion handle of a pending call.
pub(crate) type Completion = oneshot::Sender<Result<CallOutcome>>;

/// A serialized, session-bound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutboundFrame {
	pub id: u64,
	pub text: String,
}

/// What [`Dispatcher::submit`] produced.
pub(crate) struct Submission {
	pub id: u64,
	pub receiver: oneshot::Receiver<Result<CallOutcome>>,
	/// Present when a slot was free; `None` means the call was queued.
	pub transmit: Option<OutboundFrame>,
}

pub(crate) struct Dispatcher {
	next_id: u64,
	max_in_flight: usize,
	/// Ids transmitted and not yet answered. Its size is the in-flight count.
	in_flight: HashSet<u64>,
	pending: HashMap<u64, Completion>,
	queue: VecDeque<OutboundFrame>,
}

impl Dispatcher {
	pub fn new(max_in_flight: usize) -> Self {
		Self {
			next_id: 0,
			max_in_flight,
			in_flight: HashSet::new(),
			pending: HashMap::new(),
			queue: VecDeque::new(),
		}
	}

	/// Registers a call and either claims a slot for it or queues it.
	///
	/// `encode` turns the allocated id into the wire frame. If it fails nothing
	/// is registered, though the id stays consumed.
	pub fn submit(&mut self, encode: impl FnOnce(u64) -> Result<String>) -> Result<Submission> {
		let id = self.next_id;
		self.next_id += 1;

		let text = encode(id)?;
		let (sender, receiver) = oneshot::channel();

		assert!(!self.pending.contains_key(&id), "call id {} registered twice", id);
		self.pending.insert(id, sender);

		let frame = OutboundFrame { id, text };
		let transmit = if self.in_flight.len() < self.max_in_flight {
			self.in_flight.insert(id);
			Some(frame)
		} else {
			self.queue.push_back(frame);
			None
		};

		Ok(Submission { id, receiver, transmit })
	}

	/// Moves queued frames into free slots, oldest first.
	pub fn drain(&mut self) -> Vec<OutboundFrame> {
		let mut released = Vec::new();
		while self.in_flight.len() < self.max_in_flight {
			let Some(frame) = self.queue.pop_front() else {
				break;
			};
			self.in_flight.insert(frame.id);
			released.push(frame);
		}
		released
	}

	/// Settles the call `id` with `outcome` and releases its slot.
	///
	/// Returns `None` if no such call is pending, otherwise the frames released
	/// by the freed slot.
	pub fn settle(&mut self, id: u64, outcome: Result<CallOutcome>) -> Option<Vec<OutboundFrame>> {
		let completion = self.pending.remove(&id)?;

		if completion.send(outcome).is_err() {
			tracing::warn!(id, "Caller dropped call handle before the response arrived");
		} else {
			tracing::debug!(id, "Resolved call");
		}

		if self.in_flight.remove(&id) {
			Some(self.drain())
		} else {
			self.queue.retain(|frame| frame.id != id);
			Some(Vec::new())
		}
	}

	/// Fails every pending and queued call. Returns how many were failed.
	pub fn fail_all(&mut self, error: &dyn Fn() -> Error) -> usize {
		let failed = self.pending.len();
		for (_, completion) in self.pending.drain() {
			let _ = completion.send(Err(error()));
		}
		self.in_flight.clear();
		self.queue.clear();
		failed
	}

	pub fn in_flight(&self) -> usize {
		self.in_flight.len()
	}

	pub fn queued(&self) -> usize {
		self.queue.len()
	}

	pub fn pending(&self) -> usize {
		self.pending.len()
	}

	#[cfg(test)]
	pub fn is_pending(&self, id: u64) -> bool {
		self.pending.contains_key(&id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn submit(dispatcher: &mut Dispatcher) -> Submission {
		dispatcher.submit(|id| Ok(format!("frame-{}", id))).unwrap()
	}

	fn ids(frames: &[OutboundFrame]) -> Vec<u64> {
		frames.iter().map(|f| f.id).collect()
	}

	#[test]
	fn test_ids_are_monotonic_from_zero() {
		let mut dispatcher = Dispatcher::new(5);
		let allocated: Vec<u64> = (0..4).map(|_| submit(&mut dispatcher).id).collect();
		assert_eq!(allocated, vec![0, 1, 2, 3]);
	}

	#[test]
	fn test_encode_failure_registers_nothing() {
		let mut dispatcher = Dispatcher::new(5);
		let result = dispatcher.submit(|_| Err(Error::MalformedResponse("boom".into())));
		assert!(result.is_err());
		assert_eq!(dispatcher.pending(), 0);
		assert_eq!(dispatcher.in_flight(), 0);

		assert_eq!(submit(&mut dispatcher).id, 1);
	}

	#[test]
	fn test_cap_queues_in_fifo_order() {
		let mut dispatcher = Dispatcher::new(2);
		let subs: Vec<Submission> = (0..5).map(|_| submit(&mut dispatcher)).collect();

		assert!(subs[0].transmit.is_some());
		assert!(subs[1].transmit.is_some());
		assert!(subs[2..].iter().all(|s| s.transmit.is_none()));
		assert_eq!(dispatcher.in_flight(), 2);
		assert_eq!(dispatcher.queued(), 3);
		assert_eq!(dispatcher.pending(), 5);

		let released = dispatcher.settle(0, Ok(CallOutcome::Success(json!(null)))).unwrap();
		assert_eq!(ids(&released), vec![2]);
		assert_eq!(dispatcher.in_flight(), 2);

		let released = dispatcher.settle(1, Ok(CallOutcome::Success(json!(null)))).unwrap();
		assert_eq!(ids(&released), vec![3]);

		let released = dispatcher.settle(3, Ok(CallOutcome::Success(json!(null)))).unwrap();
		assert_eq!(ids(&released), vec![4]);
		assert_eq!(dispatcher.queued(), 0);
		assert_eq!(dispatcher.in_flight(), 2);
	}

	#[test]
	fn test_drain_fills_all_free_slots() {
		let mut dispatcher = Dispatcher::new(3);
		let _subs: Vec<Submission> = (0..6).map(|_| submit(&mut dispatcher)).collect();

		// Free every slot without draining, as after a burst of failures.
		dispatcher.in_flight.clear();
		let released = dispatcher.drain();
		assert_eq!(ids(&released), vec![3, 4, 5]);
		assert_eq!(dispatcher.in_flight(), 3);
		assert!(dispatcher.drain().is_empty());
	}

	#[tokio::test]
	async fn test_settle_delivers_outcome() {
		let mut dispatcher = Dispatcher::new(1);
		let sub = submit(&mut dispatcher);

		dispatcher.settle(sub.id, Ok(CallOutcome::Success(json!({"up": true})))).unwrap();
		let outcome = sub.receiver.await.unwrap().unwrap();
		assert_eq!(outcome, CallOutcome::Success(json!({"up": true})));
		assert!(!dispatcher.is_pending(sub.id));
	}

	#[test]
	fn test_settle_unknown_id() {
		let mut dispatcher = Dispatcher::new(1);
		let _sub = submit(&mut dispatcher);

		assert!(dispatcher.settle(42, Ok(CallOutcome::Success(json!(null)))).is_none());
		assert_eq!(dispatcher.in_flight(), 1);
		assert_eq!(dispatcher.pending(), 1);
	}

	#[test]
	fn test_settle_twice_is_noop() {
		let mut dispatcher = Dispatcher::new(1);
		let sub = submit(&mut dispatcher);

		assert!(dispatcher.settle(sub.id, Err(Error::Send("x".into()))).is_some());
		assert!(dispatcher.settle(sub.id, Err(Error::Send("x".into()))).is_none());
		assert_eq!(dispatcher.in_flight(), 0);
	}

	#[test]
	fn test_settle_queued_call_keeps_counter() {
		let mut dispatcher = Dispatcher::new(1);
		let _first = submit(&mut dispatcher);
		let queued = submit(&mut dispatcher);

		let released = dispatcher.settle(queued.id, Err(Error::MalformedResponse("x".into()))).unwrap();
		assert!(released.is_empty());
		assert_eq!(dispatcher.in_flight(), 1);
		assert_eq!(dispatcher.queued(), 0);
	}

	#[tokio::test]
	async fn test_fail_all() {
		let mut dispatcher = Dispatcher::new(1);
		let first = submit(&mut dispatcher);
		let second = submit(&mut dispatcher);

		assert_eq!(dispatcher.fail_all(&|| Error::ConnectionClosed(None)), 2);
		assert_eq!(dispatcher.in_flight(), 0);
		assert_eq!(dispatcher.queued(), 0);
		assert_eq!(dispatcher.pending(), 0);

		assert!(matches!(first.receiver.await.unwrap(), Err(Error::ConnectionClosed(None))));
		assert!(matches!(second.receiver.await.unwrap(), Err(Error::ConnectionClosed(None))));
	}
}
