//! Calls submitted by users and what they resolve to.

use std::fmt;

use serde_json::Value;
use ubus_protocol::{Request, UbusStatus};

use crate::error::{Error, Result};

/// A ubus invocation, minus the session token which is bound at submission.
#[derive(Debug, Clone, PartialEq)]
pub struct UbusCall {
	method: String,
	params: Vec<Value>,
	expected_result: Option<Value>,
}

impl UbusCall {
	/// Raw form: JSON-RPC `method` and the positional parameters that follow
	/// the session token.
	pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
		Self {
			method: method.into(),
			params,
			expected_result: None,
		}
	}

	/// `call` of `method` on `object` with `args`.
	pub fn call(object: impl Into<String>, method: impl Into<String>, args: Value) -> Self {
		Self::new("call", vec![Value::String(object.into()), Value::String(method.into()), args])
	}

	/// `list` of objects matching `pattern` (`*` for all).
	pub fn list(pattern: impl Into<String>) -> Self {
		Self::new("list", vec![Value::String(pattern.into())])
	}

	/// Attaches the payload the caller expects. Informational only; the engine
	/// never acts on it.
	pub fn expect(mut self, expected: Value) -> Self {
		self.expected_result = Some(expected);
		self
	}

	pub fn method(&self) -> &str {
		&self.method
	}

	pub fn params(&self) -> &[Value] {
		&self.params
	}

	pub fn expected_result(&self) -> Option<&Value> {
		self.expected_result.as_ref()
	}

	pub(crate) fn to_request(&self, id: u64, session: &str) -> Request {
		Request::new(Some(id), self.method.as_str(), session, self.params.clone())
	}
}

/// How the daemon answered a call.
///
/// A non-zero status is a resolved outcome, not an [`Error`]; use
/// [`CallOutcome::into_result`] to fold it into one.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
	/// Status 0 with the payload from `result[1]` (`null` when absent).
	Success(Value),
	/// Non-zero status.
	Failed(UbusStatus),
}

impl CallOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, CallOutcome::Success(_))
	}

	pub fn status(&self) -> UbusStatus {
		match self {
			CallOutcome::Success(_) => UbusStatus::Ok,
			CallOutcome::Failed(status) => *status,
		}
	}

	pub fn payload(&self) -> Option<&Value> {
		match self {
			CallOutcome::Success(payload) => Some(payload),
			CallOutcome::Failed(_) => None,
		}
	}

	/// Payload on success, [`Error::Remote`] otherwise.
	pub fn into_result(self) -> Result<Value> {
		match self {
			CallOutcome::Success(payload) => Ok(payload),
			CallOutcome::Failed(status) => Err(Error::Remote(status)),
		}
	}

	/// Whether a successful payload contains every field of `expected`.
	///
	/// Objects match when each expected key matches recursively; anything else
	/// must be equal.
	pub fn matches(&self, expected: &Value) -> bool {
		match self {
			CallOutcome::Success(payload) => contains(payload, expected),
			CallOutcome::Failed(_) => false,
		}
	}
}

fn contains(actual: &Value, expected: &Value) -> bool {
	match (actual, expected) {
		(Value::Object(actual), Value::Object(expected)) => expected
			.iter()
			.all(|(key, value)| actual.get(key).is_some_and(|found| contains(found, value))),
		_ => actual == expected,
	}
}

impl fmt::Display for CallOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CallOutcome::Success(payload) => write!(f, "{}", payload),
			CallOutcome::Failed(status) => write!(f, "{}", status),
		}
	}
}

/// Result of [`crate::Client::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
	/// The session was active and the transport has been asked to close.
	Closed,
	/// There was no active session.
	NotOpen,
}

impl fmt::Display for CloseOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CloseOutcome::Closed => f.write_str("Socket closed"),
			CloseOutcome::NotOpen => f.write_str("No socket open!"),
		}
	}
}
