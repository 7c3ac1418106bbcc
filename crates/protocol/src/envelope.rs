//! JSON-RPC 2.0 envelopes as spoken by the ubus WebSocket bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::{LOGIN_METHOD, LoginArgs, SESSION_OBJECT, UNAUTHENTICATED_SESSION};
use crate::status::UbusStatus;

pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing request envelope.
///
/// `params` always starts with the session token; the remaining positional
/// parameters depend on `method` (`call` takes object, method and arguments).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
	pub jsonrpc: String,
	/// Call identifier. The login request is sent without one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<u64>,
	pub method: String,
	pub params: Vec<Value>,
}

impl Request {
	/// Builds a request, prepending `session` to `params`.
	pub fn new(id: Option<u64>, method: impl Into<String>, session: &str, params: Vec<Value>) -> Self {
		let mut bound = Vec::with_capacity(params.len() + 1);
		bound.push(Value::String(session.to_string()));
		bound.extend(params);

		Self {
			jsonrpc: JSONRPC_VERSION.to_string(),
			id,
			method: method.into(),
			params: bound,
		}
	}

	/// The `session.login` call made with the placeholder session.
	pub fn login(args: &LoginArgs) -> serde_json::Result<Self> {
		let args = serde_json::to_value(args)?;
		Ok(Self::new(
			None,
			"call",
			UNAUTHENTICATED_SESSION,
			vec![Value::from(SESSION_OBJECT), Value::from(LOGIN_METHOD), args],
		))
	}

	/// Serializes the envelope into a text frame.
	pub fn to_text(&self) -> serde_json::Result<String> {
		serde_json::to_string(self)
	}
}

/// JSON-RPC error object, returned by the bridge for envelope-level failures
/// such as an expired session or an unknown method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

/// Incoming response envelope.
///
/// Fields are optional so that any JSON object parses; callers decide which
/// omissions are fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub jsonrpc: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorObject>,
}

impl Response {
	pub fn parse(text: &str) -> serde_json::Result<Self> {
		serde_json::from_str(text)
	}

	/// Call identifier, accepting both `7` and `"7"`.
	pub fn call_id(&self) -> Option<u64> {
		match self.id.as_ref()? {
			Value::Number(n) => n.as_u64(),
			Value::String(s) => s.trim().parse().ok(),
			_ => None,
		}
	}

	/// Status and payload from the `[code, payload]` result pair.
	///
	/// Returns `None` when `result` is absent or not an array led by an integer.
	/// The payload is `None` for bare `[code]` results.
	pub fn status(&self) -> Option<(UbusStatus, Option<&Value>)> {
		let pair = self.result.as_ref()?.as_array()?;
		let code = pair.first()?.as_i64()?;
		Some((UbusStatus::from_code(code), pair.get(1)))
	}
}
