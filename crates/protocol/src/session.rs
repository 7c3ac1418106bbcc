//! Payloads of the `session` ubus object.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder session id used before login. ubusd grants it access to
/// `session.login` only.
pub const UNAUTHENTICATED_SESSION: &str = "00000000000000000000000000000000";

/// Object and method used to authenticate.
pub const SESSION_OBJECT: &str = "session";
pub const LOGIN_METHOD: &str = "login";

/// Arguments of `session.login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginArgs {
	pub username: String,
	pub password: String,
}

/// Result of a successful `session.login`, found in `result[1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
	/// Session token to pass as the first parameter of every later call.
	pub ubus_rpc_session: String,
	/// Idle timeout in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timeout: Option<u64>,
	/// Seconds until the session expires.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires: Option<u64>,
	/// Access control lists granted to the session.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub acls: Option<Value>,
	/// Session data such as the username.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
}

impl SessionInfo {
	pub fn token(&self) -> &str {
		&self.ubus_rpc_session
	}
}
