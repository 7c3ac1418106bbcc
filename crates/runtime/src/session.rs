//! Login handshake.
//!
//! Builds the `session.login` frame and interprets the daemon's answer.

use ubus_protocol::{LoginArgs, Request, Response, SessionInfo, UbusStatus};

use crate::error::{Error, Result};

/// Text frame of the login call.
pub(crate) fn login_frame(args: &LoginArgs) -> Result<String> {
	Ok(Request::login(args)?.to_text()?)
}

/// Extracts the session from the login response.
///
/// Any failure is reported as [`Error::AuthFailed`] carrying the mapped status
/// label, or the bridge's error message for JSON-RPC errors.
pub(crate) fn login_outcome(text: &str) -> Result<SessionInfo> {
	let response = Response::parse(text)
		.map_err(|_| Error::AuthFailed(format!("{}: response is not valid JSON", UbusStatus::UnknownError.label())))?;

	if let Some(error) = &response.error {
		return Err(Error::AuthFailed(error.message.clone()));
	}

	let Some((status, payload)) = response.status() else {
		return Err(Error::AuthFailed(UbusStatus::UnknownError.label().to_string()));
	};

	if !status.is_ok() {
		return Err(Error::AuthFailed(status.label().to_string()));
	}

	payload
		.cloned()
		.and_then(|payload| serde_json::from_value::<SessionInfo>(payload).ok())
		.ok_or_else(|| Error::AuthFailed(format!("{}: no session token in response", UbusStatus::UnknownError.label())))
}
