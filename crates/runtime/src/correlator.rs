//! Response correlation.
//!
//! Turns an inbound frame into the call id it answers and the outcome for that
//! call, or into a [`Diagnostic`] when no caller can be identified.

use serde_json::Value;
use ubus_protocol::{Response, recover_id};

use crate::call::CallOutcome;
use crate::engine::Diagnostic;
use crate::error::{Error, Result};

const NOT_JSON: &str = "response is not valid JSON";

/// A frame matched to a call id.
#[derive(Debug)]
pub(crate) struct Correlated {
	pub id: u64,
	pub outcome: Result<CallOutcome>,
}

pub(crate) fn correlate(text: &str) -> std::result::Result<Correlated, Diagnostic> {
	let response = match Response::parse(text) {
		Ok(response) => response,
		Err(e) => {
			tracing::debug!(error = %e, "Response is not valid JSON, recovering id");
			return match recover_id(text) {
				Some(id) => Ok(Correlated {
					id,
					outcome: Err(Error::MalformedResponse(NOT_JSON.to_string())),
				}),
				None => Err(Diagnostic::UnparseableFrame { frame: text.to_string() }),
			};
		}
	};

	let Some(id) = response.call_id() else {
		return Err(Diagnostic::UnmatchedResponse { id: None });
	};

	Ok(Correlated {
		id,
		outcome: outcome_of(&response),
	})
}

fn outcome_of(response: &Response) -> Result<CallOutcome> {
	if let Some(error) = &response.error {
		return Err(Error::Rpc {
			code: error.code,
			message: error.message.clone(),
		});
	}

	match response.status() {
		Some((status, payload)) if status.is_ok() => Ok(CallOutcome::Success(payload.cloned().unwrap_or(Value::Null))),
		Some((status, _)) => Ok(CallOutcome::Failed(status)),
		None => Err(Error::MalformedResponse("missing [code, payload] result".to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use ubus_protocol::UbusStatus;

	#[test]
	fn test_success_payload() {
		let correlated = correlate(r#"{"jsonrpc":"2.0","id":4,"result":[0,{"online":true}]}"#).unwrap();
		assert_eq!(correlated.id, 4);
		assert_eq!(correlated.outcome.unwrap(), CallOutcome::Success(json!({"online": true})));
	}

	#[test]
	fn test_success_without_payload() {
		let correlated = correlate(r#"{"id":1,"result":[0]}"#).unwrap();
		assert_eq!(correlated.outcome.unwrap(), CallOutcome::Success(Value::Null));
	}

	#[test]
	fn test_nonzero_code_resolves_with_status() {
		for (code, label) in [(1, "Invalid command"), (4, "Not found"), (7, "Request timed out")] {
			let text = json!({"id": 2, "result": [code]}).to_string();
			let outcome = correlate(&text).unwrap().outcome.unwrap();
			assert_eq!(outcome.status().label(), label);
			assert!(!outcome.is_success());
		}

		let outcome = correlate(r#"{"id":2,"result":[99,{}]}"#).unwrap().outcome.unwrap();
		assert_eq!(outcome, CallOutcome::Failed(UbusStatus::Unrecognized(99)));
	}

	#[test]
	fn test_invalid_json_recovers_id() {
		let correlated = correlate(r#"{"jsonrpc":"2.0","id":"3","result":[0,{"x":}"#).unwrap();
		assert_eq!(correlated.id, 3);
		match correlated.outcome {
			Err(Error::MalformedResponse(message)) => assert_eq!(message, "response is not valid JSON"),
			other => panic!("Expected MalformedResponse, got {:?}", other),
		}
	}

	#[test]
	fn test_invalid_json_without_id() {
		match correlate("<html>502 Bad Gateway</html>") {
			Err(Diagnostic::UnparseableFrame { frame }) => assert!(frame.contains("502")),
			other => panic!("Expected UnparseableFrame, got {:?}", other),
		}
	}

	#[test]
	fn test_valid_json_without_id() {
		assert!(matches!(
			correlate(r#"{"jsonrpc":"2.0","result":[0]}"#),
			Err(Diagnostic::UnmatchedResponse { id: None })
		));
	}

	#[test]
	fn test_rpc_error_rejects() {
		let correlated = correlate(r#"{"id":5,"error":{"code":-32002,"message":"Access denied"}}"#).unwrap();
		match correlated.outcome {
			Err(Error::Rpc { code, message }) => {
				assert_eq!(code, -32002);
				assert_eq!(message, "Access denied");
			}
			other => panic!("Expected Rpc error, got {:?}", other),
		}
	}

	#[test]
	fn test_missing_result_rejects() {
		let correlated = correlate(r#"{"id":6}"#).unwrap();
		assert!(matches!(correlated.outcome, Err(Error::MalformedResponse(_))));
	}
}
