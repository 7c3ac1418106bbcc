//! Id recovery for frames that fail to parse.
//!
//! The bridge occasionally emits truncated or otherwise invalid JSON. When that
//! happens the call id is the only thing worth salvaging, so the pending call
//! can be failed instead of hanging forever.

use std::sync::LazyLock;

use regex::Regex;

static ID_KEY: &str = "\"id\"";
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Extracts the first integer-like token following the first `"id"` substring.
///
/// Quoted ids (`"id":"3"`) are accepted. Returns `None` when there is no `"id"`
/// key or no digits after it.
pub fn recover_id(text: &str) -> Option<u64> {
	let (_, rest) = text.split_once(ID_KEY)?;
	INTEGER_RE.find(rest)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_recover_numeric_id() {
		assert_eq!(recover_id(r#"{"jsonrpc":"2.0","id":17,"result":[0,{"#), Some(17));
	}

	#[test]
	fn test_recover_quoted_id() {
		assert_eq!(recover_id(r#"{"id":"3","result":[0,{oops}]"#), Some(3));
	}

	#[test]
	fn test_first_token_after_key_wins() {
		assert_eq!(recover_id(r#"{"result":[5],"id": 8, "x": 9"#), Some(8));
		assert_eq!(recover_id(r#"{"code":1,"id":22,"id":23"#), Some(22));
	}

	#[test]
	fn test_no_id() {
		assert_eq!(recover_id("garbage"), None);
		assert_eq!(recover_id(r#"{"id":null"#), None);
		assert_eq!(recover_id(r#"{"identity":5"#), None);
	}
}
