//! ubus result codes.
//!
//! Every ubus response carries an integer status as the first element of its
//! `result` array. The table is fixed by ubusd and indexed from zero.

use std::fmt;

/// Status reported by the daemon in `result[0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UbusStatus {
	Ok,
	InvalidCommand,
	InvalidArgument,
	MethodNotFound,
	NotFound,
	NoData,
	PermissionDenied,
	Timeout,
	NotSupported,
	UnknownError,
	ConnectionFailed,
	/// A code outside the known table. The raw value is preserved.
	Unrecognized(i64),
}

const TABLE: [UbusStatus; 11] = [
	UbusStatus::Ok,
	UbusStatus::InvalidCommand,
	UbusStatus::InvalidArgument,
	UbusStatus::MethodNotFound,
	UbusStatus::NotFound,
	UbusStatus::NoData,
	UbusStatus::PermissionDenied,
	UbusStatus::Timeout,
	UbusStatus::NotSupported,
	UbusStatus::UnknownError,
	UbusStatus::ConnectionFailed,
];

impl UbusStatus {
	/// Maps a raw result code onto the table.
	pub fn from_code(code: i64) -> Self {
		usize::try_from(code)
			.ok()
			.and_then(|idx| TABLE.get(idx).copied())
			.unwrap_or(UbusStatus::Unrecognized(code))
	}

	/// Raw integer code as sent on the wire.
	pub fn code(self) -> i64 {
		match self {
			UbusStatus::Unrecognized(code) => code,
			known => TABLE.iter().position(|s| *s == known).map(|idx| idx as i64).unwrap_or(-1),
		}
	}

	/// Human-readable label used by ubus tooling.
	///
	/// Codes outside the table share the "Unknown error" label.
	pub fn label(self) -> &'static str {
		match self {
			UbusStatus::Ok => "Success",
			UbusStatus::InvalidCommand => "Invalid command",
			UbusStatus::InvalidArgument => "Invalid argument",
			UbusStatus::MethodNotFound => "Method not found",
			UbusStatus::NotFound => "Not found",
			UbusStatus::NoData => "No response",
			UbusStatus::PermissionDenied => "Permission denied",
			UbusStatus::Timeout => "Request timed out",
			UbusStatus::NotSupported => "Operation not supported",
			UbusStatus::UnknownError | UbusStatus::Unrecognized(_) => "Unknown error",
			UbusStatus::ConnectionFailed => "Connection failed",
		}
	}

	pub fn is_ok(self) -> bool {
		self == UbusStatus::Ok
	}
}

impl fmt::Display for UbusStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			UbusStatus::Unrecognized(code) => write!(f, "{} ({})", self.label(), code),
			_ => f.write_str(self.label()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_table_labels() {
		assert_eq!(UbusStatus::from_code(0).label(), "Success");
		assert_eq!(UbusStatus::from_code(3).label(), "Method not found");
		assert_eq!(UbusStatus::from_code(6).label(), "Permission denied");
		assert_eq!(UbusStatus::from_code(10).label(), "Connection failed");
	}

	#[test]
	fn test_out_of_range_is_unknown() {
		let status = UbusStatus::from_code(42);
		assert_eq!(status, UbusStatus::Unrecognized(42));
		assert_eq!(status.label(), "Unknown error");
		assert_eq!(status.code(), 42);
		assert_eq!(status.to_string(), "Unknown error (42)");

		assert_eq!(UbusStatus::from_code(-1), UbusStatus::Unrecognized(-1));
	}

	#[test]
	fn test_code_matches_table_index() {
		for code in 0..=10 {
			assert_eq!(UbusStatus::from_code(code).code(), code);
		}
		assert!(UbusStatus::from_code(0).is_ok());
		assert!(!UbusStatus::from_code(7).is_ok());
	}
}
