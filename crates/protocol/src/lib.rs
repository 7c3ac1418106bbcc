//! Wire types for the ubus JSON-RPC protocol.
//!
//! ubus is the object/method bus of OpenWrt-style systems. Daemons such as
//! owsd bridge it onto WebSocket using the `ubus-json` sub-protocol, where every
//! frame is a JSON-RPC 2.0 envelope:
//!
//! ```text
//! -> {"jsonrpc":"2.0","id":7,"method":"call","params":[<session>,"system","board",{}]}
//! <- {"jsonrpc":"2.0","id":7,"result":[0,{"model":"..."}]}
//! ```
//!
//! # Main Types
//!
//! - [`Request`] - outgoing envelope with the session token as first parameter
//! - [`Response`] - incoming envelope, either a `result` pair or an `error` object
//! - [`UbusStatus`] - the daemon's numeric result codes
//! - [`SessionInfo`] - payload of a successful `session.login`
//! - [`recover_id`] - best-effort id extraction from frames that are not valid JSON

pub mod envelope;
pub mod recovery;
pub mod session;
pub mod status;

pub use envelope::{ErrorObject, JSONRPC_VERSION, Request, Response};
pub use recovery::recover_id;
pub use session::{LoginArgs, SessionInfo, UNAUTHENTICATED_SESSION};
pub use status::UbusStatus;
