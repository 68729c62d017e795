//! JSON-RPC 2.0 message model for LSP communication.
//!
//! Decoding is explicit and never panics: envelope and parameter failures come
//! back as typed errors so the dispatcher can choose how to react.

mod envelope;
mod params;
mod response;

pub use envelope::{EnvelopeDecodeError, EnvelopeFault, RequestId, RequestMessage, decode_envelope};
pub use params::{InitializeParams, InitializeResult, ParamsDecodeError, decode_params};
pub use response::{ErrorCode, Outcome, ResponseError, ResponseMessage};

/// Protocol version carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";
