//! Response envelopes.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::JSONRPC_VERSION;
use super::envelope::{
    EnvelopeDecodeError, EnvelopeFault, RequestId, check_version, parse_object,
};

/// Error codes the endpoint reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON sent is not a valid request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// A request arrived before `initialize` completed.
    ServerNotInitialized,
}

impl ErrorCode {
    /// The numeric code placed on the wire.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerNotInitialized => -32002,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponseError {
    /// Builds an error object without additional data.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The mutually exclusive payload of a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The request succeeded; `null` is a valid result.
    Result(Value),
    /// The request failed.
    Error(ResponseError),
}

/// A JSON-RPC 2.0 response message.
///
/// Holding the payload in [`Outcome`] keeps `result` and `error` from ever
/// being populated together.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMessage {
    /// Identifier of the request being answered; `None` encodes as `null`.
    pub id: Option<RequestId>,
    /// Result or error.
    pub outcome: Outcome,
}

impl ResponseMessage {
    /// Builds a success response.
    #[must_use]
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            id,
            outcome: Outcome::Result(result),
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Option<RequestId>, error: ResponseError) -> Self {
        Self {
            id,
            outcome: Outcome::Error(error),
        }
    }

    /// The success value, if any.
    #[must_use]
    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            Outcome::Result(value) => Some(value),
            Outcome::Error(_) => None,
        }
    }

    /// The error object, if any.
    #[must_use]
    pub fn error(&self) -> Option<&ResponseError> {
        match &self.outcome {
            Outcome::Result(_) => None,
            Outcome::Error(error) => Some(error),
        }
    }

    /// Serialises the response as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the result cannot be
    /// serialised.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a response body, rejecting bodies that carry both or neither
    /// of `result` and `error`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeDecodeError`] describing the first violation found.
    pub fn decode(text: &str) -> Result<Self, EnvelopeDecodeError> {
        let (mut fields, id) = parse_object(text)?;
        check_version(text, &fields, id.as_ref())?;
        if !matches!(
            fields.get("id"),
            Some(Value::Null | Value::Number(_) | Value::String(_))
        ) {
            return Err(EnvelopeDecodeError::new(text, None, EnvelopeFault::InvalidId));
        }

        let outcome = match (fields.remove("result"), fields.remove("error")) {
            (Some(result), None) => Outcome::Result(result),
            (None, Some(error)) => Outcome::Error(serde_json::from_value(error).map_err(
                |source| EnvelopeDecodeError::new(text, id.clone(), EnvelopeFault::InvalidError(source)),
            )?),
            (Some(_), Some(_)) => {
                return Err(EnvelopeDecodeError::new(
                    text,
                    id,
                    EnvelopeFault::ConflictingOutcome,
                ));
            }
            (None, None) => {
                return Err(EnvelopeDecodeError::new(
                    text,
                    id,
                    EnvelopeFault::MissingOutcome,
                ));
            }
        };

        Ok(Self { id, outcome })
    }
}

impl Serialize for ResponseMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        map.serialize_entry("id", &self.id)?;
        match &self.outcome {
            Outcome::Result(result) => map.serialize_entry("result", result)?,
            Outcome::Error(error) => map.serialize_entry("error", error)?,
        }
        map.end()
    }
}
