//! Request envelopes and their decoder.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

use super::JSONRPC_VERSION;

/// Identifier correlating a request with its response.
///
/// Numbers keep their exact JSON representation so an echoed id matches the
/// one the client sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric identifier.
    Number(serde_json::Number),
    /// String identifier.
    String(String),
}

impl RequestId {
    fn from_value(value: Value) -> Result<Self, EnvelopeFault> {
        match value {
            Value::Number(number) => Ok(Self::Number(number)),
            Value::String(text) => Ok(Self::String(text)),
            _ => Err(EnvelopeFault::InvalidId),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(number) => write!(formatter, "{number}"),
            Self::String(text) => write!(formatter, "{text:?}"),
        }
    }
}

/// A decoded JSON-RPC request or notification.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMessage {
    /// Request identifier; `None` marks a notification.
    pub id: Option<RequestId>,
    /// The method to invoke.
    pub method: String,
    /// Raw parameters, decoded per method once routing is known.
    pub params: Option<Value>,
}

impl RequestMessage {
    /// Builds a request expecting exactly one response.
    #[must_use]
    pub fn request(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Builds a notification, which never receives a response.
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Whether the message is a notification.
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Serialises the message as a JSON body.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if the parameters cannot be
    /// serialised.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Serialize for RequestMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        map.serialize_entry("method", &self.method)?;
        if let Some(params) = &self.params {
            map.serialize_entry("params", params)?;
        }
        map.end()
    }
}

/// Why a body failed to decode as a JSON-RPC envelope.
#[derive(Debug, Error)]
pub enum EnvelopeFault {
    /// The body was not valid JSON.
    #[error("body is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),

    /// The body was valid JSON but not an object.
    #[error("body is not a JSON object")]
    NotAnObject,

    /// `jsonrpc` was missing or not `"2.0"`.
    #[error("`jsonrpc` must be \"2.0\"")]
    UnsupportedVersion,

    /// `method` was missing or not a string.
    #[error("`method` must be a string")]
    MissingMethod,

    /// `id` was present but neither a number nor a string.
    #[error("`id` must be a number or a string")]
    InvalidId,

    /// A response carried neither `result` nor `error`.
    #[error("response carries neither `result` nor `error`")]
    MissingOutcome,

    /// A response carried both `result` and `error`.
    #[error("response carries both `result` and `error`")]
    ConflictingOutcome,

    /// A response `error` member did not match the error object shape.
    #[error("malformed `error` member: {0}")]
    InvalidError(#[source] serde_json::Error),
}

/// A body that could not be decoded, kept for diagnostics.
#[derive(Debug, Error)]
#[error("malformed JSON-RPC message: {fault}")]
pub struct EnvelopeDecodeError {
    text: String,
    id: Option<RequestId>,
    #[source]
    fault: EnvelopeFault,
}

impl EnvelopeDecodeError {
    pub(crate) fn new(text: &str, id: Option<RequestId>, fault: EnvelopeFault) -> Self {
        Self {
            text: text.to_owned(),
            id,
            fault,
        }
    }

    /// The offending body.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.as_str()
    }

    /// The specific shape violation.
    #[must_use]
    pub fn fault(&self) -> &EnvelopeFault {
        &self.fault
    }

    /// The request `id`, when the body was an object with a usable one.
    #[must_use]
    pub fn recoverable_id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }
}

/// Parses a JSON object out of `text`, recovering a usable `id` if present.
pub(crate) fn parse_object(
    text: &str,
) -> Result<(Map<String, Value>, Option<RequestId>), EnvelopeDecodeError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|source| EnvelopeDecodeError::new(text, None, EnvelopeFault::Json(source)))?;
    let Value::Object(fields) = value else {
        return Err(EnvelopeDecodeError::new(text, None, EnvelopeFault::NotAnObject));
    };
    let id = match fields.get("id") {
        Some(Value::Number(number)) => Some(RequestId::Number(number.clone())),
        Some(Value::String(text)) => Some(RequestId::String(text.clone())),
        _ => None,
    };
    Ok((fields, id))
}

pub(crate) fn check_version(
    text: &str,
    fields: &Map<String, Value>,
    id: Option<&RequestId>,
) -> Result<(), EnvelopeDecodeError> {
    match fields.get("jsonrpc") {
        Some(Value::String(version)) if version == JSONRPC_VERSION => Ok(()),
        _ => Err(EnvelopeDecodeError::new(
            text,
            id.cloned(),
            EnvelopeFault::UnsupportedVersion,
        )),
    }
}

/// Decodes a body into a [`RequestMessage`].
///
/// The body must be a JSON object with `jsonrpc: "2.0"`, a string `method`,
/// and, when present, a number or string `id`. Unknown members are ignored.
///
/// # Errors
///
/// Returns [`EnvelopeDecodeError`] describing the first violation found.
pub fn decode_envelope(text: &str) -> Result<RequestMessage, EnvelopeDecodeError> {
    let (mut fields, recovered) = parse_object(text)?;
    check_version(text, &fields, recovered.as_ref())?;

    let method = match fields.remove("method") {
        Some(Value::String(method)) => method,
        _ => {
            return Err(EnvelopeDecodeError::new(
                text,
                recovered,
                EnvelopeFault::MissingMethod,
            ));
        }
    };
    let id = fields
        .remove("id")
        .map(RequestId::from_value)
        .transpose()
        .map_err(|fault| EnvelopeDecodeError::new(text, None, fault))?;

    Ok(RequestMessage {
        id,
        method,
        params: fields.remove("params"),
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn decodes_request_with_numeric_id() {
        let message = decode_envelope(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#)
            .expect("decode failed");

        assert_eq!(message.id, Some(RequestId::from(1)));
        assert_eq!(message.method, "initialize");
        assert_eq!(message.params, Some(json!({})));
        assert!(!message.is_notification());
    }

    #[rstest]
    fn decodes_request_with_string_id() {
        let message = decode_envelope(r#"{"jsonrpc":"2.0","id":"abc","method":"shutdown"}"#)
            .expect("decode failed");

        assert_eq!(message.id, Some(RequestId::from("abc")));
        assert_eq!(message.params, None);
    }

    #[rstest]
    fn decodes_notification() {
        let message = decode_envelope(r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#)
            .expect("decode failed");

        assert!(message.is_notification());
    }

    #[rstest]
    fn keeps_fractional_ids_exactly() {
        let message = decode_envelope(r#"{"jsonrpc":"2.0","id":1.5,"method":"x"}"#)
            .expect("decode failed");

        let id = message.id.expect("id missing");
        assert_eq!(serde_json::to_string(&id).expect("encode failed"), "1.5");
    }

    #[rstest]
    #[case("not json", false)]
    #[case("[1,2,3]", false)]
    #[case(r#"{"id":1,"method":"initialize"}"#, true)]
    #[case(r#"{"jsonrpc":"1.0","id":1,"method":"initialize"}"#, true)]
    #[case(r#"{"jsonrpc":"2.0","id":1}"#, true)]
    #[case(r#"{"jsonrpc":"2.0","id":1,"method":7}"#, true)]
    #[case(r#"{"jsonrpc":"2.0","id":null,"method":"initialize"}"#, false)]
    #[case(r#"{"jsonrpc":"2.0","id":{"nested":1},"method":"initialize"}"#, false)]
    fn rejects_malformed_envelopes(#[case] text: &str, #[case] id_recoverable: bool) {
        let error = decode_envelope(text).expect_err("decode should fail");

        assert_eq!(error.text(), text);
        assert_eq!(error.recoverable_id().is_some(), id_recoverable);
    }

    #[rstest]
    fn reports_specific_fault() {
        let error = decode_envelope(r#"{"jsonrpc":"2.0","id":[1]}"#).expect_err("decode should fail");

        assert!(matches!(error.fault(), EnvelopeFault::MissingMethod));
        assert!(error.to_string().contains("`method` must be a string"));
    }

    #[rstest]
    fn serialises_notification_without_id() {
        let notification = RequestMessage::notification("initialized", Some(json!({})));
        let encoded = notification.encode().expect("encode failed");

        assert_eq!(encoded, r#"{"jsonrpc":"2.0","method":"initialized","params":{}}"#);
    }

    #[rstest]
    fn serialises_request_without_params() {
        let request = RequestMessage::request(42, "shutdown", None);
        let encoded = request.encode().expect("encode failed");

        assert_eq!(encoded, r#"{"jsonrpc":"2.0","id":42,"method":"shutdown"}"#);
        let decoded = decode_envelope(&encoded).expect("decode failed");
        assert_eq!(decoded, request);
    }
}
