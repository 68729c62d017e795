//! Per-method parameter and result shapes.

use lsp_types::{ClientInfo, ServerCapabilities};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The subset of `initialize` parameters the endpoint reads.
///
/// Every member is optional and unknown members are ignored, so any client's
/// parameters decode.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Information about the client.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Result of the `initialize` request.
///
/// The client information is echoed back under `clientInfo`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The capabilities the server provides.
    pub capabilities: ServerCapabilities,
    /// The client information received in `initialize`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for `method` failed to match their expected shape.
#[derive(Debug, Error)]
#[error("invalid params for '{method}': {source}")]
pub struct ParamsDecodeError {
    method: String,
    #[source]
    source: serde_json::Error,
}

impl ParamsDecodeError {
    /// The method whose parameters were rejected.
    #[must_use]
    pub fn method(&self) -> &str {
        self.method.as_str()
    }
}

/// Decodes the parameters of a routed request.
///
/// Absent and `null` parameters decode as an empty object, so shapes whose
/// members are all optional accept them while required members still fail.
///
/// # Errors
///
/// Returns [`ParamsDecodeError`] when the value does not match `T`.
pub fn decode_params<T>(method: &str, raw: Option<Value>) -> Result<T, ParamsDecodeError>
where
    T: DeserializeOwned,
{
    let raw = match raw {
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(value) => value,
    };
    serde_json::from_value(raw).map_err(|source| ParamsDecodeError {
        method: method.to_owned(),
        source,
    })
}
