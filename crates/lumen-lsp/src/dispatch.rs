//! Lifecycle-aware routing of decoded messages.
//!
//! | Phase | Accepted methods |
//! |---|---|
//! | `Uninitialized` | `initialize`, `shutdown`, `exit`, notifications |
//! | `Initialized` | `textDocument/hover`, `shutdown`, `exit`, notifications |
//! | `ShuttingDown` / `Exited` | `exit` |
//!
//! Requests outside their phase receive an error response; notifications
//! never receive anything.

use lumen_config::UnknownMethodPolicy;
use lsp_types::{
    DidSaveTextDocumentParams, Hover, HoverContents, HoverProviderCapability, MarkupContent,
    MarkupKind, ServerCapabilities, TextDocumentPositionParams,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::message::{
    ErrorCode, InitializeParams, InitializeResult, RequestId, RequestMessage, ResponseError,
    ResponseMessage, decode_params,
};
use crate::session::{Phase, Session};

/// Log target for dispatch events.
pub(crate) const DISPATCH_TARGET: &str = "lumen_lsp::dispatch";

/// Method names routed by the dispatcher.
pub mod methods {
    /// Opens the session and negotiates capabilities.
    pub const INITIALIZE: &str = "initialize";
    /// Client acknowledgement of the `initialize` response.
    pub const INITIALIZED: &str = "initialized";
    /// Hover information at a text position.
    pub const HOVER: &str = "textDocument/hover";
    /// A document was saved.
    pub const DID_SAVE: &str = "textDocument/didSave";
    /// Asks the server to shut down.
    pub const SHUTDOWN: &str = "shutdown";
    /// Asks the server process to exit.
    pub const EXIT: &str = "exit";
}

/// What the server loop must do once a message has been handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Write the response and keep reading.
    Respond(ResponseMessage),
    /// Nothing goes on the wire.
    Silent,
    /// Write the response, if the request carried an id, then finish the
    /// session successfully.
    Shutdown(Option<ResponseMessage>),
    /// Finish the session without writing anything.
    Exit {
        /// Whether `shutdown` was accepted first.
        graceful: bool,
    },
}

/// Routes messages through the session lifecycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher {
    unknown_methods: UnknownMethodPolicy,
}

impl Dispatcher {
    /// Builds a dispatcher applying `unknown_methods` to unrecognised methods.
    #[must_use]
    pub fn new(unknown_methods: UnknownMethodPolicy) -> Self {
        Self { unknown_methods }
    }

    /// Handles one message, updating `session` as the lifecycle advances.
    pub fn handle(&self, session: &mut Session, request: RequestMessage) -> Dispatch {
        info!(
            target: DISPATCH_TARGET,
            method = %request.method,
            id = ?request.id,
            phase = %session.phase(),
            "received message"
        );
        let RequestMessage { id, method, params } = request;

        match (method.as_str(), session.phase()) {
            (methods::EXIT, phase) => {
                let graceful = phase == Phase::ShuttingDown;
                if !graceful {
                    warn!(target: DISPATCH_TARGET, %phase, "exit received before shutdown");
                }
                session.exit();
                Dispatch::Exit { graceful }
            }
            (_, Phase::ShuttingDown | Phase::Exited) => reject(
                id,
                &method,
                ErrorCode::InvalidRequest,
                "server is shutting down",
            ),
            (methods::INITIALIZED | methods::DID_SAVE, _) if id.is_some() => reject(
                id,
                &method,
                ErrorCode::InvalidRequest,
                "notification method sent as a request",
            ),
            (methods::INITIALIZED, _) => Dispatch::Silent,
            (methods::DID_SAVE, _) => did_save(&method, params),
            (_, _) if id.is_none() && is_request_method(&method) => {
                warn!(
                    target: DISPATCH_TARGET,
                    method = %method,
                    "request method sent as a notification; ignoring"
                );
                Dispatch::Silent
            }
            (methods::INITIALIZE, Phase::Uninitialized) => initialize(session, id, &method, params),
            (methods::INITIALIZE, _) => reject(
                id,
                &method,
                ErrorCode::InvalidRequest,
                "server is already initialized",
            ),
            (methods::HOVER, Phase::Initialized) => hover(id, &method, params),
            (methods::HOVER, _) => reject(
                id,
                &method,
                ErrorCode::ServerNotInitialized,
                "server has not been initialized",
            ),
            (methods::SHUTDOWN, _) => {
                session.begin_shutdown();
                let response = id.map(|id| ResponseMessage::success(Some(id), Value::Null));
                Dispatch::Shutdown(response)
            }
            _ => self.unknown(id, &method),
        }
    }

    fn unknown(&self, id: Option<RequestId>, method: &str) -> Dispatch {
        error!(
            target: DISPATCH_TARGET,
            method,
            id = ?id,
            "Unknown method"
        );
        match (self.unknown_methods, id) {
            (UnknownMethodPolicy::Reject, Some(id)) => Dispatch::Respond(ResponseMessage::failure(
                Some(id),
                ResponseError::new(ErrorCode::MethodNotFound, format!("unknown method: {method}")),
            )),
            _ => Dispatch::Silent,
        }
    }
}

fn is_request_method(method: &str) -> bool {
    matches!(
        method,
        methods::INITIALIZE | methods::HOVER
    )
}

fn initialize(
    session: &mut Session,
    id: Option<RequestId>,
    method: &str,
    params: Option<Value>,
) -> Dispatch {
    let params: InitializeParams = match decode_params(method, params) {
        Ok(params) => params,
        Err(error) => return invalid_params(id, &error),
    };
    let result = InitializeResult {
        capabilities: ServerCapabilities {
            hover_provider: Some(HoverProviderCapability::Simple(true)),
            ..ServerCapabilities::default()
        },
        client_info: params.client_info.clone(),
    };
    let dispatch = respond(id, &result);
    if matches!(dispatch, Dispatch::Respond(ref response) if response.result().is_some()) {
        session.initialise(params.client_info);
        info!(
            target: DISPATCH_TARGET,
            client = ?session.client_info().map(|info| info.name.as_str()),
            "session initialized"
        );
    }
    dispatch
}

fn hover(id: Option<RequestId>, method: &str, params: Option<Value>) -> Dispatch {
    let params: TextDocumentPositionParams = match decode_params(method, params) {
        Ok(params) => params,
        Err(error) => return invalid_params(id, &error),
    };
    let hover = Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: hover_markdown(&params),
        }),
        range: None,
    };
    respond(id, &hover)
}

fn hover_markdown(params: &TextDocumentPositionParams) -> String {
    format!(
        "`{}`\n\n**Hover** at line {}, character {}",
        params.text_document.uri.as_str(),
        params.position.line,
        params.position.character
    )
}

fn did_save(method: &str, params: Option<Value>) -> Dispatch {
    match decode_params::<DidSaveTextDocumentParams>(method, params) {
        Ok(params) => debug!(
            target: DISPATCH_TARGET,
            uri = params.text_document.uri.as_str(),
            "document saved"
        ),
        Err(error) => warn!(target: DISPATCH_TARGET, %error, "dropping notification"),
    }
    Dispatch::Silent
}

fn respond<T>(id: Option<RequestId>, result: &T) -> Dispatch
where
    T: Serialize,
{
    match serde_json::to_value(result) {
        Ok(value) => Dispatch::Respond(ResponseMessage::success(id, value)),
        Err(source) => {
            error!(target: DISPATCH_TARGET, error = %source, "failed to encode result");
            Dispatch::Respond(ResponseMessage::failure(
                id,
                ResponseError::new(ErrorCode::InternalError, source.to_string()),
            ))
        }
    }
}

fn invalid_params(id: Option<RequestId>, error: &crate::message::ParamsDecodeError) -> Dispatch {
    warn!(target: DISPATCH_TARGET, %error, "rejecting request");
    Dispatch::Respond(ResponseMessage::failure(
        id,
        ResponseError::new(ErrorCode::InvalidParams, error.to_string()),
    ))
}

fn reject(id: Option<RequestId>, method: &str, code: ErrorCode, message: &str) -> Dispatch {
    warn!(target: DISPATCH_TARGET, method, reason = message, "rejecting message");
    match id {
        Some(id) => Dispatch::Respond(ResponseMessage::failure(
            Some(id),
            ResponseError::new(code, message),
        )),
        None => Dispatch::Silent,
    }
}
