//! Test world driving a [`Connection`] one message at a time.

use lumen_config::{MalformedPolicy, UnknownMethodPolicy};
use serde_json::{Value, json};

use crate::framing::{FrameCodec, frame};
use crate::message::ResponseMessage;
use crate::server::{Connection, ServeError, ServeOptions, Termination};

/// Connection under test plus everything it has produced so far.
pub struct TestWorld {
    connection: Connection<Vec<u8>>,
    consumed: usize,
    /// Responses written while handling the most recent message.
    pub responses: Vec<ResponseMessage>,
    /// Result of the most recent `receive` call.
    pub outcome: Option<Result<Option<Termination>, ServeError>>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::with_options(ServeOptions::default())
    }
}

impl TestWorld {
    /// Opens a connection with the supplied policies.
    pub fn with_options(options: ServeOptions) -> Self {
        Self {
            connection: Connection::new(Vec::new(), options),
            consumed: 0,
            responses: Vec::new(),
            outcome: None,
        }
    }

    /// Opens a connection answering unknown methods with an error.
    pub fn rejecting_unknown_methods() -> Self {
        Self::with_options(ServeOptions {
            unknown_methods: UnknownMethodPolicy::Reject,
            ..ServeOptions::default()
        })
    }

    /// Opens a connection answering malformed requests with an error.
    pub fn rejecting_malformed_messages() -> Self {
        Self::with_options(ServeOptions {
            malformed_messages: MalformedPolicy::Reject,
            ..ServeOptions::default()
        })
    }

    /// Borrows the connection.
    pub fn connection(&self) -> &Connection<Vec<u8>> {
        &self.connection
    }

    /// Frames and delivers a JSON message.
    pub fn send(&mut self, message: &Value) {
        self.send_body(message.to_string().as_bytes());
    }

    /// Frames and delivers a raw body.
    pub fn send_body(&mut self, body: &[u8]) {
        self.outcome = Some(self.connection.receive(&frame(body)));
        self.collect_responses();
    }

    /// The single response written for the most recent message.
    pub fn only_response(&self) -> &ResponseMessage {
        assert_eq!(self.responses.len(), 1, "expected exactly one response");
        self.responses.first().expect("response missing")
    }

    fn collect_responses(&mut self) {
        let output = self.connection.output();
        let fresh = output.get(self.consumed..).expect("output shrank");
        let mut codec = FrameCodec::new();
        self.responses = codec
            .feed(fresh)
            .expect("output is not well framed")
            .iter()
            .map(|body| ResponseMessage::decode(body).expect("output body is not a response"))
            .collect();
        self.consumed = output.len();
    }
}

/// An `initialize` request with id 1.
pub fn initialize_request() -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {"processId": null, "clientInfo": {"name": "behaviour-client"}, "capabilities": {}}
    })
}

/// A hover request with id 2 at the given position.
pub fn hover_request(line: u32, character: u32) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "textDocument/hover",
        "params": {
            "textDocument": {"uri": "file:///workspace/notes.md"},
            "position": {"line": line, "character": character}
        }
    })
}

/// A `shutdown` request with id 3.
pub fn shutdown_request() -> Value {
    json!({"jsonrpc": "2.0", "id": 3, "method": "shutdown"})
}

/// A notification with the given method and no parameters.
pub fn notification(method: &str) -> Value {
    json!({"jsonrpc": "2.0", "method": method})
}
