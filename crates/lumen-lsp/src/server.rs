//! Byte-stream server loop.
//!
//! [`Connection`] owns the codec, the session and the output sink, so frames
//! are written whole and in order without any locking. [`serve`] drives a
//! connection from a blocking reader such as stdin.

use std::io::{self, Read, Write};

use lumen_config::{Config, MalformedPolicy, UnknownMethodPolicy};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::dispatch::{Dispatch, Dispatcher};
use crate::framing::{FrameCodec, FramingError, frame};
use crate::message::{
    EnvelopeDecodeError, ErrorCode, ResponseError, ResponseMessage, decode_envelope,
};
use crate::session::{Phase, Session};

/// Log target for the server loop.
pub(crate) const SERVER_TARGET: &str = "lumen_lsp::server";

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Protocol policies applied by a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeOptions {
    /// Reaction to bodies that are not valid requests.
    pub malformed_messages: MalformedPolicy,
    /// Reaction to unrecognised methods.
    pub unknown_methods: UnknownMethodPolicy,
}

impl ServeOptions {
    /// Takes both policies from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            malformed_messages: config.malformed_messages(),
            unknown_methods: config.unknown_methods(),
        }
    }
}

/// How a connection finished without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// `shutdown` was answered.
    Shutdown,
    /// `exit` arrived; `graceful` records whether `shutdown` preceded it.
    Exit {
        /// Whether `shutdown` was accepted first.
        graceful: bool,
    },
    /// The input stream closed.
    EndOfInput,
}

impl Termination {
    /// Process exit status for this termination.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Shutdown | Self::EndOfInput | Self::Exit { graceful: true } => 0,
            Self::Exit { graceful: false } => 1,
        }
    }
}

/// Failures that end a connection.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The header block could not be parsed.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// A body was not a valid request and the policy does not recover.
    #[error(transparent)]
    Envelope(#[from] EnvelopeDecodeError),

    /// A response could not be serialised.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Writes framed responses to an output sink.
#[derive(Debug)]
pub struct FrameWriter<W> {
    writer: W,
}

impl<W> FrameWriter<W>
where
    W: Write,
{
    /// Wraps an output sink.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one framed response and flushes it.
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Encode`] when the response cannot be serialised
    /// and [`ServeError::Io`] when the sink fails.
    pub fn send(&mut self, response: &ResponseMessage) -> Result<(), ServeError> {
        let body = response.encode().map_err(ServeError::Encode)?;
        self.writer.write_all(&frame(body.as_bytes()))?;
        self.writer.flush()?;
        Ok(())
    }

    /// Borrows the wrapped sink.
    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns the wrapped sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// One client connection: codec, session, dispatcher and output sink.
#[derive(Debug)]
pub struct Connection<W> {
    codec: FrameCodec,
    session: Session,
    dispatcher: Dispatcher,
    malformed_messages: MalformedPolicy,
    writer: FrameWriter<W>,
}

impl<W> Connection<W>
where
    W: Write,
{
    /// Opens a connection writing responses to `output`.
    #[must_use]
    pub fn new(output: W, options: ServeOptions) -> Self {
        Self {
            codec: FrameCodec::new(),
            session: Session::new(),
            dispatcher: Dispatcher::new(options.unknown_methods),
            malformed_messages: options.malformed_messages,
            writer: FrameWriter::new(output),
        }
    }

    /// The connection's session state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Feeds raw input and handles every message it completes.
    ///
    /// Returns `Some` once the session has finished. Input that arrives
    /// after the session has exited is discarded without being decoded.
    ///
    /// # Errors
    ///
    /// Returns a [`ServeError`] for framing failures, unrecovered envelope
    /// failures, and output errors.
    pub fn receive(&mut self, chunk: &[u8]) -> Result<Option<Termination>, ServeError> {
        if self.session.phase() == Phase::Exited {
            debug!(target: SERVER_TARGET, bytes = chunk.len(), "discarding input after exit");
            return Ok(None);
        }
        let bodies = self.codec.feed(chunk).inspect_err(|error| {
            error!(target: SERVER_TARGET, %error, "unrecoverable framing error");
        })?;
        for body in bodies {
            if let Some(termination) = self.handle_body(&body)? {
                return Ok(Some(termination));
            }
        }
        Ok(None)
    }

    /// Records that the input closed.
    #[must_use]
    pub fn end_of_input(&self) -> Termination {
        let pending = self.codec.buffered_len();
        if pending > 0 {
            warn!(
                target: SERVER_TARGET,
                pending,
                "input ended inside an incomplete frame"
            );
        }
        info!(target: SERVER_TARGET, phase = %self.session.phase(), "input closed");
        Termination::EndOfInput
    }

    /// Borrows the output sink.
    #[must_use]
    pub fn output(&self) -> &W {
        self.writer.get_ref()
    }

    /// Returns the output sink.
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    fn handle_body(&mut self, body: &str) -> Result<Option<Termination>, ServeError> {
        debug!(target: SERVER_TARGET, body, "inbound message");
        let request = match decode_envelope(body) {
            Ok(request) => request,
            Err(error) => return self.malformed(error).map(|()| None),
        };

        match self.dispatcher.handle(&mut self.session, request) {
            Dispatch::Respond(response) => {
                self.writer.send(&response)?;
                Ok(None)
            }
            Dispatch::Silent => Ok(None),
            Dispatch::Shutdown(response) => {
                if let Some(reply) = response.as_ref() {
                    self.writer.send(reply)?;
                }
                self.session.exit();
                info!(target: SERVER_TARGET, "shutdown complete");
                Ok(Some(Termination::Shutdown))
            }
            Dispatch::Exit { graceful } => Ok(Some(Termination::Exit { graceful })),
        }
    }

    fn malformed(&mut self, error: EnvelopeDecodeError) -> Result<(), ServeError> {
        error!(target: SERVER_TARGET, body = error.text(), "malformed message");
        error!(target: SERVER_TARGET, fault = %error.fault(), "{error}");

        let id = match (self.malformed_messages, error.recoverable_id()) {
            (MalformedPolicy::Reject, Some(id)) => id.clone(),
            _ => return Err(ServeError::Envelope(error)),
        };
        let response = ResponseMessage::failure(
            Some(id),
            ResponseError::new(ErrorCode::InvalidRequest, error.fault().to_string()),
        );
        self.writer.send(&response)
    }
}

/// Serves one connection until it finishes or fails.
///
/// Input is read in chunks of whatever size the reader yields; output frames
/// are flushed one response at a time.
///
/// # Errors
///
/// Returns a [`ServeError`] when the stream cannot be parsed, a body is
/// rejected under [`MalformedPolicy::Terminate`], or I/O fails.
pub fn serve<R, W>(mut input: R, output: W, options: ServeOptions) -> Result<Termination, ServeError>
where
    R: Read,
    W: Write,
{
    let mut connection = Connection::new(output, options);
    let mut buffer = vec![0_u8; READ_CHUNK_SIZE];
    info!(target: SERVER_TARGET, ?options, "serving connection");

    loop {
        let read = match input.read(&mut buffer) {
            Ok(0) => return Ok(connection.end_of_input()),
            Ok(read) => read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        if let Some(termination) = connection.receive(chunk)? {
            return Ok(termination);
        }
    }
}
