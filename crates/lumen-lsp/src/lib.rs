//! Minimal Language Server Protocol endpoint.
//!
//! Messages arrive as `Content-Length` framed JSON-RPC 2.0 bodies. The
//! [`FrameCodec`] splits the byte stream into bodies, the [`message`] module
//! decodes them into typed envelopes, and the [`Dispatcher`] routes each one
//! through the [`Session`] lifecycle. [`serve`] wires the pieces to a reader
//! and a writer so the binary only has to hand over stdin and stdout.
//!
//! The endpoint advertises hover support only. Hover results are synthesised
//! from the request position; no document state is kept.

pub mod dispatch;
mod framing;
pub mod message;
mod server;
mod session;

pub use dispatch::{Dispatch, Dispatcher};
pub use framing::{FrameCodec, FramingError, frame};
pub use server::{Connection, FrameWriter, ServeError, ServeOptions, Termination, serve};
pub use session::{Phase, Session};

#[cfg(test)]
mod tests;
