//! Behavioural tests for the LSP endpoint.

mod support;
