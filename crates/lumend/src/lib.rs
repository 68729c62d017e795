//! Process wiring for the lumen language server endpoint.
//!
//! Bootstrap resolves configuration and installs the side-channel log before
//! the protocol loop takes over stdin and stdout. Nothing but protocol frames
//! is ever written to stdout.

mod bootstrap;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Endpoint, StaticConfigLoader, SystemConfigLoader,
    bootstrap_with,
};
pub use telemetry::{TelemetryError, TelemetryHandle};
