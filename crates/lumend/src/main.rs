//! `lumend`: a language server endpoint speaking JSON-RPC over stdio.

use std::io::{self, Write};
use std::process::ExitCode;

use lumend::{BootstrapError, SystemConfigLoader, bootstrap_with};

fn main() -> ExitCode {
    let endpoint = match bootstrap_with(&SystemConfigLoader) {
        Ok(endpoint) => endpoint,
        Err(BootstrapError::Configuration { source }) => {
            // clap renders its own usage text; a failed write has nowhere to go.
            drop(source.print());
            return ExitCode::from(source.exit_code());
        }
        Err(error) => {
            drop(writeln!(io::stderr(), "lumend: {error}"));
            return ExitCode::FAILURE;
        }
    };

    match endpoint.run(io::stdin().lock(), io::stdout().lock()) {
        Ok(termination) => ExitCode::from(termination.exit_code()),
        Err(_) => ExitCode::FAILURE,
    }
}
