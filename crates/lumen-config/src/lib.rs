//! Shared configuration for the lumen language server endpoint.
//!
//! Settings resolve from command-line flags first, then `LUMEN_*`
//! environment variables, then the built-in defaults. The protocol streams
//! occupy stdin and stdout, so configuration never comes from either.

mod defaults;
mod logging;
mod policy;

use std::ffi::OsString;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use thiserror::Error;

pub use defaults::{
    DEFAULT_LOG_FILTER, default_log_filter, default_log_format, default_malformed_policy,
    default_unknown_method_policy,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use policy::{MalformedPolicy, PolicyParseError, UnknownMethodPolicy};

/// Environment variable naming the side-channel log file.
pub const LOG_FILE_ENV: &str = "LUMEN_LOG_FILE";
/// Environment variable holding the log filter expression.
pub const LOG_FILTER_ENV: &str = "LUMEN_LOG_FILTER";
/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "LUMEN_LOG_FORMAT";
/// Environment variable selecting the malformed-envelope policy.
pub const MALFORMED_POLICY_ENV: &str = "LUMEN_MALFORMED_MESSAGES";
/// Environment variable selecting the unknown-method policy.
pub const UNKNOWN_METHOD_POLICY_ENV: &str = "LUMEN_UNKNOWN_METHODS";

/// Resolved runtime configuration for `lumend`.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "lumend",
    version,
    about = "Minimal Language Server Protocol endpoint speaking JSON-RPC over stdio"
)]
pub struct Config {
    /// File receiving the diagnostic log. Logs go to stderr when unset.
    #[arg(long, env = LOG_FILE_ENV, value_name = "PATH")]
    pub log_file: Option<Utf8PathBuf>,
    /// `tracing` filter expression, for example `info` or `lumen_lsp=debug`.
    #[arg(long, env = LOG_FILTER_ENV, value_name = "EXPR", default_value = DEFAULT_LOG_FILTER)]
    pub log_filter: String,
    /// Format of each diagnostic log line.
    #[arg(long, env = LOG_FORMAT_ENV, value_name = "FORMAT", default_value_t = default_log_format())]
    pub log_format: LogFormat,
    /// Reaction to bodies that are not valid JSON-RPC requests.
    #[arg(
        long,
        env = MALFORMED_POLICY_ENV,
        value_name = "POLICY",
        default_value_t = default_malformed_policy()
    )]
    pub malformed_messages: MalformedPolicy,
    /// Reaction to methods the server does not implement.
    #[arg(
        long,
        env = UNKNOWN_METHOD_POLICY_ENV,
        value_name = "POLICY",
        default_value_t = default_unknown_method_policy()
    )]
    pub unknown_methods: UnknownMethodPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: None,
            log_filter: default_log_filter().to_owned(),
            log_format: default_log_format(),
            malformed_messages: default_malformed_policy(),
            unknown_methods: default_unknown_method_policy(),
        }
    }
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Arguments`] when a flag or environment value
    /// fails to parse, or when help/version output was requested.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument list.
    ///
    /// The first item is the program name, as with [`std::env::args_os`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Arguments`] when parsing fails.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(ConfigError::Arguments)
    }

    /// Destination of the diagnostic log, when one was configured.
    #[must_use]
    pub fn log_file(&self) -> Option<&Utf8Path> {
        self.log_file.as_deref()
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log line format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Policy for malformed envelopes.
    #[must_use]
    pub fn malformed_messages(&self) -> MalformedPolicy {
        self.malformed_messages
    }

    /// Policy for unrecognised methods.
    #[must_use]
    pub fn unknown_methods(&self) -> UnknownMethodPolicy {
        self.unknown_methods
    }
}

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A flag or environment value was rejected, or help/version output was
    /// requested.
    #[error("invalid arguments: {0}")]
    Arguments(#[source] clap::Error),
}

impl ConfigError {
    /// Whether the error only carries informational output such as `--help`.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        match self {
            Self::Arguments(error) => matches!(
                error.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ),
        }
    }

    /// Prints the rendered message the way clap would: help and version text
    /// to stdout, usage errors to stderr.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while writing.
    pub fn print(&self) -> io::Result<()> {
        match self {
            Self::Arguments(error) => error.print(),
        }
    }

    /// Process exit status matching clap's conventions: 0 for informational
    /// output, 2 for usage errors.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Arguments(error) => u8::try_from(error.exit_code()).unwrap_or(2),
        }
    }
}
