use crate::logging::LogFormat;
use crate::policy::{MalformedPolicy, UnknownMethodPolicy};

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binary.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Default logging format for the binary.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Plain
}

/// Default reaction to malformed envelopes.
#[must_use]
pub fn default_malformed_policy() -> MalformedPolicy {
    MalformedPolicy::Terminate
}

/// Default reaction to unrecognised methods.
#[must_use]
pub fn default_unknown_method_policy() -> UnknownMethodPolicy {
    UnknownMethodPolicy::Ignore
}
