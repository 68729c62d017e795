//! Protocol policies applied by the session loop.
//!
//! By default a malformed envelope tears the connection down and an
//! unrecognised method is only logged.

use strum::{Display, EnumString};

/// How the server reacts to a body that is not a valid JSON-RPC request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MalformedPolicy {
    /// Log the offending body and terminate with a failure status.
    #[default]
    Terminate,
    /// Answer `InvalidRequest` when an `id` can be recovered, otherwise
    /// terminate.
    Reject,
}

/// How the server reacts to a method it does not implement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum UnknownMethodPolicy {
    /// Log the method and send nothing back.
    #[default]
    Ignore,
    /// Answer requests with `MethodNotFound`; notifications are still only
    /// logged.
    Reject,
}

/// Errors encountered while parsing a policy from text.
pub type PolicyParseError = strum::ParseError;
