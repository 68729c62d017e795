use strum::{Display, EnumString};

/// Supported side-channel log formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One `[timestamp] [LEVEL] message` line per event.
    #[default]
    Plain,
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
    /// Human-readable single line output in the `tracing` compact style.
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;
