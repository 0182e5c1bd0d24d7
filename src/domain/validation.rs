use std::fmt;

/// A backend was configured (or called) with values it cannot work with.
///
/// This is the single "improperly configured" kind: it is raised before any
/// network I/O and is never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing {
        field: &'static str,
    },
    Empty {
        field: &'static str,
    },
    InvalidType {
        field: &'static str,
        expected: &'static str,
    },
    InvalidFormat {
        field: &'static str,
        expected: &'static str,
        input: String,
    },
    MalformedPattern {
        index: usize,
        reason: String,
    },
    UnknownPattern {
        pattern: String,
    },
    LengthMismatch {
        texts: usize,
        recipients: usize,
    },
    InvalidSchedule {
        input: String,
    },
    InvalidUrl {
        input: String,
    },
    UnknownBackend {
        identifier: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { field } => write!(f, "{field} is required"),
            Self::Empty { field } => write!(f, "{field} must not be empty"),
            Self::InvalidType { field, expected } => {
                write!(f, "{field} must be {expected}")
            }
            Self::InvalidFormat {
                field,
                expected,
                input,
            } => write!(f, "{field} must match {expected}, got {input:?}"),
            Self::MalformedPattern { index, reason } => {
                write!(f, "patterns[{index}] is malformed: {reason}")
            }
            Self::UnknownPattern { pattern } => write!(f, "unknown pattern: {pattern}"),
            Self::LengthMismatch { texts, recipients } => write!(
                f,
                "texts and recipients must have the same length ({texts} != {recipients})"
            ),
            Self::InvalidSchedule { input } => write!(f, "invalid schedule time: {input}"),
            Self::InvalidUrl { input } => write!(f, "invalid base url: {input}"),
            Self::UnknownBackend { identifier } => write!(f, "unknown backend: {identifier}"),
        }
    }
}

impl std::error::Error for ConfigError {}
