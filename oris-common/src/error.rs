//! Common error types for the ORIS split analyzer

use thiserror::Error;

/// Common result type for analyzer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the analysis engine and the results source
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed time or date text
    #[error("Parse error: {0}")]
    Parse(String),

    /// Time arithmetic outside the representable range (negative loss, 24h overflow)
    #[error("Range error: {0}")]
    Range(String),

    /// Unknown category, event or competitor id
    #[error("Not found: {0}")]
    NotFound(String),

    /// Event exists but its discipline cannot be analyzed
    #[error("Unsupported discipline: {0}")]
    UnsupportedDiscipline(String),

    /// Query was valid but produced an empty result set
    #[error("Not found: {0}")]
    NoData(String),

    /// External results service failure (network, timeout, bad payload)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure may succeed on a retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Fetch(_))
    }

    /// Message suitable for showing to the user as-is
    ///
    /// `NoData` and `NotFound` read the same; unsupported disciplines get their own wording.
    pub fn user_message(&self) -> String {
        match self {
            Error::NotFound(what) | Error::NoData(what) => format!("Nenalezeno: {}", what),
            Error::UnsupportedDiscipline(name) => {
                format!("Disciplína není podporována: {}", name)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fetch_is_transient() {
        assert!(Error::Fetch("timeout".into()).is_transient());
        assert!(!Error::NotFound("x".into()).is_transient());
        assert!(!Error::Parse("x".into()).is_transient());
    }

    #[test]
    fn test_no_data_reads_like_not_found() {
        let a = Error::NotFound("ID závodu 123".into()).user_message();
        let b = Error::NoData("ID závodu 123".into()).user_message();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unsupported_discipline_message() {
        let msg = Error::UnsupportedDiscipline("Štafety".into()).user_message();
        assert!(msg.contains("Štafety"));
        assert!(!msg.starts_with("Nenalezeno"));
    }
}
