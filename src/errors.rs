use serde::Serialize;

/// Errors raised at the edges of the ledger core.
///
/// The computational paths (rates, aggregation, filtering) coerce bad input to
/// safe defaults and never return these. They surface only where a caller asks
/// for strict parsing, encodes output, or loads configuration.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    Io(
        #[from]
        #[serde(skip)]
        std::io::Error,
    ),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::SerializationError(err.to_string())
    }
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        LedgerError::SerializationError(err.to_string())
    }
}

impl From<crate::config::AppConfigError> for LedgerError {
    fn from(err: crate::config::AppConfigError) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl LedgerError {
    /// Short machine-readable code, used by the CLI's JSON error output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidStatus(_) => "invalid_status",
            Self::SerializationError(_) => "serialization_error",
            Self::Io(_) => "io_error",
            Self::Config(_) => "config_error",
        }
    }

    /// Whether the error was caused by the caller's input rather than the
    /// environment.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidStatus(_))
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(LedgerError::InvalidInput("x".into()).code(), "invalid_input");
        assert_eq!(LedgerError::InvalidStatus("x".into()).code(), "invalid_status");
        assert_eq!(
            LedgerError::SerializationError("x".into()).code(),
            "serialization_error"
        );
        assert_eq!(LedgerError::Config("x".into()).code(), "config_error");
    }

    #[test]
    fn user_errors_are_classified() {
        assert!(LedgerError::InvalidInput("page size".into()).is_user_error());
        assert!(LedgerError::InvalidStatus("shipped?".into()).is_user_error());
        assert!(!LedgerError::Config("missing".into()).is_user_error());
    }

    #[test]
    fn display_includes_message() {
        assert_eq!(
            LedgerError::InvalidStatus("Teleported".into()).to_string(),
            "Invalid status: Teleported"
        );
    }

    #[test]
    fn json_errors_convert_to_serialization() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let converted: LedgerError = err.into();
        assert!(matches!(converted, LedgerError::SerializationError(_)));
    }
}
