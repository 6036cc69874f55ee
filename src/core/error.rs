//! Error types for the rate monitor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RateError {
    /// Too few observations to compute a result. Carries caller-facing text
    #[error("{0}")]
    InsufficientData(String),

    /// Upstream answered but nothing is currently published. Carries
    /// caller-facing text
    #[error("{0}")]
    NoData(String),

    /// Network failure, timeout or non-success HTTP status
    #[error("Upstream unavailable ({source_id}): {message}")]
    UpstreamUnavailable { source_id: String, message: String },

    /// Upstream answered with a body we cannot interpret
    #[error("Malformed upstream response ({source_id}): {message}")]
    UpstreamFormat { source_id: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

pub type RateResult<T> = Result<T, RateError>;

impl RateError {
    pub fn insufficient_data(msg: impl Into<String>) -> Self {
        Self::InsufficientData(msg.into())
    }

    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    pub fn unavailable(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }

    pub fn format(source_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::UpstreamFormat {
            source_id: source_id.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for failures that originate at an upstream provider
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::UpstreamFormat { .. }
        )
    }

    /// Caller-facing message for the `{status: "error", error}` envelope.
    ///
    /// Data-availability errors say what is missing. Upstream detail stays in
    /// the logs; callers only learn which provider failed and how.
    pub fn message(&self) -> String {
        match self {
            Self::InsufficientData(msg) | Self::NoData(msg) => msg.clone(),
            Self::UpstreamUnavailable { source_id, .. } => {
                format!("Rate provider {} is currently unavailable", source_id)
            }
            Self::UpstreamFormat { source_id, .. } => {
                format!("Rate provider {} returned a malformed response", source_id)
            }
            Self::InvalidInput(msg) => msg.clone(),
            Self::Config(_) | Self::Serialization(_) | Self::IO(_) => {
                "Internal error".to_string()
            }
        }
    }
}

impl From<serde_json::Error> for RateError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_classification() {
        assert!(RateError::unavailable("FRED", "timeout").is_upstream());
        assert!(RateError::format("ECOS", "bad json").is_upstream());
        assert!(!RateError::no_data("empty").is_upstream());
    }

    #[test]
    fn test_message_distinguishes_no_data_from_malformed() {
        let empty = RateError::no_data("No rate data available");
        let malformed = RateError::format("FRED", "expected array");

        assert_eq!(empty.message(), "No rate data available");
        assert!(malformed.message().contains("malformed"));
        assert!(!malformed.message().contains("expected array"));
    }

    #[test]
    fn test_data_errors_keep_their_subject() {
        let equity = RateError::insufficient_data("Insufficient equity data for hanwha");
        let filings = RateError::no_data("No equity filings found for kyobo");

        assert_eq!(equity.message(), "Insufficient equity data for hanwha");
        assert_eq!(filings.message(), "No equity filings found for kyobo");
    }
}
