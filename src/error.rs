use thiserror::Error;

/// Errors surfaced by the collaborator calls and configuration loading.
///
/// Aggregation never fails: unresolved references and low-confidence matches
/// are ordinary outcomes, not errors.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Network failure while talking to a provider
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with a non-2xx status
    #[error("{provider} returned status {status}: {message}")]
    Provider {
        provider: String,
        status: u16,
        message: String,
    },

    /// Provider answered 2xx but the payload could not be used
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// JSON (de)serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No API key in configuration nor environment
    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    /// Provider name not known to the factory
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    /// Provider present in configuration but disabled
    #[error("Provider '{0}' is not enabled in configuration")]
    ProviderDisabled(String),

    /// Invalid input handed to the import pipeline
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Reading input files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlannerError {
    /// True for failures of the external round-trip itself (as opposed to
    /// local misconfiguration). Callers decide whether to offer a retry.
    pub fn is_external(&self) -> bool {
        matches!(
            self,
            PlannerError::Http(_)
                | PlannerError::Provider { .. }
                | PlannerError::InvalidResponse(_)
                | PlannerError::Json(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_message() {
        let err = PlannerError::Provider {
            provider: "openai".to_string(),
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "openai returned status 429: rate limited");
        assert!(err.is_external());
    }

    #[test]
    fn test_config_errors_are_not_external() {
        assert!(!PlannerError::MissingApiKey("OPENAI_API_KEY".to_string()).is_external());
        assert!(!PlannerError::UnknownProvider("foo".to_string()).is_external());
    }
}
