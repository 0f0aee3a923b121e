//! Provider-specific error types.
//!
//! Everything that can go wrong between the driver and the BMC API ends up
//! here: credential problems, rejected status codes and transport failures.

use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credentials could not be resolved or were rejected by the auth server.
    #[error("PNAP API client can not be created: {message}")]
    Authentication {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The API answered with a status code outside the operation's allow-list.
    #[error("API Returned Code: {status}, Message: {message}, Validation Errors: {validation_errors:?}")]
    Api {
        status: u16,
        message: String,
        validation_errors: Vec<String>,
    },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A success payload could not be decoded.
    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ProviderError {
    /// Create an authentication error without an underlying cause
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
            source: None,
        }
    }

    /// Create an authentication error wrapping its cause
    pub fn auth_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Authentication {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an API error from status code, message and validation errors
    pub fn api(status: u16, message: impl Into<String>, validation_errors: Vec<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            validation_errors,
        }
    }

    /// Status code carried by an API rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ProviderError::api(
            400,
            "Validation failed",
            vec!["location must be one of PHX, ASH".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "API Returned Code: 400, Message: Validation failed, Validation Errors: [\"location must be one of PHX, ASH\"]"
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_auth_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no config");
        let err = ProviderError::auth_with("config file missing", io);
        assert!(err.to_string().contains("can not be created"));
        let source = std::error::Error::source(&err).expect("source attached");
        assert_eq!(source.to_string(), "no config");
    }

    #[test]
    fn test_auth_error_without_source() {
        let err = ProviderError::auth("bad secret");
        assert!(std::error::Error::source(&err).is_none());
        assert_eq!(err.status(), None);
    }
}
