//! Error types for ddns-updater.

use thiserror::Error;

/// Result type alias for ddns-updater.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// One or more configuration problems found at startup.
    #[error("Configuration error: {}", .0.join("; "))]
    Config(Vec<String>),

    /// Malformed entry in the subdomain specification.
    #[error("Invalid subdomain entry {token:?}: {reason}")]
    Parse { token: String, reason: String },

    /// Public address observation failed.
    #[error("IP detection failed: {0}")]
    Observer(String),

    /// Published address lookup failed.
    #[error("DNS resolution failed for {name}: {message}")]
    Resolution { name: String, message: String },

    /// Provider refused or failed the record update.
    #[error("Update failed: {0}")]
    Update(String),

    /// Provider login failed or the session was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_lists_every_problem() {
        let err = DdnsError::Config(vec![
            "Please define USERNAME".to_string(),
            "Please define DOMAIN".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Configuration error: Please define USERNAME; Please define DOMAIN"
        );
    }

    #[test]
    fn test_parse_error_quotes_token() {
        let err = DdnsError::Parse {
            token: "vpn{A".to_string(),
            reason: "unbalanced braces".to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Invalid subdomain entry "vpn{A": unbalanced braces"#
        );
    }
}
