use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Coarse classification of a [`PortalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote service rejected the credential (HTTP 401/403).
    Authentication,
    /// Any other remote or transport failure.
    Api,
    /// Local misuse: bad arguments, conflicting options, malformed literals.
    Caller,
    /// Configuration could not be loaded or contained invalid values.
    Config,
}

#[derive(Debug, Error, Diagnostic)]
pub enum PortalError {
    #[error("authentication failed (HTTP {status}): {message}")]
    #[diagnostic(help("set METT_JWT or METT_API_KEY, or pass --jwt / --api-key"))]
    Authentication { status: u16, message: String },

    #[error("{}", api_message(.status, .message))]
    Api { status: Option<u16>, message: String },

    #[error("invalid query parameter '{0}': expected KEY=VALUE")]
    InvalidQueryPair(String),

    #[error("invalid header '{0}': expected KEY:VALUE")]
    InvalidHeaderPair(String),

    #[error("a request can carry either a text body or a JSON body, not both")]
    ConflictingBody,

    #[error("invalid JSON body: {0}")]
    InvalidJsonBody(String),

    #[error("unsupported HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid request path: {0}")]
    InvalidPath(String),

    #[error("invalid request timeout {0}: expected a positive number of seconds")]
    InvalidTimeout(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse config file: {0}")]
    ConfigParse(String),

    #[error("invalid value for {key}: {value}")]
    InvalidConfigValue { key: String, value: String },
}

impl PortalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::Authentication { .. } => ErrorKind::Authentication,
            PortalError::Api { .. } => ErrorKind::Api,
            PortalError::InvalidQueryPair(_)
            | PortalError::InvalidHeaderPair(_)
            | PortalError::ConflictingBody
            | PortalError::InvalidJsonBody(_)
            | PortalError::InvalidMethod(_)
            | PortalError::InvalidPath(_)
            | PortalError::InvalidTimeout(_) => ErrorKind::Caller,
            PortalError::ConfigRead(_)
            | PortalError::ConfigParse(_)
            | PortalError::InvalidConfigValue { .. } => ErrorKind::Config,
        }
    }

    /// HTTP status attached to the error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PortalError::Authentication { status, .. } => Some(*status),
            PortalError::Api { status, .. } => *status,
            _ => None,
        }
    }

    pub(crate) fn api(message: impl Into<String>) -> Self {
        PortalError::Api {
            status: None,
            message: message.into(),
        }
    }
}

fn api_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("API request failed (HTTP {status}): {message}"),
        None => format!("API request failed: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        let auth = PortalError::Authentication {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(auth.kind(), ErrorKind::Authentication);
        assert_eq!(auth.status(), Some(403));

        assert_eq!(PortalError::ConflictingBody.kind(), ErrorKind::Caller);
        assert_eq!(PortalError::api("boom").status(), None);
    }

    #[test]
    fn api_message_mentions_status_only_when_known() {
        let with_status = PortalError::Api {
            status: Some(502),
            message: "bad gateway".to_string(),
        };
        assert_eq!(
            with_status.to_string(),
            "API request failed (HTTP 502): bad gateway"
        );
        assert_eq!(
            PortalError::api("connection refused").to_string(),
            "API request failed: connection refused"
        );
    }
}
