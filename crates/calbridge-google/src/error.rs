//! Error types for token lifecycle and Calendar API operations.

use std::fmt;
use thiserror::Error;

/// The category of a [`GoogleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoogleErrorCode {
    /// No usable token; the user must visit the authorization URL.
    AuthorizationRequired,
    /// The provider rejected an authorization code or access token.
    AuthenticationFailed,
    /// The provider rejected a refresh token.
    RefreshFailed,
    /// The token store holds something that is not a token payload.
    CredentialsCorrupt,
    /// Creating, reading, writing or deleting the token store failed.
    StoreIo,
    /// Network error - connection failed, timeout, DNS resolution, etc.
    NetworkError,
    /// Rate limit exceeded - too many requests.
    RateLimited,
    /// Server returned an error (5xx status codes).
    ServerError,
    /// Invalid response from the server - parse error, unexpected format.
    InvalidResponse,
    /// Resource not found (404).
    NotFound,
    /// Request was invalid (400).
    BadRequest,
    /// The token lacks permission for the resource (403).
    AccessDenied,
    /// Configuration error - missing or invalid client secret, scopes, etc.
    ConfigurationError,
    /// Internal error - unexpected state, bug.
    InternalError,
}

impl GoogleErrorCode {
    /// Returns true if this error is transient and the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimited | Self::ServerError
        )
    }

    /// Returns a stable snake_case name for this error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationRequired => "authorization_required",
            Self::AuthenticationFailed => "authentication_failed",
            Self::RefreshFailed => "refresh_failed",
            Self::CredentialsCorrupt => "credentials_corrupt",
            Self::StoreIo => "store_io",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::AccessDenied => "access_denied",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for GoogleErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An error raised by the token manager, the OAuth endpoint or the Calendar API.
#[derive(Debug, Error)]
pub struct GoogleError {
    code: GoogleErrorCode,
    message: String,
    /// Consent URL, present on [`GoogleErrorCode::AuthorizationRequired`].
    authorization_url: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl GoogleError {
    /// Creates a new error with the given code and message.
    pub fn new(code: GoogleErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            authorization_url: None,
            source: None,
        }
    }

    /// The user must (re-)grant consent at `url`.
    pub fn authorization_required(url: impl Into<String>) -> Self {
        let mut err = Self::new(
            GoogleErrorCode::AuthorizationRequired,
            "no valid token, authorization required",
        );
        err.authorization_url = Some(url.into());
        err
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::AuthenticationFailed, message)
    }

    /// Creates a refresh failure.
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::RefreshFailed, message)
    }

    /// Creates a corrupt-credentials error.
    pub fn credentials_corrupt(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::CredentialsCorrupt, message)
    }

    /// Creates a token store I/O error.
    pub fn store_io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::new(GoogleErrorCode::StoreIo, message).with_source(source)
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::NetworkError, message)
    }

    /// Creates a rate limit error.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::RateLimited, message)
    }

    /// Creates a server error.
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::ServerError, message)
    }

    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::InvalidResponse, message)
    }

    /// Creates a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::NotFound, message)
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::BadRequest, message)
    }

    /// Creates an access denied error.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::AccessDenied, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::ConfigurationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(GoogleErrorCode::InternalError, message)
    }

    /// Sets the source error for this error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error code.
    pub fn code(&self) -> GoogleErrorCode {
        self.code
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the consent URL carried by an authorization-required error.
    pub fn authorization_url(&self) -> Option<&str> {
        self.authorization_url.as_deref()
    }

    /// Returns true if this error is transient and may be retried.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for GoogleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(ref url) = self.authorization_url {
            write!(f, " (visit {})", url)?;
        }
        Ok(())
    }
}

/// A specialized Result type for Google operations.
pub type GoogleResult<T> = Result<T, GoogleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_retryable() {
        assert!(GoogleErrorCode::NetworkError.is_retryable());
        assert!(GoogleErrorCode::RateLimited.is_retryable());
        assert!(GoogleErrorCode::ServerError.is_retryable());
        assert!(!GoogleErrorCode::RefreshFailed.is_retryable());
        assert!(!GoogleErrorCode::CredentialsCorrupt.is_retryable());
        assert!(!GoogleErrorCode::AuthorizationRequired.is_retryable());
    }

    #[test]
    fn error_code_names() {
        assert_eq!(GoogleErrorCode::StoreIo.as_str(), "store_io");
        assert_eq!(
            GoogleErrorCode::CredentialsCorrupt.to_string(),
            "credentials_corrupt"
        );
    }

    #[test]
    fn authorization_required_carries_url() {
        let err = GoogleError::authorization_required("https://accounts.example/auth");
        assert_eq!(err.code(), GoogleErrorCode::AuthorizationRequired);
        assert_eq!(err.authorization_url(), Some("https://accounts.example/auth"));
        assert!(err.to_string().contains("visit https://accounts.example/auth"));
    }

    #[test]
    fn store_io_keeps_source() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = GoogleError::store_io("failed to write token file", io_err);
        assert_eq!(err.code(), GoogleErrorCode::StoreIo);
        assert!(err.source().is_some());
        assert!(err.authorization_url().is_none());
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = GoogleError::rate_limited("too many requests");
        let display = err.to_string();
        assert!(display.contains("rate_limited"));
        assert!(display.contains("too many requests"));
    }
}
