//! CLI error types.

use std::fmt;

use calbridge_google::{GoogleError, GoogleErrorCode};

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that end a CLI command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error.
    Config(String),
    /// Invalid command-line input.
    Usage(String),
    /// Google Calendar or token error.
    Google(GoogleError),
    /// Consent required; holds the URL to visit.
    AuthRequired(String),
    /// Action failed (opening a browser).
    Action(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Usage(msg) => write!(f, "invalid input: {}", msg),
            Self::Google(err) => write!(f, "{}", err),
            Self::AuthRequired(url) => write!(
                f,
                "authorization required. Visit:\n\n  {}\n\nthen run: calbridge auth code <CODE>",
                url
            ),
            Self::Action(msg) => write!(f, "action failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Google(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GoogleError> for CliError {
    fn from(err: GoogleError) -> Self {
        match (err.code(), err.authorization_url()) {
            (GoogleErrorCode::AuthorizationRequired, Some(url)) => Self::AuthRequired(url.to_string()),
            _ => Self::Google(err),
        }
    }
}
