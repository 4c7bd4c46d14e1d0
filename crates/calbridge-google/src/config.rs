//! Client configuration and the Google client secret file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GoogleError, GoogleResult};

/// Google's OAuth consent endpoint.
pub const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's OAuth token endpoint.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client credentials loaded from a Google Cloud Console JSON file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSecret {
    /// The OAuth 2.0 client ID.
    pub client_id: String,
    /// The OAuth 2.0 client secret.
    pub client_secret: String,
    /// Consent endpoint.
    pub auth_uri: String,
    /// Token endpoint.
    pub token_uri: String,
    /// Redirect URIs registered for the client, in file order.
    pub redirect_uris: Vec<String>,
}

/// On-disk layout of the client secret file.
///
/// Google Cloud Console nests the fields under `installed` or `web`;
/// some tools write them flat at the root.
#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<SecretSection>,
    web: Option<SecretSection>,
    #[serde(flatten)]
    flat: FlatSection,
}

#[derive(Debug, Deserialize)]
struct SecretSection {
    client_id: String,
    client_secret: String,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FlatSection {
    client_id: Option<String>,
    client_secret: Option<String>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientSecret {
    /// Creates a client secret that uses Google's default endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_uri: GOOGLE_AUTH_URI.to_string(),
            token_uri: GOOGLE_TOKEN_URI.to_string(),
            redirect_uris: Vec::new(),
        }
    }

    /// Loads the client secret JSON downloaded from the Google Cloud Console.
    pub fn from_file(path: impl AsRef<Path>) -> GoogleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GoogleError::configuration(format!(
                "failed to read client secret {}: {}",
                path.display(),
                e
            ))
            .with_source(e)
        })?;
        Self::from_json(&content)
    }

    /// Parses a client secret from its JSON form.
    pub fn from_json(json: &str) -> GoogleResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(json).map_err(|e| {
            GoogleError::configuration(format!("failed to parse client secret JSON: {}", e))
        })?;

        if let Some(section) = file.installed.or(file.web) {
            return Ok(Self {
                client_id: section.client_id,
                client_secret: section.client_secret,
                auth_uri: section.auth_uri.unwrap_or_else(|| GOOGLE_AUTH_URI.to_string()),
                token_uri: section.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string()),
                redirect_uris: section.redirect_uris,
            });
        }

        let flat = file.flat;
        match (flat.client_id, flat.client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
                auth_uri: flat.auth_uri.unwrap_or_else(|| GOOGLE_AUTH_URI.to_string()),
                token_uri: flat.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URI.to_string()),
                redirect_uris: flat.redirect_uris,
            }),
            _ => Err(GoogleError::configuration(
                "client secret must contain an 'installed'/'web' section or 'client_id'/'client_secret' at root level",
            )),
        }
    }

    /// Checks that the required fields are present.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.client_id.is_empty() {
            return Err("client_id is required");
        }
        if self.client_secret.is_empty() {
            return Err("client_secret is required");
        }
        Ok(())
    }
}

/// Configuration for a [`TokenManager`](crate::TokenManager) and its clients.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Application name, sent as the HTTP user agent.
    pub application_name: String,

    /// OAuth scopes to request.
    ///
    /// Defaults to full calendar access.
    pub scopes: BTreeSet<String>,

    /// Path to the client secret JSON.
    pub client_secret_path: PathBuf,

    /// Redirect URI for the consent flow.
    ///
    /// When unset, the first `redirect_uris` entry of the client secret is used.
    pub redirect_uri: Option<String>,

    /// Request timeout for the token endpoint and Calendar API.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Default timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Default OAuth scope: read/write access to calendars.
    pub const DEFAULT_SCOPE: &'static str = "https://www.googleapis.com/auth/calendar";

    /// Creates a configuration with the default scope and timeout.
    pub fn new(application_name: impl Into<String>, client_secret_path: impl Into<PathBuf>) -> Self {
        Self {
            application_name: application_name.into(),
            scopes: BTreeSet::from([Self::DEFAULT_SCOPE.to_string()]),
            client_secret_path: client_secret_path.into(),
            redirect_uri: None,
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Default path for the persisted token file.
    pub fn default_credentials_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calbridge")
            .join("google-credentials.json")
    }

    /// Replaces the requested scopes.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the redirect URI.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Scopes joined with spaces, as the consent endpoint expects them.
    pub fn scope_param(&self) -> String {
        self.scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.application_name.trim().is_empty() {
            return Err("application_name is required".to_string());
        }
        if self.scopes.is_empty() {
            return Err("at least one OAuth scope is required".to_string());
        }
        if self.client_secret_path.as_os_str().is_empty() {
            return Err("client_secret_path is required".to_string());
        }
        if let Some(ref uri) = self.redirect_uri {
            url::Url::parse(uri).map_err(|e| format!("invalid redirect_uri {}: {}", uri, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_from_installed_section() {
        let json = r#"{
            "installed": {
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "shh",
                "project_id": "demo",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]
            }
        }"#;

        let secret = ClientSecret::from_json(json).unwrap();
        assert_eq!(secret.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secret.client_secret, "shh");
        assert_eq!(secret.auth_uri, "https://accounts.google.com/o/oauth2/auth");
        assert_eq!(secret.redirect_uris, vec!["http://localhost".to_string()]);
    }

    #[test]
    fn secret_from_web_section_uses_default_endpoints() {
        let json = r#"{
            "web": {
                "client_id": "web.apps.googleusercontent.com",
                "client_secret": "web-secret"
            }
        }"#;

        let secret = ClientSecret::from_json(json).unwrap();
        assert_eq!(secret.auth_uri, GOOGLE_AUTH_URI);
        assert_eq!(secret.token_uri, GOOGLE_TOKEN_URI);
        assert!(secret.redirect_uris.is_empty());
    }

    #[test]
    fn secret_from_flat_object() {
        let json = r#"{
            "client_id": "flat.apps.googleusercontent.com",
            "client_secret": "flat-secret",
            "refresh_token": "ignored"
        }"#;

        let secret = ClientSecret::from_json(json).unwrap();
        assert_eq!(secret.client_id, "flat.apps.googleusercontent.com");
        assert_eq!(secret.client_secret, "flat-secret");
    }

    #[test]
    fn secret_without_credentials_is_rejected() {
        let err = ClientSecret::from_json(r#"{ "other": {} }"#).unwrap_err();
        assert!(err.message().contains("client_id"));

        let err = ClientSecret::from_json("not json").unwrap_err();
        assert!(err.message().contains("parse"));
    }

    #[test]
    fn secret_from_missing_file() {
        let err = ClientSecret::from_file("/nonexistent/calbridge/secret.json").unwrap_err();
        assert_eq!(err.code(), crate::GoogleErrorCode::ConfigurationError);
    }

    #[test]
    fn secret_validation() {
        assert!(ClientSecret::new("id", "secret").validate().is_ok());
        assert!(ClientSecret::new("", "secret").validate().is_err());
        assert!(ClientSecret::new("id", "").validate().is_err());
    }

    #[test]
    fn config_defaults() {
        let config = ClientConfig::new("calbridge-test", "/tmp/secret.json");
        assert_eq!(config.scope_param(), ClientConfig::DEFAULT_SCOPE);
        assert!(config.redirect_uri.is_none());
        assert_eq!(
            config.timeout,
            Duration::from_secs(ClientConfig::DEFAULT_TIMEOUT_SECS)
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn scopes_are_deduplicated_and_sorted() {
        let config = ClientConfig::new("app", "/tmp/secret.json").with_scopes([
            "https://www.googleapis.com/auth/calendar.readonly",
            "https://www.googleapis.com/auth/calendar.events",
            "https://www.googleapis.com/auth/calendar.readonly",
        ]);
        assert_eq!(config.scopes.len(), 2);
        assert_eq!(
            config.scope_param(),
            "https://www.googleapis.com/auth/calendar.events https://www.googleapis.com/auth/calendar.readonly"
        );
    }

    #[test]
    fn config_validation() {
        let empty_scopes = ClientConfig::new("app", "/tmp/secret.json").with_scopes(Vec::<String>::new());
        assert!(empty_scopes.validate().is_err());

        let no_name = ClientConfig::new("  ", "/tmp/secret.json");
        assert!(no_name.validate().is_err());

        let bad_redirect = ClientConfig::new("app", "/tmp/secret.json").with_redirect_uri("not a url");
        assert!(bad_redirect.validate().is_err());
    }
}
