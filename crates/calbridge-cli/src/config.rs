//! CLI configuration.
//!
//! All settings live in a single `config.toml`, by default at
//! `~/.config/calbridge/config.toml`:
//!
//! ```toml
//! [google_calendar]
//! application_name = "calbridge"
//! client_secret_path = "~/.config/calbridge/client_secret.json"
//! credentials_path = "~/.local/share/calbridge/google-credentials.json"
//! # redirect_uri = "http://localhost:8080/callback"
//! # scopes = ["https://www.googleapis.com/auth/calendar.readonly"]
//! # timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use calbridge_google::ClientConfig;

/// Top-level contents of `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Debug mode.
    pub debug: bool,

    /// Google Calendar settings.
    pub google_calendar: GoogleCalendarSettings,
}

/// The `[google_calendar]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleCalendarSettings {
    /// Sent as the HTTP user agent.
    pub application_name: String,

    /// Where the OAuth token is persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,

    /// Client secret JSON downloaded from the Google Cloud Console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_path: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// OAuth scopes; full calendar access when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,

    pub timeout_secs: u64,
}

impl Default for GoogleCalendarSettings {
    fn default() -> Self {
        Self {
            application_name: "calbridge".to_string(),
            credentials_path: None,
            client_secret_path: None,
            redirect_uri: None,
            scopes: Vec::new(),
            timeout_secs: ClientConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Loads configuration from the default path, or defaults if it is absent.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("calbridge")
    }
}

impl GoogleCalendarSettings {
    /// The token file, falling back to the per-user data directory.
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(ClientConfig::default_credentials_path)
    }

    /// Converts to the library's client configuration.
    pub fn to_client_config(&self) -> Result<ClientConfig, String> {
        let secret_path = self.client_secret_path.as_deref().ok_or_else(|| {
            format!(
                "client_secret_path is not set. Add to {}:\n  \
                 [google_calendar]\n  \
                 client_secret_path = \"/path/to/client_secret.json\"",
                Settings::default_path().display()
            )
        })?;

        let mut config = ClientConfig::new(&self.application_name, expand_home(secret_path))
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if !self.scopes.is_empty() {
            config = config.with_scopes(self.scopes.iter().cloned());
        }
        if let Some(ref uri) = self.redirect_uri {
            config = config.with_redirect_uri(uri);
        }

        config.validate()?;
        Ok(config)
    }
}

/// Expands a leading `~/` to the home directory.
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
