//! Configuration commands.

use std::path::Path;

use crate::config::Settings;
use crate::error::{CliError, CliResult};

/// Dump the effective configuration to stdout.
pub fn dump(settings: &Settings, path: &Path) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(settings)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration, including the client secret file it names.
pub fn validate(settings: &Settings) -> CliResult<()> {
    check(settings)?;
    println!("Configuration is valid.");
    Ok(())
}

fn check(settings: &Settings) -> CliResult<()> {
    let google = &settings.google_calendar;
    let config = google.to_client_config().map_err(CliError::Config)?;

    calbridge_google::ClientSecret::from_file(&config.client_secret_path).map_err(|e| {
        CliError::Config(format!(
            "invalid client secret {}: {}",
            config.client_secret_path.display(),
            e
        ))
    })?;

    let credentials = google.credentials_path();
    if credentials.is_dir() {
        return Err(CliError::Config(format!(
            "credentials_path {} is a directory",
            credentials.display()
        )));
    }
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> CliResult<()> {
    println!("config: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_requires_readable_secret() {
        let tmp = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.google_calendar.client_secret_path = Some(tmp.path().join("missing.json"));
        assert!(matches!(check(&settings), Err(CliError::Config(_))));

        let secret = tmp.path().join("secret.json");
        std::fs::write(&secret, r#"{"web":{"client_id":"id","client_secret":"s"}}"#).unwrap();
        settings.google_calendar.client_secret_path = Some(secret);
        settings.google_calendar.credentials_path = Some(tmp.path().join("token.json"));
        check(&settings).unwrap();
    }

    #[test]
    fn validate_rejects_directory_credentials_path() {
        let tmp = tempfile::tempdir().unwrap();
        let secret = tmp.path().join("secret.json");
        std::fs::write(&secret, r#"{"installed":{"client_id":"id","client_secret":"s"}}"#).unwrap();

        let mut settings = Settings::default();
        settings.google_calendar.client_secret_path = Some(secret);
        settings.google_calendar.credentials_path = Some(tmp.path().to_path_buf());
        assert!(matches!(check(&settings), Err(CliError::Config(_))));
    }
}
