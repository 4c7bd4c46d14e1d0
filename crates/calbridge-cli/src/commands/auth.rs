//! Authorization commands.

use serde_json::Value;
use tracing::info;

use calbridge_google::{AuthOutcome, TokenStatus};

use crate::commands::{file_store, print_json, token_manager};
use crate::config::Settings;
use crate::error::{CliError, CliResult};

/// Prints the consent URL, optionally opening it in the browser.
pub fn url(settings: &Settings, state: Option<String>, open: bool) -> CliResult<()> {
    let mut manager = token_manager(settings)?;
    if let Some(ref state) = state {
        manager = manager.with_state(&parse_state(state)?);
    }

    let url = manager.authorization_url()?;
    println!("{}", url);

    if open {
        info!("opening consent URL in browser");
        open::that(&url).map_err(|e| CliError::Action(format!("failed to open URL: {}", e)))?;
    }
    Ok(())
}

/// Exchanges an authorization code and persists the resulting token.
pub async fn code(settings: &Settings, code: &str, force: bool) -> CliResult<()> {
    let manager = token_manager(settings)?;

    if force {
        manager.forget().await?;
    } else if manager.status()? != TokenStatus::Missing {
        eprintln!("A token is already stored; the code is ignored. Use --force to replace it.");
    }

    match manager.authenticate(Some(code)).await? {
        AuthOutcome::Authenticated(_) => {
            println!(
                "Authenticated. Token stored at {}",
                settings.google_calendar.credentials_path().display()
            );
            Ok(())
        }
        AuthOutcome::NeedsAuthorization(url) => Err(CliError::AuthRequired(url)),
    }
}

/// Prints the state of the stored token without contacting Google.
pub fn status(settings: &Settings) -> CliResult<()> {
    let manager = token_manager(settings)?;
    let status = manager.status()?;
    print_json(&StatusReport {
        credentials_path: settings.google_calendar.credentials_path().display().to_string(),
        token: status,
    })
}

/// Deletes the stored token.
pub async fn clear(settings: &Settings) -> CliResult<()> {
    let store = file_store(settings);
    let manager = token_manager(settings)?;
    manager.forget().await?;
    println!("Removed {}", store.path().display());
    Ok(())
}

#[derive(Debug, serde::Serialize)]
struct StatusReport {
    credentials_path: String,
    #[serde(flatten)]
    token: TokenStatus,
}

/// Parses `--state`, which must be a JSON object.
fn parse_state(raw: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| CliError::Usage(format!("--state is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(CliError::Usage("--state must be a JSON object".to_string()));
    }
    Ok(value)
}
