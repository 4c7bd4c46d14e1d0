//! Subcommand implementations.

pub mod auth;
pub mod calendars;
pub mod config;
pub mod events;

use std::sync::Arc;

use serde::Serialize;

use calbridge_google::{CalendarService, CallOutcome, FileStore, TokenManager};

use crate::config::Settings;
use crate::error::{CliError, CliResult};

/// The token store named by the configuration.
pub(crate) fn file_store(settings: &Settings) -> Arc<FileStore> {
    Arc::new(FileStore::new(settings.google_calendar.credentials_path()))
}

pub(crate) fn token_manager(settings: &Settings) -> CliResult<TokenManager> {
    let config = settings
        .google_calendar
        .to_client_config()
        .map_err(CliError::Config)?;
    Ok(TokenManager::from_config(&config, file_store(settings))?)
}

pub(crate) fn calendar_service(settings: &Settings) -> CliResult<CalendarService> {
    let config = settings
        .google_calendar
        .to_client_config()
        .map_err(CliError::Config)?;
    Ok(CalendarService::from_config(&config, file_store(settings))?)
}

/// Unwraps a completed call; a consent redirect becomes [`CliError::AuthRequired`].
pub(crate) fn completed<T>(outcome: CallOutcome<T>) -> CliResult<T> {
    match outcome {
        CallOutcome::Completed(value) => Ok(value),
        CallOutcome::NeedsAuthorization(url) => Err(CliError::AuthRequired(url)),
    }
}

pub(crate) fn to_pretty_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Action(format!("failed to render output: {}", e)))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", to_pretty_json(value)?);
    Ok(())
}
