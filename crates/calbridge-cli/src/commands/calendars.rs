//! Calendar list command.

use crate::commands::{calendar_service, completed, print_json};
use crate::config::Settings;
use crate::error::CliResult;

/// Prints the calendars visible to the authorized account.
pub async fn list(settings: &Settings) -> CliResult<()> {
    let service = calendar_service(settings)?;
    let calendars = completed(service.list_calendars().await?)?;
    print_json(&calendars)
}
