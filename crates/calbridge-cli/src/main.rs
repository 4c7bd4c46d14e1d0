//! calbridge CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calbridge_cli::cli::{AuthAction, Cli, Command, ConfigAction, EventsAction};
use calbridge_cli::commands::{self, events::AddArgs};
use calbridge_cli::config::Settings;
use calbridge_cli::error::{CliError, CliResult};
use calbridge_core::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = if cli.config.is_some() {
        Settings::load_from(&config_path).map_err(CliError::Config)?
    } else {
        Settings::load().map_err(CliError::Config)?
    };

    if let Err(e) = init_tracing(TracingConfig::for_cli(cli.debug || settings.debug)) {
        eprintln!("warning: {}", e);
    }

    match cli.command {
        Command::Auth { action } => match action {
            AuthAction::Url { state, open } => commands::auth::url(&settings, state, open),
            AuthAction::Code { code, force } => commands::auth::code(&settings, &code, force).await,
            AuthAction::Status => commands::auth::status(&settings),
            AuthAction::Clear => commands::auth::clear(&settings).await,
        },
        Command::Calendars => commands::calendars::list(&settings).await,
        Command::Events { action } => match action {
            EventsAction::List {
                calendar,
                window,
                sync_token,
            } => commands::events::list(&settings, &calendar, &window, sync_token).await,
            EventsAction::Get { calendar, event_id } => {
                commands::events::get(&settings, &calendar, &event_id).await
            }
            EventsAction::Add {
                calendar,
                start,
                end,
                summary,
                description,
                attendee,
                location,
            } => {
                let args = AddArgs {
                    start,
                    end,
                    summary,
                    description,
                    attendee,
                    location,
                };
                commands::events::add(&settings, &calendar, args).await
            }
            EventsAction::Delete { calendar, event_id } => {
                commands::events::delete(&settings, &calendar, &event_id).await
            }
        },
        Command::Config { action } => match action {
            ConfigAction::Dump => commands::config::dump(&settings, &config_path),
            ConfigAction::Validate => commands::config::validate(&settings),
            ConfigAction::Path => commands::config::path(&config_path),
        },
    }
}
