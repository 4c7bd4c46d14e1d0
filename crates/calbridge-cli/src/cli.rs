//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Args, Parser, Subcommand};

/// calbridge - Google Calendar from the terminal
#[derive(Debug, Parser)]
#[command(name = "calbridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "CALBRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorization and stored token management
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// List the calendars visible to the authorized account
    Calendars,

    /// Read and modify events
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authorization actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Print the consent URL
    Url {
        /// JSON object to round-trip through the OAuth `state` parameter
        #[arg(long)]
        state: Option<String>,

        /// Open the URL in the default browser
        #[arg(long)]
        open: bool,
    },

    /// Exchange an authorization code and store the token
    Code {
        /// Code from the consent redirect
        code: String,

        /// Discard any stored token first
        #[arg(long, short)]
        force: bool,
    },

    /// Show the state of the stored token
    Status,

    /// Delete the stored token
    Clear,
}

/// Event actions.
#[derive(Debug, Subcommand)]
pub enum EventsAction {
    /// List events of a calendar
    List {
        /// Calendar ID (e.g. "primary")
        calendar: String,

        #[command(flatten)]
        window: EventWindow,

        /// Only return changes since this sync token
        #[arg(long, conflicts_with_all = ["from", "to", "date"])]
        sync_token: Option<String>,
    },

    /// Show one event
    Get {
        calendar: String,
        event_id: String,
    },

    /// Create a tentative event
    Add {
        calendar: String,

        /// Start time (RFC 3339)
        #[arg(long, value_parser = parse_rfc3339)]
        start: DateTime<FixedOffset>,

        /// End time (RFC 3339)
        #[arg(long, value_parser = parse_rfc3339)]
        end: DateTime<FixedOffset>,

        #[arg(long)]
        summary: String,

        #[arg(long)]
        description: Option<String>,

        /// Email address of a single attendee
        #[arg(long)]
        attendee: Option<String>,

        #[arg(long)]
        location: Option<String>,
    },

    /// Delete an event
    Delete {
        calendar: String,
        event_id: String,
    },
}

/// Time window for `events list`.
#[derive(Debug, Clone, Default, Args)]
pub struct EventWindow {
    /// Range start (RFC 3339), requires --to
    #[arg(long, value_parser = parse_rfc3339, requires = "to", conflicts_with = "date")]
    pub from: Option<DateTime<FixedOffset>>,

    /// Range end (RFC 3339), requires --from
    #[arg(long, value_parser = parse_rfc3339, requires = "from", conflicts_with = "date")]
    pub to: Option<DateTime<FixedOffset>>,

    /// A whole local day (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

fn parse_rfc3339(value: &str) -> Result<DateTime<FixedOffset>, String> {
    DateTime::parse_from_rfc3339(value)
        .map_err(|e| format!("expected an RFC 3339 timestamp like 2024-03-01T09:00:00+01:00: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_event_range() {
        let cli = Cli::try_parse_from([
            "calbridge",
            "events",
            "list",
            "primary",
            "--from",
            "2024-03-01T00:00:00Z",
            "--to",
            "2024-03-02T00:00:00Z",
        ])
        .unwrap();

        let Command::Events {
            action: EventsAction::List { calendar, window, sync_token },
        } = cli.command
        else {
            panic!("unexpected command");
        };
        assert_eq!(calendar, "primary");
        assert!(window.from.is_some() && window.to.is_some());
        assert!(sync_token.is_none());
    }

    #[test]
    fn from_requires_to() {
        let result =
            Cli::try_parse_from(["calbridge", "events", "list", "primary", "--from", "2024-03-01T00:00:00Z"]);
        assert!(result.is_err());
    }

    #[test]
    fn date_conflicts_with_range() {
        let result = Cli::try_parse_from([
            "calbridge",
            "events",
            "list",
            "primary",
            "--date",
            "2024-03-01",
            "--from",
            "2024-03-01T00:00:00Z",
            "--to",
            "2024-03-02T00:00:00Z",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn add_rejects_bad_timestamp() {
        let result = Cli::try_parse_from([
            "calbridge", "events", "add", "primary", "--start", "tomorrow", "--end",
            "2024-03-01T10:00:00Z", "--summary", "x",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["calbridge", "auth", "status", "--debug", "--config", "/tmp/c.toml"])
            .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }
}
