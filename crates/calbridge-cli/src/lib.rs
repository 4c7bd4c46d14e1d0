//! Command-line front end for Google Calendar.
//!
//! This crate provides the `calbridge` binary. Tokens are kept in a file
//! store; commands that need consent print the URL and exit non-zero.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{CliError, CliResult};
