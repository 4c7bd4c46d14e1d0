//! Google Calendar access with an OAuth token lifecycle.
//!
//! A [`TokenManager`] reads the current token from a [`TokenStore`] on every
//! call, refreshes it when it has expired and clears it when the provider
//! rejects the refresh. Callers never see a half-valid token: they get either
//! an [`AccessToken`] or the consent URL to send the user to.
//!
//! ```no_run
//! use std::sync::Arc;
//! use calbridge_google::{CalendarService, ClientConfig, FileStore, CallOutcome};
//!
//! # async fn run() -> calbridge_google::GoogleResult<()> {
//! let config = ClientConfig::new("my-app", "/etc/my-app/client_secret.json");
//! let store = Arc::new(FileStore::new(ClientConfig::default_credentials_path()));
//! let service = CalendarService::from_config(&config, store)?;
//!
//! match service.list_calendars().await? {
//!     CallOutcome::Completed(list) => println!("{} calendars", list.items.len()),
//!     CallOutcome::NeedsAuthorization(url) => println!("visit {url}"),
//! }
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod oauth;
pub mod service;
pub mod state;
pub mod store;
pub mod token;

/// A boxed future, used to keep the capability traits object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub use client::{CALENDAR_API_BASE, CalendarApi, CalendarClient};
pub use config::{ClientConfig, ClientSecret, GOOGLE_AUTH_URI, GOOGLE_TOKEN_URI};
pub use error::{GoogleError, GoogleErrorCode, GoogleResult};
pub use event::{
    CalendarList, CalendarListEntry, Event, EventAttendee, EventDateTime, EventList, EventQuery,
    NewEvent, QueryParams,
};
pub use manager::{AuthOutcome, TokenManager, TokenStatus};
pub use oauth::{OAuthClient, TokenEndpoint};
pub use service::{CallOutcome, CalendarService};
pub use state::{decode_state, encode_state};
pub use store::{FileStore, MemoryStore, RefreshGuard, TokenStore};
pub use token::{AccessToken, EXPIRY_LEEWAY_SECS, TokenGrant};
