//! Calendar operations behind the token lifecycle.
//!
//! Every call authenticates first. When consent is needed the API is never
//! touched and the caller gets the consent URL instead of a result.

use std::sync::Arc;

use chrono::{DateTime, TimeZone};

use calbridge_core::TimeRange;

use crate::client::{CalendarApi, CalendarClient};
use crate::config::ClientConfig;
use crate::error::{GoogleError, GoogleResult};
use crate::event::{CalendarList, Event, EventList, EventQuery, NewEvent, QueryParams};
use crate::manager::{AuthOutcome, TokenManager};
use crate::store::TokenStore;
use crate::token::AccessToken;

/// Result of a calendar operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Completed(T),
    /// The user must grant consent at this URL before retrying.
    NeedsAuthorization(String),
}

impl<T> CallOutcome<T> {
    /// Converts a consent redirect into an `AuthorizationRequired` error.
    pub fn into_result(self) -> GoogleResult<T> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::NeedsAuthorization(url) => Err(GoogleError::authorization_required(url)),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            Self::Completed(value) => CallOutcome::Completed(f(value)),
            Self::NeedsAuthorization(url) => CallOutcome::NeedsAuthorization(url),
        }
    }
}

/// Google Calendar access for one token store.
#[derive(Debug, Clone)]
pub struct CalendarService {
    manager: TokenManager,
    api: Arc<dyn CalendarApi>,
}

impl CalendarService {
    pub fn new(manager: TokenManager, api: Arc<dyn CalendarApi>) -> Self {
        Self { manager, api }
    }

    /// Builds a service talking to Google with the given store.
    pub fn from_config(config: &ClientConfig, store: Arc<dyn TokenStore>) -> GoogleResult<Self> {
        let manager = TokenManager::from_config(config, store)?;
        let api = CalendarClient::new(&config.application_name, config.timeout)?;
        Ok(Self::new(manager, Arc::new(api)))
    }

    pub fn manager(&self) -> &TokenManager {
        &self.manager
    }

    async fn token(&self) -> GoogleResult<Result<AccessToken, String>> {
        Ok(match self.manager.authenticate(None).await? {
            AuthOutcome::Authenticated(token) => Ok(token),
            AuthOutcome::NeedsAuthorization(url) => Err(url),
        })
    }

    /// Creates a tentative event.
    pub async fn add_event(
        &self,
        calendar_id: &str,
        event: NewEvent,
        params: &QueryParams,
    ) -> GoogleResult<CallOutcome<Event>> {
        let token = match self.token().await? {
            Ok(token) => token,
            Err(url) => return Ok(CallOutcome::NeedsAuthorization(url)),
        };
        let body = event.into_event();
        let created = self
            .api
            .insert_event(&token, calendar_id, &body, params)
            .await?;
        Ok(CallOutcome::Completed(created))
    }

    /// Lists events, or only the changes since `sync_token`.
    pub async fn get_events(
        &self,
        calendar_id: &str,
        sync_token: Option<&str>,
    ) -> GoogleResult<CallOutcome<EventList>> {
        let query = match sync_token {
            Some(token) => EventQuery::sync(token),
            None => EventQuery::default(),
        };
        self.events_by_params(calendar_id, &query).await
    }

    /// The first page of events, without paging metadata.
    pub async fn init_events_list(&self, calendar_id: &str) -> GoogleResult<CallOutcome<Vec<Event>>> {
        Ok(self
            .events_by_params(calendar_id, &EventQuery::default())
            .await?
            .map(|list| list.items))
    }

    pub async fn delete_event(
        &self,
        calendar_id: &str,
        event_id: &str,
    ) -> GoogleResult<CallOutcome<()>> {
        let token = match self.token().await? {
            Ok(token) => token,
            Err(url) => return Ok(CallOutcome::NeedsAuthorization(url)),
        };
        self.api.delete_event(&token, calendar_id, event_id).await?;
        Ok(CallOutcome::Completed(()))
    }

    /// Replaces the event identified by `event.id`.
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event: &Event,
    ) -> GoogleResult<CallOutcome<Event>> {
        if event.id.as_deref().is_none_or(str::is_empty) {
            return Err(GoogleError::bad_request("event has no id"));
        }
        let token = match self.token().await? {
            Ok(token) => token,
            Err(url) => return Ok(CallOutcome::NeedsAuthorization(url)),
        };
        let updated = self.api.update_event(&token, calendar_id, event).await?;
        Ok(CallOutcome::Completed(updated))
    }

    pub async fn get_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        params: &QueryParams,
    ) -> GoogleResult<CallOutcome<Event>> {
        let token = match self.token().await? {
            Ok(token) => token,
            Err(url) => return Ok(CallOutcome::NeedsAuthorization(url)),
        };
        let event = self
            .api
            .get_event(&token, calendar_id, event_id, params)
            .await?;
        Ok(CallOutcome::Completed(event))
    }

    pub async fn list_calendars(&self) -> GoogleResult<CallOutcome<CalendarList>> {
        let token = match self.token().await? {
            Ok(token) => token,
            Err(url) => return Ok(CallOutcome::NeedsAuthorization(url)),
        };
        Ok(CallOutcome::Completed(self.api.list_calendars(&token).await?))
    }

    /// Single events between `start` and `end`, ordered by start time.
    pub async fn events_on_range<Tz: TimeZone>(
        &self,
        calendar_id: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> GoogleResult<CallOutcome<EventList>> {
        let range = TimeRange::new(start, end).map_err(|e| GoogleError::bad_request(e.to_string()))?;
        self.events_by_params(calendar_id, &EventQuery::range(&range))
            .await
    }

    /// Single events on the calendar day of `date`, in `date`'s own offset.
    pub async fn events_for_date<Tz: TimeZone>(
        &self,
        calendar_id: &str,
        date: &DateTime<Tz>,
    ) -> GoogleResult<CallOutcome<EventList>> {
        let range = TimeRange::for_day(date);
        self.events_by_params(calendar_id, &EventQuery::range(&range))
            .await
    }

    pub async fn events_by_params(
        &self,
        calendar_id: &str,
        query: &EventQuery,
    ) -> GoogleResult<CallOutcome<EventList>> {
        let token = match self.token().await? {
            Ok(token) => token,
            Err(url) => return Ok(CallOutcome::NeedsAuthorization(url)),
        };
        let params = query.to_query_pairs();
        let list = self.api.list_events(&token, calendar_id, &params).await?;
        Ok(CallOutcome::Completed(list))
    }
}
