//! Google Calendar API v3 client.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::BoxFuture;
use crate::error::{GoogleError, GoogleResult};
use crate::event::{CalendarList, Event, EventList, QueryParams};
use crate::token::AccessToken;

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Calendar operations, each authorized by a bearer token.
pub trait CalendarApi: Send + Sync + fmt::Debug {
    fn insert_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event: &'a Event,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, GoogleResult<Event>>;

    fn list_events<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, GoogleResult<EventList>>;

    fn get_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event_id: &'a str,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, GoogleResult<Event>>;

    /// Replaces an event with `event`, whose `id` selects the target.
    fn update_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event: &'a Event,
    ) -> BoxFuture<'a, GoogleResult<Event>>;

    fn delete_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, GoogleResult<()>>;

    fn list_calendars<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> BoxFuture<'a, GoogleResult<CalendarList>>;
}

/// Production [`CalendarApi`] over HTTPS.
#[derive(Debug, Clone)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl CalendarClient {
    /// Creates a client with the given user agent and request timeout.
    pub fn new(application_name: &str, timeout: Duration) -> GoogleResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(application_name.to_string())
            .build()
            .map_err(|e| {
                GoogleError::internal(format!("failed to create HTTP client: {}", e)).with_source(e)
            })?;

        Ok(Self {
            http_client,
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at another server, e.g. a local mock.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> GoogleResult<String> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GoogleError::network("request timeout")
            } else if e.is_connect() {
                GoogleError::network(format!("connection failed: {}", e))
            } else {
                GoogleError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return response
                .text()
                .await
                .map_err(|e| GoogleError::network(format!("failed to read response: {}", e)));
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, retry_after, &body))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> GoogleResult<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            GoogleError::invalid_response(format!("failed to parse response: {}", e))
        })
    }

    fn authorized(
        &self,
        method: reqwest::Method,
        url: &str,
        token: &AccessToken,
    ) -> reqwest::RequestBuilder {
        self.http_client
            .request(method, url)
            .bearer_auth(token.access_token())
    }

    fn with_body<B: Serialize>(
        request: reqwest::RequestBuilder,
        body: &B,
    ) -> GoogleResult<reqwest::RequestBuilder> {
        let json = serde_json::to_string(body)
            .map_err(|e| GoogleError::internal(format!("failed to serialize request: {}", e)))?;
        Ok(request
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(json))
    }
}

/// Maps a non-success status to an error, keeping Google's message if any.
fn status_error(status: reqwest::StatusCode, retry_after: Option<u64>, body: &str) -> GoogleError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string());

    match status.as_u16() {
        400 => GoogleError::bad_request(format!("bad request: {}", detail)),
        401 => GoogleError::authentication("access token expired or invalid"),
        403 => GoogleError::access_denied(format!("access denied: {}", detail)),
        404 => GoogleError::not_found(format!("not found: {}", detail)),
        429 => GoogleError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        _ => GoogleError::server(format!("API error ({}): {}", status, detail)),
    }
}

impl CalendarApi for CalendarClient {
    fn insert_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event: &'a Event,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, GoogleResult<Event>> {
        Box::pin(async move {
            debug!("inserting event into calendar {}", calendar_id);
            let request = self
                .authorized(reqwest::Method::POST, &self.events_url(calendar_id), token)
                .query(params);
            self.fetch(Self::with_body(request, event)?).await
        })
    }

    fn list_events<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, GoogleResult<EventList>> {
        Box::pin(async move {
            let request = self
                .authorized(reqwest::Method::GET, &self.events_url(calendar_id), token)
                .query(params);
            let list: EventList = self.fetch(request).await?;
            debug!("fetched {} events from calendar {}", list.items.len(), calendar_id);
            Ok(list)
        })
    }

    fn get_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event_id: &'a str,
        params: &'a QueryParams,
    ) -> BoxFuture<'a, GoogleResult<Event>> {
        Box::pin(async move {
            let request = self
                .authorized(
                    reqwest::Method::GET,
                    &self.event_url(calendar_id, event_id),
                    token,
                )
                .query(params);
            self.fetch(request).await
        })
    }

    fn update_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event: &'a Event,
    ) -> BoxFuture<'a, GoogleResult<Event>> {
        Box::pin(async move {
            let event_id = event
                .id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or_else(|| GoogleError::bad_request("event has no id"))?;
            debug!("updating event {} in calendar {}", event_id, calendar_id);
            let request = self.authorized(
                reqwest::Method::PUT,
                &self.event_url(calendar_id, event_id),
                token,
            );
            self.fetch(Self::with_body(request, event)?).await
        })
    }

    fn delete_event<'a>(
        &'a self,
        token: &'a AccessToken,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, GoogleResult<()>> {
        Box::pin(async move {
            debug!("deleting event {} from calendar {}", event_id, calendar_id);
            let request = self.authorized(
                reqwest::Method::DELETE,
                &self.event_url(calendar_id, event_id),
                token,
            );
            self.send(request).await.map(|_| ())
        })
    }

    fn list_calendars<'a>(
        &'a self,
        token: &'a AccessToken,
    ) -> BoxFuture<'a, GoogleResult<CalendarList>> {
        Box::pin(async move {
            let url = format!("{}/users/me/calendarList", self.base_url);
            self.fetch(self.authorized(reqwest::Method::GET, &url, token))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GoogleErrorCode;
    use crate::event::NewEvent;
    use mockito::Matcher;

    fn token() -> AccessToken {
        AccessToken::from_json(r#"{"access_token":"ya29.test"}"#).unwrap()
    }

    fn client(server: &mockito::ServerGuard) -> CalendarClient {
        CalendarClient::new("calbridge-tests", Duration::from_secs(5))
            .unwrap()
            .with_base_url(server.url())
    }

    fn no_params() -> Vec<(String, String)> {
        Vec::new()
    }

    #[tokio::test]
    async fn list_events_sends_bearer_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/team%40example.com/events")
            .match_header("authorization", "Bearer ya29.test")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("syncToken".into(), "abc".into()),
                Matcher::UrlEncoded("singleEvents".into(), "true".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"{"kind":"calendar#events","items":[{"id":"e1","summary":"Lunch"}],"nextSyncToken":"def"}"#,
            )
            .create_async()
            .await;

        let params = vec![
            ("syncToken".to_string(), "abc".to_string()),
            ("singleEvents".to_string(), "true".to_string()),
        ];
        let list = client(&server)
            .list_events(&token(), "team@example.com", &params)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(list.items.len(), 1);
        assert_eq!(list.items[0].summary.as_deref(), Some("Lunch"));
        assert_eq!(list.next_sync_token.as_deref(), Some("def"));
        assert_eq!(list.extra["kind"], "calendar#events");
    }

    #[tokio::test]
    async fn insert_event_posts_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendars/primary/events")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "status": "tentative",
                "summary": "Sync",
                "attendees": [{"email": "a@example.com"}]
            })))
            .with_status(200)
            .with_body(r#"{"id":"new1","status":"tentative","summary":"Sync"}"#)
            .create_async()
            .await;

        let start = chrono::DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z").unwrap();
        let end = chrono::DateTime::parse_from_rfc3339("2024-03-01T11:00:00Z").unwrap();
        let event = NewEvent::new("Sync", &start, &end)
            .with_attendee("a@example.com")
            .into_event();

        let created = client(&server)
            .insert_event(&token(), "primary", &event, &no_params())
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(created.id.as_deref(), Some("new1"));
    }

    #[tokio::test]
    async fn update_preserves_unknown_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/calendars/primary/events/e1")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "id": "e1",
                "summary": "Renamed",
                "reminders": {"useDefault": false}
            })))
            .with_status(200)
            .with_body(r#"{"id":"e1","summary":"Renamed"}"#)
            .create_async()
            .await;

        let mut event: Event = serde_json::from_str(
            r#"{"id":"e1","summary":"Old","reminders":{"useDefault":false}}"#,
        )
        .unwrap();
        event.summary = Some("Renamed".to_string());

        client(&server)
            .update_event(&token(), "primary", &event)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_without_id_is_bad_request() {
        let server = mockito::Server::new_async().await;
        let err = client(&server)
            .update_event(&token(), "primary", &Event::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::BadRequest);
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/calendars/primary/events/e1")
            .with_status(204)
            .create_async()
            .await;

        client(&server)
            .delete_event(&token(), "primary", "e1")
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn list_calendars_parses_entries() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me/calendarList")
            .with_status(200)
            .with_body(
                r#"{"items":[{"id":"primary@example.com","summary":"Me","primary":true,"accessRole":"owner"},{"id":"holidays"}]}"#,
            )
            .create_async()
            .await;

        let list = client(&server).list_calendars(&token()).await.unwrap();
        assert_eq!(list.items.len(), 2);
        assert!(list.items[0].primary);
        assert_eq!(list.items[0].access_role.as_deref(), Some("owner"));
        assert!(!list.items[1].primary);
    }

    #[tokio::test]
    async fn status_codes_map_to_error_codes() {
        let cases = [
            (400, GoogleErrorCode::BadRequest),
            (401, GoogleErrorCode::AuthenticationFailed),
            (403, GoogleErrorCode::AccessDenied),
            (404, GoogleErrorCode::NotFound),
            (429, GoogleErrorCode::RateLimited),
            (500, GoogleErrorCode::ServerError),
            (503, GoogleErrorCode::ServerError),
        ];

        for (status, expected) in cases {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("GET", "/calendars/primary/events/e1")
                .with_status(status)
                .with_body(r#"{"error":{"code":0,"message":"nope"}}"#)
                .create_async()
                .await;

            let err = client(&server)
                .get_event(&token(), "primary", "e1", &no_params())
                .await
                .unwrap_err();
            assert_eq!(err.code(), expected, "status {}", status);
        }
    }

    #[tokio::test]
    async fn rate_limit_reports_retry_after() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me/calendarList")
            .with_status(429)
            .with_header("retry-after", "17")
            .create_async()
            .await;

        let err = client(&server).list_calendars(&token()).await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::RateLimited);
        assert!(err.message().contains("17"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn google_error_message_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/calendars/primary/events/missing")
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"Not Found"}}"#)
            .create_async()
            .await;

        let err = client(&server)
            .get_event(&token(), "primary", "missing", &no_params())
            .await
            .unwrap_err();
        assert_eq!(err.message(), "not found: Not Found");
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/users/me/calendarList")
            .with_status(200)
            .with_body("<html>")
            .create_async()
            .await;

        let err = client(&server).list_calendars(&token()).await.unwrap_err();
        assert_eq!(err.code(), GoogleErrorCode::InvalidResponse);
    }
}
