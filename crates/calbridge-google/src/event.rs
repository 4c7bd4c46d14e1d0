//! Calendar API resource types.
//!
//! Only the fields this crate reads or writes are typed. Everything else the
//! API returns lands in `extra` and is sent back unchanged on update.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use calbridge_core::to_rfc3339;

/// Extra query parameters passed through to the API verbatim.
pub type QueryParams = [(String, String)];

/// A calendar event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<EventAttendee>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Start or end of an event: a timestamp, or a date for all-day events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// A timed boundary, formatted as RFC 3339 with the instant's offset.
    pub fn at<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            date_time: Some(to_rfc3339(instant)),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventAttendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One page of `events.list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    /// Present on the last page; pass it back to fetch only changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_sync_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The user's calendar list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Input for [`CalendarService::add_event`](crate::CalendarService::add_event).
///
/// New events are created `tentative`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub summary: String,
    pub description: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    pub attendee: Option<String>,
    pub location: Option<String>,
}

impl NewEvent {
    pub fn new<Tz: TimeZone>(
        summary: impl Into<String>,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            summary: summary.into(),
            description: None,
            start: EventDateTime::at(start),
            end: EventDateTime::at(end),
            attendee: None,
            location: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Invites a single attendee by email.
    pub fn with_attendee(mut self, email: impl Into<String>) -> Self {
        self.attendee = Some(email.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// The request body for `events.insert`.
    pub fn into_event(self) -> Event {
        Event {
            status: Some("tentative".to_string()),
            summary: Some(self.summary),
            description: self.description,
            location: self.location,
            start: Some(self.start),
            end: Some(self.end),
            attendees: self
                .attendee
                .into_iter()
                .map(|email| EventAttendee {
                    email,
                    ..EventAttendee::default()
                })
                .collect(),
            ..Event::default()
        }
    }
}

/// Typed `events.list` parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    pub time_min: Option<DateTime<chrono::FixedOffset>>,
    pub time_max: Option<DateTime<chrono::FixedOffset>>,
    pub updated_min: Option<DateTime<chrono::FixedOffset>>,
    pub order_by: Option<String>,
    pub single_events: Option<bool>,
    pub sync_token: Option<String>,
    pub page_token: Option<String>,
    pub max_results: Option<u32>,
    /// Free-text search.
    pub q: Option<String>,
    /// Any other parameter, passed through as given.
    pub extra: Vec<(String, String)>,
}

impl EventQuery {
    /// Expanded single events between two instants, ordered by start time.
    pub fn range(range: &calbridge_core::TimeRange) -> Self {
        Self {
            time_min: Some(range.start),
            time_max: Some(range.end),
            order_by: Some("startTime".to_string()),
            single_events: Some(true),
            ..Self::default()
        }
    }

    /// Changes since a previous listing.
    pub fn sync(sync_token: impl Into<String>) -> Self {
        Self {
            sync_token: Some(sync_token.into()),
            ..Self::default()
        }
    }

    /// Query string pairs in API naming.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: String| pairs.push((key.to_string(), value));

        if let Some(ref t) = self.time_min {
            push("timeMin", to_rfc3339(t));
        }
        if let Some(ref t) = self.time_max {
            push("timeMax", to_rfc3339(t));
        }
        if let Some(ref t) = self.updated_min {
            push("updatedMin", to_rfc3339(t));
        }
        if let Some(ref order) = self.order_by {
            push("orderBy", order.clone());
        }
        if let Some(single) = self.single_events {
            push("singleEvents", single.to_string());
        }
        if let Some(ref token) = self.sync_token {
            push("syncToken", token.clone());
        }
        if let Some(ref token) = self.page_token {
            push("pageToken", token.clone());
        }
        if let Some(max) = self.max_results {
            push("maxResults", max.to_string());
        }
        if let Some(ref q) = self.q {
            push("q", q.clone());
        }
        pairs.extend(self.extra.iter().cloned());
        pairs
    }
}
