//! Event commands.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone};

use calbridge_google::{CalendarService, EventList, NewEvent};

use crate::cli::EventWindow;
use crate::commands::{calendar_service, completed, print_json};
use crate::config::Settings;
use crate::error::{CliError, CliResult};

/// Which listing `events list` performs.
#[derive(Debug, Clone, PartialEq)]
enum Listing {
    All,
    Sync(String),
    Range(DateTime<FixedOffset>, DateTime<FixedOffset>),
    Day(DateTime<FixedOffset>),
}

impl Listing {
    fn from_args(window: &EventWindow, sync_token: Option<String>) -> CliResult<Self> {
        if let Some(token) = sync_token {
            return Ok(Self::Sync(token));
        }
        match (window.from, window.to, window.date) {
            (Some(from), Some(to), None) => Ok(Self::Range(from, to)),
            (None, None, Some(date)) => Ok(Self::Day(local_noon(date)?)),
            (None, None, None) => Ok(Self::All),
            _ => Err(CliError::Usage(
                "use either --from with --to, or --date".to_string(),
            )),
        }
    }

    async fn run(self, service: &CalendarService, calendar: &str) -> CliResult<EventList> {
        let outcome = match self {
            Self::All => service.get_events(calendar, None).await?,
            Self::Sync(token) => service.get_events(calendar, Some(&token)).await?,
            Self::Range(from, to) => service.events_on_range(calendar, from, to).await?,
            Self::Day(date) => service.events_for_date(calendar, &date).await?,
        };
        completed(outcome)
    }
}

/// Midday of `date` in the local zone, carrying the local offset of that day.
fn local_noon(date: NaiveDate) -> CliResult<DateTime<FixedOffset>> {
    let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
    Local
        .from_local_datetime(&noon)
        .earliest()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| CliError::Usage(format!("{} has no local midday", date)))
}

pub async fn list(
    settings: &Settings,
    calendar: &str,
    window: &EventWindow,
    sync_token: Option<String>,
) -> CliResult<()> {
    let listing = Listing::from_args(window, sync_token)?;
    let service = calendar_service(settings)?;
    let list = listing.run(&service, calendar).await?;
    print_json(&list)
}

pub async fn get(settings: &Settings, calendar: &str, event_id: &str) -> CliResult<()> {
    let service = calendar_service(settings)?;
    let event = completed(service.get_event(calendar, event_id, &[]).await?)?;
    print_json(&event)
}

/// Fields for `events add`.
#[derive(Debug, Clone)]
pub struct AddArgs {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub summary: String,
    pub description: Option<String>,
    pub attendee: Option<String>,
    pub location: Option<String>,
}

impl AddArgs {
    fn into_new_event(self) -> CliResult<NewEvent> {
        if self.end < self.start {
            return Err(CliError::Usage("--end is before --start".to_string()));
        }
        let mut event = NewEvent::new(self.summary, &self.start, &self.end);
        if let Some(description) = self.description {
            event = event.with_description(description);
        }
        if let Some(attendee) = self.attendee {
            event = event.with_attendee(attendee);
        }
        if let Some(location) = self.location {
            event = event.with_location(location);
        }
        Ok(event)
    }
}

pub async fn add(settings: &Settings, calendar: &str, args: AddArgs) -> CliResult<()> {
    let new_event = args.into_new_event()?;
    let service = calendar_service(settings)?;
    let created = completed(service.add_event(calendar, new_event, &[]).await?)?;
    print_json(&created)
}

pub async fn delete(settings: &Settings, calendar: &str, event_id: &str) -> CliResult<()> {
    let service = calendar_service(settings)?;
    completed(service.delete_event(calendar, event_id).await?)?;
    println!("Deleted event {}", event_id);
    Ok(())
}
