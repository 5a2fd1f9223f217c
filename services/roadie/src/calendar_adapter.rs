//! Adapter mapping the Google Calendar client onto the agent's calendar
//! seam.

use async_trait::async_trait;
use google_calendar::{CalendarError, GoogleCalendarClient};
use roadie_core::calendar::CalendarApi;
use roadie_core::error::{Result, RoadieError};
use roadie_types::{EventDetails, EventPatch};

pub struct GoogleCalendar {
    client: GoogleCalendarClient,
}

impl GoogleCalendar {
    pub fn new(client: GoogleCalendarClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendar {
    async fn create_event(&self, details: EventDetails) -> Result<String> {
        self.client.create_event(&details).await.map_err(into_roadie)
    }

    async fn update_event(&self, event_id: &str, patch: EventPatch) -> Result<()> {
        self.client
            .update_event(event_id, &patch)
            .await
            .map_err(into_roadie)
    }
}

/// Conflicts keep their identity so the agent can name the event in the
/// way; everything else collapses to the calendar error kind.
fn into_roadie(e: CalendarError) -> RoadieError {
    match e {
        CalendarError::Conflict { event_id, message } => {
            RoadieError::conflict(event_id, message)
        }
        other => RoadieError::calendar_api(other.to_string()),
    }
}
