//! Client for the Google Calendar v3 events API.

use std::sync::Arc;

use reqwest::{Client, Response, StatusCode};
use roadie_types::{EventDetails, EventPatch};
use serde_json::Value;

use crate::auth::TokenProvider;
use crate::error::CalendarError;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

pub struct GoogleCalendarClient {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
    calendar_id: String,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(tokens: Arc<dyn TokenProvider>, calendar_id: String) -> Self {
        Self::with_base_url(tokens, calendar_id, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(
        tokens: Arc<dyn TokenProvider>,
        calendar_id: String,
        base_url: String,
    ) -> Self {
        Self {
            http: Client::new(),
            tokens,
            calendar_id,
            base_url,
        }
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.base_url, self.calendar_id)
    }

    /// Creates an event and returns the id Google assigned to it.
    pub async fn create_event(&self, details: &EventDetails) -> Result<String, CalendarError> {
        let token = self.tokens.access_token().await?;
        tracing::debug!(summary = %details.summary, "creating calendar event");
        let response = self
            .http
            .post(self.events_url())
            .bearer_auth(token)
            .json(details)
            .send()
            .await?;
        let body = check_status(response, None).await?;
        created_event_id(&body)
    }

    /// Sends only the populated patch fields, leaving the rest of the event
    /// untouched.
    pub async fn update_event(
        &self,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<(), CalendarError> {
        let token = self.tokens.access_token().await?;
        tracing::debug!(event_id, "updating calendar event");
        let response = self
            .http
            .patch(format!("{}/{}", self.events_url(), event_id))
            .bearer_auth(token)
            .json(patch)
            .send()
            .await?;
        check_status(response, Some(event_id)).await?;
        Ok(())
    }
}

/// Success bodies parse as JSON; failures carry Google's error message.
/// A 409 becomes the conflict variant so callers can name the event in
/// the way.
async fn check_status(
    response: Response,
    event_id: Option<&str>,
) -> Result<Value, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(CalendarError::from);
    }
    let raw = response.text().await.unwrap_or_default();
    let message = api_error_message(&raw).unwrap_or(raw);
    if status == StatusCode::CONFLICT {
        return Err(CalendarError::Conflict {
            event_id: event_id.unwrap_or("unknown").to_string(),
            message,
        });
    }
    Err(CalendarError::Api {
        status: status.as_u16(),
        message,
    })
}

fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn created_event_id(body: &Value) -> Result<String, CalendarError> {
    body.get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(CalendarError::MissingField("id"))
}
