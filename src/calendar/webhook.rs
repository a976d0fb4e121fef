// src/calendar/webhook.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{CalendarError, CalendarEvent, CalendarMirror};

/// Calendar mirror speaking plain JSON over HTTP:
/// `POST /events`, `PUT /events/{ref}`, `DELETE /events/{ref}`.
#[derive(Debug)]
pub struct WebhookCalendar {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

impl WebhookCalendar {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CalendarError> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| CalendarError::InvalidUrl(format!("{raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CalendarError::InvalidUrl(raw));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, CalendarError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CalendarError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn event_url(&self, calendar_ref: &str) -> Result<Url, CalendarError> {
        self.url(&["events", calendar_ref])
    }
}

fn ensure_success(status: StatusCode) -> Result<(), CalendarError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(CalendarError::Status(status.as_u16()))
    }
}

#[async_trait]
impl CalendarMirror for WebhookCalendar {
    async fn notify_create(&self, event: &CalendarEvent) -> Result<String, CalendarError> {
        let resp = self
            .client
            .post(self.url(&["events"])?)
            .json(event)
            .send()
            .await?;
        ensure_success(resp.status())?;

        let created: CreatedEvent = resp.json().await?;
        if created.id.trim().is_empty() {
            return Err(CalendarError::MissingRef);
        }
        Ok(created.id)
    }

    async fn notify_update(&self, calendar_ref: &str, event: &CalendarEvent) -> Result<(), CalendarError> {
        let resp = self
            .client
            .put(self.event_url(calendar_ref)?)
            .json(event)
            .send()
            .await?;
        ensure_success(resp.status())
    }

    async fn notify_delete(&self, calendar_ref: &str) -> Result<(), CalendarError> {
        let resp = self.client.delete(self.event_url(calendar_ref)?).send().await?;
        // already gone on the calendar side
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(resp.status())
    }
}
