//! JSON event file.
//!
//! Loading is lenient: anything that cannot become a [`BaseEvent`] is
//! logged and dropped instead of failing the whole file.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{CalGridError, CalGridResult};
use crate::event::{BaseEvent, new_event_id};

/// On-disk shape before validation. Timestamps stay strings so one bad
/// record cannot poison the rest.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEvent {
    id: Option<String>,
    #[serde(default)]
    title: String,
    description: Option<String>,
    start: Option<String>,
    end: Option<String>,
    recurrence: Option<String>,
    #[serde(default)]
    excluded_dates: Vec<String>,
    recurrence_group_id: Option<String>,
    #[serde(default)]
    is_recurrence_base: bool,
    original_start: Option<String>,
    #[serde(default)]
    is_virtual: bool,
}

pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EventStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the collection. A missing file is an empty calendar.
    pub fn load(&self) -> CalGridResult<Vec<BaseEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<serde_json::Value> = serde_json::from_str(&content).map_err(|e| {
            CalGridError::Store(format!("{} is not a JSON array of events: {e}", self.path.display()))
        })?;

        let total = entries.len();
        let events: Vec<BaseEvent> = entries.into_iter().filter_map(into_base_event).collect();

        tracing::debug!(path = %self.path.display(), total, loaded = events.len(), "loaded events");
        Ok(events)
    }

    /// Write the collection, replacing the file atomically.
    pub fn save(&self, events: &[BaseEvent]) -> CalGridResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(events)?;
        let temp = self.path.with_extension("json.tmp");

        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), events = events.len(), "saved events");
        Ok(())
    }
}

fn into_base_event(value: serde_json::Value) -> Option<BaseEvent> {
    let raw: RawEvent = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed event record");
            return None;
        }
    };

    if raw.is_virtual {
        tracing::warn!(id = ?raw.id, "dropping persisted virtual occurrence");
        return None;
    }

    let (Some(start), Some(end)) = (
        raw.start.as_deref().and_then(parse_instant),
        raw.end.as_deref().and_then(parse_instant),
    ) else {
        tracing::warn!(id = ?raw.id, title = %raw.title, "dropping event without a valid start/end");
        return None;
    };

    let excluded_dates: BTreeSet<NaiveDate> = raw
        .excluded_dates
        .iter()
        .filter_map(|d| parse_day_or_instant(d))
        .collect();

    Some(BaseEvent {
        id: raw.id.unwrap_or_else(new_event_id),
        title: raw.title,
        description: raw.description,
        start,
        end,
        recurrence: raw.recurrence,
        excluded_dates,
        recurrence_group_id: raw.recurrence_group_id,
        is_recurrence_base: raw.is_recurrence_base,
        original_start: raw.original_start.as_deref().and_then(parse_instant),
    })
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Excluded dates are plain days, but full timestamps are accepted too.
fn parse_day_or_instant(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_instant(s).map(|dt| dt.date_naive()))
}
