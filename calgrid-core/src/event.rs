//! Event types shared by the resolver, the layout engine and the
//! interaction state machine.
//!
//! [`BaseEvent`] is the only persisted shape. Everything a render pass
//! produces is a [`ResolvedEvent`], which tags each entry as an anchor,
//! a generated occurrence or a materialized exception so consumers can
//! match on it instead of probing flags.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalGridError, CalGridResult};
use crate::recurrence::RecurrenceRule;

/// A persisted calendar event, optionally the anchor of a recurring series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    // Recurrence fields
    /// Rule string, e.g. `FREQ=WEEKLY;INTERVAL=2;BYDAY=MO,WE`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    /// Calendar days on which the series produces nothing
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded_dates: BTreeSet<NaiveDate>,
    /// Shared by every record (series, splits, exceptions) of one logical series
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_group_id: Option<String>,
    #[serde(default)]
    pub is_recurrence_base: bool,
    /// Start of the series occurrence an exception replaces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_start: Option<DateTime<Utc>>,
}

impl BaseEvent {
    pub fn new(title: impl Into<String>, span: Span) -> Self {
        BaseEvent {
            id: new_event_id(),
            title: title.into(),
            description: None,
            start: span.start,
            end: span.end,
            recurrence: None,
            excluded_dates: BTreeSet::new(),
            recurrence_group_id: None,
            is_recurrence_base: false,
            original_start: None,
        }
    }

    /// Builder-style setter for the recurrence rule.
    pub fn with_recurrence(mut self, rule: impl Into<String>) -> Self {
        self.recurrence = Some(rule.into());
        self
    }

    /// Parsed rule, `None` for absent, `"none"` or unrecognized strings.
    pub fn rule(&self) -> Option<RecurrenceRule> {
        self.recurrence.as_deref().and_then(RecurrenceRule::parse)
    }

    pub fn is_recurring(&self) -> bool {
        self.rule().is_some()
    }

    /// A non-recurring member of a recurrence group.
    pub fn is_exception(&self) -> bool {
        !self.is_recurring() && self.recurrence_group_id.is_some() && !self.is_recurrence_base
    }

    /// Edits to this record need a single/following/all decision.
    pub fn belongs_to_series(&self) -> bool {
        self.is_recurring() || self.recurrence_group_id.is_some()
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn span(&self) -> Span {
        Span {
            start: self.start,
            end: self.end,
        }
    }

    pub fn is_excluded(&self, day: NaiveDate) -> bool {
        self.excluded_dates.contains(&day)
    }

    /// Day of the series occurrence this record stands for.
    pub fn occurrence_day(&self) -> NaiveDate {
        self.original_start.unwrap_or(self.start).date_naive()
    }
}

impl fmt::Display for BaseEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// Generate a fresh event id.
pub fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A generated occurrence of a recurring [`BaseEvent`]. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualOccurrence {
    /// `<parent_id>_<start millis>`
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub recurrence: Option<String>,
    pub recurrence_group_id: Option<String>,
}

impl VirtualOccurrence {
    pub fn synthetic_id(parent_id: &str, start: DateTime<Utc>) -> String {
        format!("{}_{}", parent_id, start.timestamp_millis())
    }
}

/// One entry of a render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedEvent {
    /// A standalone event or the anchor occurrence of a series.
    Base(BaseEvent),
    /// A materialized override of one occurrence.
    Exception(BaseEvent),
    Virtual(VirtualOccurrence),
}

impl ResolvedEvent {
    pub(crate) fn from_base(event: BaseEvent) -> Self {
        if event.is_exception() {
            ResolvedEvent::Exception(event)
        } else {
            ResolvedEvent::Base(event)
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => &e.id,
            ResolvedEvent::Virtual(v) => &v.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => &e.title,
            ResolvedEvent::Virtual(v) => &v.title,
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => e.start,
            ResolvedEvent::Virtual(v) => v.start,
        }
    }

    pub fn end(&self) -> DateTime<Utc> {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => e.end,
            ResolvedEvent::Virtual(v) => v.end,
        }
    }

    /// `None` when the stored range is inverted.
    pub fn span(&self) -> Option<Span> {
        Span::new(self.start(), self.end())
    }

    pub fn recurrence_group_id(&self) -> Option<&str> {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => {
                e.recurrence_group_id.as_deref()
            }
            ResolvedEvent::Virtual(v) => v.recurrence_group_id.as_deref(),
        }
    }

    /// Id of the persisted record that owns this entry.
    pub fn record_id(&self) -> &str {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => &e.id,
            ResolvedEvent::Virtual(v) => &v.parent_id,
        }
    }

    /// Start of the series occurrence this entry represents.
    pub fn original_start(&self) -> DateTime<Utc> {
        match self {
            ResolvedEvent::Base(e) => e.start,
            ResolvedEvent::Exception(e) => e.original_start.unwrap_or(e.start),
            ResolvedEvent::Virtual(v) => v.start,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, ResolvedEvent::Virtual(_))
    }

    /// Whether an edit needs a single/following/all decision.
    pub fn is_recurring(&self) -> bool {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => e.belongs_to_series(),
            ResolvedEvent::Virtual(_) => true,
        }
    }

    pub fn as_base(&self) -> Option<&BaseEvent> {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => Some(e),
            ResolvedEvent::Virtual(_) => None,
        }
    }

    pub fn into_base(self) -> Option<BaseEvent> {
        match self {
            ResolvedEvent::Base(e) | ResolvedEvent::Exception(e) => Some(e),
            ResolvedEvent::Virtual(_) => None,
        }
    }
}

/// A forward time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Span {
    /// `None` if `end` is before `start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (end >= start).then_some(Span { start, end })
    }

    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalGridResult<Self> {
        Span::new(start, end).ok_or_else(|| CalGridError::InvalidSpan {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        })
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn shifted(&self, delta: Duration) -> Self {
        Span {
            start: self.start + delta,
            end: self.end + delta,
        }
    }
}
