//! TUI rendering traits for calgrid types.
//!
//! Extension traits that add colored terminal rendering to calgrid-core
//! types using owo_colors.

use calgrid_core::{EditScope, Geometry, ResolvedEvent};
use chrono::{DateTime, NaiveDate, Utc};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for ResolvedEvent {
    fn render(&self) -> String {
        let marker = match self {
            ResolvedEvent::Base(e) if e.is_recurring() => "↻".cyan().to_string(),
            ResolvedEvent::Base(_) => " ".to_string(),
            ResolvedEvent::Exception(_) => "*".yellow().to_string(),
            ResolvedEvent::Virtual(_) => "↻".dimmed().to_string(),
        };
        format!(
            "{} {} {} {}",
            format_span(self.start(), self.end()),
            marker,
            self.title(),
            self.id().dimmed()
        )
    }
}

impl Render for EditScope {
    fn render(&self) -> String {
        match self {
            EditScope::Single => "this event",
            EditScope::Following => "this and following events",
            EditScope::All => "all events in the series",
        }
        .to_string()
    }
}

/// One block of the day grid, e.g. `10:00-11:00  Standup  col 1/2  top 601 h 58`
pub fn render_block(geometry: &Geometry, event: Option<&ResolvedEvent>) -> String {
    let (time, title) = match event {
        Some(e) => (format_span(e.start(), e.end()), e.title().to_string()),
        None => ("?".to_string(), geometry.event_id.clone()),
    };
    let mut line = format!(
        "{} {}  {}",
        time,
        title,
        format!(
            "col {}/{}  top {:.0} h {:.0}  left {:.1}% w {:.1}%",
            geometry.column + 1,
            geometry.column_count,
            geometry.top,
            geometry.height,
            geometry.left,
            geometry.width
        )
        .dimmed()
    );
    if geometry.continues_from_previous_day {
        line.push_str(&" ←".dimmed().to_string());
    }
    if geometry.continues_to_next_day {
        line.push_str(&" →".dimmed().to_string());
    }
    line
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
pub fn format_date_label(date: NaiveDate, today: NaiveDate) -> String {
    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

/// `HH:MM-HH:MM`, with the end date when it falls on another day
pub fn format_span(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    if start.date_naive() == end.date_naive() {
        format!("{:>5}-{}", start.format("%H:%M"), end.format("%H:%M"))
    } else {
        format!("{:>5}-{}", start.format("%H:%M"), end.format("%a %H:%M"))
    }
}
