//! View windows bounding recurrence expansion.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{CalGridError, CalGridResult};

/// Number of days shown around "now" when no window is given
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// A finite `[start, end]` range of instants. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ViewWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalGridResult<Self> {
        if end < start {
            return Err(CalGridError::InvalidSpan {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(ViewWindow { start, end })
    }

    /// Window from the start of `from` to the last second of `to`.
    pub fn for_days(from: NaiveDate, to: NaiveDate) -> CalGridResult<Self> {
        let end = day_start(to) + Duration::days(1) - Duration::seconds(1);
        ViewWindow::new(day_start(from), end)
    }

    /// Default window: the current day plus DEFAULT_WINDOW_DAYS after it.
    pub fn upcoming(now: DateTime<Utc>) -> Self {
        let start = day_start(now.date_naive());
        ViewWindow {
            start,
            end: start + Duration::days(DEFAULT_WINDOW_DAYS),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Calendar days touched by the window, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.end.date_naive();
        self.start
            .date_naive()
            .iter_days()
            .take_while(move |d| *d <= last)
    }
}

/// Midnight UTC at the start of `day`.
pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Parse YYYY-MM-DD.
pub fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date format '{}'. Expected YYYY-MM-DD", s))
}
