//! Pointer position ↔ calendar time conversion and grid snapping.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Span;
use crate::window::day_start;

/// Default snapping step in minutes
pub const DEFAULT_STEP_MINUTES: u32 = 15;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Rounding applied by [`SnapClock::snap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapMode {
    Floor,
    Ceil,
    Round,
}

/// Converts vertical pixel offsets in the day columns of a view into times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapClock {
    /// Day shown in column 0
    pub origin: NaiveDate,
    pub px_per_hour: f64,
    pub step_minutes: u32,
}

impl SnapClock {
    pub fn new(origin: NaiveDate, px_per_hour: f64, step_minutes: u32) -> Self {
        SnapClock {
            origin,
            px_per_hour,
            step_minutes: step_minutes.max(1),
        }
    }

    /// Unsnapped time under the pointer. `y` is relative to the visible top
    /// of the grid; `scroll_offset` is how far the grid is scrolled.
    pub fn position_to_time(&self, y: f64, day_index: usize, scroll_offset: f64) -> DateTime<Utc> {
        let day = self.day(day_index);
        let seconds = if self.px_per_hour > 0.0 {
            (y + scroll_offset) / self.px_per_hour * 3600.0
        } else {
            0.0
        };
        // Clamp into [00:00, 24:00)
        let seconds = seconds.clamp(0.0, f64::from(MINUTES_PER_DAY * 60 - 1));
        day_start(day) + Duration::seconds(seconds as i64)
    }

    /// Pixel offset of `time` within its day column, before scrolling.
    pub fn time_to_position(&self, time: DateTime<Utc>) -> f64 {
        let since_midnight = time - day_start(time.date_naive());
        since_midnight.num_seconds() as f64 / 3600.0 * self.px_per_hour
    }

    pub fn day(&self, day_index: usize) -> NaiveDate {
        self.origin + Duration::days(day_index as i64)
    }

    /// Quantize to this clock's step.
    pub fn snap(&self, time: DateTime<Utc>, mode: SnapMode) -> DateTime<Utc> {
        snap(time, mode, self.step_minutes)
    }

    /// Span for a drag-to-create gesture: the earlier point is floored and
    /// the later one ceiled, so the dragged pixels are always covered.
    pub fn create_span(&self, press: DateTime<Utc>, release: DateTime<Utc>) -> Span {
        let (first, last) = if press <= release {
            (press, release)
        } else {
            (release, press)
        };
        let start = self.snap(first, SnapMode::Floor);
        let end = self.snap(last, SnapMode::Ceil);
        self.with_min_duration(start, end)
    }

    /// Extend `end` so the span lasts at least one step.
    pub fn with_min_duration(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Span {
        let min_end = start + Duration::minutes(i64::from(self.step_minutes));
        Span {
            start,
            end: end.max(min_end),
        }
    }
}

/// Quantize the minute-of-day of `time` to a multiple of `step_minutes`.
///
/// Seconds are discarded and the result never leaves the day: a value that
/// would round up to midnight is held at 23:59.
pub fn snap(time: DateTime<Utc>, mode: SnapMode, step_minutes: u32) -> DateTime<Utc> {
    let step = f64::from(step_minutes.max(1));
    let minute_of_day = f64::from(time.hour() * 60 + time.minute()) + f64::from(time.second()) / 60.0;

    let steps = minute_of_day / step;
    let quantized = match mode {
        SnapMode::Floor => steps.floor(),
        SnapMode::Ceil => steps.ceil(),
        SnapMode::Round => steps.round(),
    } * step;

    let minutes = (quantized.max(0.0) as u32).min(MINUTES_PER_DAY - 1);
    let hour = (minutes / 60).min(23);
    let minute = (minutes % 60).min(59);

    let clock = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    time.date_naive().and_time(clock).and_utc()
}
