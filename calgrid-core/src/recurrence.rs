//! Recurrence rules and their expansion into virtual occurrences.
//!
//! Only a small RRULE subset is understood: `FREQ` (daily, weekly, monthly,
//! yearly), `INTERVAL`, `BYDAY` and `UNTIL`. Tokens are found by substring
//! search, so ordering does not matter and unknown tokens are ignored. A
//! rule without a recognizable `FREQ` is no rule at all.

use std::fmt;

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc, Weekday,
};
use serde::{Deserialize, Serialize};

use crate::event::{BaseEvent, VirtualOccurrence};
use crate::window::ViewWindow;

/// Format of the `UNTIL` token.
pub const UNTIL_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Upper bound on periods scanned when looking for the next candidate of a
/// series; enough for a Feb 29 yearly rule.
const MAX_LOOKAHEAD_PERIODS: i64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Parsed view of a rule string. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Always at least 1
    pub interval: u32,
    /// Weekday allow-list
    pub by_day: Option<Vec<Weekday>>,
    pub until: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    /// Parse a rule string. Returns `None` for `"none"` and for anything
    /// without a supported `FREQ`.
    pub fn parse(rule: &str) -> Option<Self> {
        let upper = rule.trim().to_ascii_uppercase();
        if upper.is_empty() || upper == "NONE" {
            return None;
        }

        let frequency = if upper.contains("FREQ=DAILY") {
            Frequency::Daily
        } else if upper.contains("FREQ=WEEKLY") {
            Frequency::Weekly
        } else if upper.contains("FREQ=MONTHLY") {
            Frequency::Monthly
        } else if upper.contains("FREQ=YEARLY") {
            Frequency::Yearly
        } else {
            return None;
        };

        let interval = token_value(&upper, "INTERVAL=")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(1);

        let by_day = token_value(&upper, "BYDAY=")
            .map(parse_weekdays)
            .filter(|days| !days.is_empty());

        let until = token_value(&upper, "UNTIL=").and_then(parse_until);

        Some(RecurrenceRule {
            frequency,
            interval,
            by_day,
            until,
        })
    }

    /// Whether `candidate` survives the weekday allow-list.
    pub fn allows_weekday(&self, candidate: DateTime<Utc>) -> bool {
        match &self.by_day {
            Some(days) => days.contains(&candidate.weekday()),
            None => true,
        }
    }

    /// The instant one period before `occurrence`, used as the UNTIL bound
    /// when a series is cut just before `occurrence`. `None` when that
    /// instant is out of range.
    ///
    /// Rules with a weekday allow-list produce candidates on consecutive
    /// days, so their period is a single day.
    pub fn period_before(&self, occurrence: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.by_day.is_some() {
            return occurrence.checked_sub_signed(TimeDelta::try_days(1)?);
        }
        let interval = i64::from(self.interval);
        match self.frequency {
            Frequency::Daily | Frequency::Weekly => {
                occurrence.checked_sub_signed(TimeDelta::try_days(self.step_days())?)
            }
            Frequency::Monthly => occurrence.checked_sub_months(Months::new(self.interval)),
            Frequency::Yearly => {
                let months = u32::try_from(interval * 12).ok()?;
                occurrence.checked_sub_months(Months::new(months))
            }
        }
    }

    /// First candidate of the series anchored at `anchor` strictly after
    /// `after`, ignoring `UNTIL` and exclusions.
    pub fn next_after(&self, anchor: DateTime<Utc>, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let first = self.first_period(anchor, after);
        (first..first + MAX_LOOKAHEAD_PERIODS)
            .flat_map(|period| self.period_candidates(anchor, period))
            .find(|candidate| *candidate > after && *candidate >= anchor)
    }

    fn step_days(&self) -> i64 {
        match self.frequency {
            Frequency::Weekly => 7 * i64::from(self.interval),
            _ => i64::from(self.interval),
        }
    }

    /// Index of the last period starting at or before `from`. Jumps over
    /// elapsed periods arithmetically instead of walking them.
    fn first_period(&self, anchor: DateTime<Utc>, from: DateTime<Utc>) -> i64 {
        if from <= anchor {
            return 0;
        }
        let interval = i64::from(self.interval);
        match self.frequency {
            Frequency::Daily | Frequency::Weekly => (from - anchor).num_days() / self.step_days(),
            Frequency::Monthly => {
                let months = i64::from(from.year() - anchor.year()) * 12
                    + i64::from(from.month0())
                    - i64::from(anchor.month0());
                months.max(0) / interval
            }
            Frequency::Yearly => i64::from(from.year() - anchor.year()).max(0) / interval,
        }
    }

    /// Earliest instant any candidate of `period` can take. Periods are
    /// monotonic in this value, so the walk stops once it passes the window.
    fn period_floor(&self, anchor: DateTime<Utc>, period: i64) -> Option<DateTime<Utc>> {
        match self.frequency {
            Frequency::Daily | Frequency::Weekly => self.period_start(anchor, period),
            Frequency::Monthly | Frequency::Yearly => {
                let (year, month) = self.target_month(anchor, period)?;
                NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN).and_utc())
            }
        }
    }

    /// Candidates produced by `period`, weekday filter applied. Empty once
    /// the period lies outside the representable range.
    ///
    /// Weekly rules with BYDAY open up every day of their week and then
    /// filter, instead of stepping a whole week per candidate. This goes
    /// beyond a literal per-candidate filter, which could only ever keep
    /// the anchor's weekday.
    fn period_candidates(&self, anchor: DateTime<Utc>, period: i64) -> Vec<DateTime<Utc>> {
        let mut candidates = Vec::new();
        match self.frequency {
            Frequency::Weekly if self.by_day.is_some() => {
                if let Some(week_start) = self.period_start(anchor, period) {
                    candidates.extend(
                        (0..7)
                            .filter_map(TimeDelta::try_days)
                            .filter_map(|offset| week_start.checked_add_signed(offset)),
                    );
                }
            }
            Frequency::Daily | Frequency::Weekly => {
                candidates.extend(self.period_start(anchor, period));
            }
            Frequency::Monthly | Frequency::Yearly => {
                // A month without the anchor's day is skipped, not clamped
                let date = self
                    .target_month(anchor, period)
                    .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, anchor.day()));
                if let Some(date) = date {
                    candidates.push(date.and_time(anchor.time()).and_utc());
                }
            }
        }
        candidates.retain(|c| self.allows_weekday(*c));
        candidates
    }

    /// Start of a daily or weekly period, `None` when out of range.
    fn period_start(&self, anchor: DateTime<Utc>, period: i64) -> Option<DateTime<Utc>> {
        let days = period.checked_mul(self.step_days())?;
        anchor.checked_add_signed(TimeDelta::try_days(days)?)
    }

    fn target_month(&self, anchor: DateTime<Utc>, period: i64) -> Option<(i32, u32)> {
        let months = match self.frequency {
            Frequency::Monthly => period * i64::from(self.interval),
            Frequency::Yearly => period * i64::from(self.interval) * 12,
            Frequency::Daily | Frequency::Weekly => return None,
        };
        let index = i64::from(anchor.year()) * 12 + i64::from(anchor.month0()) + months;
        let year = i32::try_from(index.div_euclid(12)).ok()?;
        let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
        Some((year, month))
    }

    /// Upper window test. Monthly and yearly series are bounded by calendar
    /// month, so a window ending on the first of a month still picks up that
    /// month's occurrence.
    fn within_upper_bound(&self, candidate: DateTime<Utc>, window: &ViewWindow) -> bool {
        match self.frequency {
            Frequency::Daily | Frequency::Weekly => candidate <= window.end,
            Frequency::Monthly | Frequency::Yearly => candidate
                .date_naive()
                .with_day(1)
                .is_some_and(|first| first.and_time(NaiveTime::MIN).and_utc() <= window.end),
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let freq = match self.frequency {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        };
        write!(f, "FREQ={}", freq)?;
        if self.interval != 1 {
            write!(f, ";INTERVAL={}", self.interval)?;
        }
        if let Some(days) = &self.by_day {
            let days: Vec<&str> = days.iter().map(|d| weekday_code(*d)).collect();
            write!(f, ";BYDAY={}", days.join(","))?;
        }
        if let Some(until) = self.until {
            write!(f, ";UNTIL={}", until.format(UNTIL_FORMAT))?;
        }
        Ok(())
    }
}

/// Expand `base` into the virtual occurrences visible in `window`.
///
/// The anchor itself is never returned; it is the base event. Returns an
/// empty list when the base carries no usable rule.
pub fn expand(base: &BaseEvent, window: &ViewWindow) -> Vec<VirtualOccurrence> {
    let Some(rule) = base.rule() else {
        return Vec::new();
    };

    let anchor = base.start;
    let duration = base.duration();
    // Back off by one duration so occurrences straddling the window start are kept
    let reach = window
        .start
        .checked_sub_signed(duration.max(Duration::zero()))
        .unwrap_or(window.start);

    let mut occurrences = Vec::new();
    let mut period = rule.first_period(anchor, reach);

    loop {
        let Some(floor) = rule.period_floor(anchor, period) else {
            break;
        };
        if floor > window.end || rule.until.is_some_and(|until| floor > until) {
            break;
        }

        for candidate in rule.period_candidates(anchor, period) {
            let Some(end) = candidate.checked_add_signed(duration) else {
                continue;
            };
            if candidate <= anchor || rule.until.is_some_and(|until| candidate > until) {
                continue;
            }
            if !rule.within_upper_bound(candidate, window) {
                continue;
            }
            if candidate < window.start && end <= window.start {
                continue;
            }
            if base.is_excluded(candidate.date_naive()) {
                continue;
            }

            occurrences.push(VirtualOccurrence {
                id: VirtualOccurrence::synthetic_id(&base.id, candidate),
                parent_id: base.id.clone(),
                title: base.title.clone(),
                description: base.description.clone(),
                start: candidate,
                end,
                recurrence: base.recurrence.clone(),
                recurrence_group_id: base.recurrence_group_id.clone(),
            });
        }

        period += 1;
    }

    occurrences
}

/// Replace (or drop, with `None`) the UNTIL token of a rule string, keeping
/// every other token as written.
pub fn with_until(rule: &str, until: Option<DateTime<Utc>>) -> String {
    let mut tokens: Vec<String> = rule
        .split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.to_ascii_uppercase().starts_with("UNTIL="))
        .map(str::to_string)
        .collect();
    if let Some(until) = until {
        tokens.push(format!("UNTIL={}", until.format(UNTIL_FORMAT)));
    }
    tokens.join(";")
}

/// Value following `key` up to the next `;`.
fn token_value<'a>(rule: &'a str, key: &str) -> Option<&'a str> {
    let start = rule.find(key)? + key.len();
    let rest = &rule[start..];
    let value = rest.split(';').next().unwrap_or(rest).trim();
    (!value.is_empty()).then_some(value)
}

fn parse_weekdays(list: &str) -> Vec<Weekday> {
    let mut days = Vec::new();
    for token in list.split(',') {
        // Ordinal prefixes such as "1MO" or "-1FR" are not supported; keep the day
        let token = token.trim();
        let code = token.get(token.len().saturating_sub(2)..).unwrap_or(token);
        if let Some(day) = weekday_from_code(code) {
            if !days.contains(&day) {
                days.push(day);
            }
        }
    }
    days
}

fn parse_until(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, UNTIL_FORMAT) {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(dt.and_utc());
    }
    // Date-only UNTIL covers the whole day
    NaiveDate::parse_from_str(value, "%Y%m%d")
        .ok()
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map(|dt| dt.and_utc())
}

fn weekday_from_code(code: &str) -> Option<Weekday> {
    match code {
        "MO" => Some(Weekday::Mon),
        "TU" => Some(Weekday::Tue),
        "WE" => Some(Weekday::Wed),
        "TH" => Some(Weekday::Thu),
        "FR" => Some(Weekday::Fri),
        "SA" => Some(Weekday::Sat),
        "SU" => Some(Weekday::Sun),
        _ => None,
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}
