//! Natural-language date/time input.

use anyhow::{Context, Result};
use calgrid_core::window::parse_day;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// What the user typed: a whole day or a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    Day(NaiveDate),
    At(DateTime<Utc>),
}

impl When {
    pub fn day(&self) -> NaiveDate {
        match self {
            When::Day(d) => *d,
            When::At(dt) => dt.date_naive(),
        }
    }

    /// Require a time of day.
    pub fn instant(&self, input: &str) -> Result<DateTime<Utc>> {
        match self {
            When::At(dt) => Ok(*dt),
            When::Day(_) => anyhow::bail!(
                "\"{}\" has no time of day. Try something like \"{} 3pm\"",
                input,
                input
            ),
        }
    }
}

/// Expand common abbreviations that fuzzydate doesn't handle.
pub fn expand_abbreviations(input: &str) -> String {
    let abbrevs = [
        ("mon", "monday"),
        ("tue", "tuesday"),
        ("tues", "tuesday"),
        ("wed", "wednesday"),
        ("thu", "thursday"),
        ("thur", "thursday"),
        ("thurs", "thursday"),
        ("fri", "friday"),
        ("sat", "saturday"),
        ("sun", "sunday"),
        ("jan", "january"),
        ("feb", "february"),
        ("mar", "march"),
        ("apr", "april"),
        ("jun", "june"),
        ("jul", "july"),
        ("aug", "august"),
        ("sep", "september"),
        ("sept", "september"),
        ("oct", "october"),
        ("nov", "november"),
        ("dec", "december"),
    ];

    input
        .to_lowercase()
        .split_whitespace()
        .map(|word| {
            abbrevs
                .iter()
                .find(|(abbr, _)| *abbr == word)
                .map(|(_, full)| (*full).to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse `YYYY-MM-DD` or natural language ("tomorrow 3pm", "fri 9:30").
/// Times are taken as UTC.
pub fn parse_when(input: &str) -> Result<When> {
    if let Ok(day) = parse_day(input.trim()) {
        return Ok(When::Day(day));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input.trim()) {
        return Ok(When::At(dt.with_timezone(&Utc)));
    }

    let expanded = expand_abbreviations(input);
    let dt = fuzzydate::parse(&expanded)
        .map_err(|_| anyhow::anyhow!("Could not parse date/time: \"{}\"", input))?;

    if has_time_component(input) {
        Ok(When::At(dt.and_utc()))
    } else {
        Ok(When::Day(dt.date()))
    }
}

/// Check if the user's input string contains time-related tokens.
pub fn has_time_component(input: &str) -> bool {
    let lower = input.to_lowercase();

    if lower.contains("noon") || lower.contains("midnight") {
        return true;
    }

    // am/pm right after a digit, e.g. "6pm", "6 pm"
    let bytes = lower.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if (b == b'a' || b == b'p') && bytes.get(i + 1) == Some(&b'm') {
            if i > 0 && bytes[i - 1].is_ascii_digit() {
                return true;
            }
            if i > 1 && bytes[i - 1] == b' ' && bytes[i - 2].is_ascii_digit() {
                return true;
            }
        }
    }

    // HH:MM
    for (i, &b) in bytes.iter().enumerate() {
        if b == b':' {
            let has_digit_before = i > 0 && bytes[i - 1].is_ascii_digit();
            let has_digit_after = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            if has_digit_before && has_digit_after {
                return true;
            }
        }
    }

    // "at 3", "friday at 15"
    let after_at = lower
        .find(" at ")
        .map(|pos| &lower[pos + 4..])
        .or_else(|| lower.strip_prefix("at "));
    after_at.is_some_and(|after| after.starts_with(|c: char| c.is_ascii_digit()))
}

/// End of an event: a duration ("45m", "2h") or a time ("until 5pm").
pub fn parse_end(input: &str, start: DateTime<Utc>) -> Result<DateTime<Utc>> {
    if let Ok(end) = apply_duration(start, input) {
        return Ok(end);
    }

    let cleaned = input
        .strip_prefix("until ")
        .or_else(|| input.strip_prefix("to "))
        .unwrap_or(input);

    parse_when(cleaned)?.instant(cleaned)
}

pub fn apply_duration(start: DateTime<Utc>, input: &str) -> Result<DateTime<Utc>> {
    let std_dur = humantime::parse_duration(input.trim())
        .with_context(|| format!("Could not parse duration: \"{}\"", input))?;
    let chrono_dur = Duration::from_std(std_dur).context("Duration too large")?;
    Ok(start + chrono_dur)
}
