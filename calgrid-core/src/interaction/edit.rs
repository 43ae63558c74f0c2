//! Rewrites of the base-event collection for edits and deletions that touch
//! a recurring series.
//!
//! Every function is pure: it takes the committed collection and returns the
//! next one, leaving history bookkeeping to the caller.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalGridError, CalGridResult};
use crate::event::{BaseEvent, ResolvedEvent, Span, new_event_id};
use crate::recurrence::{RecurrenceRule, with_until};

/// How much of a series an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditScope {
    /// Just this occurrence
    Single,
    /// This occurrence and every later one
    Following,
    /// The whole series
    All,
}

/// Move or resize `target` to `span`.
///
/// `scope` is ignored for events that are not part of a series.
pub fn apply_edit(
    events: &[BaseEvent],
    target: &ResolvedEvent,
    span: Span,
    scope: EditScope,
) -> CalGridResult<Vec<BaseEvent>> {
    let mut next = events.to_vec();

    let owner = match target {
        ResolvedEvent::Virtual(_) => Some(index_of(&next, target.record_id())?),
        _ => series_owner(&next, target),
    };

    let Some(owner) = owner else {
        // Standalone record, or an exception whose series is gone
        let idx = index_of(&next, target.record_id())?;
        next[idx].start = span.start;
        next[idx].end = span.end;
        return Ok(next);
    };

    match scope {
        EditScope::Single => edit_single(&mut next, owner, target, span),
        EditScope::Following => edit_following(&mut next, owner, target, span),
        EditScope::All => edit_all(&mut next, owner, target, span),
    }
    Ok(next)
}

/// Delete `target` with the given scope.
pub fn apply_delete(
    events: &[BaseEvent],
    target: &ResolvedEvent,
    scope: EditScope,
) -> CalGridResult<Vec<BaseEvent>> {
    let mut next = events.to_vec();

    let owner = match target {
        ResolvedEvent::Virtual(_) => Some(index_of(&next, target.record_id())?),
        _ => series_owner(&next, target),
    };

    let Some(owner) = owner else {
        let idx = index_of(&next, target.record_id())?;
        next.remove(idx);
        return Ok(next);
    };

    let original = target.original_start();
    let day = original.date_naive();
    let group = next[owner].recurrence_group_id.clone();

    match scope {
        EditScope::Single => {
            next[owner].excluded_dates.insert(day);
            if let Some(group) = group {
                next.retain(|e| !(is_group_exception(e, &group) && e.occurrence_day() == day));
            }
        }
        EditScope::Following => {
            let owner_id = next[owner].id.clone();
            if original <= next[owner].start {
                next.remove(owner);
            } else {
                truncate_before(&mut next[owner], original);
            }
            if let Some(group) = group {
                next.retain(|e| {
                    if e.id == owner_id || e.recurrence_group_id.as_deref() != Some(group.as_str()) {
                        return true;
                    }
                    if e.is_recurring() {
                        e.start < original
                    } else {
                        e.occurrence_day() < day
                    }
                });
            }
        }
        EditScope::All => {
            let owner_id = next[owner].id.clone();
            match group {
                Some(group) => next.retain(|e| e.recurrence_group_id.as_deref() != Some(group.as_str())),
                None => next.retain(|e| e.id != owner_id),
            }
        }
    }

    Ok(next)
}

fn edit_single(next: &mut Vec<BaseEvent>, owner: usize, target: &ResolvedEvent, span: Span) {
    let original = target.original_start();
    let day = original.date_naive();
    let group = ensure_group(&mut next[owner]);

    // Set semantics: excluding an excluded day again is a no-op
    next[owner].excluded_dates.insert(day);

    let existing = next
        .iter()
        .position(|e| is_group_exception(e, &group) && e.occurrence_day() == day);

    match existing {
        Some(idx) => {
            next[idx].start = span.start;
            next[idx].end = span.end;
        }
        None => {
            let series = &next[owner];
            let exception = BaseEvent {
                id: new_event_id(),
                title: target.title().to_string(),
                description: series.description.clone(),
                start: span.start,
                end: span.end,
                recurrence: None,
                excluded_dates: Default::default(),
                recurrence_group_id: Some(group),
                is_recurrence_base: false,
                original_start: Some(original),
            };
            tracing::debug!(series = %series.id, %day, "created exception");
            next.push(exception);
        }
    }
}

fn edit_following(next: &mut Vec<BaseEvent>, owner: usize, target: &ResolvedEvent, span: Span) {
    let original = target.original_start();
    let group = ensure_group(&mut next[owner]);
    let Some(rule_text) = next[owner].recurrence.clone() else {
        return;
    };

    let replaced = rebase_exceptions(next, &group, owner, original, span.start - original);
    split_following(next, owner, &group, &rule_text, original, span);
    if let Some(replaced) = replaced {
        next.retain(|e| e.id != replaced);
    }
}

fn split_following(
    next: &mut Vec<BaseEvent>,
    owner: usize,
    group: &str,
    rule_text: &str,
    original: DateTime<Utc>,
    span: Span,
) {
    let original_until = RecurrenceRule::parse(rule_text).and_then(|r| r.until);
    let day = original.date_naive();
    let day_shift = Duration::days((span.start.date_naive() - day).num_days());

    if original <= next[owner].start {
        // Editing the first occurrence rewrites the series in place
        let series = &mut next[owner];
        series.start = span.start;
        series.end = span.end;
        let carried = series.excluded_dates.iter().copied().filter(|d| *d != day);
        series.excluded_dates = shift_days(carried, day_shift);

        if let Some(matching) = seamless_predecessor(next, group, owner) {
            let series = next.remove(owner);
            let matching = if matching > owner { matching - 1 } else { matching };
            absorb(&mut next[matching], &series, original_until);
        }
        return;
    }

    let series = &mut next[owner];
    truncate_before(series, original);
    let (kept, moved): (Vec<NaiveDate>, Vec<NaiveDate>) =
        series.excluded_dates.iter().copied().partition(|d| *d < day);
    series.excluded_dates = kept.into_iter().collect();

    let split = BaseEvent {
        id: new_event_id(),
        title: series.title.clone(),
        description: series.description.clone(),
        start: span.start,
        end: span.end,
        recurrence: Some(with_until(rule_text, original_until)),
        excluded_dates: shift_days(moved.into_iter().filter(|d| *d > day), day_shift),
        recurrence_group_id: Some(group.to_string()),
        is_recurrence_base: false,
        original_start: None,
    };

    next.push(split);
    let split_idx = next.len() - 1;
    if let Some(matching) = seamless_predecessor(next, group, split_idx) {
        let split = next.remove(split_idx);
        absorb(&mut next[matching], &split, original_until);
        tracing::debug!(series = %next[matching].id, "merged split back into series");
    }
}

/// Re-anchor the exceptions `owner` is responsible for from `original`
/// onwards so they follow the series when it moves by `delta`. The one on
/// `original`'s day is superseded by the edit; its id is returned for
/// removal.
fn rebase_exceptions(
    next: &mut [BaseEvent],
    group: &str,
    owner: usize,
    original: DateTime<Utc>,
    delta: Duration,
) -> Option<String> {
    let day = original.date_naive();
    let owner_start = next[owner].start;
    // A later series of the group takes over its own exceptions
    let handover = next
        .iter()
        .enumerate()
        .filter(|(i, e)| {
            *i != owner
                && e.recurrence_group_id.as_deref() == Some(group)
                && e.is_recurring()
                && e.start > owner_start
        })
        .map(|(_, e)| e.start.date_naive())
        .min();

    let mut replaced = None;
    for event in next.iter_mut() {
        if !is_group_exception(event, group) {
            continue;
        }
        let occurrence_day = event.occurrence_day();
        if occurrence_day < day || handover.is_some_and(|h| occurrence_day >= h) {
            continue;
        }
        if occurrence_day == day {
            replaced = Some(event.id.clone());
            continue;
        }
        let from = event.original_start.unwrap_or(event.start);
        event.original_start = Some(from.checked_add_signed(delta).unwrap_or(from));
    }
    replaced
}

fn edit_all(next: &mut Vec<BaseEvent>, owner: usize, target: &ResolvedEvent, span: Span) {
    let delta = span.start - target.start();
    let duration = span.duration();

    let Some(group) = next[owner].recurrence_group_id.clone() else {
        let series = &mut next[owner];
        series.start += delta;
        series.end = series.start + duration;
        series.excluded_dates.clear();
        return;
    };

    let members: Vec<usize> = (0..next.len())
        .filter(|&i| next[i].recurrence_group_id.as_deref() == Some(group.as_str()))
        .collect();
    let series: Vec<usize> = members.iter().copied().filter(|&i| next[i].is_recurring()).collect();

    let anchor = series
        .iter()
        .copied()
        .find(|&i| next[i].is_recurrence_base)
        .or_else(|| series.iter().copied().min_by_key(|&i| next[i].start))
        .unwrap_or(owner);
    let last_until = series
        .iter()
        .copied()
        .max_by_key(|&i| next[i].start)
        .and_then(|i| next[i].rule())
        .and_then(|rule| rule.until);

    let anchor_id = next[anchor].id.clone();
    {
        let base = &mut next[anchor];
        base.start += delta;
        base.end = base.start + duration;
        base.excluded_dates.clear();
        base.is_recurrence_base = true;
        if let Some(rule) = base.recurrence.as_deref() {
            base.recurrence = Some(with_until(rule, last_until));
        }
    }

    next.retain(|e| e.id == anchor_id || e.recurrence_group_id.as_deref() != Some(group.as_str()));
    tracing::debug!(series = %anchor_id, folded = members.len().saturating_sub(1), "shifted whole series");
}

/// Cut `series` so its last occurrence is the one before `occurrence`.
fn truncate_before(series: &mut BaseEvent, occurrence: DateTime<Utc>) {
    let (Some(rule), Some(text)) = (series.rule(), series.recurrence.as_deref()) else {
        return;
    };
    let Some(until) = rule
        .period_before(occurrence)
        .or_else(|| occurrence.checked_sub_signed(Duration::seconds(1)))
    else {
        return;
    };
    series.recurrence = Some(with_until(text, Some(until)));
}

/// A series of `group` that `candidate` continues without a gap: same rule
/// apart from UNTIL, same duration, and its next candidate after its UNTIL
/// is exactly `candidate`'s start.
fn seamless_predecessor(events: &[BaseEvent], group: &str, candidate: usize) -> Option<usize> {
    let split = &events[candidate];
    let split_rule = split.rule()?;

    events
        .iter()
        .enumerate()
        .filter(|(i, e)| *i != candidate && e.recurrence_group_id.as_deref() == Some(group))
        .find(|(_, e)| {
            let Some(rule) = e.rule() else {
                return false;
            };
            let Some(until) = rule.until else {
                return false;
            };
            same_cadence(&rule, &split_rule)
                && e.duration() == split.duration()
                && rule.next_after(e.start, until) == Some(split.start)
        })
        .map(|(i, _)| i)
}

/// Fold `continuation` into `series`: the UNTIL becomes the continuation's
/// original bound and its exclusions carry over.
fn absorb(series: &mut BaseEvent, continuation: &BaseEvent, until: Option<DateTime<Utc>>) {
    if let Some(text) = series.recurrence.as_deref() {
        series.recurrence = Some(with_until(text, until));
    }
    series
        .excluded_dates
        .extend(continuation.excluded_dates.iter().copied());
}

fn same_cadence(a: &RecurrenceRule, b: &RecurrenceRule) -> bool {
    a.frequency == b.frequency && a.interval == b.interval && a.by_day == b.by_day
}

/// The series record responsible for `target`, if any.
fn series_owner(events: &[BaseEvent], target: &ResolvedEvent) -> Option<usize> {
    let record = events.iter().position(|e| e.id == target.record_id())?;
    if events[record].is_recurring() {
        return Some(record);
    }
    let group = events[record].recurrence_group_id.as_deref()?;
    let original = target.original_start();

    // Latest series of the group starting at or before the occurrence
    let series = || {
        events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.recurrence_group_id.as_deref() == Some(group) && e.is_recurring())
    };
    series()
        .filter(|(_, e)| e.start <= original)
        .max_by_key(|(_, e)| e.start)
        .or_else(|| series().find(|(_, e)| e.is_recurrence_base))
        .or_else(|| series().min_by_key(|(_, e)| e.start))
        .map(|(i, _)| i)
}

/// Give `series` a group id if it has none, marking it as the group's base.
fn ensure_group(series: &mut BaseEvent) -> String {
    if let Some(group) = &series.recurrence_group_id {
        return group.clone();
    }
    series.recurrence_group_id = Some(series.id.clone());
    series.is_recurrence_base = true;
    series.id.clone()
}

fn is_group_exception(event: &BaseEvent, group: &str) -> bool {
    event.recurrence_group_id.as_deref() == Some(group) && !event.is_recurring() && !event.is_recurrence_base
}

fn shift_days(
    days: impl Iterator<Item = NaiveDate>,
    shift: Duration,
) -> std::collections::BTreeSet<NaiveDate> {
    days.map(|d| d + shift).collect()
}

fn index_of(events: &[BaseEvent], id: &str) -> CalGridResult<usize> {
    events
        .iter()
        .position(|e| e.id == id)
        .ok_or_else(|| CalGridError::EventNotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use crate::window::ViewWindow;
    use chrono::TimeZone;

    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, 0, 0).unwrap()
    }

    fn span(day: u32, from: u32, to: u32) -> Span {
        Span::new(at(day, from), at(day, to)).unwrap()
    }

    fn daily() -> BaseEvent {
        BaseEvent::new("Standup", span(1, 10, 11)).with_recurrence("FREQ=DAILY")
    }

    fn occurrence(events: &[BaseEvent], start: DateTime<Utc>) -> ResolvedEvent {
        let window = ViewWindow::for_days(at(1, 0).date_naive(), at(20, 0).date_naive()).unwrap();
        resolve(events, &window)
            .into_iter()
            .find(|e| e.start() == start)
            .unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        at(d, 0).date_naive()
    }

    #[test]
    fn single_excludes_day_and_adds_exception() {
        let events = vec![daily()];
        let target = occurrence(&events, at(3, 10));

        let next = apply_edit(&events, &target, span(3, 14, 15), EditScope::Single).unwrap();

        assert_eq!(next.len(), 2);
        let series = &next[0];
        assert!(series.is_excluded(day(3)));
        assert!(series.is_recurrence_base);
        assert_eq!(series.recurrence_group_id.as_deref(), Some(series.id.as_str()));

        let exception = &next[1];
        assert!(exception.is_exception());
        assert_eq!(exception.span(), span(3, 14, 15));
        assert_eq!(exception.original_start, Some(at(3, 10)));
    }

    #[test]
    fn single_twice_updates_the_same_exception() {
        let events = vec![daily()];
        let target = occurrence(&events, at(3, 10));
        let once = apply_edit(&events, &target, span(3, 14, 15), EditScope::Single).unwrap();

        let exception = occurrence(&once, at(3, 14));
        assert!(matches!(exception, ResolvedEvent::Exception(_)));
        let twice = apply_edit(&once, &exception, span(3, 16, 17), EditScope::Single).unwrap();

        assert_eq!(twice.len(), 2);
        assert_eq!(twice[0].excluded_dates.len(), 1);
        assert_eq!(twice[1].span(), span(3, 16, 17));
        assert_eq!(twice[1].original_start, Some(at(3, 10)));
    }

    #[test]
    fn following_splits_the_series() {
        let events = vec![daily()];
        let target = occurrence(&events, at(4, 10));

        let next = apply_edit(&events, &target, span(4, 12, 13), EditScope::Following).unwrap();

        assert_eq!(next.len(), 2);
        assert_eq!(next[0].rule().unwrap().until, Some(at(3, 10)));
        let split = &next[1];
        assert_eq!(split.span(), span(4, 12, 13));
        assert_eq!(split.rule().unwrap().until, None);
        assert_eq!(split.recurrence_group_id, next[0].recurrence_group_id);
        assert!(!split.is_recurrence_base);
    }

    #[test]
    fn following_keeps_the_original_until_on_the_split() {
        let events = vec![daily().with_recurrence("FREQ=DAILY;UNTIL=20240110T100000Z")];
        let target = occurrence(&events, at(4, 10));

        let next = apply_edit(&events, &target, span(4, 12, 13), EditScope::Following).unwrap();

        assert_eq!(next[1].rule().unwrap().until, Some(at(10, 10)));
    }

    #[test]
    fn following_moves_later_exclusions_to_the_split() {
        let mut series = daily();
        series.excluded_dates.extend([day(2), day(6)]);
        let events = vec![series];
        let target = occurrence(&events, at(4, 10));

        let next = apply_edit(&events, &target, span(5, 10, 11), EditScope::Following).unwrap();

        assert_eq!(next[0].excluded_dates, [day(2)].into_iter().collect());
        assert_eq!(next[1].excluded_dates, [day(7)].into_iter().collect());
    }

    fn starts_on(events: &[BaseEvent], from: u32, to: u32) -> Vec<DateTime<Utc>> {
        let window = ViewWindow::for_days(day(from), day(to)).unwrap();
        let mut starts: Vec<_> = resolve(events, &window).iter().map(|e| e.start()).collect();
        starts.sort();
        starts
    }

    #[test]
    fn following_on_an_exception_replaces_it() {
        let events = vec![daily()];
        let target = occurrence(&events, at(3, 10));
        let once = apply_edit(&events, &target, span(3, 14, 15), EditScope::Single).unwrap();

        let exception = occurrence(&once, at(3, 14));
        let next = apply_edit(&once, &exception, span(3, 16, 17), EditScope::Following).unwrap();

        assert_eq!(next.len(), 2);
        assert!(next.iter().all(|e| !e.is_exception()));
        assert_eq!(starts_on(&next, 3, 3), vec![at(3, 16)]);
        assert_eq!(starts_on(&next, 4, 4), vec![at(4, 16)]);
    }

    #[test]
    fn following_on_an_exception_of_the_first_occurrence_rewrites_in_place() {
        let events = vec![daily()];
        let anchor = occurrence(&events, at(1, 10));
        let once = apply_edit(&events, &anchor, span(1, 14, 15), EditScope::Single).unwrap();

        let exception = occurrence(&once, at(1, 14));
        let next = apply_edit(&once, &exception, span(1, 16, 17), EditScope::Following).unwrap();

        assert_eq!(next.len(), 1);
        assert!(next[0].excluded_dates.is_empty());
        assert_eq!(starts_on(&next, 1, 2), vec![at(1, 16), at(2, 16)]);
    }

    #[test]
    fn following_with_a_day_shift_carries_later_exceptions() {
        let events = vec![daily()];
        let later = occurrence(&events, at(6, 10));
        let with_exception = apply_edit(&events, &later, span(6, 14, 15), EditScope::Single).unwrap();

        let target = occurrence(&with_exception, at(4, 10));
        let next = apply_edit(&with_exception, &target, span(5, 10, 11), EditScope::Following).unwrap();

        let exception = next.iter().find(|e| e.is_exception()).unwrap();
        assert_eq!(exception.original_start, Some(at(7, 10)));
        let split = next.iter().find(|e| e.is_recurring() && e.start == at(5, 10)).unwrap();
        assert!(split.is_excluded(exception.occurrence_day()));
        assert!(!split.is_excluded(day(6)));

        assert_eq!(
            starts_on(&next, 5, 8),
            vec![at(5, 10), at(6, 10), at(6, 14), at(8, 10)]
        );

        // The carried exception is still found by a later single edit
        let moved = occurrence(&next, at(6, 14));
        let again = apply_edit(&next, &moved, span(6, 15, 16), EditScope::Single).unwrap();
        assert_eq!(again.len(), next.len());
    }

    #[test]
    fn following_back_onto_the_old_cadence_merges() {
        let events = vec![daily()];
        let target = occurrence(&events, at(4, 10));
        let split = apply_edit(&events, &target, span(4, 12, 13), EditScope::Following).unwrap();

        let first = occurrence(&split, at(4, 12));
        let merged = apply_edit(&split, &first, span(4, 10, 11), EditScope::Following).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].id, events[0].id);
        assert_eq!(merged[0].rule().unwrap().until, None);
    }

    #[test]
    fn following_on_a_different_time_leaves_two_series() {
        let events = vec![daily()];
        let target = occurrence(&events, at(4, 10));
        let split = apply_edit(&events, &target, span(4, 12, 13), EditScope::Following).unwrap();

        let first = occurrence(&split, at(4, 12));
        let moved = apply_edit(&split, &first, span(4, 15, 16), EditScope::Following).unwrap();

        assert_eq!(moved.len(), 2);
        assert_eq!(moved[1].span(), span(4, 15, 16));
    }

    #[test]
    fn all_folds_the_group_into_the_anchor() {
        let events = vec![daily()];
        let target = occurrence(&events, at(4, 10));
        let split = apply_edit(&events, &target, span(4, 12, 13), EditScope::Following).unwrap();
        let single_target = occurrence(&split, at(2, 10));
        let with_exception =
            apply_edit(&split, &single_target, span(2, 8, 9), EditScope::Single).unwrap();
        assert_eq!(with_exception.len(), 3);

        let target = occurrence(&with_exception, at(6, 12));
        let next = apply_edit(&with_exception, &target, span(6, 13, 15), EditScope::All).unwrap();

        assert_eq!(next.len(), 1);
        let series = &next[0];
        assert_eq!(series.id, events[0].id);
        assert_eq!(series.span(), span(1, 11, 13));
        assert!(series.excluded_dates.is_empty());
        assert_eq!(series.rule().unwrap().until, None);
    }

    #[test]
    fn plain_event_ignores_scope() {
        let events = vec![BaseEvent::new("Lunch", span(2, 12, 13))];
        let target = ResolvedEvent::from_base(events[0].clone());

        let next = apply_edit(&events, &target, span(2, 13, 14), EditScope::All).unwrap();

        assert_eq!(next.len(), 1);
        assert_eq!(next[0].span(), span(2, 13, 14));
    }

    #[test]
    fn unknown_target_is_an_error() {
        let events = vec![daily()];
        let stray = ResolvedEvent::from_base(BaseEvent::new("Gone", span(2, 9, 10)));

        assert!(matches!(
            apply_edit(&events, &stray, span(2, 10, 11), EditScope::Single),
            Err(CalGridError::EventNotFound(_))
        ));
        assert!(apply_delete(&events, &stray, EditScope::All).is_err());
    }

    #[test]
    fn delete_single_removes_that_days_exception() {
        let events = vec![daily()];
        let target = occurrence(&events, at(3, 10));
        let edited = apply_edit(&events, &target, span(3, 14, 15), EditScope::Single).unwrap();

        let exception = occurrence(&edited, at(3, 14));
        let next = apply_delete(&edited, &exception, EditScope::Single).unwrap();

        assert_eq!(next.len(), 1);
        assert!(next[0].is_excluded(day(3)));
    }

    #[test]
    fn delete_following_truncates_and_drops_later_records() {
        let events = vec![daily()];
        let target = occurrence(&events, at(6, 10));
        let split = apply_edit(&events, &target, span(6, 12, 13), EditScope::Following).unwrap();

        let target = occurrence(&split, at(4, 10));
        let next = apply_delete(&split, &target, EditScope::Following).unwrap();

        assert_eq!(next.len(), 1);
        assert_eq!(next[0].rule().unwrap().until, Some(at(3, 10)));
    }

    #[test]
    fn delete_following_from_the_anchor_removes_the_series() {
        let events = vec![daily()];
        let target = occurrence(&events, at(1, 10));

        let next = apply_delete(&events, &target, EditScope::Following).unwrap();

        assert!(next.is_empty());
    }

    #[test]
    fn delete_all_removes_the_group() {
        let events = vec![daily(), BaseEvent::new("Lunch", span(2, 12, 13))];
        let target = occurrence(&events, at(4, 10));
        let split = apply_edit(&events, &target, span(4, 12, 13), EditScope::Following).unwrap();

        let target = occurrence(&split, at(8, 12));
        let next = apply_delete(&split, &target, EditScope::All).unwrap();

        assert_eq!(next.len(), 1);
        assert_eq!(next[0].title, "Lunch");
    }
}
