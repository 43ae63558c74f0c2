//! Merge persisted events and their expansions into one render list.

use std::collections::HashSet;

use chrono::DateTime;

use crate::event::{BaseEvent, ResolvedEvent};
use crate::recurrence::expand;
use crate::window::ViewWindow;

/// Resolve the collection for `window`.
///
/// Output order: each base (or series anchor) in input order, immediately
/// followed by its own virtual occurrences in chronological order. Duplicate
/// ids are processed once.
pub fn resolve(bases: &[BaseEvent], window: &ViewWindow) -> Vec<ResolvedEvent> {
    resolve_iter(bases.iter(), window)
}

/// Resolve a list that may already contain virtual occurrences, e.g. the
/// output of a previous pass. Virtual entries are skipped, never expanded.
pub fn resolve_entries(entries: &[ResolvedEvent], window: &ViewWindow) -> Vec<ResolvedEvent> {
    resolve_iter(entries.iter().filter_map(ResolvedEvent::as_base), window)
}

fn resolve_iter<'a>(
    bases: impl Iterator<Item = &'a BaseEvent>,
    window: &ViewWindow,
) -> Vec<ResolvedEvent> {
    let mut seen_ids: HashSet<&str> = HashSet::new();
    let mut emitted_virtuals: HashSet<String> = HashSet::new();
    let mut resolved = Vec::new();
    let mut duplicates = 0usize;

    for base in bases {
        if !seen_ids.insert(base.id.as_str()) {
            duplicates += 1;
            tracing::trace!(id = %base.id, "skipping duplicate event");
            continue;
        }

        if !base.is_recurring() {
            if window.contains(base.start) {
                resolved.push(ResolvedEvent::from_base(base.clone()));
            }
            continue;
        }

        if window.contains(base.start) && !base.is_excluded(base.start.date_naive()) {
            resolved.push(ResolvedEvent::from_base(base.clone()));
        }

        // Expansion runs even when the anchor itself is excluded or out of range
        for occurrence in expand(base, window) {
            if emitted_virtuals.insert(occurrence.id.clone()) {
                resolved.push(ResolvedEvent::Virtual(occurrence));
            }
        }
    }

    tracing::debug!(
        events = seen_ids.len(),
        duplicates,
        resolved = resolved.len(),
        virtuals = emitted_virtuals.len(),
        "resolved view window"
    );

    resolved
}

/// Persistence adapter: drop virtual occurrences, keep everything else.
pub fn persistable(resolved: &[ResolvedEvent]) -> Vec<BaseEvent> {
    resolved
        .iter()
        .filter_map(ResolvedEvent::as_base)
        .cloned()
        .collect()
}

/// Look up one entry by the id a render pass gave it: a record id, or the
/// synthetic `<parent>_<millis>` id of a virtual occurrence.
pub fn find_occurrence(bases: &[BaseEvent], id: &str) -> Option<ResolvedEvent> {
    if let Some(base) = bases.iter().find(|e| e.id == id) {
        return Some(ResolvedEvent::from_base(base.clone()));
    }

    let (parent_id, millis) = id.rsplit_once('_')?;
    let start = DateTime::from_timestamp_millis(millis.parse().ok()?)?;
    let parent = bases.iter().find(|e| e.id == parent_id)?;

    let window = ViewWindow { start, end: start };
    expand(parent, &window)
        .into_iter()
        .find(|occurrence| occurrence.id == id)
        .map(ResolvedEvent::Virtual)
}
