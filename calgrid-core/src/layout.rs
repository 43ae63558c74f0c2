//! Per-day time-grid geometry with conflict columns.
//!
//! Vertical positions are pixels from the top of the day column; horizontal
//! positions are percentages of the column width so the renderer can apply
//! them to any column size.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::event::ResolvedEvent;
use crate::window::day_start;

/// Grid constants shared by the layout engine and the snap clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridMetrics {
    pub px_per_hour: f64,
    /// Inset applied to the top and bottom edge of every block
    pub edge_gap_px: f64,
    /// Floor so zero-length events stay visible and clickable
    pub min_height_px: f64,
    /// Gap between conflict columns, percent of width
    pub column_gap_pct: f64,
    /// Right-hand inset of a non-conflicting block, percent of width
    pub side_inset_pct: f64,
}

impl Default for GridMetrics {
    fn default() -> Self {
        GridMetrics {
            px_per_hour: 60.0,
            edge_gap_px: 1.0,
            min_height_px: 20.0,
            column_gap_pct: 1.0,
            side_inset_pct: 2.0,
        }
    }
}

impl GridMetrics {
    /// Time covered by `px` pixels of grid.
    pub fn duration_for_px(&self, px: f64) -> Duration {
        if self.px_per_hour <= 0.0 {
            return Duration::zero();
        }
        Duration::milliseconds((px / self.px_per_hour * 3_600_000.0) as i64)
    }

    fn px_for(&self, duration: Duration) -> f64 {
        duration.num_milliseconds() as f64 / 3_600_000.0 * self.px_per_hour
    }
}

/// Where to draw one occurrence on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Geometry {
    pub event_id: String,
    pub day: NaiveDate,
    pub top: f64,
    pub height: f64,
    /// Percent of the column width
    pub left: f64,
    /// Percent of the column width
    pub width: f64,
    pub column: usize,
    pub column_count: usize,
    /// Border styling only
    pub continues_from_previous_day: bool,
    /// Border styling only
    pub continues_to_next_day: bool,
}

/// The part of an occurrence that falls on the laid-out day.
#[derive(Debug, Clone)]
struct Slice<'a> {
    index: usize,
    id: &'a str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    /// End of the drawn block, at least `min_height_px` below `start`
    visual_end: DateTime<Utc>,
    from_previous_day: bool,
    to_next_day: bool,
}

impl Slice<'_> {
    fn duration(&self) -> Duration {
        self.end - self.start
    }

    fn overlaps(&self, other: &Slice) -> bool {
        self.start < other.visual_end && other.start < self.visual_end
    }
}

/// Lay out the occurrences touching `day`.
///
/// Results come back in layout order: start ascending, longer first on
/// ties, then input order. The same input always yields the same columns.
pub fn layout_day(occurrences: &[ResolvedEvent], day: NaiveDate, metrics: &GridMetrics) -> Vec<Geometry> {
    let day_start = day_start(day);
    let day_end = day_start + Duration::days(1);
    let min_span = metrics.duration_for_px(metrics.min_height_px);

    let mut slices: Vec<Slice> = occurrences
        .iter()
        .enumerate()
        .filter_map(|(index, occurrence)| visible_slice(index, occurrence, day_start, day_end, min_span))
        .collect();

    slices.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.duration().cmp(&a.duration()))
            .then_with(|| a.index.cmp(&b.index))
    });

    // Greedy first-fit: join the first group holding an overlapping member
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (pos, slice) in slices.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|group| group.iter().any(|&member| slices[member].overlaps(slice)))
        {
            Some(group) => group.push(pos),
            None => groups.push(vec![pos]),
        }
    }

    let mut placed: Vec<(usize, Geometry)> = Vec::with_capacity(slices.len());
    for group in &groups {
        let column_count = group.len();
        for (column, &pos) in group.iter().enumerate() {
            let slice = &slices[pos];
            let (left, width) = horizontal(column, column_count, metrics);
            let height = (metrics.px_for(slice.duration()) - 2.0 * metrics.edge_gap_px)
                .max(metrics.min_height_px);

            placed.push((
                pos,
                Geometry {
                    event_id: slice.id.to_string(),
                    day,
                    top: metrics.px_for(slice.start - day_start) + metrics.edge_gap_px,
                    height,
                    left,
                    width,
                    column,
                    column_count,
                    continues_from_previous_day: slice.from_previous_day,
                    continues_to_next_day: slice.to_next_day,
                },
            ));
        }
    }
    placed.sort_by_key(|(pos, _)| *pos);

    tracing::debug!(%day, blocks = placed.len(), groups = groups.len(), "laid out day");

    placed.into_iter().map(|(_, geometry)| geometry).collect()
}

/// Lay out several days at once, keyed by day.
pub fn layout_days(
    occurrences: &[ResolvedEvent],
    days: impl IntoIterator<Item = NaiveDate>,
    metrics: &GridMetrics,
) -> BTreeMap<NaiveDate, Vec<Geometry>> {
    days.into_iter()
        .map(|day| (day, layout_day(occurrences, day, metrics)))
        .collect()
}

fn visible_slice<'a>(
    index: usize,
    occurrence: &'a ResolvedEvent,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
    min_span: Duration,
) -> Option<Slice<'a>> {
    let Some(span) = occurrence.span() else {
        tracing::warn!(id = occurrence.id(), "skipping event with end before start");
        return None;
    };

    let touches_day = if span.start == span.end {
        span.start >= day_start && span.start < day_end
    } else {
        span.start < day_end && span.end > day_start
    };
    if !touches_day {
        return None;
    }

    let start = span.start.max(day_start);
    let end = span.end.min(day_end);
    Some(Slice {
        index,
        id: occurrence.id(),
        start,
        end,
        visual_end: end.max(start + min_span),
        from_previous_day: span.start < day_start,
        to_next_day: span.end > day_end,
    })
}

fn horizontal(column: usize, column_count: usize, metrics: &GridMetrics) -> (f64, f64) {
    if column_count <= 1 {
        return (0.0, 100.0 - metrics.side_inset_pct);
    }
    let share = 100.0 / column_count as f64;
    (column as f64 * share, share - metrics.column_gap_pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{BaseEvent, Span};
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn occurrence(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ResolvedEvent {
        let mut event = BaseEvent::new(id, Span { start, end });
        event.id = id.to_string();
        ResolvedEvent::Base(event)
    }

    fn by_id<'a>(geometry: &'a [Geometry], id: &str) -> &'a Geometry {
        geometry.iter().find(|g| g.event_id == id).unwrap()
    }

    #[test]
    fn lone_event_uses_full_width_minus_inset() {
        let metrics = GridMetrics::default();
        let geometry = layout_day(&[occurrence("a", at(10, 9, 0), at(10, 10, 30))], day(), &metrics);

        assert_eq!(geometry.len(), 1);
        let g = &geometry[0];
        assert_eq!(g.top, 9.0 * 60.0 + 1.0);
        assert_eq!(g.height, 90.0 - 2.0);
        assert_eq!(g.left, 0.0);
        assert_eq!(g.width, 98.0);
        assert_eq!((g.column, g.column_count), (0, 1));
        assert!(!g.continues_from_previous_day && !g.continues_to_next_day);
    }

    #[test]
    fn overlapping_events_get_disjoint_columns() {
        let metrics = GridMetrics::default();
        let events = [
            occurrence("short", at(10, 9, 30), at(10, 10, 0)),
            occurrence("long", at(10, 9, 0), at(10, 12, 0)),
            occurrence("mid", at(10, 9, 0), at(10, 11, 0)),
        ];
        let geometry = layout_day(&events, day(), &metrics);

        // Sorted by start, then longer first
        let order: Vec<&str> = geometry.iter().map(|g| g.event_id.as_str()).collect();
        assert_eq!(order, vec!["long", "mid", "short"]);
        for (i, g) in geometry.iter().enumerate() {
            assert_eq!(g.column, i);
            assert_eq!(g.column_count, 3);
        }
        for pair in geometry.windows(2) {
            assert!(pair[0].left + pair[0].width <= pair[1].left);
        }
        let last = geometry.last().unwrap();
        assert!((last.left + last.width + metrics.column_gap_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn separate_groups_do_not_share_columns() {
        let metrics = GridMetrics::default();
        let events = [
            occurrence("a", at(10, 8, 0), at(10, 9, 0)),
            occurrence("b", at(10, 8, 30), at(10, 9, 30)),
            occurrence("c", at(10, 14, 0), at(10, 15, 0)),
        ];
        let geometry = layout_day(&events, day(), &metrics);
        assert_eq!(by_id(&geometry, "a").column_count, 2);
        assert_eq!(by_id(&geometry, "b").column, 1);
        assert_eq!(by_id(&geometry, "c").column_count, 1);
    }

    #[test]
    fn zero_length_event_keeps_min_height() {
        let metrics = GridMetrics::default();
        let geometry = layout_day(&[occurrence("ping", at(10, 12, 0), at(10, 12, 0))], day(), &metrics);
        assert_eq!(geometry[0].height, metrics.min_height_px);
    }

    #[test]
    fn zero_length_event_conflicts_with_block_it_covers() {
        let metrics = GridMetrics::default();
        let events = [
            occurrence("ping", at(10, 12, 0), at(10, 12, 0)),
            occurrence("next", at(10, 12, 10), at(10, 13, 0)),
        ];
        let geometry = layout_day(&events, day(), &metrics);
        assert!(geometry.iter().all(|g| g.column_count == 2));
    }

    #[test]
    fn overnight_event_is_clamped_and_flagged() {
        let metrics = GridMetrics::default();
        let events = [occurrence("night", at(9, 22, 0), at(11, 2, 0))];
        let geometry = layout_day(&events, day(), &metrics);

        let g = &geometry[0];
        assert_eq!(g.top, 1.0);
        assert_eq!(g.height, 24.0 * 60.0 - 2.0);
        assert!(g.continues_from_previous_day);
        assert!(g.continues_to_next_day);
    }

    #[test]
    fn event_ending_at_midnight_does_not_continue() {
        let metrics = GridMetrics::default();
        let events = [occurrence("late", at(10, 23, 0), at(11, 0, 0))];
        let geometry = layout_day(&events, day(), &metrics);
        assert!(!geometry[0].continues_to_next_day);
        assert!(layout_day(&events, day().succ_opt().unwrap(), &metrics).is_empty());
    }

    #[test]
    fn inverted_event_has_no_geometry() {
        let metrics = GridMetrics::default();
        let events = [occurrence("broken", at(10, 11, 0), at(10, 10, 0))];
        assert!(layout_day(&events, day(), &metrics).is_empty());
    }

    #[test]
    fn layout_ignores_input_order() {
        let metrics = GridMetrics::default();
        let events = vec![
            occurrence("a", at(10, 9, 0), at(10, 11, 0)),
            occurrence("b", at(10, 9, 15), at(10, 10, 0)),
            occurrence("c", at(10, 10, 30), at(10, 12, 0)),
        ];
        let mut reversed = events.clone();
        reversed.reverse();

        assert_eq!(layout_day(&events, day(), &metrics), layout_day(&reversed, day(), &metrics));
    }

    #[test]
    fn layout_days_keys_each_day() {
        let metrics = GridMetrics::default();
        let events = [occurrence("night", at(9, 22, 0), at(10, 2, 0))];
        let days = [day().pred_opt().unwrap(), day()];
        let laid_out = layout_days(&events, days, &metrics);
        assert_eq!(laid_out.len(), 2);
        assert!(laid_out.values().all(|g| g.len() == 1));
    }
}
