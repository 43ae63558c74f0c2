//! Pointer gestures → create / move / resize / delete sessions.
//!
//! [`InteractionMachine`] is a single tagged state plus the committed
//! [`Timeline`]. Pointer-move frames only ever touch the in-memory preview;
//! the collection changes atomically on release (or, for deletions, when the
//! deadline passes in [`InteractionMachine::tick`]).
//!
//! # State machine
//!
//! ```text
//! Idle ─down─▶ Pending{Create,Move,Resize} ─move past threshold─▶ {Creating,Moving,Resizing}
//!                   │ up (click)                                      │ up
//!                   ▼                                                 ▼
//!                  Idle                         commit ─▶ Idle   or   AwaitingScope ─choose─▶ Idle
//!
//! Idle ─request_delete─▶ Deleting(deadline) ─tick past deadline─▶ Idle
//! ```
//!
//! Escape or leaving the surface returns any non-idle state to `Idle`
//! without touching the collection.

pub mod edit;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalGridResult;
use crate::event::{BaseEvent, ResolvedEvent, Span};
use crate::history::{DEFAULT_HISTORY_LIMIT, Timeline};
use crate::snap::{DEFAULT_STEP_MINUTES, SnapClock, SnapMode};

pub use edit::{EditScope, apply_delete, apply_edit};

/// Title given to events created by dragging
pub const DEFAULT_EVENT_TITLE: &str = "New event";

/// Thresholds and delays for gesture handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Pointer travel (px) before a press becomes a drag
    pub drag_threshold_px: f64,
    pub snap_step_minutes: u32,
    /// Grace period before a requested deletion is committed
    pub delete_delay_ms: u64,
    pub history_limit: usize,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        InteractionConfig {
            drag_threshold_px: 5.0,
            snap_step_minutes: DEFAULT_STEP_MINUTES,
            delete_delay_ms: 300,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// A pointer position in grid coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    pub day_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Start,
    End,
}

/// Which part of an event the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grab {
    Body,
    Edge(ResizeEdge),
}

/// Input consumed from the pointer/keyboard layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    PointerDown {
        at: PointerSample,
        target: Option<(ResolvedEvent, Grab)>,
    },
    PointerMove(PointerSample),
    PointerUp(PointerSample),
    Escape,
    PointerLeave,
}

/// A move or resize waiting for the single/following/all decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEdit {
    pub target: ResolvedEvent,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    PendingCreate {
        origin: PointerSample,
    },
    PendingMove {
        origin: PointerSample,
        target: ResolvedEvent,
    },
    PendingResize {
        origin: PointerSample,
        target: ResolvedEvent,
        edge: ResizeEdge,
    },
    Creating {
        origin: PointerSample,
        preview: Span,
    },
    Moving {
        origin: PointerSample,
        target: ResolvedEvent,
        preview: Span,
    },
    Resizing {
        origin: PointerSample,
        target: ResolvedEvent,
        edge: ResizeEdge,
        preview: Span,
    },
    AwaitingScope(PendingEdit),
    Deleting {
        target: ResolvedEvent,
        scope: EditScope,
        deadline: DateTime<Utc>,
    },
}

/// What happened, for the renderer to animate. The core itself has no
/// visual side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    /// The input did not apply to the current state
    Ignored,
    /// A press was recorded; nothing visible yet
    Pressed,
    Preview(Span),
    /// Press and release without a drag
    Click { event_id: Option<String> },
    /// The host must ask which part of the series to change
    ScopeRequired { event_id: String },
    Created { event_id: String },
    Updated {
        event_id: String,
        scope: Option<EditScope>,
    },
    DeleteScheduled {
        event_id: String,
        deadline: DateTime<Utc>,
    },
    Deleted { event_id: String },
    Cancelled,
}

pub struct InteractionMachine {
    clock: SnapClock,
    config: InteractionConfig,
    scroll_offset: f64,
    state: InteractionState,
    timeline: Timeline,
}

impl InteractionMachine {
    pub fn new(events: Vec<BaseEvent>, clock: SnapClock, config: InteractionConfig) -> Self {
        InteractionMachine {
            clock,
            config,
            scroll_offset: 0.0,
            state: InteractionState::Idle,
            timeline: Timeline::with_limit(events, config.history_limit),
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn events(&self) -> &[BaseEvent] {
        self.timeline.events()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn clock(&self) -> &SnapClock {
        &self.clock
    }

    /// The view moved to another set of days.
    pub fn set_clock(&mut self, clock: SnapClock) {
        self.clock = clock;
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = offset;
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    /// Span currently shown while a gesture is in flight.
    pub fn preview(&self) -> Option<Span> {
        match &self.state {
            InteractionState::Creating { preview, .. }
            | InteractionState::Moving { preview, .. }
            | InteractionState::Resizing { preview, .. } => Some(*preview),
            InteractionState::AwaitingScope(edit) => Some(edit.span),
            _ => None,
        }
    }

    /// Feed one pointer/keyboard event.
    pub fn handle(&mut self, gesture: Gesture) -> CalGridResult<Intent> {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);

        match (state, gesture) {
            (InteractionState::Idle, Gesture::Escape | Gesture::PointerLeave) => Ok(Intent::Ignored),
            (_, Gesture::Escape | Gesture::PointerLeave) => {
                tracing::debug!("interaction cancelled");
                Ok(Intent::Cancelled)
            }

            (InteractionState::Idle, Gesture::PointerDown { at, target }) => {
                self.state = match target {
                    None => InteractionState::PendingCreate { origin: at },
                    Some((target, Grab::Body)) => InteractionState::PendingMove { origin: at, target },
                    Some((target, Grab::Edge(edge))) => InteractionState::PendingResize {
                        origin: at,
                        target,
                        edge,
                    },
                };
                Ok(Intent::Pressed)
            }
            (state, Gesture::PointerDown { .. }) => {
                // One session at a time
                self.state = state;
                Ok(Intent::Ignored)
            }

            (state, Gesture::PointerMove(at)) => Ok(self.on_move(state, at)),
            (state, Gesture::PointerUp(at)) => self.on_release(state, at),
        }
    }

    /// Resolve a pending scope choice.
    pub fn choose_scope(&mut self, scope: EditScope) -> CalGridResult<Intent> {
        let state = std::mem::replace(&mut self.state, InteractionState::Idle);
        let InteractionState::AwaitingScope(edit) = state else {
            self.state = state;
            return Ok(Intent::Ignored);
        };

        let next = apply_edit(self.timeline.events(), &edit.target, edit.span, scope)?;
        self.timeline.commit(next);
        Ok(Intent::Updated {
            event_id: edit.target.id().to_string(),
            scope: Some(scope),
        })
    }

    /// Schedule deletion of `target`. It is committed by the first
    /// [`tick`](Self::tick) at or after the deadline unless cancelled first.
    pub fn request_delete(&mut self, target: ResolvedEvent, scope: EditScope, now: DateTime<Utc>) -> Intent {
        if !self.is_idle() {
            return Intent::Ignored;
        }
        let deadline = now + Duration::milliseconds(self.config.delete_delay_ms as i64);
        let event_id = target.id().to_string();
        self.state = InteractionState::Deleting {
            target,
            scope,
            deadline,
        };
        Intent::DeleteScheduled { event_id, deadline }
    }

    /// Advance timed transitions.
    pub fn tick(&mut self, now: DateTime<Utc>) -> CalGridResult<Intent> {
        match &self.state {
            InteractionState::Deleting { deadline, .. } if now >= *deadline => {}
            _ => return Ok(Intent::Ignored),
        }
        let InteractionState::Deleting { target, scope, .. } =
            std::mem::replace(&mut self.state, InteractionState::Idle)
        else {
            return Ok(Intent::Ignored);
        };

        let next = apply_delete(self.timeline.events(), &target, scope)?;
        self.timeline.commit(next);
        Ok(Intent::Deleted {
            event_id: target.id().to_string(),
        })
    }

    /// Create an event directly, outside any gesture.
    pub fn create(&mut self, title: &str, span: Span, recurrence: Option<String>) -> String {
        let mut event = BaseEvent::new(title, self.clock.with_min_duration(span.start, span.end));
        event.recurrence = recurrence;
        let event_id = event.id.clone();

        let mut next = self.timeline.events().to_vec();
        next.push(event);
        self.timeline.commit(next);
        event_id
    }

    /// Only available between gestures.
    pub fn undo(&mut self) -> bool {
        self.is_idle() && self.timeline.undo()
    }

    /// Only available between gestures.
    pub fn redo(&mut self) -> bool {
        self.is_idle() && self.timeline.redo()
    }

    fn time_at(&self, at: PointerSample) -> DateTime<Utc> {
        self.clock.position_to_time(at.y, at.day_index, self.scroll_offset)
    }

    fn past_threshold(&self, origin: PointerSample, at: PointerSample) -> bool {
        let distance = (at.x - origin.x).hypot(at.y - origin.y);
        distance > self.config.drag_threshold_px || at.day_index != origin.day_index
    }

    fn on_move(&mut self, state: InteractionState, at: PointerSample) -> Intent {
        let next = match state {
            InteractionState::PendingCreate { origin } if self.past_threshold(origin, at) => {
                InteractionState::Creating {
                    origin,
                    preview: self.create_preview(origin, at),
                }
            }
            InteractionState::PendingMove { origin, target } if self.past_threshold(origin, at) => {
                match target.span() {
                    Some(current) => {
                        let preview = self.move_preview(origin, at, &target, current);
                        InteractionState::Moving {
                            origin,
                            target,
                            preview,
                        }
                    }
                    None => InteractionState::Idle,
                }
            }
            InteractionState::PendingResize { origin, target, edge } if self.past_threshold(origin, at) => {
                match target.span() {
                    Some(current) => InteractionState::Resizing {
                        origin,
                        preview: self.resize_preview(at, edge, &target, current),
                        target,
                        edge,
                    },
                    None => InteractionState::Idle,
                }
            }
            InteractionState::Creating { origin, .. } => InteractionState::Creating {
                origin,
                preview: self.create_preview(origin, at),
            },
            InteractionState::Moving { origin, target, preview } => InteractionState::Moving {
                origin,
                preview: self.move_preview(origin, at, &target, preview),
                target,
            },
            InteractionState::Resizing {
                origin,
                target,
                edge,
                preview,
            } => InteractionState::Resizing {
                origin,
                preview: self.resize_preview(at, edge, &target, preview),
                target,
                edge,
            },
            other => {
                self.state = other;
                return Intent::Ignored;
            }
        };

        self.state = next;
        match self.preview() {
            Some(span) => Intent::Preview(span),
            None => Intent::Ignored,
        }
    }

    fn on_release(&mut self, state: InteractionState, at: PointerSample) -> CalGridResult<Intent> {
        match state {
            InteractionState::PendingCreate { .. } => Ok(Intent::Click { event_id: None }),
            InteractionState::PendingMove { target, .. } | InteractionState::PendingResize { target, .. } => {
                Ok(Intent::Click {
                    event_id: Some(target.id().to_string()),
                })
            }
            InteractionState::Creating { origin, .. } => {
                let span = self.create_preview(origin, at);
                let event_id = self.create(DEFAULT_EVENT_TITLE, span, None);
                tracing::debug!(%event_id, "created event from drag");
                Ok(Intent::Created { event_id })
            }
            InteractionState::Moving { origin, target, preview } => {
                let span = self.move_preview(origin, at, &target, preview);
                self.finish_edit(target, span)
            }
            InteractionState::Resizing {
                target, edge, preview, ..
            } => {
                let span = self.resize_preview(at, edge, &target, preview);
                self.finish_edit(target, span)
            }
            other => {
                self.state = other;
                Ok(Intent::Ignored)
            }
        }
    }

    fn finish_edit(&mut self, target: ResolvedEvent, span: Span) -> CalGridResult<Intent> {
        if target.span() == Some(span) {
            return Ok(Intent::Cancelled);
        }

        if target.is_recurring() {
            let event_id = target.id().to_string();
            self.state = InteractionState::AwaitingScope(PendingEdit { target, span });
            return Ok(Intent::ScopeRequired { event_id });
        }

        let next = apply_edit(self.timeline.events(), &target, span, EditScope::Single)?;
        self.timeline.commit(next);
        Ok(Intent::Updated {
            event_id: target.id().to_string(),
            scope: None,
        })
    }

    fn create_preview(&self, origin: PointerSample, at: PointerSample) -> Span {
        self.clock.create_span(self.time_at(origin), self.time_at(at))
    }

    /// The grab offset keeps the event under the same point of the pointer.
    fn move_preview(&self, origin: PointerSample, at: PointerSample, target: &ResolvedEvent, last: Span) -> Span {
        let Some(current) = target.span() else {
            return last;
        };
        let grab_offset = self.time_at(origin) - current.start;
        let start = self.clock.snap(self.time_at(at) - grab_offset, SnapMode::Round);
        Span {
            start,
            end: start + current.duration(),
        }
    }

    /// Rejects inverted ranges by returning `last`.
    fn resize_preview(&self, at: PointerSample, edge: ResizeEdge, target: &ResolvedEvent, last: Span) -> Span {
        let Some(current) = target.span() else {
            return last;
        };
        let snapped = self.clock.snap(self.time_at(at), SnapMode::Round);
        let candidate = match edge {
            ResizeEdge::Start => Span::new(snapped, current.end),
            ResizeEdge::End => Span::new(current.start, snapped),
        };
        match candidate {
            Some(span) => self.clock.with_min_duration(span.start, span.end),
            None => last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use crate::window::ViewWindow;
    use chrono::{NaiveDate, TimeZone};

    fn at(day: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, h, m, 0).unwrap()
    }

    fn span(start: DateTime<Utc>, end: DateTime<Utc>) -> Span {
        Span::new(start, end).unwrap()
    }

    /// Column 0 is Monday 2024-01-01; one pixel per minute.
    fn machine(events: Vec<BaseEvent>) -> InteractionMachine {
        let clock = SnapClock::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 60.0, 15);
        InteractionMachine::new(events, clock, InteractionConfig::default())
    }

    fn pointer(day_index: usize, h: u32, m: u32) -> PointerSample {
        PointerSample {
            x: 100.0,
            y: f64::from(h * 60 + m),
            day_index,
        }
    }

    fn down(at: PointerSample, target: Option<(ResolvedEvent, Grab)>) -> Gesture {
        Gesture::PointerDown { at, target }
    }

    fn week() -> ViewWindow {
        ViewWindow::for_days(at(1, 0, 0).date_naive(), at(7, 0, 0).date_naive()).unwrap()
    }

    fn lunch() -> BaseEvent {
        BaseEvent::new("Lunch", span(at(2, 12, 0), at(2, 13, 0)))
    }

    #[test]
    fn press_and_release_is_a_click() {
        let mut m = machine(vec![]);
        assert_eq!(m.handle(down(pointer(0, 9, 0), None)).unwrap(), Intent::Pressed);
        // Within the drag threshold
        m.handle(Gesture::PointerMove(pointer(0, 9, 2))).unwrap();
        assert_eq!(
            m.handle(Gesture::PointerUp(pointer(0, 9, 2))).unwrap(),
            Intent::Click { event_id: None }
        );
        assert!(m.is_idle());
        assert!(m.events().is_empty());
    }

    #[test]
    fn drag_creates_a_snapped_event() {
        let mut m = machine(vec![]);
        m.handle(down(pointer(0, 9, 7), None)).unwrap();
        let preview = m.handle(Gesture::PointerMove(pointer(0, 9, 50))).unwrap();
        assert_eq!(preview, Intent::Preview(span(at(1, 9, 0), at(1, 10, 0))));

        let intent = m.handle(Gesture::PointerUp(pointer(0, 10, 7))).unwrap();
        let Intent::Created { event_id } = intent else {
            panic!("expected a created event, got {intent:?}");
        };
        assert_eq!(m.events().len(), 1);
        assert_eq!(m.events()[0].id, event_id);
        assert_eq!(m.events()[0].title, DEFAULT_EVENT_TITLE);
        assert_eq!(m.events()[0].span(), span(at(1, 9, 0), at(1, 10, 15)));

        assert!(m.undo());
        assert!(m.events().is_empty());
        assert!(m.redo());
        assert_eq!(m.events().len(), 1);
    }

    #[test]
    fn dragging_upwards_still_creates_forward_span() {
        let mut m = machine(vec![]);
        m.handle(down(pointer(0, 11, 0), None)).unwrap();
        m.handle(Gesture::PointerMove(pointer(0, 10, 0))).unwrap();
        m.handle(Gesture::PointerUp(pointer(0, 9, 40))).unwrap();
        assert_eq!(m.events()[0].span(), span(at(1, 9, 30), at(1, 11, 0)));
    }

    #[test]
    fn moving_a_plain_event_commits_directly() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);

        // Grab ten minutes into the event
        m.handle(down(pointer(1, 12, 10), Some((target, Grab::Body)))).unwrap();
        m.handle(Gesture::PointerMove(pointer(1, 14, 0))).unwrap();
        let intent = m.handle(Gesture::PointerUp(pointer(1, 15, 12))).unwrap();

        assert!(matches!(intent, Intent::Updated { scope: None, .. }));
        assert_eq!(m.events()[0].span(), span(at(2, 15, 0), at(2, 16, 0)));
        assert!(m.timeline().can_undo());
    }

    #[test]
    fn moving_to_another_day_column_starts_the_drag() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);

        m.handle(down(pointer(1, 12, 0), Some((target, Grab::Body)))).unwrap();
        let intent = m.handle(Gesture::PointerMove(pointer(3, 12, 0))).unwrap();

        assert_eq!(intent, Intent::Preview(span(at(4, 12, 0), at(4, 13, 0))));
    }

    #[test]
    fn release_without_change_is_cancelled() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);

        m.handle(down(pointer(1, 12, 0), Some((target, Grab::Body)))).unwrap();
        let mut sideways = pointer(1, 12, 0);
        sideways.x += 40.0;
        m.handle(Gesture::PointerMove(sideways)).unwrap();

        assert_eq!(m.handle(Gesture::PointerUp(sideways)).unwrap(), Intent::Cancelled);
        assert!(!m.timeline().can_undo());
    }

    #[test]
    fn inverted_resize_keeps_last_valid_preview() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);

        m.handle(down(pointer(1, 13, 0), Some((target, Grab::Edge(ResizeEdge::End)))))
            .unwrap();
        assert_eq!(
            m.handle(Gesture::PointerMove(pointer(1, 13, 30))).unwrap(),
            Intent::Preview(span(at(2, 12, 0), at(2, 13, 30)))
        );
        assert_eq!(
            m.handle(Gesture::PointerMove(pointer(1, 11, 0))).unwrap(),
            Intent::Preview(span(at(2, 12, 0), at(2, 13, 30)))
        );

        m.handle(Gesture::PointerUp(pointer(1, 11, 0))).unwrap();
        assert_eq!(m.events()[0].span(), span(at(2, 12, 0), at(2, 13, 30)));
    }

    #[test]
    fn resize_start_edge_keeps_minimum_duration() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);

        m.handle(down(pointer(1, 12, 0), Some((target, Grab::Edge(ResizeEdge::Start)))))
            .unwrap();
        m.handle(Gesture::PointerMove(pointer(1, 13, 0))).unwrap();
        m.handle(Gesture::PointerUp(pointer(1, 13, 0))).unwrap();

        assert_eq!(m.events()[0].span(), span(at(2, 13, 0), at(2, 13, 15)));
    }

    #[test]
    fn escape_cancels_without_mutation() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);

        m.handle(down(pointer(1, 12, 0), Some((target, Grab::Body)))).unwrap();
        m.handle(Gesture::PointerMove(pointer(1, 16, 0))).unwrap();
        assert_eq!(m.handle(Gesture::Escape).unwrap(), Intent::Cancelled);

        assert!(m.is_idle());
        assert_eq!(m.events()[0].span(), span(at(2, 12, 0), at(2, 13, 0)));
        assert_eq!(m.handle(Gesture::PointerLeave).unwrap(), Intent::Ignored);
    }

    #[test]
    fn second_press_during_a_session_is_ignored() {
        let mut m = machine(vec![]);
        m.handle(down(pointer(0, 9, 0), None)).unwrap();
        m.handle(Gesture::PointerMove(pointer(0, 10, 0))).unwrap();

        assert_eq!(m.handle(down(pointer(2, 15, 0), None)).unwrap(), Intent::Ignored);
        assert!(matches!(m.state(), InteractionState::Creating { .. }));
    }

    #[test]
    fn single_edit_of_a_virtual_occurrence() {
        let series = BaseEvent::new("Standup", span(at(1, 10, 0), at(1, 11, 0))).with_recurrence("FREQ=DAILY");
        let mut m = machine(vec![series]);
        let before = resolve(m.events(), &week());
        let tuesday = before
            .iter()
            .find(|e| e.start() == at(2, 10, 0))
            .cloned()
            .unwrap();
        assert!(tuesday.is_virtual());

        m.handle(down(pointer(1, 10, 30), Some((tuesday.clone(), Grab::Body))))
            .unwrap();
        m.handle(Gesture::PointerMove(pointer(1, 14, 30))).unwrap();
        let intent = m.handle(Gesture::PointerUp(pointer(1, 14, 30))).unwrap();
        assert_eq!(
            intent,
            Intent::ScopeRequired {
                event_id: tuesday.id().to_string()
            }
        );
        assert!(m.events()[0].excluded_dates.is_empty());

        let intent = m.choose_scope(EditScope::Single).unwrap();
        assert!(matches!(intent, Intent::Updated { scope: Some(EditScope::Single), .. }));

        let tuesday_date = at(2, 0, 0).date_naive();
        assert!(m.events()[0].is_excluded(tuesday_date));
        let exception = m.events().iter().find(|e| e.is_exception()).unwrap();
        assert_eq!(exception.span(), span(at(2, 14, 0), at(2, 15, 0)));

        let after = resolve(m.events(), &week());
        assert_eq!(after.len(), before.len());
    }

    #[test]
    fn escape_while_awaiting_scope_discards_the_edit() {
        let series = BaseEvent::new("Standup", span(at(1, 10, 0), at(1, 11, 0))).with_recurrence("FREQ=DAILY");
        let mut m = machine(vec![series]);
        let target = resolve(m.events(), &week()).remove(0);

        m.handle(down(pointer(0, 10, 0), Some((target, Grab::Body)))).unwrap();
        m.handle(Gesture::PointerMove(pointer(0, 12, 0))).unwrap();
        m.handle(Gesture::PointerUp(pointer(0, 12, 0))).unwrap();
        assert!(matches!(m.state(), InteractionState::AwaitingScope(_)));
        assert!(!m.undo());

        assert_eq!(m.handle(Gesture::Escape).unwrap(), Intent::Cancelled);
        assert_eq!(m.choose_scope(EditScope::All).unwrap(), Intent::Ignored);
        assert_eq!(m.events()[0].span(), span(at(1, 10, 0), at(1, 11, 0)));
    }

    #[test]
    fn delete_commits_after_the_deadline() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);
        let now = at(5, 8, 0);

        let intent = m.request_delete(target, EditScope::Single, now);
        let deadline = now + Duration::milliseconds(300);
        assert!(matches!(intent, Intent::DeleteScheduled { deadline: d, .. } if d == deadline));

        assert_eq!(m.tick(now + Duration::milliseconds(100)).unwrap(), Intent::Ignored);
        assert_eq!(m.events().len(), 1);

        assert!(matches!(m.tick(deadline).unwrap(), Intent::Deleted { .. }));
        assert!(m.events().is_empty());
        assert!(m.is_idle());

        assert!(m.undo());
        assert_eq!(m.events().len(), 1);
    }

    #[test]
    fn escape_cancels_a_pending_delete() {
        let mut m = machine(vec![lunch()]);
        let target = resolve(m.events(), &week()).remove(0);
        let now = at(5, 8, 0);

        m.request_delete(target, EditScope::Single, now);
        assert_eq!(m.handle(Gesture::Escape).unwrap(), Intent::Cancelled);
        assert_eq!(m.tick(now + Duration::seconds(1)).unwrap(), Intent::Ignored);
        assert_eq!(m.events().len(), 1);
    }

    #[test]
    fn scroll_offset_shifts_pointer_times() {
        let mut m = machine(vec![]);
        m.set_scroll_offset(480.0);
        m.handle(down(pointer(0, 1, 0), None)).unwrap();
        let intent = m.handle(Gesture::PointerMove(pointer(0, 2, 0))).unwrap();

        assert_eq!(intent, Intent::Preview(span(at(1, 9, 0), at(1, 10, 0))));
    }
}
