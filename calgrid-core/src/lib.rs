//! Scheduling core for calgrid.
//!
//! This crate turns a flat list of persisted events into what a time-grid
//! calendar draws, and turns pointer gestures back into edits:
//! - `recurrence` expands repeat rules into virtual occurrences
//! - `resolve` merges bases, exceptions and expansions for a view window
//! - `layout` assigns conflict columns and pixel geometry per day
//! - `snap` converts pointer positions into snapped times
//! - `interaction` drives create / move / resize / delete sessions with
//!   single / following / all scope and undo/redo history

pub mod config;
pub mod error;
pub mod event;
pub mod history;
pub mod interaction;
pub mod layout;
pub mod recurrence;
pub mod resolve;
pub mod snap;
pub mod store;
pub mod window;

pub use config::CalGridConfig;
pub use error::{CalGridError, CalGridResult};
pub use event::{BaseEvent, ResolvedEvent, Span, VirtualOccurrence};
pub use history::Timeline;
pub use interaction::{
    EditScope, Gesture, Grab, Intent, InteractionConfig, InteractionMachine, InteractionState,
    PointerSample, ResizeEdge,
};
pub use layout::{Geometry, GridMetrics, layout_day, layout_days};
pub use recurrence::{RecurrenceRule, expand};
pub use resolve::{find_occurrence, persistable, resolve, resolve_entries};
pub use snap::{SnapClock, SnapMode, snap};
pub use store::EventStore;
pub use window::ViewWindow;
