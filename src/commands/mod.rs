pub mod agenda;
pub mod day;
pub mod delete;
pub mod move_event;
pub mod new;

use anyhow::{Context, Result};
use calgrid_core::{
    BaseEvent, CalGridConfig, EditScope, EventStore, InteractionMachine, ResolvedEvent,
    find_occurrence,
};
use chrono::NaiveDate;
use dialoguer::Select;

/// Configuration plus the loaded event file, shared by every command.
pub struct CalendarContext {
    pub config: CalGridConfig,
    pub store: EventStore,
    pub events: Vec<BaseEvent>,
}

impl CalendarContext {
    pub fn load() -> Result<Self> {
        let config = CalGridConfig::load().context("Could not load calgrid config")?;
        let store = EventStore::new(config.events_path());
        let events = store
            .load()
            .with_context(|| format!("Could not read {}", store.path().display()))?;

        tracing::debug!(path = %store.path().display(), events = events.len(), "calendar loaded");
        Ok(CalendarContext {
            config,
            store,
            events,
        })
    }

    pub fn save(&self, events: &[BaseEvent]) -> Result<()> {
        self.store
            .save(events)
            .with_context(|| format!("Could not write {}", self.store.path().display()))
    }

    /// An interaction machine over the loaded events, for a view starting at `origin`.
    pub fn machine(&self, origin: NaiveDate) -> InteractionMachine {
        InteractionMachine::new(
            self.events.clone(),
            self.config.clock(origin),
            self.config.interaction,
        )
    }

    /// Look up an id printed by `agenda` or `day`.
    pub fn occurrence(&self, id: &str) -> Result<ResolvedEvent> {
        find_occurrence(&self.events, id).ok_or_else(|| {
            anyhow::anyhow!("No event or occurrence with id '{}'. Run `calgrid agenda` to list ids", id)
        })
    }
}

/// Scope for an edit or delete. Plain events need none; for series the
/// user is asked when `--scope` was not given.
pub fn resolve_scope(target: &ResolvedEvent, scope: Option<EditScope>, verb: &str) -> Result<EditScope> {
    if !target.is_recurring() {
        return Ok(EditScope::Single);
    }
    if let Some(scope) = scope {
        return Ok(scope);
    }

    let choices = [EditScope::Single, EditScope::Following, EditScope::All];
    let items = [
        "This event",
        "This and following events",
        "All events",
    ];
    let selection = Select::new()
        .with_prompt(format!("  {} recurring event", verb))
        .items(&items)
        .default(0)
        .interact()?;
    Ok(choices[selection])
}
