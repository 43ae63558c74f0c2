use anyhow::Result;
use calgrid_core::EditScope;
use calgrid_core::interaction::apply_delete;
use owo_colors::OwoColorize;

use super::{CalendarContext, resolve_scope};
use crate::render::Render;

pub fn run(ctx: &CalendarContext, id: &str, scope: Option<EditScope>) -> Result<()> {
    let target = ctx.occurrence(id)?;
    let scope = resolve_scope(&target, scope, "Delete")?;

    let next = apply_delete(&ctx.events, &target, scope)?;
    ctx.save(&next)?;

    tracing::info!(id, ?scope, removed = ctx.events.len().saturating_sub(next.len()), "deleted");
    let mut line = format!("  Deleted: {}", target.title());
    if target.is_recurring() {
        line.push_str(&format!(" ({})", scope.render()));
    }
    println!("{}", line.red());

    Ok(())
}
