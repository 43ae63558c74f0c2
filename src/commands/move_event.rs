use anyhow::Result;
use calgrid_core::interaction::apply_edit;
use calgrid_core::{EditScope, Span};
use owo_colors::OwoColorize;

use super::{CalendarContext, resolve_scope};
use crate::render::{Render, format_span};
use crate::utils::when::{apply_duration, parse_when};

/// Move an event or occurrence to a new start, optionally changing its length.
pub fn run(
    ctx: &CalendarContext,
    id: &str,
    start: &str,
    duration: Option<String>,
    scope: Option<EditScope>,
) -> Result<()> {
    let target = ctx.occurrence(id)?;
    let Some(current) = target.span() else {
        anyhow::bail!("Event '{}' ends before it starts and cannot be moved", id);
    };

    let new_start = parse_when(start)?.instant(start)?;
    let new_end = match duration {
        Some(d) => apply_duration(new_start, &d)?,
        None => new_start + current.duration(),
    };
    let span = Span::try_new(new_start, new_end)?;

    if span == current {
        println!("{}", "  Nothing to change".dimmed());
        return Ok(());
    }

    let scope = resolve_scope(&target, scope, "Move")?;
    let next = apply_edit(&ctx.events, &target, span, scope)?;
    ctx.save(&next)?;

    tracing::info!(id, ?scope, "moved");
    let mut line = format!("  Moved: {} → {}", target.title(), format_span(span.start, span.end));
    if target.is_recurring() {
        line.push_str(&format!(" ({})", scope.render()));
    }
    println!("{}", line.green());

    Ok(())
}
