use anyhow::Result;
use calgrid_core::{ViewWindow, layout_day, resolve};
use chrono::{Duration, NaiveDate, Utc};
use owo_colors::OwoColorize;

use super::CalendarContext;
use crate::render::{format_date_label, render_block};

/// Print the grid geometry for one day.
pub fn run(ctx: &CalendarContext, date: NaiveDate, json: bool) -> Result<()> {
    // Start a day early so overnight events reaching into `date` are resolved
    let window = ViewWindow::for_days(date - Duration::days(1), date)?;
    let occurrences = resolve(&ctx.events, &window);
    let blocks = layout_day(&occurrences, date, &ctx.config.grid);

    if json {
        println!("{}", serde_json::to_string_pretty(&blocks)?);
        return Ok(());
    }

    println!("{}", format_date_label(date, Utc::now().date_naive()).bold());

    if blocks.is_empty() {
        println!("  {}", "Nothing scheduled".dimmed());
        return Ok(());
    }

    for block in &blocks {
        let event = occurrences.iter().find(|o| o.id() == block.event_id);
        println!("  {}", render_block(block, event));
    }

    Ok(())
}
