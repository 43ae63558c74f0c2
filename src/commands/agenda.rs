use anyhow::Result;
use calgrid_core::{ViewWindow, resolve};
use chrono::Utc;
use owo_colors::OwoColorize;

use super::CalendarContext;
use crate::render::{Render, format_date_label};

pub fn run(ctx: &CalendarContext, window: ViewWindow, json: bool) -> Result<()> {
    let mut occurrences = resolve(&ctx.events, &window);

    if json {
        println!("{}", serde_json::to_string_pretty(&occurrences)?);
        return Ok(());
    }

    if occurrences.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    // Stable, so series order survives among equal starts
    occurrences.sort_by_key(|o| o.start());

    let today = Utc::now().date_naive();
    let mut current_date = None;

    for occurrence in &occurrences {
        let date = occurrence.start().date_naive();

        if current_date != Some(date) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", format_date_label(date, today).bold());
            current_date = Some(date);
        }

        println!("  {}", occurrence.render());
    }

    Ok(())
}
