use anyhow::{Context, Result};
use calgrid_core::{RecurrenceRule, Span};
use chrono::Duration;
use dialoguer::Input;
use owo_colors::OwoColorize;

use super::CalendarContext;
use crate::utils::when::{apply_duration, parse_end, parse_when};

pub fn run(
    ctx: &CalendarContext,
    title: Option<String>,
    start: Option<String>,
    end: Option<String>,
    duration: Option<String>,
    repeat: Option<String>,
) -> Result<()> {
    let interactive = title.is_none() || start.is_none();

    // --- Title ---
    let title = match title {
        Some(t) => t,
        None => Input::<String>::new()
            .with_prompt("  Title")
            .interact_text()?,
    };

    // --- Start ---
    let start_input = match start {
        Some(s) => s,
        None => Input::<String>::new()
            .with_prompt("  When?")
            .interact_text()?,
    };
    let start = parse_when(&start_input)?.instant(&start_input)?;

    // --- End ---
    let end = if let Some(end_input) = end {
        parse_end(&end_input, start)?
    } else if let Some(dur_input) = duration {
        apply_duration(start, &dur_input)?
    } else {
        start + Duration::hours(1)
    };
    let span = Span::try_new(start, end).context("The event would end before it starts")?;

    // --- Repeat ---
    if let Some(rule) = &repeat
        && RecurrenceRule::parse(rule).is_none()
        && !rule.eq_ignore_ascii_case("none")
    {
        anyhow::bail!(
            "Unrecognized repeat rule \"{}\". Expected e.g. FREQ=WEEKLY;BYDAY=MO,WE",
            rule
        );
    }
    let repeat = repeat.filter(|rule| !rule.eq_ignore_ascii_case("none"));

    let mut machine = ctx.machine(start.date_naive());
    let event_id = machine.create(&title, span, repeat);
    ctx.save(machine.events())?;

    if interactive {
        println!();
    }
    println!("{}", format!("  Created: {}", title).green());
    println!("  {}", event_id.dimmed());

    Ok(())
}
