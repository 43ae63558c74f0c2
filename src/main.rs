mod commands;
mod render;
mod utils;

use anyhow::Result;
use calgrid_core::window::DEFAULT_WINDOW_DAYS;
use calgrid_core::{EditScope, ViewWindow};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::CalendarContext;
use crate::utils::when::parse_when;

#[derive(Parser)]
#[command(name = "calgrid")]
#[command(about = "View and edit your calendar, recurring events included")]
struct Cli {
    /// More log output (-v, -vv, -vvv). CALGRID_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List occurrences grouped by day
    Agenda {
        /// Show events from this date (YYYY-MM-DD or e.g. "monday")
        #[arg(long)]
        from: Option<String>,

        /// Show events until this date
        #[arg(long)]
        to: Option<String>,

        /// Print the resolved occurrences as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the time-grid layout of one day
    Day {
        /// Day to show (defaults to today)
        date: Option<String>,

        /// Print the geometry as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new event
    New {
        /// Event title
        title: Option<String>,

        /// Start date/time (e.g., "2025-03-20T15:00:00Z" or "tomorrow 3pm")
        #[arg(short, long)]
        start: Option<String>,

        /// End date/time
        #[arg(short, long, conflicts_with = "duration")]
        end: Option<String>,

        /// Duration (e.g., "30m", "1h", "2h30m")
        #[arg(short, long)]
        duration: Option<String>,

        /// Repeat rule, e.g. "FREQ=WEEKLY;BYDAY=MO,WE"
        #[arg(short, long)]
        repeat: Option<String>,
    },
    /// Move an event or one occurrence of a series
    Move {
        /// Event or occurrence id, as printed by `agenda`
        id: String,

        /// New start date/time
        #[arg(short, long)]
        start: String,

        /// New duration (keeps the current one if omitted)
        #[arg(short, long)]
        duration: Option<String>,

        /// Which part of a series to change (asked if omitted)
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,
    },
    /// Delete an event or part of a series
    Delete {
        /// Event or occurrence id, as printed by `agenda`
        id: String,

        /// Which part of a series to delete (asked if omitted)
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Single,
    Following,
    All,
}

impl From<ScopeArg> for EditScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Single => EditScope::Single,
            ScopeArg::Following => EditScope::Following,
            ScopeArg::All => EditScope::All,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = CalendarContext::load()?;

    match cli.command {
        Commands::Agenda { from, to, json } => {
            let window = agenda_window(from.as_deref(), to.as_deref())?;
            commands::agenda::run(&ctx, window, json)
        }
        Commands::Day { date, json } => {
            let date = match date {
                Some(d) => parse_when(&d)?.day(),
                None => Utc::now().date_naive(),
            };
            commands::day::run(&ctx, date, json)
        }
        Commands::New {
            title,
            start,
            end,
            duration,
            repeat,
        } => commands::new::run(&ctx, title, start, end, duration, repeat),
        Commands::Move {
            id,
            start,
            duration,
            scope,
        } => commands::move_event::run(&ctx, &id, &start, duration, scope.map(Into::into)),
        Commands::Delete { id, scope } => commands::delete::run(&ctx, &id, scope.map(Into::into)),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("CALGRID_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Window for `agenda`: today plus a week unless bounds are given.
fn agenda_window(from: Option<&str>, to: Option<&str>) -> Result<ViewWindow> {
    let today = Utc::now().date_naive();

    let from = match from {
        Some(s) => parse_when(s)?.day(),
        None => today,
    };
    let to = match to {
        Some(s) => parse_when(s)?.day(),
        None => from + Duration::days(DEFAULT_WINDOW_DAYS),
    };

    if to < from {
        anyhow::bail!("--to ({}) is before --from ({})", to, from);
    }
    Ok(ViewWindow::for_days(from, to)?)
}
