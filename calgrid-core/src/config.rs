//! Global calgrid configuration.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{CalGridError, CalGridResult};
use crate::interaction::InteractionConfig;
use crate::layout::GridMetrics;
use crate::snap::SnapClock;

static DEFAULT_EVENTS_FILE: &str = "~/calendar/events.json";

fn default_events_file() -> PathBuf {
    PathBuf::from(DEFAULT_EVENTS_FILE)
}

fn is_default_events_file(p: &PathBuf) -> bool {
    *p == default_events_file()
}

/// Global configuration at ~/.config/calgrid/config.toml
///
/// Every value can also be set from the environment, e.g.
/// `CALGRID_EVENTS_FILE` or `CALGRID_GRID__PX_PER_HOUR`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalGridConfig {
    #[serde(default = "default_events_file", skip_serializing_if = "is_default_events_file")]
    pub events_file: PathBuf,

    #[serde(default)]
    pub grid: GridMetrics,

    #[serde(default)]
    pub interaction: InteractionConfig,
}

impl Default for CalGridConfig {
    fn default() -> Self {
        CalGridConfig {
            events_file: default_events_file(),
            grid: GridMetrics::default(),
            interaction: InteractionConfig::default(),
        }
    }
}

impl CalGridConfig {
    pub fn config_path() -> CalGridResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalGridError::Config("Could not determine config directory".into()))?
            .join("calgrid");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented template there
    /// on first run.
    pub fn load() -> CalGridResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from `path` (optional) with environment overrides applied on top.
    pub fn load_from(path: &Path) -> CalGridResult<Self> {
        let config: CalGridConfig = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("CALGRID")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CalGridError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalGridError::Config(e.to_string()))?;

        tracing::debug!(path = %path.display(), events_file = %config.events_file.display(), "loaded config");
        Ok(config)
    }

    /// The events file with `~` expanded.
    pub fn events_path(&self) -> PathBuf {
        let full_path_str = shellexpand::tilde(&self.events_file.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    /// Snap clock for a view whose first column shows `origin`.
    pub fn clock(&self, origin: chrono::NaiveDate) -> SnapClock {
        SnapClock::new(origin, self.grid.px_per_hour, self.interaction.snap_step_minutes)
    }

    pub fn save_to(&self, path: &Path) -> CalGridResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| CalGridError::Config(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| CalGridError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalGridResult<()> {
        let grid = GridMetrics::default();
        let interaction = InteractionConfig::default();
        let contents = format!(
            "\
# calgrid configuration

# Where your events are stored:
# events_file = \"{}\"

# [grid]
# px_per_hour = {:.1}
# edge_gap_px = {:.1}
# min_height_px = {:.1}
# column_gap_pct = {:.1}
# side_inset_pct = {:.1}

# [interaction]
# snap_step_minutes = {}
# drag_threshold_px = {:.1}
# delete_delay_ms = {}
# history_limit = {}
",
            DEFAULT_EVENTS_FILE,
            grid.px_per_hour,
            grid.edge_gap_px,
            grid.min_height_px,
            grid.column_gap_pct,
            grid.side_inset_pct,
            interaction.snap_step_minutes,
            interaction.drag_threshold_px,
            interaction.delete_delay_ms,
            interaction.history_limit,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalGridError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalGridError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}
