//! Configuration loading for sync-sim
//!
//! Settings come from a `sync-sim.toml` file, or from the
//! `[tool.sync-sim]` section of a `pyproject.toml`, found by walking up
//! from the script's directory. Command-line flags take precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sync_sim::SimConfig;

pub const CONFIG_FILE: &str = "sync-sim.toml";
const PYPROJECT_SECTION: &str = "sync-sim";

/// File-level configuration. Every field is optional so a file can set
/// just the ones it cares about.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Milliseconds between run-loop iterations
    pub delay_ms: Option<u64>,

    /// Seed for random scheduling
    pub seed: Option<u64>,

    /// Stop `run` after this many iterations
    pub max_steps: Option<u64>,

    /// End `run` on the first failing row
    pub stop_on_error: Option<bool>,

    /// Use random scheduling for `run` and `step`
    pub random: Option<bool>,

    /// Append a JSON-lines step trace to this file
    pub trace_log: Option<PathBuf>,
}

/// Flags given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub delay_ms: Option<u64>,
    pub seed: Option<u64>,
    pub max_steps: Option<u64>,
    pub stop_on_error: bool,
    pub random: bool,
    pub trace_log: Option<PathBuf>,
}

/// Effective settings after merging file and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub sim: SimConfig,
    pub random: bool,
    pub trace_log: Option<PathBuf>,
}

/// Find the nearest config file, starting at `start_path` and walking up.
///
/// A `sync-sim.toml` wins over a `pyproject.toml` in the same directory; a
/// `pyproject.toml` only counts if it has a `[tool.sync-sim]` section.
pub fn find_config_file(start_path: &Path) -> Option<PathBuf> {
    let mut current = if start_path.is_file() {
        start_path.parent()?
    } else {
        start_path
    };

    loop {
        let dedicated = current.join(CONFIG_FILE);
        if dedicated.exists() {
            return Some(dedicated);
        }

        let pyproject = current.join("pyproject.toml");
        if pyproject.exists() && pyproject_section(&pyproject).is_some() {
            return Some(pyproject);
        }

        current = current.parent()?;
    }
}

fn pyproject_section(path: &Path) -> Option<toml::Value> {
    let content = std::fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    value.get("tool")?.get(PYPROJECT_SECTION).cloned()
}

/// Load configuration from `path`, or from the nearest config file above
/// `start_path` when no path is given.
///
/// A file that cannot be read or parsed is logged and ignored.
pub fn load_config(path: Option<&Path>, start_path: &Path) -> Option<Config> {
    let config_path = match path {
        Some(p) if p.exists() => p.to_path_buf(),
        Some(p) => {
            log::warn!("config file {} does not exist", p.display());
            return None;
        }
        None => find_config_file(start_path)?,
    };
    log::debug!("loading config from {}", config_path.display());

    let parsed = if config_path.file_name().is_some_and(|n| n == "pyproject.toml") {
        pyproject_section(&config_path).map(|section| section.try_into::<Config>())
    } else {
        std::fs::read_to_string(&config_path)
            .ok()
            .map(|content| toml::from_str::<Config>(&content))
    };

    match parsed {
        Some(Ok(config)) => Some(config),
        Some(Err(err)) => {
            log::warn!("ignoring {}: {}", config_path.display(), err);
            None
        }
        None => None,
    }
}

/// Merge command line flags with config file settings.
/// Flags take precedence.
pub fn merge_config(config: Option<&Config>, overrides: &Overrides) -> Settings {
    let file = config.cloned().unwrap_or_default();
    let defaults = SimConfig::default();

    let sim = SimConfig {
        delay_ms: overrides
            .delay_ms
            .or(file.delay_ms)
            .unwrap_or(defaults.delay_ms),
        seed: overrides.seed.or(file.seed),
        max_steps: overrides.max_steps.or(file.max_steps),
        stop_on_error: overrides.stop_on_error || file.stop_on_error.unwrap_or(false),
    };

    Settings {
        sim,
        random: overrides.random || file.random.unwrap_or(false),
        trace_log: overrides.trace_log.clone().or(file.trace_log),
    }
}
