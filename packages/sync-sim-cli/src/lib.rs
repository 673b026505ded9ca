//! Terminal front end for the sync-sim simulator.
//!
//! Loads scripts from disk, merges file and command-line settings, renders
//! simulator events, writes the optional JSON-lines trace and drives the
//! interactive command loop.

pub mod config;
pub mod render;
pub mod shell;
pub mod trace_log;

pub use config::{find_config_file, load_config, merge_config, Config, Overrides, Settings};
pub use render::{OutputFormat, TerminalObserver};
pub use shell::{parse_command, run_shell, Command};
pub use trace_log::{StepLogEntry, TraceLogger};
