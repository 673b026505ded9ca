//! Simulator settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Pause between iterations of `run` and `random_run`.
pub const DEFAULT_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub delay_ms: u64,
    /// Seed for random scheduling and `RandomSemaphore`; `None` seeds from
    /// the OS.
    pub seed: Option<u64>,
    /// Upper bound on iterations of a run loop.
    pub max_steps: Option<u64>,
    /// End a run loop on the first failed row instead of reporting it and
    /// carrying on.
    pub stop_on_error: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            delay_ms: DEFAULT_DELAY_MS,
            seed: None,
            max_steps: None,
            stop_on_error: false,
        }
    }
}

impl SimConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}
