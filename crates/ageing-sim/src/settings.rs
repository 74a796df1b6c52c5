//! Run settings shared by every scenario.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Network size used when nothing else is given.
pub const DEFAULT_NET_SIZE: usize = 100_000;

/// Join events simulated per vault of target network size.
pub const EVENTS_PER_VAULT: usize = 5;

/// Progress lines logged per run.
pub const PROGRESS_STEPS: usize = 100;

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for the network's random source
    pub seed: u64,
    /// Population the network is held at once full
    pub net_size: usize,
    /// Join events simulated while building the network
    pub total_events: usize,
    /// Events between progress log lines
    pub progress_step: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self::for_network(DEFAULT_NET_SIZE, 0)
    }
}

impl Settings {
    /// Settings for a network of `net_size` vaults, deriving the event count
    /// and progress step from it.
    pub fn for_network(net_size: usize, seed: u64) -> Self {
        let total_events = net_size * EVENTS_PER_VAULT;
        Self {
            seed,
            net_size,
            total_events,
            progress_step: total_events / PROGRESS_STEPS,
        }
    }

    /// Override the event count, keeping the progress step in proportion.
    pub fn with_events(mut self, total_events: usize) -> Self {
        self.total_events = total_events;
        self.progress_step = total_events / PROGRESS_STEPS;
        self
    }

    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings no scenario can run with.
    pub fn validate(&self) -> Result<()> {
        if self.net_size == 0 {
            return Err(Error::Config("net_size must be at least 1".into()));
        }
        if self.total_events == 0 {
            return Err(Error::Config("total_events must be at least 1".into()));
        }
        Ok(())
    }

    /// Whether event `index` should log progress.
    pub fn reports_progress(&self, index: usize) -> bool {
        index % self.progress_step.max(1) == 0
    }

    /// Percentage of the run completed before event `index`.
    pub fn percent_complete(&self, index: usize) -> usize {
        if self.total_events == 0 {
            return 100;
        }
        index * 100 / self.total_events
    }
}
