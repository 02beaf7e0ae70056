use serde::Serialize;
use std::time::Duration;

/// Sampling policy for one candidate's measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingConfig {
    /// Calibration doubles the batch size until one batch takes this long.
    pub min_sample_time: Duration,
    /// Measured time after which sampling may stop.
    pub max_time: Duration,
    pub min_samples: usize,
    pub max_samples: usize,
    /// Upper bound on iterations per batch.
    pub max_batch: u64,
    /// Bound on a single async trial's completion.
    pub trial_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_sample_time: Duration::from_millis(10),
            max_time: Duration::from_secs(1),
            min_samples: 5,
            max_samples: 100,
            max_batch: 1 << 20,
            trial_timeout: Duration::from_secs(1),
        }
    }
}

impl TimingConfig {
    /// Short measurement window for smoke runs and tests.
    pub fn quick() -> Self {
        Self {
            min_sample_time: Duration::from_millis(1),
            max_time: Duration::from_millis(20),
            min_samples: 3,
            max_samples: 20,
            max_batch: 1 << 14,
            trial_timeout: Duration::from_millis(250),
        }
    }

    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn with_min_sample_time(mut self, min_sample_time: Duration) -> Self {
        self.min_sample_time = min_sample_time;
        self
    }

    pub fn with_samples(mut self, min_samples: usize, max_samples: usize) -> Self {
        self.min_samples = min_samples.max(1);
        self.max_samples = max_samples.max(self.min_samples);
        self
    }

    pub fn with_max_batch(mut self, max_batch: u64) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    pub fn with_trial_timeout(mut self, trial_timeout: Duration) -> Self {
        self.trial_timeout = trial_timeout;
        self
    }
}

/// What the scheduler does after a suite errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HaltPolicy {
    /// Stop the chain and skip the remaining suites.
    #[default]
    Halt,
    /// Keep running the remaining suites.
    Continue,
}

/// Everything needed to assemble a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunConfig {
    pub timing: TimingConfig,
    pub policy: HaltPolicy,
    /// Scenario keys to run, in order. Empty runs the whole catalog.
    pub scenarios: Vec<String>,
    /// Candidate names to include. Empty includes every registered engine.
    pub candidates: Vec<String>,
}
