//! Generic sampler used by the suite runner.
//!
//! The sampler only decides how many iterations to run next and turns the
//! measured batches into statistics; running the iterations is the caller's
//! job, which keeps it usable for both sync and async trials.

use crate::config::TimingConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Two-sided 95% Student's t critical values for 1..=30 degrees of freedom.
const T_TABLE: [f64; 30] = [
    12.706, 4.303, 3.182, 2.776, 2.571, 2.447, 2.365, 2.306, 2.262, 2.228, 2.201, 2.179, 2.160, 2.145, 2.131, 2.120,
    2.110, 2.101, 2.093, 2.086, 2.080, 2.074, 2.069, 2.064, 2.060, 2.056, 2.052, 2.048, 2.045, 2.042,
];
const T_INFINITY: f64 = 1.96;

fn t_critical(df: usize) -> f64 {
    match df {
        0 => f64::NAN,
        1..=30 => T_TABLE[df - 1],
        _ => T_INFINITY,
    }
}

/// Summary statistics over per-iteration sample times, in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    pub mean_ns: f64,
    pub variance_ns2: f64,
    pub std_dev_ns: f64,
    /// Standard error of the mean.
    pub sem_ns: f64,
    /// Margin of error at 95% confidence.
    pub moe_ns: f64,
    /// Relative margin of error, in percent.
    pub rme: f64,
    /// Operations per second.
    pub hz: f64,
    pub samples: usize,
    pub batch: u64,
}

impl Stats {
    /// Compute statistics from per-iteration times. A single sample has zero
    /// variance and zero margin of error.
    pub fn from_samples(samples: &[f64], batch: u64) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self {
                mean_ns: 0.0,
                variance_ns2: 0.0,
                std_dev_ns: 0.0,
                sem_ns: 0.0,
                moe_ns: 0.0,
                rme: 0.0,
                hz: 0.0,
                samples: 0,
                batch,
            };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let sem = std_dev / (n as f64).sqrt();
        let moe = if n > 1 { sem * t_critical(n - 1) } else { 0.0 };
        let rme = if mean > 0.0 { moe / mean * 100.0 } else { 0.0 };
        let hz = if mean > 0.0 { 1e9 / mean } else { 0.0 };
        Self {
            mean_ns: mean,
            variance_ns2: variance,
            std_dev_ns: std_dev,
            sem_ns: sem,
            moe_ns: moe,
            rme,
            hz,
            samples: n,
            batch,
        }
    }

    pub fn mean(&self) -> Duration {
        Duration::from_nanos(self.mean_ns.max(0.0).round() as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Calibrating,
    Measuring,
    Finished,
}

/// Drives warm-up and measurement for one candidate.
///
/// ```ignore
/// let mut sampler = Sampler::new(&config);
/// while let Some(batch) = sampler.next_batch() {
///     let elapsed = run(batch);
///     sampler.record(batch, elapsed);
/// }
/// let stats = sampler.finish();
/// ```
#[derive(Debug)]
pub struct Sampler {
    config: TimingConfig,
    phase: Phase,
    batch: u64,
    calibration_time: Duration,
    measured_time: Duration,
    samples: Vec<f64>,
}

impl Sampler {
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            config: config.clone(),
            phase: Phase::Calibrating,
            batch: 1,
            calibration_time: Duration::ZERO,
            measured_time: Duration::ZERO,
            samples: Vec::with_capacity(config.min_samples),
        }
    }

    /// Iterations to run in the next batch, or `None` once sampling is done.
    pub fn next_batch(&mut self) -> Option<u64> {
        if self.phase == Phase::Measuring && self.is_saturated() {
            self.phase = Phase::Finished;
        }
        match self.phase {
            Phase::Calibrating | Phase::Measuring => Some(self.batch),
            Phase::Finished => None,
        }
    }

    /// Record how long `batch` iterations took.
    pub fn record(&mut self, batch: u64, elapsed: Duration) {
        match self.phase {
            Phase::Calibrating => {
                self.calibration_time += elapsed;
                let settled = elapsed >= self.config.min_sample_time
                    || batch >= self.config.max_batch
                    || self.calibration_time >= self.config.max_time;
                if settled {
                    debug!(batch, ?elapsed, "calibration finished");
                    self.phase = Phase::Measuring;
                } else {
                    self.batch = (batch * 2).min(self.config.max_batch);
                }
            }
            Phase::Measuring => {
                self.measured_time += elapsed;
                self.samples.push(elapsed.as_nanos() as f64 / batch.max(1) as f64);
            }
            Phase::Finished => {}
        }
    }

    fn is_saturated(&self) -> bool {
        let n = self.samples.len();
        n >= self.config.max_samples || (n >= self.config.min_samples && self.measured_time >= self.config.max_time)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn finish(self) -> Stats {
        Stats::from_samples(&self.samples, self.batch)
    }
}
