//! Per-candidate results, suite outcomes and the run report.

use crate::context::CounterSnapshot;
use crate::error::BenchError;
use crate::extract;
use crate::timing::Stats;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Aggregated measurement of one candidate in one suite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialResult {
    pub candidate: String,
    pub mean_ns: f64,
    pub variance_ns2: f64,
    pub sample_count: usize,
    pub stats: Stats,
    pub counters: CounterSnapshot,
}

impl TrialResult {
    pub fn new(candidate: impl Into<String>, stats: Stats, counters: CounterSnapshot) -> Self {
        Self {
            candidate: candidate.into(),
            mean_ns: stats.mean_ns,
            variance_ns2: stats.variance_ns2,
            sample_count: stats.samples,
            stats,
            counters,
        }
    }

    pub fn mean(&self) -> Duration {
        self.stats.mean()
    }

    /// One line per measured cycle, e.g.
    /// `atom x 1,234,567 ops/sec ±0.52% (54 runs sampled)`.
    pub fn cycle_line(&self) -> String {
        format!(
            "{} x {} ops/sec \u{b1}{:.2}% ({} run{} sampled)",
            self.candidate,
            group_thousands(self.stats.hz),
            self.stats.rme,
            self.sample_count,
            if self.sample_count == 1 { "" } else { "s" }
        )
    }
}

impl fmt::Display for TrialResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cycle_line())
    }
}

/// Format ops/sec the way benchmark reports usually do: integers get
/// thousands separators, sub-100 rates keep two decimals.
fn group_thousands(hz: f64) -> String {
    if !hz.is_finite() || hz < 0.0 {
        return "0".to_string();
    }
    if hz < 100.0 {
        return format!("{:.2}", hz);
    }
    let mut buf = itoa::Buffer::new();
    let digits = buf.format(hz.round() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub candidate: String,
    pub mean_ns: f64,
    pub moe_ns: f64,
}

/// Candidates ordered from fastest to slowest mean.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ranking {
    entries: Vec<RankedEntry>,
}

impl Ranking {
    pub fn from_results(results: &[TrialResult]) -> Self {
        let mut entries: Vec<RankedEntry> = results
            .iter()
            .map(|r| RankedEntry {
                candidate: r.candidate.clone(),
                mean_ns: r.stats.mean_ns,
                moe_ns: r.stats.moe_ns,
            })
            .collect();
        entries.sort_by(|a, b| a.mean_ns.total_cmp(&b.mean_ns));
        Self { entries }
    }

    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    pub fn winner(&self) -> Option<&str> {
        self.entries.first().map(|e| e.candidate.as_str())
    }

    /// Every candidate not measurably slower than the fastest one: its lower
    /// confidence bound does not exceed the fastest candidate's upper bound.
    pub fn fastest(&self) -> Vec<&str> {
        let Some(best) = self.entries.first() else {
            return Vec::new();
        };
        let best_upper = best.mean_ns + best.moe_ns;
        self.entries
            .iter()
            .filter(|e| e.mean_ns - e.moe_ns <= best_upper)
            .map(|e| e.candidate.as_str())
            .collect()
    }
}

/// Terminal state of a suite.
#[derive(Debug, Clone, PartialEq)]
pub enum SuiteStatus {
    Complete { ranking: Ranking },
    Errored { error: BenchError },
}

/// Wall-clock checkpoints of one suite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuiteTimeline {
    pub started: Instant,
    /// When the first trial of the suite began, if any trial ran.
    pub first_trial: Option<Instant>,
    /// When the completion notification was emitted.
    pub completed: Instant,
}

/// Everything a suite reports to its registrant, exactly once.
#[derive(Debug, Clone)]
pub struct SuiteOutcome {
    pub scenario: String,
    pub title: String,
    /// Results of every candidate that finished. An errored suite keeps the
    /// results gathered before the failing candidate.
    pub results: Vec<TrialResult>,
    pub status: SuiteStatus,
    pub timeline: SuiteTimeline,
}

impl SuiteOutcome {
    pub fn is_errored(&self) -> bool {
        matches!(self.status, SuiteStatus::Errored { .. })
    }

    pub fn ranking(&self) -> Option<&Ranking> {
        match &self.status {
            SuiteStatus::Complete { ranking } => Some(ranking),
            SuiteStatus::Errored { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&BenchError> {
        match &self.status {
            SuiteStatus::Errored { error } => Some(error),
            SuiteStatus::Complete { .. } => None,
        }
    }

    pub fn fastest(&self) -> Vec<&str> {
        self.ranking().map(Ranking::fastest).unwrap_or_default()
    }

    /// Human-readable summary line, `Fastest is [...]` for complete suites.
    pub fn summary(&self) -> String {
        match &self.status {
            SuiteStatus::Complete { ranking } => extract::format_fastest(&ranking.fastest()),
            SuiteStatus::Errored { error } => format!("Errored: {}", error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelineOffsets {
    pub started_us: u64,
    pub first_trial_us: Option<u64>,
    pub completed_us: u64,
}

impl TimelineOffsets {
    fn from_timeline(timeline: &SuiteTimeline, origin: Instant) -> Self {
        let offset = |at: Instant| at.saturating_duration_since(origin).as_micros() as u64;
        Self {
            started_us: offset(timeline.started),
            first_trial_us: timeline.first_trial.map(offset),
            completed_us: offset(timeline.completed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuiteRecord {
    pub scenario: String,
    pub title: String,
    pub status: &'static str,
    pub fastest: Vec<String>,
    pub failed_candidate: Option<String>,
    pub error: Option<String>,
    pub results: Vec<TrialResult>,
    pub timeline: TimelineOffsets,
}

/// Ordered suite outcomes, built incrementally by the scheduler.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub suites: Vec<SuiteRecord>,
    /// Scenario keys never started because the chain halted.
    pub skipped: Vec<String>,
    pub halted: bool,
    #[serde(skip)]
    origin: Instant,
}

impl RunReport {
    pub fn new(origin: Instant) -> Self {
        Self {
            generated_at: Utc::now(),
            suites: Vec::new(),
            skipped: Vec::new(),
            halted: false,
            origin,
        }
    }

    pub fn push(&mut self, outcome: &SuiteOutcome) {
        let error = outcome.error();
        self.suites.push(SuiteRecord {
            scenario: outcome.scenario.clone(),
            title: outcome.title.clone(),
            status: if error.is_some() { "errored" } else { "complete" },
            fastest: outcome.fastest().into_iter().map(str::to_string).collect(),
            failed_candidate: error.and_then(|e| e.candidate()).map(str::to_string),
            error: error.map(|e| e.to_string()),
            results: outcome.results.clone(),
            timeline: TimelineOffsets::from_timeline(&outcome.timeline, self.origin),
        });
    }

    pub fn skip(&mut self, scenario: impl Into<String>) {
        self.skipped.push(scenario.into());
    }

    pub fn is_success(&self) -> bool {
        !self.halted && self.skipped.is_empty() && self.suites.iter().all(|s| s.error.is_none())
    }

    /// Winning candidate names per completed suite, in run order.
    pub fn winners(&self) -> Vec<(&str, &[String])> {
        self.suites
            .iter()
            .filter(|s| s.error.is_none())
            .map(|s| (s.scenario.as_str(), s.fastest.as_slice()))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize run report")
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))
    }
}
