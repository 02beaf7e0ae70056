//! Per-candidate counters and per-trial context.
//!
//! Counters live for one (suite, candidate) binding only; nothing here is
//! process-global, so one candidate's steady-state bookkeeping can never leak
//! into another's.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// Steady-state counters a scenario may keep for its candidate.
#[derive(Debug, Default)]
pub struct CandidateCounters {
    creates: Cell<u64>,
    reads: Cell<u64>,
    reactions: Cell<u64>,
    last_observed: Cell<i64>,
}

impl CandidateCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump the create counter and return the new value, used as a seed.
    pub fn next_create(&self) -> i64 {
        let n = self.creates.get() + 1;
        self.creates.set(n);
        n as i64
    }

    pub fn record_read(&self, value: i64) {
        self.reads.set(self.reads.get() + 1);
        self.last_observed.set(value);
    }

    pub fn record_reaction(&self, value: i64) {
        self.reactions.set(self.reactions.get() + 1);
        self.last_observed.set(value);
    }

    /// Forget reactions counted so far. Bindings call this right after
    /// subscribing so an engine's initial run on subscribe is not reported.
    pub fn clear_reactions(&self) {
        self.reactions.set(0);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            creates: self.creates.get(),
            reads: self.reads.get(),
            reactions: self.reactions.get(),
            last_observed: self.last_observed.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub creates: u64,
    pub reads: u64,
    pub reactions: u64,
    pub last_observed: i64,
}

/// Fresh context handed to every trial.
pub struct TrialContext<'a> {
    iteration: u64,
    counters: &'a CandidateCounters,
}

impl<'a> TrialContext<'a> {
    pub fn new(iteration: u64, counters: &'a CandidateCounters) -> Self {
        Self { iteration, counters }
    }

    /// Zero-based index of this trial within the candidate's measurement.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn counters(&self) -> &CandidateCounters {
        self.counters
    }
}
