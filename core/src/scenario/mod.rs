//! Scenario model shared by the suite runner, the CLI and the Criterion
//! benches.
//!
//! Keeping the workload catalog in one place means every tool measures the
//! same operations under the same names.

pub mod catalog;

use crate::bridge::Completion;
use crate::context::{CandidateCounters, TrialContext};
use crate::engine::ReactiveEngine;
use serde::Serialize;
use std::fmt;
use std::rc::Rc;

pub use catalog::{catalog, find};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Sync,
    Async,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::Sync => f.write_str("sync"),
            ScenarioKind::Async => f.write_str("async"),
        }
    }
}

/// What a single trial hands back to the suite.
#[derive(Debug)]
pub enum Trial {
    /// The trial finished when the closure returned.
    Done,
    /// The trial finishes when the completion settles.
    Pending(Completion),
}

/// Closure measured once per trial.
pub type TrialFn = Box<dyn FnMut(&mut TrialContext<'_>) -> anyhow::Result<Trial>>;

/// Builds a candidate's trial closure. Long-lived state (instances,
/// subscriptions) is created here and owned by the returned closure, so it is
/// released as soon as the candidate's measurement ends.
pub type BindFn = dyn Fn(&Rc<dyn ReactiveEngine>, &Rc<CandidateCounters>) -> anyhow::Result<TrialFn>;

/// One named workload applied identically to every candidate.
#[derive(Clone)]
pub struct Scenario {
    key: String,
    title: String,
    kind: ScenarioKind,
    bind: Rc<BindFn>,
}

impl Scenario {
    pub fn new<F>(key: impl Into<String>, title: impl Into<String>, kind: ScenarioKind, bind: F) -> Self
    where
        F: Fn(&Rc<dyn ReactiveEngine>, &Rc<CandidateCounters>) -> anyhow::Result<TrialFn> + 'static,
    {
        Self {
            key: key.into(),
            title: title.into(),
            kind,
            bind: Rc::new(bind),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    pub fn bind(&self, engine: &Rc<dyn ReactiveEngine>, counters: &Rc<CandidateCounters>) -> anyhow::Result<TrialFn> {
        (self.bind)(engine, counters)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .finish()
    }
}
