//! Sequential scheduler: runs an ordered queue of suites, one at a time.

use crate::config::{HaltPolicy, RunConfig};
use crate::error::BenchError;
use crate::registry::CandidateRegistry;
use crate::report::RunReport;
use crate::scenario::{self, Scenario};
use crate::suite::{Suite, SuiteObserver};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    /// Suites queued, nothing started.
    Idle { queued: usize },
    /// The suite at `index` (in queue order) is running.
    Running { index: usize, scenario: String },
    Done,
}

/// Owns the suite queue. The next suite starts only after the previous one's
/// completion has been received.
pub struct Scheduler {
    queue: VecDeque<Suite>,
    policy: HaltPolicy,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(policy: HaltPolicy) -> Self {
        Self {
            queue: VecDeque::new(),
            policy,
            state: SchedulerState::Idle { queued: 0 },
        }
    }

    /// Build one suite per selected scenario over the selected candidates.
    pub fn from_config(config: &RunConfig, registry: &CandidateRegistry) -> Result<Self, BenchError> {
        let scenarios: Vec<Scenario> = if config.scenarios.is_empty() {
            scenario::catalog()
        } else {
            config
                .scenarios
                .iter()
                .map(|key| scenario::find(key))
                .collect::<Result<_, _>>()?
        };
        let candidates = registry.select(&config.candidates)?;

        let mut scheduler = Scheduler::new(config.policy);
        for scenario in scenarios {
            scheduler.push(Suite::new(scenario, candidates.clone(), config.timing.clone())?);
        }
        Ok(scheduler)
    }

    pub fn push(&mut self, suite: Suite) {
        self.queue.push_back(suite);
        if let SchedulerState::Idle { queued } = &mut self.state {
            *queued += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn policy(&self) -> HaltPolicy {
        self.policy
    }

    /// Scenario keys in queue order.
    pub fn scenario_keys(&self) -> Vec<&str> {
        self.queue.iter().map(Suite::key).collect()
    }

    /// Drain the queue. Each suite is awaited to completion before the next
    /// one is taken; under [`HaltPolicy::Halt`] the first errored suite stops
    /// the chain and the rest are reported as skipped.
    pub async fn run(&mut self, observer: &mut dyn SuiteObserver) -> RunReport {
        let mut report = RunReport::new(Instant::now());
        let mut index = 0;
        while let Some(mut suite) = self.queue.pop_front() {
            self.state = SchedulerState::Running {
                index,
                scenario: suite.key().to_string(),
            };
            let outcome = suite.run(observer).await;
            report.push(&outcome);
            index += 1;

            if outcome.is_errored() && self.policy == HaltPolicy::Halt {
                warn!(scenario = %outcome.scenario, remaining = self.queue.len(), "halting suite chain");
                report.halted = true;
                for skipped in self.queue.drain(..) {
                    report.skip(skipped.key());
                }
                break;
            }
        }
        info!(suites = report.suites.len(), skipped = report.skipped.len(), "run finished");
        self.state = SchedulerState::Done;
        report
    }
}
