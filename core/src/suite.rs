//! Suite runner: measures one scenario across all candidates, one candidate
//! at a time.

use crate::bridge::Abandoned;
use crate::config::TimingConfig;
use crate::context::{CandidateCounters, TrialContext};
use crate::engine::ReactiveEngine;
use crate::error::BenchError;
use crate::report::{Ranking, SuiteOutcome, SuiteStatus, SuiteTimeline, TrialResult};
use crate::scenario::{Scenario, ScenarioKind, Trial, TrialFn};
use crate::timing::Sampler;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Receives suite progress. Every method has a no-op default.
pub trait SuiteObserver {
    fn on_start(&mut self, _scenario: &Scenario) {}

    /// Called once per candidate as soon as its measurement finishes.
    fn on_cycle(&mut self, _scenario: &Scenario, _result: &TrialResult) {}

    /// The suite's single completion notification.
    fn on_complete(&mut self, _outcome: &SuiteOutcome) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct Silent;

impl SuiteObserver for Silent {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteState {
    Idle,
    Running,
    Complete,
    Errored,
}

/// One scenario bound to every candidate.
pub struct Suite {
    scenario: Scenario,
    candidates: Vec<Rc<dyn ReactiveEngine>>,
    timing: TimingConfig,
    state: SuiteState,
    first_trial: Option<Instant>,
}

impl Suite {
    pub fn new(
        scenario: Scenario,
        candidates: Vec<Rc<dyn ReactiveEngine>>,
        timing: TimingConfig,
    ) -> Result<Self, BenchError> {
        if candidates.is_empty() {
            return Err(BenchError::NoCandidates);
        }
        for (idx, candidate) in candidates.iter().enumerate() {
            if candidates[..idx].iter().any(|c| c.name() == candidate.name()) {
                return Err(BenchError::DuplicateCandidate(candidate.name().to_string()));
            }
        }
        Ok(Self {
            scenario,
            candidates,
            timing,
            state: SuiteState::Idle,
            first_trial: None,
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn key(&self) -> &str {
        self.scenario.key()
    }

    pub fn state(&self) -> SuiteState {
        self.state
    }

    pub fn candidate_names(&self) -> Vec<&str> {
        self.candidates.iter().map(|c| c.name()).collect()
    }

    /// Measure every candidate in order and emit exactly one completion
    /// notification. The first failing candidate ends the suite, which is
    /// left in [`SuiteState::Complete`] or [`SuiteState::Errored`].
    pub async fn run(&mut self, observer: &mut dyn SuiteObserver) -> SuiteOutcome {
        let started = Instant::now();
        self.state = SuiteState::Running;
        self.first_trial = None;
        info!(scenario = self.scenario.key(), candidates = self.candidates.len(), "suite started");
        observer.on_start(&self.scenario);

        let candidates = self.candidates.clone();
        let mut results = Vec::with_capacity(candidates.len());
        let mut failure = None;
        for engine in &candidates {
            match self.measure(engine).await {
                Ok(result) => {
                    observer.on_cycle(&self.scenario, &result);
                    results.push(result);
                }
                Err(error) => {
                    warn!(scenario = self.scenario.key(), %error, "suite errored");
                    failure = Some(error);
                    break;
                }
            }
        }

        let status = match failure {
            Some(error) => {
                self.state = SuiteState::Errored;
                SuiteStatus::Errored { error }
            }
            None => {
                self.state = SuiteState::Complete;
                SuiteStatus::Complete {
                    ranking: Ranking::from_results(&results),
                }
            }
        };
        let outcome = SuiteOutcome {
            scenario: self.scenario.key().to_string(),
            title: self.scenario.title().to_string(),
            results,
            status,
            timeline: SuiteTimeline {
                started,
                first_trial: self.first_trial,
                completed: Instant::now(),
            },
        };
        info!(scenario = self.scenario.key(), state = ?self.state, "suite finished");
        observer.on_complete(&outcome);
        outcome
    }

    async fn measure(&mut self, engine: &Rc<dyn ReactiveEngine>) -> Result<TrialResult, BenchError> {
        let name = engine.name().to_string();
        let counters = Rc::new(CandidateCounters::new());
        let mut trial = match panic::catch_unwind(AssertUnwindSafe(|| self.scenario.bind(engine, &counters))) {
            Ok(Ok(trial)) => trial,
            Ok(Err(err)) => return Err(BenchError::scenario(self.scenario.key(), &name, format!("{:#}", err))),
            Err(payload) => return Err(BenchError::scenario(self.scenario.key(), &name, panic_message(payload))),
        };

        let mut sampler = Sampler::new(&self.timing);
        let mut iteration = 0u64;
        while let Some(batch) = sampler.next_batch() {
            let elapsed = self
                .run_batch(&name, &mut trial, &counters, batch, &mut iteration)
                .await?;
            sampler.record(batch, elapsed);
        }
        // Release the binding's instances and subscriptions before the next
        // candidate starts.
        drop(trial);

        let stats = sampler.finish();
        debug!(
            candidate = %name,
            samples = stats.samples,
            batch = stats.batch,
            mean_ns = stats.mean_ns,
            "candidate measured"
        );
        Ok(TrialResult::new(name, stats, counters.snapshot()))
    }

    async fn run_batch(
        &mut self,
        name: &str,
        trial: &mut TrialFn,
        counters: &CandidateCounters,
        batch: u64,
        iteration: &mut u64,
    ) -> Result<Duration, BenchError> {
        let start = Instant::now();
        if self.first_trial.is_none() {
            self.first_trial = Some(start);
        }
        let key = self.scenario.key();
        let kind = self.scenario.kind();
        for _ in 0..batch {
            let mut ctx = TrialContext::new(*iteration, counters);
            *iteration += 1;
            let outcome = match panic::catch_unwind(AssertUnwindSafe(|| trial(&mut ctx))) {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => return Err(BenchError::scenario(key, name, format!("{:#}", err))),
                Err(payload) => return Err(BenchError::scenario(key, name, panic_message(payload))),
            };
            match (kind, outcome) {
                (ScenarioKind::Sync, Trial::Done) => {}
                (ScenarioKind::Sync, Trial::Pending(_)) => {
                    return Err(BenchError::contract(
                        key,
                        name,
                        "synchronous scenario returned a pending completion",
                    ));
                }
                (ScenarioKind::Async, Trial::Done) => {
                    return Err(BenchError::contract(
                        key,
                        name,
                        "asynchronous scenario returned without a completion",
                    ));
                }
                (ScenarioKind::Async, Trial::Pending(completion)) => {
                    match tokio::time::timeout(self.timing.trial_timeout, completion).await {
                        Ok(Ok(())) => {}
                        Ok(Err(Abandoned)) => {
                            return Err(BenchError::Abandoned {
                                scenario: key.to_string(),
                                candidate: name.to_string(),
                            });
                        }
                        Err(_) => {
                            return Err(BenchError::Timeout {
                                scenario: key.to_string(),
                                candidate: name.to_string(),
                                after: self.timing.trial_timeout,
                            });
                        }
                    }
                }
            }
        }
        Ok(start.elapsed())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}
