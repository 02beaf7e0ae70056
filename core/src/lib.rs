//! Core of the reactive engine benchmark harness.
//!
//! A [`Scheduler`](scheduler::Scheduler) runs one [`Suite`](suite::Suite) per
//! scenario, strictly one after another. Each suite measures its scenario on
//! every candidate [`ReactiveEngine`](engine::ReactiveEngine) in turn, and
//! async scenarios signal completion through the [`bridge`].

pub mod bridge;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod extract;
pub mod registry;
pub mod report;
pub mod rt;
pub mod scenario;
pub mod scheduler;
pub mod suite;
pub mod timing;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod suite_test;

pub use config::{HaltPolicy, RunConfig, TimingConfig};
pub use engine::{EngineTraits, Field, Instance, Mutation, Reaction, ReactiveEngine, Snapshot, Subscription, Tracker};
pub use error::BenchError;
pub use registry::CandidateRegistry;
