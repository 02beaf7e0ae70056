//! Single-threaded runtime the harness runs on.
//!
//! Suites and engines are `!Send` (`Rc`/`RefCell` graphs), so everything is
//! driven from one current-thread tokio runtime; the timer is enabled for
//! per-trial timeouts.

use crate::report::RunReport;
use crate::scheduler::Scheduler;
use crate::suite::SuiteObserver;
use anyhow::{Result, anyhow};
use std::future::Future;

#[derive(Debug)]
pub struct Runtime {
    tokio_runtime: tokio::runtime::Runtime,
}

impl Runtime {
    pub fn new() -> Result<Self> {
        let tokio_runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| anyhow!("Failed to create tokio runtime: {}", e))?;
        Ok(Self { tokio_runtime })
    }

    /// Block on a future using the tokio runtime
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        self.tokio_runtime.block_on(future)
    }

    /// Run the scheduler's whole chain to completion.
    pub fn run(&self, scheduler: &mut Scheduler, observer: &mut dyn SuiteObserver) -> RunReport {
        self.block_on(scheduler.run(observer))
    }
}
