//! Reactive engines compared by the harness.
//!
//! Each engine implements [`ReactiveEngine`] on its own terms:
//!
//! - [`atom`]: per-field observables, batched actions, reactions run on subscribe.
//! - [`proxy`]: effect map keyed by field, unbatched triggers.
//! - [`store`]: one coarse listener list, notified once per changing mutation.

pub mod atom;
pub mod proxy;
pub mod store;

#[cfg(test)]
mod atom_test;
#[cfg(test)]
mod store_test;

use reactbench_core::{BenchError, CandidateRegistry, ReactiveEngine};
use std::rc::Rc;

/// Every built-in engine, in the order suites measure them.
pub fn engines() -> Vec<Rc<dyn ReactiveEngine>> {
    vec![
        Rc::new(atom::AtomEngine) as Rc<dyn ReactiveEngine>,
        Rc::new(proxy::ProxyEngine),
        Rc::new(store::StoreEngine),
    ]
}

/// Register all built-in engines with the given registry
pub fn register_engines(registry: &mut CandidateRegistry) -> Result<(), BenchError> {
    for engine in engines() {
        registry.register(engine)?;
    }
    Ok(())
}

/// A registry holding every built-in engine.
pub fn default_registry() -> Result<CandidateRegistry, BenchError> {
    let mut registry = CandidateRegistry::new();
    register_engines(&mut registry)?;
    Ok(registry)
}
