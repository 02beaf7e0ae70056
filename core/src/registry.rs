use crate::engine::ReactiveEngine;
use crate::error::BenchError;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Ordered set of candidate engines.
///
/// Registration order is preserved so suites measure candidates in a stable
/// order; names are unique.
#[derive(Debug, Default)]
pub struct CandidateRegistry {
    engines: Vec<Rc<dyn ReactiveEngine>>,
    by_name: FxHashMap<String, usize>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine. Fails if a candidate with the same name exists.
    pub fn register(&mut self, engine: Rc<dyn ReactiveEngine>) -> Result<(), BenchError> {
        let name = engine.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(BenchError::DuplicateCandidate(name));
        }
        self.by_name.insert(name, self.engines.len());
        self.engines.push(engine);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Rc<dyn ReactiveEngine>, BenchError> {
        self.by_name
            .get(name)
            .map(|idx| self.engines[*idx].clone())
            .ok_or_else(|| BenchError::UnknownCandidate(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    pub fn all(&self) -> &[Rc<dyn ReactiveEngine>] {
        &self.engines
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    /// Resolve a name filter. An empty filter selects every candidate in
    /// registration order; otherwise the filter order is kept.
    pub fn select(&self, names: &[String]) -> Result<Vec<Rc<dyn ReactiveEngine>>, BenchError> {
        let selected: Vec<_> = if names.is_empty() {
            self.engines.clone()
        } else {
            let mut picked: Vec<Rc<dyn ReactiveEngine>> = Vec::with_capacity(names.len());
            for name in names {
                let engine = self.get(name)?;
                if picked.iter().any(|e| e.name() == engine.name()) {
                    return Err(BenchError::DuplicateCandidate(name.clone()));
                }
                picked.push(engine);
            }
            picked
        };
        if selected.is_empty() {
            return Err(BenchError::NoCandidates);
        }
        Ok(selected)
    }
}
