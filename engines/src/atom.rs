//! Observable atoms with automatic dependency tracking.
//!
//! Every field is an atom that knows which derivations observe it. A reaction
//! is re-tracked on each run, so it only ever depends on the fields it read
//! last time. Mutations run as actions: changed atoms queue their observers,
//! and the queue is flushed once when the outermost action ends.

use reactbench_core::{EngineTraits, Field, Instance, Mutation, Reaction, ReactiveEngine, Subscription, Tracker};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::trace;

#[derive(Debug, Default, Clone, Copy)]
pub struct AtomEngine;

impl ReactiveEngine for AtomEngine {
    fn name(&self) -> &str {
        "atom"
    }

    fn description(&self) -> &str {
        "per-field atoms, batched actions, reactions run on subscribe"
    }

    fn traits(&self) -> EngineTraits {
        EngineTraits {
            runs_on_subscribe: true,
            batches: true,
        }
    }

    fn create(&self, seed: i64) -> Rc<dyn Instance> {
        Rc::new(AtomInstance::new(seed))
    }
}

struct Derivation {
    id: u64,
    callback: RefCell<Option<Reaction>>,
    /// Bit set of fields read during the last run.
    observing: Cell<u8>,
    queued: Cell<bool>,
    disposed: Cell<bool>,
}

struct Atom {
    value: Cell<i64>,
    observers: RefCell<Vec<Rc<Derivation>>>,
}

impl Atom {
    fn new(value: i64) -> Self {
        Self {
            value: Cell::new(value),
            observers: RefCell::new(Vec::new()),
        }
    }

    fn remove_observer(&self, derivation: &Rc<Derivation>) {
        self.observers.borrow_mut().retain(|d| !Rc::ptr_eq(d, derivation));
    }
}

struct AtomState {
    atoms: [Atom; 3],
    derivations: RefCell<FxHashMap<u64, Rc<Derivation>>>,
    next_id: Cell<u64>,
    batch_depth: Cell<u32>,
    flushing: Cell<bool>,
    pending: RefCell<VecDeque<Rc<Derivation>>>,
}

struct AtomTracker<'a> {
    state: &'a AtomState,
    reads: Cell<u8>,
}

impl Tracker for AtomTracker<'_> {
    fn get(&self, field: Field) -> i64 {
        self.reads.set(self.reads.get() | field.bit());
        self.state.atom(field).value.get()
    }
}

impl AtomState {
    fn atom(&self, field: Field) -> &Atom {
        &self.atoms[field.index()]
    }

    fn start_batch(&self) {
        self.batch_depth.set(self.batch_depth.get() + 1);
    }

    fn end_batch(&self) {
        let depth = self.batch_depth.get() - 1;
        self.batch_depth.set(depth);
        if depth == 0 && !self.flushing.get() {
            self.flush();
        }
    }

    fn report_changed(&self, field: Field) {
        for derivation in self.atom(field).observers.borrow().iter() {
            if !derivation.queued.get() {
                derivation.queued.set(true);
                self.pending.borrow_mut().push_back(derivation.clone());
            }
        }
    }

    /// Run queued reactions until the queue is empty. Reactions that mutate
    /// state queue more work onto the same loop instead of recursing.
    fn flush(&self) {
        self.flushing.set(true);
        loop {
            let Some(derivation) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            derivation.queued.set(false);
            if !derivation.disposed.get() {
                trace!(id = derivation.id, "running reaction");
                self.track(&derivation);
            }
        }
        self.flushing.set(false);
    }

    fn track(&self, derivation: &Rc<Derivation>) {
        let Some(mut callback) = derivation.callback.borrow_mut().take() else {
            return;
        };
        let tracker = AtomTracker {
            state: self,
            reads: Cell::new(0),
        };
        self.start_batch();
        callback(&tracker);
        if !derivation.disposed.get() {
            self.retrack(derivation, tracker.reads.get());
            *derivation.callback.borrow_mut() = Some(callback);
        }
        self.end_batch();
    }

    fn retrack(&self, derivation: &Rc<Derivation>, reads: u8) {
        let previous = derivation.observing.get();
        for field in Field::ALL {
            let bit = field.bit();
            match (previous & bit != 0, reads & bit != 0) {
                (true, false) => self.atom(field).remove_observer(derivation),
                (false, true) => self.atom(field).observers.borrow_mut().push(derivation.clone()),
                _ => {}
            }
        }
        derivation.observing.set(reads);
    }

    fn dispose(&self, derivation: &Rc<Derivation>) {
        derivation.disposed.set(true);
        let observing = derivation.observing.replace(0);
        for field in Field::ALL {
            if observing & field.bit() != 0 {
                self.atom(field).remove_observer(derivation);
            }
        }
        self.derivations.borrow_mut().remove(&derivation.id);
        let callback = derivation.callback.borrow_mut().take();
        drop(callback);
    }
}

pub struct AtomInstance {
    state: Rc<AtomState>,
}

impl AtomInstance {
    pub fn new(seed: i64) -> Self {
        Self {
            state: Rc::new(AtomState {
                atoms: [Atom::new(seed), Atom::new(0), Atom::new(0)],
                derivations: RefCell::new(FxHashMap::default()),
                next_id: Cell::new(0),
                batch_depth: Cell::new(0),
                flushing: Cell::new(false),
                pending: RefCell::new(VecDeque::new()),
            }),
        }
    }
}

impl Instance for AtomInstance {
    fn mutate(&self, mutation: Mutation) {
        let state = &self.state;
        state.start_batch();
        for field in mutation.fields() {
            let atom = state.atom(*field);
            atom.value.set(atom.value.get() + 1);
            state.report_changed(*field);
        }
        state.end_batch();
    }

    fn get(&self, field: Field) -> i64 {
        self.state.atom(field).value.get()
    }

    fn subscribe(&self, reaction: Reaction) -> Subscription {
        let id = self.state.next_id.get();
        self.state.next_id.set(id + 1);
        let derivation = Rc::new(Derivation {
            id,
            callback: RefCell::new(Some(reaction)),
            observing: Cell::new(0),
            queued: Cell::new(false),
            disposed: Cell::new(false),
        });
        self.state.derivations.borrow_mut().insert(id, derivation.clone());
        self.state.track(&derivation);

        let state: Weak<AtomState> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.dispose(&derivation);
            } else {
                derivation.disposed.set(true);
            }
        })
    }

    fn subscriber_count(&self) -> usize {
        self.state.derivations.borrow().len()
    }
}
