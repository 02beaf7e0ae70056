//! Minimal in-crate engine and scenarios used by the unit tests.

use crate::bridge::Completion;
use crate::config::TimingConfig;
use crate::context::TrialContext;
use crate::engine::{EngineTraits, Field, Instance, Mutation, Reaction, ReactiveEngine, Snapshot, Subscription, Tracker};
use crate::scenario::{Scenario, ScenarioKind, Trial};
use anyhow::anyhow;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

const ALL_FIELDS: u8 = 0b111;

pub fn quick_timing() -> TimingConfig {
    TimingConfig::quick()
        .with_min_sample_time(Duration::from_micros(200))
        .with_max_time(Duration::from_millis(2))
        .with_samples(2, 4)
        .with_max_batch(256)
        .with_trial_timeout(Duration::from_millis(20))
}

/// Dependency-tracking engine with switchable subscribe/batching behaviour.
pub struct ProbeEngine {
    name: String,
    traits: EngineTraits,
    created: Cell<usize>,
}

impl ProbeEngine {
    /// Runs reactions on subscribe, no batching.
    pub fn eager(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            traits: EngineTraits {
                runs_on_subscribe: true,
                batches: false,
            },
            created: Cell::new(0),
        })
    }

    /// Waits for the first change before running reactions, batches writes.
    pub fn lazy(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            traits: EngineTraits {
                runs_on_subscribe: false,
                batches: true,
            },
            created: Cell::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.get()
    }
}

impl ReactiveEngine for ProbeEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn traits(&self) -> EngineTraits {
        self.traits
    }

    fn create(&self, seed: i64) -> Rc<dyn Instance> {
        self.created.set(self.created.get() + 1);
        Rc::new(ProbeInstance {
            state: Rc::new(ProbeState {
                values: Cell::new(Snapshot::seeded(seed)),
                slots: RefCell::new(Vec::new()),
                traits: self.traits,
            }),
        })
    }
}

struct Slot {
    callback: RefCell<Option<Reaction>>,
    deps: Cell<u8>,
    live: Cell<bool>,
}

struct ProbeState {
    values: Cell<Snapshot>,
    slots: RefCell<Vec<Rc<Slot>>>,
    traits: EngineTraits,
}

struct ProbeTracker<'a> {
    state: &'a ProbeState,
    deps: Cell<u8>,
}

impl Tracker for ProbeTracker<'_> {
    fn get(&self, field: Field) -> i64 {
        self.deps.set(self.deps.get() | field.bit());
        self.state.values.get().get(field)
    }
}

impl ProbeState {
    fn run(&self, slot: &Slot) {
        let Some(mut callback) = slot.callback.borrow_mut().take() else {
            return;
        };
        let tracker = ProbeTracker {
            state: self,
            deps: Cell::new(0),
        };
        callback(&tracker);
        if slot.live.get() {
            slot.deps.set(tracker.deps.get());
            *slot.callback.borrow_mut() = Some(callback);
        }
    }

    fn notify(&self, changed: u8) {
        let slots = self.slots.borrow().clone();
        for slot in slots {
            if slot.live.get() && slot.deps.get() & changed != 0 {
                self.run(&slot);
            }
        }
    }
}

pub struct ProbeInstance {
    state: Rc<ProbeState>,
}

impl Instance for ProbeInstance {
    fn mutate(&self, mutation: Mutation) {
        if self.state.traits.batches {
            let mut next = self.state.values.get();
            mutation.apply(&mut next);
            self.state.values.set(next);
            let changed = mutation.fields().iter().fold(0, |acc, f| acc | f.bit());
            self.state.notify(changed);
        } else {
            for field in mutation.fields() {
                let mut next = self.state.values.get();
                next.set(*field, next.get(*field) + 1);
                self.state.values.set(next);
                self.state.notify(field.bit());
            }
        }
    }

    fn get(&self, field: Field) -> i64 {
        self.state.values.get().get(field)
    }

    fn subscribe(&self, reaction: Reaction) -> Subscription {
        let slot = Rc::new(Slot {
            callback: RefCell::new(Some(reaction)),
            deps: Cell::new(if self.state.traits.runs_on_subscribe { 0 } else { ALL_FIELDS }),
            live: Cell::new(true),
        });
        self.state.slots.borrow_mut().push(slot.clone());
        if self.state.traits.runs_on_subscribe {
            self.state.run(&slot);
        }
        let state: Weak<ProbeState> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            slot.live.set(false);
            let callback = slot.callback.borrow_mut().take();
            drop(callback);
            if let Some(state) = state.upgrade() {
                state.slots.borrow_mut().retain(|s| !Rc::ptr_eq(s, &slot));
            }
        })
    }

    fn subscriber_count(&self) -> usize {
        self.state.slots.borrow().len()
    }
}

pub fn as_engine(engine: &Rc<ProbeEngine>) -> Rc<dyn ReactiveEngine> {
    engine.clone()
}

/// Sync scenario that mutates and reads; errors or panics for `bad`.
pub fn failing_scenario(key: &str, bad: &'static str, panics: bool) -> Scenario {
    Scenario::new(key, "fails for one candidate", ScenarioKind::Sync, move |engine, _counters| {
        let instance = engine.create(0);
        let is_bad = engine.name() == bad;
        Ok(Box::new(move |ctx: &mut TrialContext<'_>| {
            instance.mutate(Mutation::UpdateA);
            ctx.counters().record_read(instance.get(Field::A));
            if is_bad && ctx.iteration() >= 1 {
                if panics {
                    panic!("engine exploded");
                }
                return Err(anyhow!("mutation rejected"));
            }
            Ok(Trial::Done)
        }))
    })
}

/// Async scenario whose completion never settles.
pub fn never_settling_scenario(key: &str) -> Scenario {
    Scenario::new(key, "never settles", ScenarioKind::Async, |_engine, _counters| {
        Ok(Box::new(|_ctx: &mut TrialContext<'_>| {
            let (settle, completion) = Completion::channel();
            Ok(Trial::Pending(completion.keep_alive(settle)))
        }))
    })
}

/// Async scenario whose settling side is dropped immediately.
pub fn abandoning_scenario(key: &str) -> Scenario {
    Scenario::new(key, "abandons", ScenarioKind::Async, |_engine, _counters| {
        Ok(Box::new(|_ctx: &mut TrialContext<'_>| {
            let (_settle, completion) = Completion::channel();
            Ok(Trial::Pending(completion))
        }))
    })
}

/// Scenario declared with `kind` whose closure returns the opposite outcome.
pub fn mismatched_scenario(key: &str, kind: ScenarioKind) -> Scenario {
    Scenario::new(key, "wrong outcome", kind, move |_engine, _counters| {
        Ok(Box::new(move |_ctx: &mut TrialContext<'_>| match kind {
            ScenarioKind::Sync => Ok(Trial::Pending(Completion::ready())),
            ScenarioKind::Async => Ok(Trial::Done),
        }))
    })
}
