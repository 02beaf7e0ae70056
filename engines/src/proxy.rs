//! Effect-map reactivity.
//!
//! Reads go through a tracking getter that links the currently active effect
//! to the field; writes trigger every effect linked to that field right away,
//! one field at a time. Effects clean up their links before each run and
//! collect them again while running.

use reactbench_core::{EngineTraits, Field, Instance, Mutation, Reaction, ReactiveEngine, Snapshot, Subscription, Tracker};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::trace;

#[derive(Debug, Default, Clone, Copy)]
pub struct ProxyEngine;

impl ReactiveEngine for ProxyEngine {
    fn name(&self) -> &str {
        "proxy"
    }

    fn description(&self) -> &str {
        "effect map per field, unbatched triggers"
    }

    fn traits(&self) -> EngineTraits {
        EngineTraits {
            runs_on_subscribe: true,
            batches: false,
        }
    }

    fn create(&self, seed: i64) -> Rc<dyn Instance> {
        Rc::new(ProxyInstance::new(seed))
    }
}

struct Effect {
    callback: RefCell<Option<Reaction>>,
    deps: RefCell<Vec<Field>>,
    active: Cell<bool>,
    running: Cell<bool>,
}

struct ProxyState {
    target: Cell<Snapshot>,
    dep_map: RefCell<FxHashMap<Field, Vec<Rc<Effect>>>>,
    active_effect: RefCell<Option<Rc<Effect>>>,
    effects: RefCell<Vec<Rc<Effect>>>,
}

struct ProxyTracker<'a> {
    state: &'a ProxyState,
}

impl Tracker for ProxyTracker<'_> {
    fn get(&self, field: Field) -> i64 {
        self.state.read(field)
    }
}

impl ProxyState {
    fn read(&self, field: Field) -> i64 {
        self.track(field);
        self.target.get().get(field)
    }

    fn track(&self, field: Field) {
        let active = self.active_effect.borrow();
        let Some(effect) = active.as_ref() else {
            return;
        };
        let mut dep_map = self.dep_map.borrow_mut();
        let dep = dep_map.entry(field).or_default();
        if !dep.iter().any(|e| Rc::ptr_eq(e, effect)) {
            dep.push(effect.clone());
            effect.deps.borrow_mut().push(field);
        }
    }

    fn trigger(&self, field: Field) {
        let effects = match self.dep_map.borrow().get(&field) {
            Some(dep) => dep.clone(),
            None => return,
        };
        for effect in effects {
            if effect.running.get() {
                trace!(%field, "skipping re-entrant effect");
                continue;
            }
            self.run(&effect);
        }
    }

    fn cleanup(&self, effect: &Rc<Effect>) {
        let deps = std::mem::take(&mut *effect.deps.borrow_mut());
        let mut dep_map = self.dep_map.borrow_mut();
        for field in deps {
            if let Some(dep) = dep_map.get_mut(&field) {
                dep.retain(|e| !Rc::ptr_eq(e, effect));
            }
        }
    }

    fn run(&self, effect: &Rc<Effect>) {
        if !effect.active.get() {
            return;
        }
        let Some(mut callback) = effect.callback.borrow_mut().take() else {
            return;
        };
        self.cleanup(effect);
        let parent = self.active_effect.replace(Some(effect.clone()));
        effect.running.set(true);
        callback(&ProxyTracker { state: self });
        effect.running.set(false);
        *self.active_effect.borrow_mut() = parent;
        if effect.active.get() {
            *effect.callback.borrow_mut() = Some(callback);
        }
    }

    fn stop(&self, effect: &Rc<Effect>) {
        effect.active.set(false);
        self.cleanup(effect);
        self.effects.borrow_mut().retain(|e| !Rc::ptr_eq(e, effect));
        let callback = effect.callback.borrow_mut().take();
        drop(callback);
    }
}

pub struct ProxyInstance {
    state: Rc<ProxyState>,
}

impl ProxyInstance {
    pub fn new(seed: i64) -> Self {
        Self {
            state: Rc::new(ProxyState {
                target: Cell::new(Snapshot::seeded(seed)),
                dep_map: RefCell::new(FxHashMap::default()),
                active_effect: RefCell::new(None),
                effects: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl Instance for ProxyInstance {
    fn mutate(&self, mutation: Mutation) {
        for field in mutation.fields() {
            let mut target = self.state.target.get();
            target.set(*field, target.get(*field) + 1);
            self.state.target.set(target);
            self.state.trigger(*field);
        }
    }

    fn get(&self, field: Field) -> i64 {
        self.state.read(field)
    }

    fn subscribe(&self, reaction: Reaction) -> Subscription {
        let effect = Rc::new(Effect {
            callback: RefCell::new(Some(reaction)),
            deps: RefCell::new(Vec::new()),
            active: Cell::new(true),
            running: Cell::new(false),
        });
        self.state.effects.borrow_mut().push(effect.clone());
        self.state.run(&effect);

        let state: Weak<ProxyState> = Rc::downgrade(&self.state);
        Subscription::new(move || match state.upgrade() {
            Some(state) => state.stop(&effect),
            None => effect.active.set(false),
        })
    }

    fn subscriber_count(&self) -> usize {
        self.state.effects.borrow().len()
    }
}
