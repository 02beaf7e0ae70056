//! Single-state store with coarse listeners.
//!
//! A mutation computes the next state and, if anything changed, notifies
//! every listener once with the new state. Listeners are not told which
//! fields changed and are not called on subscribe.

use reactbench_core::{EngineTraits, Field, Instance, Mutation, Reaction, ReactiveEngine, Snapshot, Subscription};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Default, Clone, Copy)]
pub struct StoreEngine;

impl ReactiveEngine for StoreEngine {
    fn name(&self) -> &str {
        "store"
    }

    fn description(&self) -> &str {
        "one state object, listeners notified per changing mutation"
    }

    fn traits(&self) -> EngineTraits {
        EngineTraits {
            runs_on_subscribe: false,
            batches: true,
        }
    }

    fn create(&self, seed: i64) -> Rc<dyn Instance> {
        Rc::new(StoreInstance::new(seed))
    }
}

struct Listener {
    callback: RefCell<Option<Reaction>>,
    live: Cell<bool>,
}

struct StoreState {
    state: Cell<Snapshot>,
    listeners: RefCell<Vec<Rc<Listener>>>,
}

impl StoreState {
    fn notify(&self) {
        // Listeners added or removed while notifying take effect next time.
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            if !listener.live.get() {
                continue;
            }
            let Some(mut callback) = listener.callback.borrow_mut().take() else {
                continue;
            };
            callback(&self.state.get());
            if listener.live.get() {
                *listener.callback.borrow_mut() = Some(callback);
            }
        }
    }
}

pub struct StoreInstance {
    state: Rc<StoreState>,
}

impl StoreInstance {
    pub fn new(seed: i64) -> Self {
        Self {
            state: Rc::new(StoreState {
                state: Cell::new(Snapshot::seeded(seed)),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }
}

impl Instance for StoreInstance {
    fn mutate(&self, mutation: Mutation) {
        let prev = self.state.state.get();
        let mut next = prev;
        mutation.apply(&mut next);
        if next == prev {
            return;
        }
        self.state.state.set(next);
        self.state.notify();
    }

    fn get(&self, field: Field) -> i64 {
        self.state.state.get().get(field)
    }

    fn subscribe(&self, reaction: Reaction) -> Subscription {
        let listener = Rc::new(Listener {
            callback: RefCell::new(Some(reaction)),
            live: Cell::new(true),
        });
        self.state.listeners.borrow_mut().push(listener.clone());

        let state: Weak<StoreState> = Rc::downgrade(&self.state);
        Subscription::new(move || {
            listener.live.set(false);
            let callback = listener.callback.borrow_mut().take();
            drop(callback);
            if let Some(state) = state.upgrade() {
                state.listeners.borrow_mut().retain(|l| !Rc::ptr_eq(l, &listener));
            }
        })
    }

    fn subscriber_count(&self) -> usize {
        self.state.listeners.borrow().len()
    }
}
