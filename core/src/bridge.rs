//! Async bridge: turns "wait until an observed value reaches a target" into a
//! completion the suite can await.

use crate::engine::{Reaction, Subscription, Tracker};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::warn;

/// The settling side was dropped before it settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned;

impl fmt::Display for Abandoned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "completion dropped without settling")
    }
}

impl std::error::Error for Abandoned {}

/// Deferred signal an async trial returns to tell the suite it finished.
///
/// Resolves to `Ok(())` once settled, or `Err(Abandoned)` if the settling
/// side went away first. Values attached with [`Completion::keep_alive`] are
/// released together with the completion.
pub struct Completion {
    rx: oneshot::Receiver<()>,
    held: Vec<Box<dyn Any>>,
}

impl Completion {
    pub fn channel() -> (Settle, Completion) {
        let (tx, rx) = oneshot::channel();
        let settle = Settle {
            tx: Cell::new(Some(tx)),
            attempts: Cell::new(0),
        };
        (settle, Completion { rx, held: Vec::new() })
    }

    /// A completion that is already settled.
    pub fn ready() -> Completion {
        let (settle, completion) = Completion::channel();
        settle.settle();
        completion
    }

    /// Keep `value` alive until the completion is dropped.
    pub fn keep_alive<T: Any>(mut self, value: T) -> Self {
        self.held.push(Box::new(value));
        self
    }
}

impl Future for Completion {
    type Output = Result<(), Abandoned>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll(cx).map(|res| res.map_err(|_| Abandoned))
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").field("held", &self.held.len()).finish()
    }
}

/// Settling side of a [`Completion`]. Only the first call has an effect.
pub struct Settle {
    tx: Cell<Option<oneshot::Sender<()>>>,
    attempts: Cell<u32>,
}

impl Settle {
    /// Settle the completion. Returns `false` (and logs) on repeated calls.
    pub fn settle(&self) -> bool {
        self.attempts.set(self.attempts.get() + 1);
        match self.tx.take() {
            Some(tx) => {
                // A dropped receiver means the suite gave up on this trial.
                let _ = tx.send(());
                true
            }
            None => {
                warn!(attempts = self.attempts.get(), "completion settled more than once");
                false
            }
        }
    }

    /// Number of times `settle` was called.
    pub fn attempts(&self) -> u32 {
        self.attempts.get()
    }
}

struct BridgeState {
    subscription: RefCell<Option<Subscription>>,
    satisfied: Cell<bool>,
    settle: Settle,
}

impl BridgeState {
    fn finish(&self, mut subscription: Subscription) {
        subscription.dispose();
        self.settle.settle();
    }
}

/// Disposes a still-open subscription when the completion is dropped, which
/// breaks the reaction -> state -> subscription cycle of an unsettled wait.
struct DisposeOnDrop(Rc<BridgeState>);

impl Drop for DisposeOnDrop {
    fn drop(&mut self) {
        let subscription = self.0.subscription.borrow_mut().take();
        if let Some(mut subscription) = subscription {
            subscription.dispose();
        }
    }
}

/// Subscribe through `subscribe`, evaluate `predicate` on every value produced
/// by `observe`, and settle the returned completion the first time it holds.
///
/// The subscription is disposed before the completion settles, so later
/// recomputations can never settle it again. The subscription is established
/// before this function returns: a mutation issued right after the call is
/// always observed.
pub fn await_condition<S, O, V, P>(subscribe: S, mut observe: O, mut predicate: P) -> Completion
where
    S: FnOnce(Reaction) -> Subscription,
    O: FnMut(&dyn Tracker) -> V + 'static,
    P: FnMut(&V) -> bool + 'static,
{
    let (settle, completion) = Completion::channel();
    let state = Rc::new(BridgeState {
        subscription: RefCell::new(None),
        satisfied: Cell::new(false),
        settle,
    });

    let reaction_state = state.clone();
    let reaction: Reaction = Box::new(move |tracker| {
        if reaction_state.satisfied.get() {
            return;
        }
        let value = observe(tracker);
        if !predicate(&value) {
            return;
        }
        reaction_state.satisfied.set(true);
        // Still inside `subscribe` when the slot is empty; the caller below
        // finishes the job once the handle exists.
        let subscription = reaction_state.subscription.borrow_mut().take();
        if let Some(subscription) = subscription {
            reaction_state.finish(subscription);
        }
    });

    let subscription = subscribe(reaction);
    if state.satisfied.get() {
        state.finish(subscription);
    } else {
        *state.subscription.borrow_mut() = Some(subscription);
    }
    completion.keep_alive(DisposeOnDrop(state))
}
