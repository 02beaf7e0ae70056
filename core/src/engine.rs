//! Uniform capability set every reactive engine exposes to the harness.
//!
//! The core never touches engine internals: it creates instances, applies
//! named mutations, reads fields and registers reactions through the traits
//! in this module. Any engine offering these operations can be benchmarked.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Observable fields carried by every benchmark instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    A,
    B,
    C,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::A, Field::B, Field::C];

    pub fn index(self) -> usize {
        match self {
            Field::A => 0,
            Field::B => 1,
            Field::C => 2,
        }
    }

    /// Single-bit mask, handy for engines that track dependencies in a byte.
    pub fn bit(self) -> u8 {
        1 << self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::A => "a",
            Field::B => "b",
            Field::C => "c",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named mutation operations. Each one increments its fields by 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutation {
    #[serde(rename = "updateA")]
    UpdateA,
    #[serde(rename = "updateB")]
    UpdateB,
    #[serde(rename = "updateC")]
    UpdateC,
    /// Increments both `a` and `b` in one operation.
    #[serde(rename = "update")]
    Update,
}

impl Mutation {
    pub const ALL: [Mutation; 4] = [Mutation::UpdateA, Mutation::UpdateB, Mutation::UpdateC, Mutation::Update];

    pub fn name(self) -> &'static str {
        match self {
            Mutation::UpdateA => "updateA",
            Mutation::UpdateB => "updateB",
            Mutation::UpdateC => "updateC",
            Mutation::Update => "update",
        }
    }

    /// Fields written by this mutation, in write order.
    pub fn fields(self) -> &'static [Field] {
        match self {
            Mutation::UpdateA => &[Field::A],
            Mutation::UpdateB => &[Field::B],
            Mutation::UpdateC => &[Field::C],
            Mutation::Update => &[Field::A, Field::B],
        }
    }

    pub fn apply(self, snapshot: &mut Snapshot) {
        for field in self.fields() {
            snapshot.set(*field, snapshot.get(*field) + 1);
        }
    }
}

impl FromStr for Mutation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mutation::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| anyhow!("unknown mutation '{}'", s))
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Plain copy of an instance's current field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub a: i64,
    pub b: i64,
    pub c: i64,
}

impl Snapshot {
    /// Initial state of a freshly created instance.
    pub fn seeded(seed: i64) -> Self {
        Self { a: seed, b: 0, c: 0 }
    }

    pub fn get(&self, field: Field) -> i64 {
        match field {
            Field::A => self.a,
            Field::B => self.b,
            Field::C => self.c,
        }
    }

    pub fn set(&mut self, field: Field, value: i64) {
        match field {
            Field::A => self.a = value,
            Field::B => self.b = value,
            Field::C => self.c = value,
        }
    }
}

/// Read access handed to a running reaction. Engines that track dependencies
/// record every field read through it.
pub trait Tracker {
    fn get(&self, field: Field) -> i64;
}

impl Tracker for Snapshot {
    fn get(&self, field: Field) -> i64 {
        Snapshot::get(self, field)
    }
}

/// Callback re-invoked whenever a field it read changes.
pub type Reaction = Box<dyn FnMut(&dyn Tracker)>;

/// Opaque state object created by an engine.
pub trait Instance {
    /// Apply a named mutation synchronously.
    fn mutate(&self, mutation: Mutation);

    /// Read a field outside of any reaction.
    fn get(&self, field: Field) -> i64;

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            a: self.get(Field::A),
            b: self.get(Field::B),
            c: self.get(Field::C),
        }
    }

    /// Register a reaction. Some engines run it once immediately, others only
    /// after the first relevant change.
    fn subscribe(&self, reaction: Reaction) -> Subscription;

    /// Number of live subscriptions on this instance.
    fn subscriber_count(&self) -> usize;
}

/// Behavioural differences the harness has to tolerate between engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineTraits {
    /// `subscribe` invokes the reaction once before returning.
    pub runs_on_subscribe: bool,
    /// Multi-field mutations notify each reaction at most once.
    pub batches: bool,
}

impl Default for EngineTraits {
    fn default() -> Self {
        Self {
            runs_on_subscribe: true,
            batches: false,
        }
    }
}

/// A reactive engine under comparison.
pub trait ReactiveEngine {
    /// Candidate name. Unique within a registry.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn traits(&self) -> EngineTraits {
        EngineTraits::default()
    }

    /// Create a fresh instance with `a = seed`, `b = 0`, `c = 0`.
    fn create(&self, seed: i64) -> Rc<dyn Instance>;
}

impl fmt::Debug for dyn ReactiveEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEngine").field("name", &self.name()).finish()
    }
}

/// Handle returned by [`Instance::subscribe`].
///
/// Disposal is idempotent and also happens on drop.
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription with nothing to release.
    pub fn detached() -> Self {
        Self { dispose: None }
    }

    pub fn dispose(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    pub fn is_active(&self) -> bool {
        self.dispose.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}
