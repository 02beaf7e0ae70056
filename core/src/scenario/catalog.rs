use super::{Scenario, ScenarioKind, Trial, TrialFn};
use crate::bridge;
use crate::context::{CandidateCounters, TrialContext};
use crate::engine::{Field, Mutation, ReactiveEngine, Tracker};
use crate::error::BenchError;
use anyhow::Result;
use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

type CatalogBind = fn(&Rc<dyn ReactiveEngine>, &Rc<CandidateCounters>) -> Result<TrialFn>;

struct CatalogEntry {
    key: &'static str,
    title: &'static str,
    kind: ScenarioKind,
    bind: CatalogBind,
}

static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        key: "create",
        title: "create observable object",
        kind: ScenarioKind::Sync,
        bind: bind_create,
    },
    CatalogEntry {
        key: "update_read_unobserved",
        title: "update & read without observe",
        kind: ScenarioKind::Sync,
        bind: bind_update_read_unobserved,
    },
    CatalogEntry {
        key: "update_with_reaction",
        title: "update & run reaction",
        kind: ScenarioKind::Sync,
        bind: bind_update_with_reaction,
    },
    CatalogEntry {
        key: "update_two_fields",
        title: "update 2 props & run reaction",
        kind: ScenarioKind::Sync,
        bind: bind_update_two_fields,
    },
    CatalogEntry {
        key: "update_unobserved_no_read",
        title: "update unobserved without read",
        kind: ScenarioKind::Sync,
        bind: bind_update_unobserved_no_read,
    },
    CatalogEntry {
        key: "async_create_update_observe",
        title: "create, update & observe 1 field",
        kind: ScenarioKind::Async,
        bind: bind_async_create_update_observe,
    },
];

/// The fixed workload catalog, in run order.
pub fn catalog() -> Vec<Scenario> {
    CATALOG
        .iter()
        .map(|entry| Scenario::new(entry.key, entry.title, entry.kind, entry.bind))
        .collect()
}

pub fn find(key: &str) -> Result<Scenario, BenchError> {
    CATALOG
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| Scenario::new(entry.key, entry.title, entry.kind, entry.bind))
        .ok_or_else(|| BenchError::UnknownScenario(key.to_string()))
}

fn bind_create(engine: &Rc<dyn ReactiveEngine>, _counters: &Rc<CandidateCounters>) -> Result<TrialFn> {
    let engine = engine.clone();
    Ok(Box::new(move |ctx: &mut TrialContext<'_>| {
        let seed = ctx.counters().next_create();
        black_box(engine.create(seed));
        Ok(Trial::Done)
    }))
}

fn bind_update_read_unobserved(engine: &Rc<dyn ReactiveEngine>, _counters: &Rc<CandidateCounters>) -> Result<TrialFn> {
    let instance = engine.create(0);
    Ok(Box::new(move |ctx: &mut TrialContext<'_>| {
        instance.mutate(Mutation::UpdateA);
        ctx.counters().record_read(instance.get(Field::A));
        Ok(Trial::Done)
    }))
}

fn bind_update_with_reaction(engine: &Rc<dyn ReactiveEngine>, counters: &Rc<CandidateCounters>) -> Result<TrialFn> {
    let instance = engine.create(0);
    let observed = counters.clone();
    let subscription = instance.subscribe(Box::new(move |t: &dyn Tracker| observed.record_reaction(t.get(Field::B))));
    counters.clear_reactions();
    Ok(Box::new(move |_ctx: &mut TrialContext<'_>| {
        let _held = &subscription;
        instance.mutate(Mutation::UpdateB);
        Ok(Trial::Done)
    }))
}

fn bind_update_two_fields(engine: &Rc<dyn ReactiveEngine>, counters: &Rc<CandidateCounters>) -> Result<TrialFn> {
    let instance = engine.create(0);
    let observed = counters.clone();
    let subscription =
        instance.subscribe(Box::new(move |t: &dyn Tracker| observed.record_reaction(t.get(Field::A) + t.get(Field::B))));
    counters.clear_reactions();
    Ok(Box::new(move |_ctx: &mut TrialContext<'_>| {
        let _held = &subscription;
        instance.mutate(Mutation::Update);
        Ok(Trial::Done)
    }))
}

fn bind_update_unobserved_no_read(
    engine: &Rc<dyn ReactiveEngine>,
    _counters: &Rc<CandidateCounters>,
) -> Result<TrialFn> {
    let instance = engine.create(0);
    Ok(Box::new(move |_ctx: &mut TrialContext<'_>| {
        instance.mutate(Mutation::UpdateC);
        Ok(Trial::Done)
    }))
}

fn bind_async_create_update_observe(
    engine: &Rc<dyn ReactiveEngine>,
    counters: &Rc<CandidateCounters>,
) -> Result<TrialFn> {
    let engine = engine.clone();
    let counters = counters.clone();
    Ok(Box::new(move |ctx: &mut TrialContext<'_>| {
        let seed = ctx.counters().next_create();
        let target = seed + 1;
        let instance = engine.create(seed);
        let observed = counters.clone();
        // Runs made inside `subscribe` are not reactions to an update.
        let armed = Rc::new(Cell::new(false));
        let armed_in_reaction = armed.clone();
        let completion = bridge::await_condition(
            |reaction| instance.subscribe(reaction),
            move |t: &dyn Tracker| {
                let a = t.get(Field::A);
                if armed_in_reaction.get() {
                    observed.record_reaction(a);
                }
                a
            },
            move |a| *a == target,
        );
        armed.set(true);
        instance.mutate(Mutation::UpdateA);
        Ok(Trial::Pending(completion.keep_alive(instance)))
    }))
}
