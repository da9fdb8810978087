//! The tick stepper.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Derived modifiers and the combined global production multiplier
//!   2. Effective caps (stored caps + running cap boosts)
//!   3. Production        (per enabled machine stack)
//!   4. Cap clamp         (excess to overflow_lost)
//!   5. Contracts         (expiry, completion, reveal roll)
//!   6. Events            (expiry, boost pruning, spawn roll)
//!   7. Milestones        (first-true rewards)
//!   8. Wrecks            (despawn, spawn roll, drone harvest)
//!
//! RULES:
//!   - The input state is never mutated; stages work on one clone.
//!   - Stages see the tick being produced (`input.tick + 1`).
//!   - All randomness flows through per-tick roll streams.

use crate::{
    config::Catalogs,
    contract_subsystem::ContractSubsystem,
    derived::get_derived,
    economy::booster_prod_multiplier,
    error::SimResult,
    event::SimEvent,
    event_subsystem::EventSubsystem,
    milestone_subsystem::MilestoneSubsystem,
    production_subsystem::ProductionSubsystem,
    state::SimStateV1,
    subsystem::{TickContext, TickStage},
    wreck_subsystem::WreckSubsystem,
};

static STAGES: [&dyn TickStage; 5] = [
    &ProductionSubsystem,
    &ContractSubsystem,
    &EventSubsystem,
    &MilestoneSubsystem,
    &WreckSubsystem,
];

/// Advance `state` by one tick.
pub fn step_tick(state: &SimStateV1, catalogs: &Catalogs) -> SimResult<SimStateV1> {
    step_tick_with_events(state, catalogs).map(|(next, _)| next)
}

/// Advance `state` by one tick, also returning the tick's diagnostic events.
pub fn step_tick_with_events(
    state: &SimStateV1,
    catalogs: &Catalogs,
) -> SimResult<(SimStateV1, Vec<SimEvent>)> {
    let mut next = state.clone();
    next.tick += 1;

    // Nothing registered at all: the clock still runs.
    if catalogs.is_empty() {
        return Ok((next, vec![]));
    }
    let balance = catalogs.balance()?;

    let derived = get_derived(state, catalogs);
    let global_prod_mult = booster_prod_multiplier(state, catalogs)
        * derived.global_prod_mult
        * next.events.prod_mult_at(next.tick);

    let ctx = TickContext {
        catalogs,
        balance,
        derived: &derived,
        tick: next.tick,
        dt: balance.dt(),
        global_prod_mult,
        effective_caps: next.effective_caps(),
    };

    let mut events = Vec::new();
    for stage in STAGES.iter() {
        let emitted = stage.run(&mut next, &ctx);
        if !emitted.is_empty() {
            log::trace!("tick={} {}: {} event(s)", ctx.tick, stage.name(), emitted.len());
        }
        events.extend(emitted);
    }

    next.dirty = state.dirty || next.resources != state.resources;
    Ok((next, events))
}
