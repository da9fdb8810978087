//! Wreck subsystem — salvage wrecks on the outer ring.
//!
//! Wrecks spawn on a cadence at a random ring position and are worn down
//! either by TAP_WRECK or by the salvage drones stack. A wreck is depleted
//! once its hp or every remaining yield reaches zero; archetypes flagged
//! `despawn_on_depleted` leave the field at that point.

use crate::{
    config::{Catalogs, WreckArchetype},
    economy::credit,
    event::SimEvent,
    rng::RollStream,
    state::{RingPosition, SimStateV1, WreckState},
    subsystem::{TickContext, TickStage},
    types::{round_micro, Micro, ResourceKind, Resources, WreckId},
};
use std::f64::consts::TAU;

/// Machine code of the stack that auto-harvests wrecks.
pub const DRONE_CODE: &str = "DRONES_MAG";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarvestOutcome {
    pub damage_micro: Micro,
    pub yielded:      Resources,
    pub depleted:     bool,
    pub despawned:    bool,
}

/// Deal `damage` to wreck `id` and move up to `yields` (capped by what the
/// wreck still holds) into the player's wallet. Returns None when the wreck
/// does not exist or is already depleted.
pub fn harvest(
    state: &mut SimStateV1,
    catalogs: &Catalogs,
    id: WreckId,
    damage: Micro,
    yields: &Resources,
) -> Option<HarvestOutcome> {
    let wreck = state.wrecks.wrecks.get_mut(&id)?;
    if wreck.depleted {
        return None;
    }

    wreck.hp_micro = wreck.hp_micro.saturating_sub(damage);
    let mut taken = Resources::ZERO;
    for kind in ResourceKind::ALL {
        let remaining = wreck.yield_remaining.get_mut(kind);
        let amount = yields.get(kind).min(*remaining);
        *remaining -= amount;
        *taken.get_mut(kind) = amount;
    }
    wreck.refresh_depleted();
    let depleted = wreck.depleted;
    let despawn = depleted
        && catalogs
            .wreck_archetype(&wreck.archetype_id)
            .is_some_and(|a| a.despawn_on_depleted);

    for kind in ResourceKind::ALL {
        let amount = taken.get(kind);
        if amount > 0 {
            credit(state, kind, amount);
        }
    }
    if despawn {
        state.wrecks.wrecks.remove(&id);
    }

    Some(HarvestOutcome {
        damage_micro: damage,
        yielded:      taken,
        depleted,
        despawned:    despawn,
    })
}

pub struct WreckSubsystem;

impl TickStage for WreckSubsystem {
    fn name(&self) -> &'static str { "wrecks" }

    fn run(&self, state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let tick = ctx.tick;

        let stale: Vec<WreckId> = state
            .wrecks
            .wrecks
            .iter()
            .filter(|(_, w)| {
                w.depleted
                    && ctx
                        .catalogs
                        .wreck_archetype(&w.archetype_id)
                        .is_some_and(|a| a.despawn_on_depleted)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            state.wrecks.wrecks.remove(&id);
            events.push(SimEvent::WreckDespawned { tick, wreck_id: id });
        }

        events.extend(roll_spawn(state, ctx));
        events.extend(drone_harvest(state, ctx));
        events
    }
}

/// `max_active_wrecks` bounds the whole field. A full field makes room by
/// evicting its oldest depleted wreck; a field of live wrecks blocks the spawn.
fn roll_spawn(state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent> {
    let balance = &ctx.balance.wrecks;
    let interval = balance.spawn_interval_ticks;
    if ctx.catalogs.wrecks.is_empty() || interval == 0 || !ctx.tick.is_multiple_of(interval) {
        return vec![];
    }
    let live = state.wrecks.wrecks.values().filter(|w| !w.depleted).count();
    if live >= balance.max_active_wrecks {
        return vec![];
    }

    let mut rng = RollStream::WreckSpawn.at_tick(state.seed, ctx.tick);
    let chance = balance.base_spawn_chance + 0.5 * ctx.derived.reveal_chance_add;
    if !rng.chance(chance) {
        return vec![];
    }
    let Some(idx) = rng.weighted_index(ctx.catalogs.wrecks.iter().map(|w| w.weight)) else {
        return vec![];
    };
    let archetype: &WreckArchetype = &ctx.catalogs.wrecks[idx];

    let mut events = Vec::new();
    while state.wrecks.wrecks.len() >= balance.max_active_wrecks {
        let Some(oldest) = state
            .wrecks
            .wrecks
            .iter()
            .filter(|(_, w)| w.depleted)
            .map(|(id, _)| *id)
            .min()
        else {
            break;
        };
        state.wrecks.wrecks.remove(&oldest);
        log::debug!("tick={} wrecks: evicted depleted #{oldest}", ctx.tick);
        events.push(SimEvent::WreckDespawned { tick: ctx.tick, wreck_id: oldest });
    }

    let angle = rng.next_float() * TAU;
    let span = (balance.ring_outer_radius - balance.ring_inner_radius).max(0.0);
    let radius = balance.ring_inner_radius + rng.next_float() * span;

    let id = state.wrecks.next_id;
    state.wrecks.next_id += 1;
    let mut wreck = WreckState {
        archetype_id:    archetype.id.clone(),
        hp_micro:        archetype.hp_micro,
        max_hp_micro:    archetype.hp_micro,
        yield_remaining: archetype.total_yield,
        position:        RingPosition { angle, radius },
        spawned_at_tick: ctx.tick,
        depleted:        false,
    };
    wreck.refresh_depleted();
    state.wrecks.wrecks.insert(id, wreck);

    log::debug!("tick={} wrecks: spawned #{id} ({}) at r={radius:.1}", ctx.tick, archetype.id);
    events.push(SimEvent::WreckSpawned {
        tick: ctx.tick,
        wreck_id: id,
        archetype_id: archetype.id.clone(),
    });
    events
}

/// Salvage drones hit the nearest live wreck. Yield is apportioned by the
/// fraction of max hp the hit removed, not by the per-tap table.
fn drone_harvest(state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent> {
    let interval = ctx.balance.wrecks.drone_harvest_interval_ticks;
    if interval == 0 || !ctx.tick.is_multiple_of(interval) {
        return vec![];
    }
    let Some(stack) = state.machine(DRONE_CODE).filter(|s| s.is_active()) else {
        return vec![];
    };
    let tier_mult = ctx
        .catalogs
        .machine(DRONE_CODE)
        .map(|d| d.tier_mult(stack.tier))
        .unwrap_or(1.0);
    let damage = round_micro(
        ctx.balance.wrecks.tap_damage_micro as f64 * stack.count as f64 * tier_mult,
    );

    let Some((id, target)) = nearest_live_wreck(state) else {
        return vec![];
    };
    let dealt = damage.min(target.hp_micro);
    let fraction = if target.max_hp_micro == 0 {
        1.0
    } else {
        dealt as f64 / target.max_hp_micro as f64
    };
    let yields = ctx
        .catalogs
        .wreck_archetype(&target.archetype_id)
        .map(|a| a.total_yield.scaled(fraction))
        .unwrap_or(Resources::ZERO);

    let Some(outcome) = harvest(state, ctx.catalogs, id, damage, &yields) else {
        return vec![];
    };
    log::debug!(
        "tick={} wrecks: drones hit #{id} for {} (depleted={})",
        ctx.tick,
        outcome.damage_micro,
        outcome.depleted
    );
    let mut events = vec![SimEvent::WreckHarvested {
        tick: ctx.tick,
        wreck_id: id,
        damage_micro: outcome.damage_micro,
        yielded: outcome.yielded,
        depleted: outcome.depleted,
    }];
    if outcome.despawned {
        events.push(SimEvent::WreckDespawned { tick: ctx.tick, wreck_id: id });
    }
    events
}

/// Closest non-depleted wreck to the ring centre; ties go to the lower id.
fn nearest_live_wreck(state: &SimStateV1) -> Option<(WreckId, WreckState)> {
    state
        .wrecks
        .wrecks
        .iter()
        .filter(|(_, w)| !w.depleted)
        .min_by(|(ia, a), (ib, b)| {
            a.position
                .radius
                .total_cmp(&b.position.radius)
                .then(ia.cmp(ib))
        })
        .map(|(id, w)| (*id, w.clone()))
}
