//! Event subsystem — timed random events and the boosts they leave behind.
//!
//! At most one event is active. TAP events wait for TAP_EVENT or expire;
//! AUTO events apply on spawn and consume themselves. Boost entries carry
//! absolute expiry ticks and are pruned once expired.

use crate::{
    config::{BalanceConfig, EventDef, EventEffect, EventTrigger},
    economy::credit,
    event::SimEvent,
    rng::RollStream,
    state::{ActiveEvent, CapBoost, ProdBoost, SimStateV1},
    subsystem::{TickContext, TickStage},
    types::Tick,
};

pub struct EventSubsystem;

impl TickStage for EventSubsystem {
    fn name(&self) -> &'static str { "events" }

    fn run(&self, state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let tick = ctx.tick;

        if let Some(active) = state.events.active.as_ref() {
            if active.consumed || tick >= active.expires_at_tick {
                log::debug!("tick={tick} events: cleared {}", active.event_id);
                events.push(SimEvent::EventCleared {
                    tick,
                    event_id: active.event_id.clone(),
                    consumed: active.consumed,
                });
                state.events.active = None;
            }
        }

        let prod_before = state.events.prod_boosts.len();
        let cap_before = state.events.cap_boosts.len();
        state.events.prod_boosts.retain(|b| b.expires_at_tick > tick);
        state.events.cap_boosts.retain(|b| b.expires_at_tick > tick);
        let prod_dropped = prod_before - state.events.prod_boosts.len();
        let cap_dropped = cap_before - state.events.cap_boosts.len();
        if prod_dropped + cap_dropped > 0 {
            events.push(SimEvent::BoostsExpired {
                tick,
                prod_boosts: prod_dropped,
                cap_boosts: cap_dropped,
            });
        }

        let interval = ctx.balance.events.spawn_interval_ticks;
        if ctx.catalogs.events.is_empty()
            || interval == 0
            || !tick.is_multiple_of(interval)
            || state.events.active.is_some()
        {
            return events;
        }

        let mut rng = RollStream::EventSpawn.at_tick(state.seed, tick);
        if !rng.chance(ctx.balance.events.base_spawn_chance) {
            return events;
        }
        let Some(idx) = rng.weighted_index(ctx.catalogs.events.iter().map(|e| e.weight)) else {
            return events;
        };
        let def = &ctx.catalogs.events[idx];

        let auto = def.trigger == EventTrigger::Auto;
        state.events.active = Some(ActiveEvent {
            event_id:        def.id.clone(),
            spawned_at_tick: tick,
            expires_at_tick: tick + ctx.balance.seconds_to_ticks(def.duration_sec),
            consumed:        auto,
        });
        if auto {
            apply_effects(state, def, ctx.balance, tick);
        }
        log::debug!("tick={tick} events: spawned {} (auto={auto})", def.id);
        events.push(SimEvent::EventSpawned {
            tick,
            event_id: def.id.clone(),
            auto_applied: auto,
        });

        events
    }
}

/// Apply every effect of `def` at `tick`. Bursts are clamped credits;
/// boosts are appended with absolute expiry ticks.
pub fn apply_effects(state: &mut SimStateV1, def: &EventDef, balance: &BalanceConfig, tick: Tick) {
    for effect in &def.effects {
        match effect {
            EventEffect::ResourceBurst { resource, micro } => {
                credit(state, *resource, *micro);
            }
            EventEffect::ProdBoost { mult, duration_sec } => {
                state.events.prod_boosts.push(ProdBoost {
                    source:          def.id.clone(),
                    mult:            *mult,
                    expires_at_tick: tick + balance.seconds_to_ticks(*duration_sec),
                });
            }
            EventEffect::CapBoost { resource, micro, duration_sec } => {
                state.events.cap_boosts.push(CapBoost {
                    source:          def.id.clone(),
                    resource:        *resource,
                    micro:           *micro,
                    expires_at_tick: tick + balance.seconds_to_ticks(*duration_sec),
                });
            }
        }
    }
}
