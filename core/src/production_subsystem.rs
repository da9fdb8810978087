//! Production — per-tick output of every enabled machine stack, followed
//! by the cap clamp.
//!
//! Stacks run in ownership order, so a converter only sees what earlier
//! stacks (and previous ticks) left in the wallet.

use crate::{
    config::MachineBehavior,
    economy::{clamp_resources, scaled_rate},
    event::SimEvent,
    state::SimStateV1,
    subsystem::{TickContext, TickStage},
    types::{Micro, ResourceKind},
};

pub struct ProductionSubsystem;

impl TickStage for ProductionSubsystem {
    fn name(&self) -> &'static str { "production" }

    fn run(&self, state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent> {
        let flux_before = state.resources.flux;
        let mut flux_produced: Micro = 0;

        for stack in state.machines.iter().filter(|s| s.is_active()) {
            let Some(def) = ctx.catalogs.machine(&stack.code) else {
                continue;
            };
            let factor = ctx.dt
                * def.tier_mult(stack.tier)
                * stack.level as f64
                * ctx.global_prod_mult
                * ctx.derived.machine_mult(&stack.code)
                * stack.count as f64;

            match &def.behavior {
                MachineBehavior::Producer { resource, per_sec_micro } => {
                    let amount = scaled_rate(*per_sec_micro, factor);
                    add(&mut state.resources, *resource, amount);
                    if *resource == ResourceKind::Flux {
                        flux_produced = flux_produced.saturating_add(amount);
                    }
                }
                MachineBehavior::Converter { input, output, in_per_sec_micro, out_per_in } => {
                    let wanted = scaled_rate(*in_per_sec_micro, factor);
                    let consumed = wanted.min(state.resources.get(*input));
                    if consumed == 0 {
                        continue;
                    }
                    let produced = scaled_rate(
                        consumed,
                        *out_per_in * ctx.derived.converter_mult(&stack.code),
                    );
                    *state.resources.get_mut(*input) -= consumed;
                    add(&mut state.resources, *output, produced);
                    if *output == ResourceKind::Flux {
                        flux_produced = flux_produced.saturating_add(produced);
                    }
                }
                MachineBehavior::Contract { signal_per_sec_micro } => {
                    let amount = scaled_rate(*signal_per_sec_micro, factor);
                    add(&mut state.resources, ResourceKind::Signal, amount);
                }
                MachineBehavior::Cosmic { per_sec_micro } => {
                    let amount = scaled_rate(*per_sec_micro, ctx.dt * stack.count as f64);
                    for kind in ResourceKind::ALL {
                        add(&mut state.resources, kind, amount);
                    }
                    flux_produced = flux_produced.saturating_add(amount);
                }
                MachineBehavior::Buffer { .. }
                | MachineBehavior::Booster { .. }
                | MachineBehavior::Discovery => {}
            }
        }

        let (clamped, overflow) = clamp_resources(&state.resources, &ctx.effective_caps);
        let flux_lost = state.resources.flux - clamped.flux;
        state.resources = clamped;
        state.stats.overflow_lost = state.stats.overflow_lost.saturating_add(overflow);

        // Lifetime flux counts what was produced and kept, never what a
        // converter ate or the cap discarded.
        let kept = flux_produced.saturating_sub(flux_lost);
        state.stats.total_flux_earned = state.stats.total_flux_earned.saturating_add(kept);

        log::trace!(
            "tick={} production: flux {} -> {} (overflow {overflow})",
            ctx.tick,
            flux_before,
            state.resources.flux
        );

        if overflow > 0 {
            vec![SimEvent::ResourcesOverflowed { tick: ctx.tick, lost_micro: overflow }]
        } else {
            vec![]
        }
    }
}

fn add(resources: &mut crate::types::Resources, kind: ResourceKind, amount: Micro) {
    let slot = resources.get_mut(kind);
    *slot = slot.saturating_add(amount);
}
