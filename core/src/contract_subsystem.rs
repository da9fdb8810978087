//! Contract subsystem — expiry, completion and reveal rolls.
//!
//! Manages the contract lifecycle:
//!   hidden → revealed → active → completed → claimed (reducer)
//!                          └──→ expired (back to revealed)
//!
//! An id lives in exactly one of: revealed, the active slot, completed.
//!
//! Progress is measured against the snapshot taken when the contract
//! started, so nothing earned before START_CONTRACT counts.

use crate::{
    config::{ContractDef, ContractRequirement},
    event::SimEvent,
    rng::RollStream,
    state::{ActiveContract, SimStateV1},
    subsystem::{TickContext, TickStage},
};

pub struct ContractSubsystem;

impl TickStage for ContractSubsystem {
    fn name(&self) -> &'static str { "contracts" }

    fn run(&self, state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent> {
        let mut events = Vec::new();
        let tick = ctx.tick;

        if let Some(active) = state.contracts.active.clone() {
            if !active.completed {
                if tick > active.ends_at_tick {
                    log::debug!("tick={tick} contracts: {} expired", active.id);
                    state.contracts.active = None;
                    state.contracts.revealed.push(active.id.clone());
                    events.push(SimEvent::ContractExpired { tick, contract_id: active.id });
                } else if let Some(def) = ctx.catalogs.contract(&active.id) {
                    if requirements_met(state, &active, def) {
                        log::debug!("tick={tick} contracts: {} completed", active.id);
                        if let Some(slot) = state.contracts.active.as_mut() {
                            slot.completed = true;
                        }
                        events.push(SimEvent::ContractCompleted { tick, contract_id: active.id });
                    }
                }
            }
        }

        let interval = ctx.balance.contracts.reveal_interval_ticks.max(1);
        if tick.saturating_sub(state.contracts.last_reveal_roll_tick) >= interval {
            // The roll tick advances whether or not anything is revealed.
            state.contracts.last_reveal_roll_tick = tick;
            if let Some(id) = roll_reveal(state, ctx) {
                log::debug!("tick={tick} contracts: revealed {id}");
                state.contracts.revealed.push(id.clone());
                events.push(SimEvent::ContractRevealed { tick, contract_id: id });
            }
        }

        events
    }
}

fn roll_reveal(state: &SimStateV1, ctx: &TickContext<'_>) -> Option<String> {
    if ctx.catalogs.contracts.is_empty() {
        return None;
    }
    let mut rng = RollStream::ContractReveal.at_tick(state.seed, ctx.tick);
    let chance = ctx.balance.contracts.base_reveal_chance + ctx.derived.reveal_chance_add;
    if !rng.chance(chance) {
        return None;
    }
    if state.contracts.revealed.len() >= ctx.balance.contracts.max_revealed {
        return None;
    }
    let candidates: Vec<&ContractDef> = ctx
        .catalogs
        .contracts
        .iter()
        .filter(|c| !state.contracts.is_known(&c.id))
        .collect();
    if candidates.is_empty() {
        return None;
    }
    let pick = rng.next_index(candidates.len());
    Some(candidates[pick].id.clone())
}

/// True when every requirement of `def` holds for `active`.
pub fn requirements_met(state: &SimStateV1, active: &ActiveContract, def: &ContractDef) -> bool {
    def.requirements.iter().all(|req| match req {
        ContractRequirement::EarnResource { resource, target_micro } => {
            let now = state.resources.get(*resource);
            let then = active.resources_snapshot.get(*resource);
            now.saturating_sub(then) >= *target_micro
        }
        ContractRequirement::OwnMachine { code, target } => state.owned_count(code) >= *target,
        ContractRequirement::UpgradesPurchased { target } => {
            state.upgrades_purchased.len() >= *target
        }
    })
}
