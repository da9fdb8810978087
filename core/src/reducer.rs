//! The command reducer.
//!
//! RULES:
//!   - Every handler is total. It either rejects, returning a value equal
//!     to the input, or returns a fully-built new state.
//!   - A rejection is not an error. It is logged at trace level and the
//!     caller sees the unchanged state.
//!   - Handlers work on a private clone; a partially-updated state is never
//!     observable.

use crate::{
    command::PlayerCommand,
    config::{tier_unlock_id, BalanceConfig, Catalogs, EventTrigger},
    derived::{get_derived, DerivedMods},
    economy::{
        click_multiplier, clamp_to_caps, credit, credit_all, quote_purchase, recompute_caps,
        tier_upgrade_cost,
    },
    error::SimResult,
    event_subsystem::apply_effects,
    state::{create_fresh_state, ActiveContract, MachineStack, SimStateV1},
    types::{round_micro, ResourceKind, WreckId},
    wreck_subsystem::harvest,
};

pub const MAX_TIER: u8 = 3;

/// Why a command was turned away. Only ever logged.
type Rejection = &'static str;

type Outcome = Result<SimStateV1, Rejection>;

struct Reducer<'a> {
    state:    &'a SimStateV1,
    catalogs: &'a Catalogs,
    balance:  &'a BalanceConfig,
    derived:  DerivedMods,
}

/// Apply one player command to `state`.
pub fn apply_input(
    state: &SimStateV1,
    command: &PlayerCommand,
    catalogs: &Catalogs,
) -> SimResult<SimStateV1> {
    let balance = catalogs.balance()?;
    let reducer = Reducer {
        state,
        catalogs,
        balance,
        derived: get_derived(state, catalogs),
    };

    let outcome = match command {
        PlayerCommand::Tap { amount } => Ok(reducer.tap(*amount)),
        PlayerCommand::BuyMachine { code, qty } => reducer.buy_machine(code, *qty),
        PlayerCommand::ToggleMachineEnabled { code, enabled } => reducer.toggle_machine(code, *enabled),
        PlayerCommand::UpgradeMachineTier { code } => reducer.upgrade_tier(code),
        PlayerCommand::BuyUpgrade { id } => reducer.buy_upgrade(id),
        PlayerCommand::StartContract { id } => reducer.start_contract(id),
        PlayerCommand::ClaimContractReward => reducer.claim_contract(),
        PlayerCommand::TapEvent => reducer.tap_event(),
        PlayerCommand::TapWreck { id } => reducer.tap_wreck(*id),
        PlayerCommand::DismissMilestoneToast => reducer.dismiss_toast(),
        PlayerCommand::Reset => Ok(reducer.reset()),
        PlayerCommand::Unknown => Err("unknown command"),
    };

    Ok(match outcome {
        Ok(next) => next,
        Err(reason) => {
            log::trace!(
                "tick={} reducer: {} rejected: {reason}",
                state.tick,
                command.type_name()
            );
            state.clone()
        }
    })
}

impl Reducer<'_> {
    fn draft(&self) -> SimStateV1 {
        let mut next = self.state.clone();
        next.dirty = true;
        next
    }

    /// A fresh run on the same seed. Dirty so the host pushes it out.
    fn reset(&self) -> SimStateV1 {
        let mut next = create_fresh_state(self.state.seed, self.catalogs);
        next.dirty = true;
        next
    }

    fn tap(&self, amount: Option<u64>) -> SimStateV1 {
        let mut next = self.draft();
        let base = amount.unwrap_or(self.balance.tap_flux_micro);
        let mult = click_multiplier(self.state, self.catalogs, &self.derived);
        credit(&mut next, ResourceKind::Flux, round_micro(base as f64 * mult));
        next.stats.total_taps += 1;
        next
    }

    fn buy_machine(&self, code: &str, qty: u64) -> Outcome {
        let def = self.catalogs.machine(code).ok_or("unknown machine")?;
        if qty == 0 {
            return Err("zero quantity");
        }
        if self.state.stats.total_flux_earned < def.unlock_at_flux_micro {
            return Err("machine still locked");
        }
        let owned = self.state.owned_count(code);
        let quote = quote_purchase(def, owned, qty, &self.state.resources, &self.derived)
            .ok_or("cannot afford")?;

        let mut next = self.draft();
        next.resources = next.resources.saturating_sub(&quote.cost);
        match next.machine_mut(code) {
            Some(stack) => stack.count += quote.qty,
            None => {
                let mut stack = MachineStack::new(code);
                stack.count = quote.qty;
                next.machines.push(stack);
            }
        }
        if def.behavior.is_buffer() {
            next.caps = recompute_caps(&next, self.catalogs, &self.derived);
        }
        clamp_to_caps(&mut next);
        Ok(next)
    }

    fn toggle_machine(&self, code: &str, enabled: bool) -> Outcome {
        self.state.machine(code).ok_or("no such stack")?;
        let mut next = self.draft();
        if let Some(stack) = next.machine_mut(code) {
            stack.enabled = enabled;
        }
        Ok(next)
    }

    fn upgrade_tier(&self, code: &str) -> Outcome {
        let stack = self.state.machine(code).ok_or("no such stack")?;
        if stack.count == 0 {
            return Err("stack is empty");
        }
        if stack.tier >= MAX_TIER {
            return Err("already at max tier");
        }
        let next_tier = stack.tier + 1;
        if !self.state.has_upgrade(&tier_unlock_id(next_tier, code)) {
            return Err("tier not unlocked");
        }
        let def = self.catalogs.machine(code).ok_or("unknown machine")?;
        let cost = tier_upgrade_cost(self.catalogs, def, next_tier);
        if !self.state.resources.covers(&cost) {
            return Err("cannot afford");
        }

        let mut next = self.draft();
        next.resources = next.resources.saturating_sub(&cost);
        if let Some(stack) = next.machine_mut(code) {
            stack.tier = next_tier;
        }
        if def.behavior.is_buffer() {
            next.caps = recompute_caps(&next, self.catalogs, &self.derived);
        }
        Ok(next)
    }

    fn buy_upgrade(&self, id: &str) -> Outcome {
        if self.state.has_upgrade(id) {
            return Err("already purchased");
        }
        let def = self.catalogs.upgrade(id).ok_or("unknown upgrade")?;
        if self.state.stats.total_flux_earned < def.unlock_at_flux_micro {
            return Err("upgrade still locked");
        }
        if !def.prerequisites.iter().all(|p| self.state.has_upgrade(p)) {
            return Err("missing prerequisite");
        }
        if !self.state.resources.covers(&def.cost) {
            return Err("cannot afford");
        }

        let mut next = self.draft();
        next.resources = next.resources.saturating_sub(&def.cost);
        next.upgrades_purchased.push(def.id.clone());
        let fresh = get_derived(&next, self.catalogs);
        next.caps = recompute_caps(&next, self.catalogs, &fresh);
        Ok(next)
    }

    fn start_contract(&self, id: &str) -> Outcome {
        if self.state.contracts.active.is_some() {
            return Err("a contract is already running");
        }
        if !self.state.contracts.revealed.iter().any(|r| r == id) {
            return Err("contract not revealed");
        }
        if self.state.contracts.completed.iter().any(|c| c == id) {
            return Err("contract already completed");
        }
        let def = self.catalogs.contract(id).ok_or("unknown contract")?;

        let mut next = self.draft();
        next.contracts.revealed.retain(|r| r != id);
        next.contracts.active = Some(ActiveContract {
            id:                 def.id.clone(),
            started_at_tick:    self.state.tick,
            ends_at_tick:       self.state.tick + self.balance.seconds_to_ticks(def.duration_sec),
            resources_snapshot: self.state.resources,
            stats_snapshot:     self.state.stats,
            completed:          false,
        });
        Ok(next)
    }

    fn claim_contract(&self) -> Outcome {
        let active = self.state.contracts.active.as_ref().ok_or("no active contract")?;
        if !active.completed {
            return Err("contract not completed");
        }
        let rewards = self
            .catalogs
            .contract(&active.id)
            .map(|c| c.rewards)
            .unwrap_or_default();

        let mut next = self.draft();
        credit_all(&mut next, &rewards);
        next.contracts.revealed.retain(|r| r != &active.id);
        next.contracts.completed.push(active.id.clone());
        next.contracts.active = None;
        Ok(next)
    }

    fn tap_event(&self) -> Outcome {
        let active = self.state.events.active.as_ref().ok_or("no active event")?;
        if active.consumed {
            return Err("event already consumed");
        }
        if self.state.tick >= active.expires_at_tick {
            return Err("event expired");
        }
        let def = self.catalogs.event(&active.event_id).ok_or("unknown event")?;
        if def.trigger != EventTrigger::Tap {
            return Err("event is not tappable");
        }

        let mut next = self.draft();
        apply_effects(&mut next, def, self.balance, self.state.tick);
        if let Some(slot) = next.events.active.as_mut() {
            slot.consumed = true;
        }
        Ok(next)
    }

    fn tap_wreck(&self, id: WreckId) -> Outcome {
        let wreck = self.state.wrecks.wrecks.get(&id).ok_or("no such wreck")?;
        if wreck.depleted {
            return Err("wreck depleted");
        }
        let mult = click_multiplier(self.state, self.catalogs, &self.derived);
        let damage = round_micro(self.balance.wrecks.tap_damage_micro as f64 * mult);
        let yields = self
            .catalogs
            .wreck_archetype(&wreck.archetype_id)
            .map(|a| a.yield_per_tap.scaled(mult))
            .unwrap_or_default();

        let mut next = self.draft();
        harvest(&mut next, self.catalogs, id, damage, &yields).ok_or("wreck depleted")?;
        Ok(next)
    }

    fn dismiss_toast(&self) -> Outcome {
        if self.state.milestones.pending_toast.is_empty() {
            return Err("nothing to dismiss");
        }
        let mut next = self.draft();
        next.milestones.pending_toast.clear();
        Ok(next)
    }
}
