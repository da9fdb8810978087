//! The simulation state aggregate.
//!
//! RULE: `SimStateV1` is a value. The reducer and the stepper take it by
//! reference and hand back a new one; nothing mutates a state in place
//! once it has been published to the host. This is what makes snapshots,
//! replay and deterministic tests cheap.

use crate::{
    config::Catalogs,
    types::{Micro, ResourceKind, Resources, Tick, WreckId},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATE_VERSION: u32 = 1;

/// All owned copies of one machine code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineStack {
    pub code:    String,
    pub count:   u64,
    /// 1..=3, never decreases.
    pub tier:    u8,
    pub level:   u32,
    pub enabled: bool,
}

impl MachineStack {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code:    code.into(),
            count:   0,
            tier:    1,
            level:   1,
            enabled: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && self.count > 0
    }
}

/// Polar position on the salvage ring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RingPosition {
    pub angle:  f64,
    pub radius: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WreckState {
    pub archetype_id:    String,
    pub hp_micro:        Micro,
    pub max_hp_micro:    Micro,
    pub yield_remaining: Resources,
    pub position:        RingPosition,
    pub spawned_at_tick: Tick,
    pub depleted:        bool,
}

impl WreckState {
    /// Recompute the depletion flag: no hp left, or nothing left to yield.
    pub fn refresh_depleted(&mut self) {
        self.depleted = self.hp_micro == 0 || self.yield_remaining.is_zero();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WrecksField {
    pub wrecks:  BTreeMap<WreckId, WreckState>,
    /// Monotonic; ids are never reused.
    pub next_id: WreckId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveContract {
    pub id:                 String,
    pub started_at_tick:    Tick,
    pub ends_at_tick:       Tick,
    pub resources_snapshot: Resources,
    pub stats_snapshot:     SimStats,
    pub completed:          bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractState {
    pub active:                Option<ActiveContract>,
    pub revealed:              Vec<String>,
    pub completed:             Vec<String>,
    pub last_reveal_roll_tick: Tick,
}

impl ContractState {
    pub fn is_known(&self, id: &str) -> bool {
        self.revealed.iter().any(|r| r == id)
            || self.completed.iter().any(|c| c == id)
            || self.active.as_ref().is_some_and(|a| a.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveEvent {
    pub event_id:        String,
    pub spawned_at_tick: Tick,
    pub expires_at_tick: Tick,
    pub consumed:        bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProdBoost {
    pub source:          String,
    pub mult:            f64,
    pub expires_at_tick: Tick,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapBoost {
    pub source:          String,
    pub resource:        ResourceKind,
    pub micro:           Micro,
    pub expires_at_tick: Tick,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventState {
    pub active:      Option<ActiveEvent>,
    pub prod_boosts: Vec<ProdBoost>,
    pub cap_boosts:  Vec<CapBoost>,
}

impl EventState {
    /// Product of every boost still running at `tick`.
    pub fn prod_mult_at(&self, tick: Tick) -> f64 {
        self.prod_boosts
            .iter()
            .filter(|b| b.expires_at_tick > tick)
            .map(|b| b.mult)
            .product()
    }

    /// Sum of every cap boost still running at `tick`.
    pub fn cap_bonus_at(&self, tick: Tick) -> Resources {
        let mut bonus = Resources::ZERO;
        for boost in self.cap_boosts.iter().filter(|b| b.expires_at_tick > tick) {
            let slot = bonus.get_mut(boost.resource);
            *slot = slot.saturating_add(boost.micro);
        }
        bonus
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MilestoneState {
    /// Append-only.
    pub claimed:       Vec<String>,
    /// Cleared by DISMISS_MILESTONE_TOAST.
    pub pending_toast: Vec<String>,
}

/// Lifetime counters. Only ever grow.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimStats {
    pub total_flux_earned: Micro,
    pub total_taps:        u64,
    pub overflow_lost:     Micro,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimStateV1 {
    pub version:            u32,
    pub seed:               u32,
    pub tick:               Tick,
    pub resources:          Resources,
    pub caps:               Resources,
    pub machines:           Vec<MachineStack>,
    pub wrecks:             WrecksField,
    pub upgrades_purchased: Vec<String>,
    pub contracts:          ContractState,
    pub events:             EventState,
    pub milestones:         MilestoneState,
    pub stats:              SimStats,
    pub dirty:              bool,
}

impl SimStateV1 {
    pub fn machine(&self, code: &str) -> Option<&MachineStack> {
        self.machines.iter().find(|m| m.code == code)
    }

    pub fn machine_mut(&mut self, code: &str) -> Option<&mut MachineStack> {
        self.machines.iter_mut().find(|m| m.code == code)
    }

    /// Owned count for one code, or the total across stacks for `"*"`.
    pub fn owned_count(&self, code: &str) -> u64 {
        if code == "*" {
            self.machines.iter().map(|m| m.count).sum()
        } else {
            self.machine(code).map(|m| m.count).unwrap_or(0)
        }
    }

    pub fn has_upgrade(&self, id: &str) -> bool {
        self.upgrades_purchased.iter().any(|u| u == id)
    }

    /// Stored caps plus every cap boost still running at the current tick.
    pub fn effective_caps(&self) -> Resources {
        self.caps.saturating_add(&self.events.cap_bonus_at(self.tick))
    }
}

/// A brand-new run for `seed`.
/// Caps and starting resources come from the balance table when one is
/// registered; otherwise both start at zero.
pub fn create_fresh_state(seed: u32, catalogs: &Catalogs) -> SimStateV1 {
    let mut state = SimStateV1 {
        version:            STATE_VERSION,
        seed,
        tick:               0,
        resources:          Resources::ZERO,
        caps:               Resources::ZERO,
        machines:           Vec::new(),
        wrecks:             WrecksField::default(),
        upgrades_purchased: Vec::new(),
        contracts:          ContractState::default(),
        events:             EventState::default(),
        milestones:         MilestoneState::default(),
        stats:              SimStats::default(),
        dirty:              false,
    };
    if let Some(balance) = catalogs.balance.as_ref() {
        let derived = crate::derived::get_derived(&state, catalogs);
        state.caps = crate::economy::recompute_caps(&state, catalogs, &derived);
        let (start, _) = crate::economy::clamp_resources(&balance.starting_resources, &state.caps);
        state.resources = start;
    }
    state
}
