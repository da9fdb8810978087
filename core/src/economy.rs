//! Economy arithmetic shared by the reducer and the tick stepper.
//!
//! All amounts are integer micro-units. Every float product is rounded
//! explicitly, and every credit is clamped to the effective caps with the
//! excess counted in `overflow_lost`.

use crate::{
    config::{Catalogs, MachineBehavior, MachineDef},
    derived::DerivedMods,
    state::SimStateV1,
    types::{round_micro, Micro, ResourceKind, Resources},
};

/// Quantities at or above this buy as many units as the wallet allows.
pub const MAX_AFFORDABLE_QTY: u64 = 999;
/// Upper bound on units considered by a max-affordable purchase.
pub const MAX_AFFORDABLE_ITERATIONS: u64 = 1_000;

/// Cost of one unit when `owned` units already exist.
pub fn unit_cost(base: &Resources, growth: f64, owned: u64) -> Resources {
    if growth == 1.0 {
        return *base;
    }
    base.scaled(growth.powf(owned as f64))
}

/// Cost of `qty` units starting at `owned`, each term rounded then summed.
pub fn compute_bulk_cost(base: &Resources, growth: f64, owned: u64, qty: u64) -> Resources {
    if growth == 1.0 {
        return Resources {
            flux:   base.flux.saturating_mul(qty),
            alloy:  base.alloy.saturating_mul(qty),
            signal: base.signal.saturating_mul(qty),
        };
    }
    (owned..owned.saturating_add(qty)).fold(Resources::ZERO, |acc, i| {
        acc.saturating_add(&unit_cost(base, growth, i))
    })
}

/// A resolved purchase: how many units and what they cost after discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub qty:  u64,
    pub cost: Resources,
}

/// Price `qty` units of `def`. A quantity of MAX_AFFORDABLE_QTY or more
/// resolves to the largest affordable count (bounded by
/// MAX_AFFORDABLE_ITERATIONS). Returns None when nothing is affordable.
pub fn quote_purchase(
    def: &MachineDef,
    owned: u64,
    qty: u64,
    wallet: &Resources,
    derived: &DerivedMods,
) -> Option<Quote> {
    if qty == 0 {
        return None;
    }
    let discount = derived.cost_mult(&def.code);

    if qty >= MAX_AFFORDABLE_QTY {
        let mut raw = Resources::ZERO;
        let mut best: Option<Quote> = None;
        for n in 0..MAX_AFFORDABLE_ITERATIONS {
            raw = raw.saturating_add(&unit_cost(&def.buy_cost, def.growth, owned + n));
            let cost = raw.scaled(discount);
            if !wallet.covers(&cost) {
                break;
            }
            best = Some(Quote { qty: n + 1, cost });
        }
        return best;
    }

    let cost = compute_bulk_cost(&def.buy_cost, def.growth, owned, qty).scaled(discount);
    wallet.covers(&cost).then_some(Quote { qty, cost })
}

/// Cost of raising `def` to `next_tier`: the tier-unlock catalog entry if
/// present, otherwise the base buy cost times the fallback multiplier.
pub fn tier_upgrade_cost(catalogs: &Catalogs, def: &MachineDef, next_tier: u8) -> Resources {
    if let Some(entry) = catalogs.tier_unlock_cost(&def.code, next_tier) {
        return entry.cost;
    }
    let mult = match next_tier {
        2 => 5.0,
        3 => 25.0,
        _ => 1.0,
    };
    def.buy_cost.scaled(mult)
}

/// Full cap recomputation: catalog defaults, plus every BUFFER stack's
/// contribution, plus upgrade cap bonuses. Caps are never patched
/// incrementally.
pub fn recompute_caps(state: &SimStateV1, catalogs: &Catalogs, derived: &DerivedMods) -> Resources {
    let mut caps = catalogs
        .balance
        .as_ref()
        .map(|b| b.default_caps)
        .unwrap_or(Resources::ZERO);

    for stack in &state.machines {
        let Some(def) = catalogs.machine(&stack.code) else {
            continue;
        };
        if let MachineBehavior::Buffer { cap_bonus } = &def.behavior {
            let factor = def.tier_mult(stack.tier) * stack.count as f64;
            caps = caps.saturating_add(&cap_bonus.scaled(factor));
        }
    }

    caps.saturating_add(&derived.cap_bonus_micro)
}

/// Clamp `resources` to `caps`, returning the clamped value and the total
/// excess that did not fit.
pub fn clamp_resources(resources: &Resources, caps: &Resources) -> (Resources, Micro) {
    let mut clamped = *resources;
    let mut overflow: Micro = 0;
    for kind in ResourceKind::ALL {
        let value = clamped.get_mut(kind);
        let cap = caps.get(kind);
        if *value > cap {
            overflow = overflow.saturating_add(*value - cap);
            *value = cap;
        }
    }
    (clamped, overflow)
}

/// Clamp the state's resources to its effective caps, recording overflow.
pub fn clamp_to_caps(state: &mut SimStateV1) -> Micro {
    let (clamped, overflow) = clamp_resources(&state.resources, &state.effective_caps());
    state.resources = clamped;
    state.stats.overflow_lost = state.stats.overflow_lost.saturating_add(overflow);
    overflow
}

/// Credit `amount` of `kind` up to the effective cap. The excess goes to
/// `overflow_lost`; credited flux counts toward lifetime flux.
/// Returns the amount actually credited.
pub fn credit(state: &mut SimStateV1, kind: ResourceKind, amount: Micro) -> Micro {
    let cap = state.effective_caps().get(kind);
    let current = state.resources.get(kind);
    let headroom = cap.saturating_sub(current);
    let gained = amount.min(headroom);
    let overflow = amount - gained;

    *state.resources.get_mut(kind) = current + gained;
    state.stats.overflow_lost = state.stats.overflow_lost.saturating_add(overflow);
    if kind == ResourceKind::Flux {
        state.stats.total_flux_earned = state.stats.total_flux_earned.saturating_add(gained);
    }
    gained
}

/// Credit every currency of `amounts`. Returns what was actually credited.
pub fn credit_all(state: &mut SimStateV1, amounts: &Resources) -> Resources {
    let mut credited = Resources::ZERO;
    for kind in ResourceKind::ALL {
        let amount = amounts.get(kind);
        if amount > 0 {
            *credited.get_mut(kind) = credit(state, kind, amount);
        }
    }
    credited
}

/// Click multiplier: product over enabled BOOSTER stacks of
/// (click_mult × tier_mult)^count, times the upgrade click multiplier.
pub fn click_multiplier(state: &SimStateV1, catalogs: &Catalogs, derived: &DerivedMods) -> f64 {
    let mut mult = derived.click_mult;
    for stack in state.machines.iter().filter(|s| s.is_active()) {
        let Some(def) = catalogs.machine(&stack.code) else {
            continue;
        };
        if let MachineBehavior::Booster { click_mult, .. } = def.behavior {
            mult *= (click_mult * def.tier_mult(stack.tier)).powf(stack.count as f64);
        }
    }
    mult
}

/// Production multiplier from enabled BOOSTER stacks:
/// product of (global_prod_mult^tier_mult)^count.
pub fn booster_prod_multiplier(state: &SimStateV1, catalogs: &Catalogs) -> f64 {
    let mut mult = 1.0;
    for stack in state.machines.iter().filter(|s| s.is_active()) {
        let Some(def) = catalogs.machine(&stack.code) else {
            continue;
        };
        if let MachineBehavior::Booster { global_prod_mult, .. } = def.behavior {
            mult *= global_prod_mult
                .powf(def.tier_mult(stack.tier))
                .powf(stack.count as f64);
        }
    }
    mult
}

/// Scale one per-second rate through the full production chain.
pub fn scaled_rate(per_sec: Micro, factor: f64) -> Micro {
    round_micro(per_sec as f64 * factor)
}
