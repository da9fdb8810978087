//! Derived modifiers — the fold of every purchased upgrade into runtime
//! multipliers and bonuses.
//!
//! Pure and O(purchased × effects). Compute it once per reducer or tick
//! invocation and pass it down; never recompute inside an inner loop.

use crate::{
    config::{Catalogs, UpgradeDef, UpgradeEffect},
    state::SimStateV1,
    types::Resources,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedMods {
    pub click_mult:           f64,
    pub global_prod_mult:     f64,
    pub machine_prod_mult:    BTreeMap<String, f64>,
    pub cap_bonus_micro:      Resources,
    pub converter_efficiency: BTreeMap<String, f64>,
    pub cost_reduction:       BTreeMap<String, f64>,
    pub reveal_chance_add:    f64,
}

impl Default for DerivedMods {
    fn default() -> Self {
        Self {
            click_mult:           1.0,
            global_prod_mult:     1.0,
            machine_prod_mult:    BTreeMap::new(),
            cap_bonus_micro:      Resources::ZERO,
            converter_efficiency: BTreeMap::new(),
            cost_reduction:       BTreeMap::new(),
            reveal_chance_add:    0.0,
        }
    }
}

impl DerivedMods {
    pub fn machine_mult(&self, code: &str) -> f64 {
        self.machine_prod_mult.get(code).copied().unwrap_or(1.0)
    }

    pub fn converter_mult(&self, code: &str) -> f64 {
        self.converter_efficiency.get(code).copied().unwrap_or(1.0)
    }

    /// Per-code discount times the wildcard discount.
    pub fn cost_mult(&self, code: &str) -> f64 {
        let specific = self.cost_reduction.get(code).copied().unwrap_or(1.0);
        let wildcard = self.cost_reduction.get(WILDCARD).copied().unwrap_or(1.0);
        specific * wildcard
    }

    fn apply(&mut self, effect: &UpgradeEffect) {
        match effect {
            UpgradeEffect::ClickMult { mult } => self.click_mult *= mult,
            UpgradeEffect::GlobalProdMult { mult } => self.global_prod_mult *= mult,
            UpgradeEffect::MachineProdMult { code, mult } => {
                *self.machine_prod_mult.entry(code.clone()).or_insert(1.0) *= mult;
            }
            UpgradeEffect::CapBonus { resource, micro } => {
                let slot = self.cap_bonus_micro.get_mut(*resource);
                *slot = slot.saturating_add(*micro);
            }
            UpgradeEffect::ConverterEfficiency { code, mult } => {
                *self.converter_efficiency.entry(code.clone()).or_insert(1.0) *= mult;
            }
            UpgradeEffect::CostReduction { code, mult } => {
                *self.cost_reduction.entry(code.clone()).or_insert(1.0) *= mult;
            }
            UpgradeEffect::RevealChanceAdd { add } => self.reveal_chance_add += add,
            UpgradeEffect::TierUnlock { .. } => {}
        }
    }
}

/// Fold the effect lists of every purchased upgrade.
/// Ids missing from the catalog are ignored.
pub fn compute_derived<S: AsRef<str>>(purchased: &[S], upgrades: &[UpgradeDef]) -> DerivedMods {
    let mut mods = DerivedMods::default();
    for id in purchased {
        let Some(def) = upgrades.iter().find(|u| u.id == id.as_ref()) else {
            continue;
        };
        for effect in &def.effects {
            mods.apply(effect);
        }
    }
    mods
}

/// Derived modifiers for a state's purchased upgrades.
pub fn get_derived(state: &SimStateV1, catalogs: &Catalogs) -> DerivedMods {
    compute_derived(&state.upgrades_purchased, &catalogs.upgrades)
}
