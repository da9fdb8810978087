//! Tick stage trait.
//!
//! RULE: Every per-tick stage implements TickStage.
//! The stepper calls run() on each stage in a fixed order, every tick,
//! against one working copy of the state. Execution order is documented
//! in tick.rs.

use crate::{
    config::{BalanceConfig, Catalogs},
    derived::DerivedMods,
    event::SimEvent,
    state::SimStateV1,
    types::{Resources, Tick},
};

/// Everything a stage may read besides the state itself.
/// Built once per tick, before the first stage runs.
pub struct TickContext<'a> {
    pub catalogs:         &'a Catalogs,
    pub balance:          &'a BalanceConfig,
    pub derived:          &'a DerivedMods,
    /// The tick being produced.
    pub tick:             Tick,
    /// Seconds per tick.
    pub dt:               f64,
    /// Boosters × upgrades × running event boosts.
    pub global_prod_mult: f64,
    /// Stored caps plus running cap boosts, as of the start of the tick.
    pub effective_caps:   Resources,
}

/// The contract every tick stage must fulfill.
pub trait TickStage: Sync {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Advance this stage's slice of `state` by one tick.
    /// Returns the events it wants logged.
    fn run(&self, state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent>;
}
