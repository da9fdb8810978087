//! Milestone subsystem — one-time threshold rewards.
//!
//! A milestone is claimed on the first tick its predicate holds. Its id is
//! appended to both `claimed` (permanent) and `pending_toast` (until the
//! player dismisses it).
//!
//! Known limitation: RESOURCE_EARNED compares against lifetime flux no
//! matter which resource it names. Alloy or signal thresholds therefore
//! track flux earned.

use crate::{
    config::MilestoneThreshold,
    economy::credit_all,
    event::SimEvent,
    state::SimStateV1,
    subsystem::{TickContext, TickStage},
};

pub struct MilestoneSubsystem;

impl TickStage for MilestoneSubsystem {
    fn name(&self) -> &'static str { "milestones" }

    fn run(&self, state: &mut SimStateV1, ctx: &TickContext<'_>) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for def in &ctx.catalogs.milestones {
            if state.milestones.claimed.iter().any(|c| c == &def.id) {
                continue;
            }
            if !threshold_met(state, &def.threshold) {
                continue;
            }
            let reward = credit_all(state, &def.reward);
            state.milestones.claimed.push(def.id.clone());
            state.milestones.pending_toast.push(def.id.clone());
            log::debug!("tick={} milestones: claimed {}", ctx.tick, def.id);
            events.push(SimEvent::MilestoneClaimed {
                tick: ctx.tick,
                milestone_id: def.id.clone(),
                reward,
            });
        }
        events
    }
}

pub fn threshold_met(state: &SimStateV1, threshold: &MilestoneThreshold) -> bool {
    match threshold {
        MilestoneThreshold::ResourceEarned { micro, .. } => state.stats.total_flux_earned >= *micro,
        MilestoneThreshold::TotalTaps { count } => state.stats.total_taps >= *count,
        MilestoneThreshold::MachinesOwned { code, count } => state.owned_count(code) >= *count,
        MilestoneThreshold::UpgradesPurchased { count } => state.upgrades_purchased.len() >= *count,
        MilestoneThreshold::ContractsCompleted { count } => state.contracts.completed.len() >= *count,
    }
}
