//! Diagnostic events emitted while stepping a tick.
//!
//! RULE: Events describe what happened; they never feed back into the
//! simulation. The stepper returns them alongside the new state and the
//! host may log or persist them. Dropping them changes nothing.

use crate::types::{Micro, Resources, RunId, Tick, WreckId};
use serde::{Deserialize, Serialize};

/// Variants are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Host events ────────────────────────────────
    RunInitialized {
        run_id: RunId,
        seed: u32,
    },
    CommandApplied {
        tick: Tick,
        command_type: String,
        accepted: bool,
    },

    // ── Production ─────────────────────────────────
    ResourcesOverflowed {
        tick: Tick,
        lost_micro: Micro,
    },

    // ── Contracts ──────────────────────────────────
    ContractRevealed {
        tick: Tick,
        contract_id: String,
    },
    ContractCompleted {
        tick: Tick,
        contract_id: String,
    },
    ContractExpired {
        tick: Tick,
        contract_id: String,
    },

    // ── Events ─────────────────────────────────────
    EventSpawned {
        tick: Tick,
        event_id: String,
        auto_applied: bool,
    },
    EventCleared {
        tick: Tick,
        event_id: String,
        consumed: bool,
    },
    BoostsExpired {
        tick: Tick,
        prod_boosts: usize,
        cap_boosts: usize,
    },

    // ── Milestones ─────────────────────────────────
    MilestoneClaimed {
        tick: Tick,
        milestone_id: String,
        reward: Resources,
    },

    // ── Wrecks ─────────────────────────────────────
    WreckSpawned {
        tick: Tick,
        wreck_id: WreckId,
        archetype_id: String,
    },
    WreckHarvested {
        tick: Tick,
        wreck_id: WreckId,
        damage_micro: Micro,
        yielded: Resources,
        depleted: bool,
    },
    WreckDespawned {
        tick: Tick,
        wreck_id: WreckId,
    },
}

impl SimEvent {
    /// Which part of the simulation emitted this event.
    pub fn subsystem(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. } | Self::CommandApplied { .. } => "engine",
            Self::ResourcesOverflowed { .. } => "production",
            Self::ContractRevealed { .. }
            | Self::ContractCompleted { .. }
            | Self::ContractExpired { .. } => "contracts",
            Self::EventSpawned { .. } | Self::EventCleared { .. } | Self::BoostsExpired { .. } => {
                "events"
            }
            Self::MilestoneClaimed { .. } => "milestones",
            Self::WreckSpawned { .. } | Self::WreckHarvested { .. } | Self::WreckDespawned { .. } => {
                "wrecks"
            }
        }
    }

    /// Stable name for the event_type column of the event log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunInitialized { .. }      => "run_initialized",
            Self::CommandApplied { .. }      => "command_applied",
            Self::ResourcesOverflowed { .. } => "resources_overflowed",
            Self::ContractRevealed { .. }    => "contract_revealed",
            Self::ContractCompleted { .. }   => "contract_completed",
            Self::ContractExpired { .. }     => "contract_expired",
            Self::EventSpawned { .. }        => "event_spawned",
            Self::EventCleared { .. }        => "event_cleared",
            Self::BoostsExpired { .. }       => "boosts_expired",
            Self::MilestoneClaimed { .. }    => "milestone_claimed",
            Self::WreckSpawned { .. }        => "wreck_spawned",
            Self::WreckHarvested { .. }      => "wreck_harvested",
            Self::WreckDespawned { .. }      => "wreck_despawned",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub tick: Tick,
    pub subsystem: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
