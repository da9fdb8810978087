use crate::types::{Micro, WreckId};
use serde::{Deserialize, Serialize};

/// All player-issued economy commands.
/// Variants are never removed or reordered: command logs replay them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerCommand {
    Tap {
        #[serde(default)]
        amount: Option<Micro>,
    },
    BuyMachine {
        code: String,
        qty:  u64,
    },
    ToggleMachineEnabled {
        code:    String,
        enabled: bool,
    },
    UpgradeMachineTier {
        code: String,
    },
    BuyUpgrade {
        id: String,
    },
    StartContract {
        id: String,
    },
    ClaimContractReward,
    TapEvent,
    TapWreck {
        id: WreckId,
    },
    DismissMilestoneToast,
    Reset,

    /// Anything a client sends that this build does not recognise.
    #[serde(other)]
    Unknown,
}

impl PlayerCommand {
    /// Stable name, used for logging and the command log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Tap { .. }                  => "TAP",
            Self::BuyMachine { .. }           => "BUY_MACHINE",
            Self::ToggleMachineEnabled { .. } => "TOGGLE_MACHINE_ENABLED",
            Self::UpgradeMachineTier { .. }   => "UPGRADE_MACHINE_TIER",
            Self::BuyUpgrade { .. }           => "BUY_UPGRADE",
            Self::StartContract { .. }        => "START_CONTRACT",
            Self::ClaimContractReward         => "CLAIM_CONTRACT_REWARD",
            Self::TapEvent                    => "TAP_EVENT",
            Self::TapWreck { .. }             => "TAP_WRECK",
            Self::DismissMilestoneToast       => "DISMISS_MILESTONE_TOAST",
            Self::Reset                       => "RESET",
            Self::Unknown                     => "UNKNOWN",
        }
    }
}
