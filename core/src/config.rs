//! Static game-content catalogs.
//!
//! RULE: Catalogs are built once at boot and never mutated afterwards.
//! The host shares one `Catalogs` value (usually behind an `Arc`) with every
//! reducer and stepper call. There are no global setters.

use crate::types::{Micro, ResourceKind, Resources, Tick};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Balance ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Fixed simulation rate. One tick lasts 1 / sim_hz seconds.
    pub sim_hz: u32,
    /// Base flux gained per TAP when the command carries no amount.
    pub tap_flux_micro: Micro,
    pub default_caps: Resources,
    #[serde(default)]
    pub starting_resources: Resources,
    pub contracts: ContractBalance,
    pub events: EventBalance,
    pub wrecks: WreckBalance,
}

impl BalanceConfig {
    /// Seconds per tick.
    pub fn dt(&self) -> f64 {
        1.0 / self.sim_hz.max(1) as f64
    }

    /// Convert a duration in seconds to a whole number of ticks.
    pub fn seconds_to_ticks(&self, seconds: f64) -> Tick {
        let ticks = (seconds * self.sim_hz as f64).round();
        if ticks.is_nan() || ticks <= 0.0 { 0 } else { ticks as Tick }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractBalance {
    pub reveal_interval_ticks: Tick,
    pub base_reveal_chance: f64,
    pub max_revealed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBalance {
    pub spawn_interval_ticks: Tick,
    pub base_spawn_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WreckBalance {
    pub spawn_interval_ticks: Tick,
    pub base_spawn_chance: f64,
    pub max_active_wrecks: usize,
    pub tap_damage_micro: Micro,
    pub drone_harvest_interval_ticks: Tick,
    pub ring_inner_radius: f64,
    pub ring_outer_radius: f64,
}

// ── Machines ──────────────────────────────────────────────────────

/// What a machine stack does each tick (or, for passive kinds, elsewhere).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineBehavior {
    Producer {
        resource: ResourceKind,
        per_sec_micro: Micro,
    },
    Converter {
        input: ResourceKind,
        output: ResourceKind,
        in_per_sec_micro: Micro,
        out_per_in: f64,
    },
    /// Produces signal through the same multiplier chain as a producer.
    Contract {
        signal_per_sec_micro: Micro,
    },
    /// Adds a fixed base rate to all three currencies.
    Cosmic {
        per_sec_micro: Micro,
    },
    /// Raises caps; contributes only through cap recomputation.
    Buffer {
        cap_bonus: Resources,
    },
    Booster {
        #[serde(default = "one")]
        click_mult: f64,
        #[serde(default = "one")]
        global_prod_mult: f64,
    },
    Discovery,
}

fn one() -> f64 {
    1.0
}

impl MachineBehavior {
    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineDef {
    pub code: String,
    #[serde(default)]
    pub label: String,
    pub behavior: MachineBehavior,
    pub buy_cost: Resources,
    pub growth: f64,
    /// Output multiplier per tier, indexed by tier - 1.
    #[serde(default = "default_tier_mults")]
    pub tier_mults: Vec<f64>,
    /// Lifetime flux required before the first purchase.
    #[serde(default)]
    pub unlock_at_flux_micro: Micro,
}

fn default_tier_mults() -> Vec<f64> {
    vec![1.0, 2.0, 4.0]
}

impl MachineDef {
    pub fn tier_mult(&self, tier: u8) -> f64 {
        let idx = tier.max(1) as usize - 1;
        self.tier_mults.get(idx).copied().unwrap_or(1.0)
    }
}

/// Explicit cost of raising one machine code to one tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierUnlockCost {
    pub code: String,
    pub tier: u8,
    pub cost: Resources,
}

// ── Upgrades ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpgradeEffect {
    ClickMult { mult: f64 },
    GlobalProdMult { mult: f64 },
    MachineProdMult { code: String, mult: f64 },
    CapBonus { resource: ResourceKind, micro: Micro },
    ConverterEfficiency { code: String, mult: f64 },
    /// `code` may be `"*"` to discount every machine.
    CostReduction { code: String, mult: f64 },
    RevealChanceAdd { add: f64 },
    /// Gates a machine tier. Checked against the purchased-id list,
    /// not folded into any runtime modifier.
    TierUnlock { code: String, tier: u8 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub cost: Resources,
    #[serde(default)]
    pub unlock_at_flux_micro: Micro,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub effects: Vec<UpgradeEffect>,
}

/// Id of the upgrade that gates `tier` of machine `code`.
pub fn tier_unlock_id(tier: u8, code: &str) -> String {
    format!("UNLOCK_T{tier}_{code}")
}

// ── Contracts ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractRequirement {
    /// Resource delta since the contract started.
    EarnResource { resource: ResourceKind, target_micro: Micro },
    /// Owned count of one code, or of every machine when `code` is `"*"`.
    OwnMachine { code: String, target: u64 },
    UpgradesPurchased { target: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub duration_sec: f64,
    pub requirements: Vec<ContractRequirement>,
    #[serde(default)]
    pub rewards: Resources,
}

// ── Events ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventTrigger {
    /// Waits for a TAP_EVENT command or natural expiry.
    Tap,
    /// Applies on spawn and consumes itself.
    Auto,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventEffect {
    ResourceBurst { resource: ResourceKind, micro: Micro },
    ProdBoost { mult: f64, duration_sec: f64 },
    CapBoost { resource: ResourceKind, micro: Micro, duration_sec: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub trigger: EventTrigger,
    pub weight: f64,
    /// How long a spawned event stays tappable.
    pub duration_sec: f64,
    pub effects: Vec<EventEffect>,
}

// ── Milestones ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneThreshold {
    /// Compared against lifetime flux whatever `resource` names.
    ResourceEarned { resource: ResourceKind, micro: Micro },
    TotalTaps { count: u64 },
    /// `code` may be `"*"` for the total across every stack.
    MachinesOwned { code: String, count: u64 },
    UpgradesPurchased { count: usize },
    ContractsCompleted { count: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub threshold: MilestoneThreshold,
    #[serde(default)]
    pub reward: Resources,
}

// ── Wrecks ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WreckArchetype {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub hp_micro: Micro,
    /// Yield granted per manual tap, before the click multiplier.
    pub yield_per_tap: Resources,
    /// Total yield a fresh wreck carries.
    pub total_yield: Resources,
    pub weight: f64,
    #[serde(default)]
    pub despawn_on_depleted: bool,
}

// ── Catalog bundle ────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Catalogs {
    pub balance:      Option<BalanceConfig>,
    pub machines:     Vec<MachineDef>,
    pub upgrades:     Vec<UpgradeDef>,
    pub contracts:    Vec<ContractDef>,
    pub events:       Vec<EventDef>,
    pub milestones:   Vec<MilestoneDef>,
    pub wrecks:       Vec<WreckArchetype>,
    pub tier_unlocks: Vec<TierUnlockCost>,
}

#[derive(Debug, Clone, Deserialize)]
struct MachinesFile {
    machines: Vec<MachineDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct UpgradesFile {
    upgrades: Vec<UpgradeDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContractsFile {
    contracts: Vec<ContractDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct EventsFile {
    events: Vec<EventDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct MilestonesFile {
    milestones: Vec<MilestoneDef>,
}

#[derive(Debug, Clone, Deserialize)]
struct WrecksFile {
    archetypes: Vec<WreckArchetype>,
}

#[derive(Debug, Clone, Deserialize)]
struct TierUnlocksFile {
    tier_unlocks: Vec<TierUnlockCost>,
}

impl Catalogs {
    pub fn with_balance(mut self, balance: BalanceConfig) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_machines(mut self, machines: Vec<MachineDef>) -> Self {
        self.machines = machines;
        self
    }

    pub fn with_upgrades(mut self, upgrades: Vec<UpgradeDef>) -> Self {
        self.upgrades = upgrades;
        self
    }

    pub fn with_contracts(mut self, contracts: Vec<ContractDef>) -> Self {
        self.contracts = contracts;
        self
    }

    pub fn with_events(mut self, events: Vec<EventDef>) -> Self {
        self.events = events;
        self
    }

    pub fn with_milestones(mut self, milestones: Vec<MilestoneDef>) -> Self {
        self.milestones = milestones;
        self
    }

    pub fn with_wrecks(mut self, wrecks: Vec<WreckArchetype>) -> Self {
        self.wrecks = wrecks;
        self
    }

    pub fn with_tier_unlocks(mut self, tier_unlocks: Vec<TierUnlockCost>) -> Self {
        self.tier_unlocks = tier_unlocks;
        self
    }

    /// True when nothing at all has been registered.
    pub fn is_empty(&self) -> bool {
        self.balance.is_none()
            && self.machines.is_empty()
            && self.upgrades.is_empty()
            && self.contracts.is_empty()
            && self.events.is_empty()
            && self.milestones.is_empty()
            && self.wrecks.is_empty()
            && self.tier_unlocks.is_empty()
    }

    /// The balance table. Running without it is a programmer error.
    pub fn balance(&self) -> crate::error::SimResult<&BalanceConfig> {
        self.balance
            .as_ref()
            .ok_or(crate::error::SimError::BalanceNotRegistered)
    }

    pub fn machine(&self, code: &str) -> Option<&MachineDef> {
        self.machines.iter().find(|m| m.code == code)
    }

    pub fn upgrade(&self, id: &str) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|u| u.id == id)
    }

    pub fn contract(&self, id: &str) -> Option<&ContractDef> {
        self.contracts.iter().find(|c| c.id == id)
    }

    pub fn event(&self, id: &str) -> Option<&EventDef> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn wreck_archetype(&self, id: &str) -> Option<&WreckArchetype> {
        self.wrecks.iter().find(|w| w.id == id)
    }

    pub fn tier_unlock_cost(&self, code: &str, tier: u8) -> Option<&TierUnlockCost> {
        self.tier_unlocks
            .iter()
            .find(|t| t.code == code && t.tier == tier)
    }

    /// Load from a data directory.
    /// `balance.json` is required; every other table is optional.
    /// In tests, use Catalogs::default_test().
    pub fn load(data_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = data_dir.as_ref();

        let balance: BalanceConfig = read_json(&dir.join("balance.json"))?;

        let mut catalogs = Catalogs::default().with_balance(balance);
        if let Some(file) = read_optional::<MachinesFile>(&dir.join("machines.json"))? {
            catalogs.machines = file.machines;
        }
        if let Some(file) = read_optional::<UpgradesFile>(&dir.join("upgrades.json"))? {
            catalogs.upgrades = file.upgrades;
        }
        if let Some(file) = read_optional::<ContractsFile>(&dir.join("contracts.json"))? {
            catalogs.contracts = file.contracts;
        }
        if let Some(file) = read_optional::<EventsFile>(&dir.join("events.json"))? {
            catalogs.events = file.events;
        }
        if let Some(file) = read_optional::<MilestonesFile>(&dir.join("milestones.json"))? {
            catalogs.milestones = file.milestones;
        }
        if let Some(file) = read_optional::<WrecksFile>(&dir.join("wrecks.json"))? {
            catalogs.wrecks = file.archetypes;
        }
        if let Some(file) = read_optional::<TierUnlocksFile>(&dir.join("tier_unlocks.json"))? {
            catalogs.tier_unlocks = file.tier_unlocks;
        }

        log::info!(
            "catalogs loaded from {}: {} machines, {} upgrades, {} contracts, {} events, {} milestones, {} wreck archetypes",
            dir.display(),
            catalogs.machines.len(),
            catalogs.upgrades.len(),
            catalogs.contracts.len(),
            catalogs.events.len(),
            catalogs.milestones.len(),
            catalogs.wrecks.len(),
        );
        Ok(catalogs)
    }

    /// Balance with hardcoded defaults for use in tests.
    pub fn test_balance() -> BalanceConfig {
        BalanceConfig {
            sim_hz: 10,
            tap_flux_micro: 1_000,
            default_caps: Resources::new(10_000_000, 5_000_000, 2_000_000),
            starting_resources: Resources::ZERO,
            contracts: ContractBalance {
                reveal_interval_ticks: 50,
                base_reveal_chance: 0.35,
                max_revealed: 3,
            },
            events: EventBalance {
                spawn_interval_ticks: 100,
                base_spawn_chance: 0.25,
            },
            wrecks: WreckBalance {
                spawn_interval_ticks: 40,
                base_spawn_chance: 0.3,
                max_active_wrecks: 4,
                tap_damage_micro: 500,
                drone_harvest_interval_ticks: 20,
                ring_inner_radius: 120.0,
                ring_outer_radius: 300.0,
            },
        }
    }

    /// Catalogs with hardcoded content for use in tests.
    pub fn default_test() -> Self {
        let machines = vec![
            MachineDef {
                code: "CUTTER".into(),
                label: "Flux Cutter".into(),
                behavior: MachineBehavior::Producer {
                    resource: ResourceKind::Flux,
                    per_sec_micro: 1_000,
                },
                buy_cost: Resources::flux(100),
                growth: 1.15,
                tier_mults: vec![1.0, 2.0, 4.0],
                unlock_at_flux_micro: 0,
            },
            MachineDef {
                code: "SMELTER".into(),
                label: "Alloy Smelter".into(),
                behavior: MachineBehavior::Converter {
                    input: ResourceKind::Flux,
                    output: ResourceKind::Alloy,
                    in_per_sec_micro: 2_000,
                    out_per_in: 0.5,
                },
                buy_cost: Resources::flux(5_000),
                growth: 1.2,
                tier_mults: vec![1.0, 2.0, 4.0],
                unlock_at_flux_micro: 2_000,
            },
            MachineDef {
                code: "RELAY".into(),
                label: "Signal Relay".into(),
                behavior: MachineBehavior::Contract { signal_per_sec_micro: 500 },
                buy_cost: Resources::new(10_000, 2_000, 0),
                growth: 1.25,
                tier_mults: vec![1.0, 2.0, 4.0],
                unlock_at_flux_micro: 10_000,
            },
            MachineDef {
                code: "SILO".into(),
                label: "Storage Silo".into(),
                behavior: MachineBehavior::Buffer {
                    cap_bonus: Resources::new(1_000_000, 500_000, 0),
                },
                buy_cost: Resources::flux(2_000),
                growth: 1.5,
                tier_mults: vec![1.0, 2.0, 4.0],
                unlock_at_flux_micro: 0,
            },
            MachineDef {
                code: "AMPLIFIER".into(),
                label: "Tap Amplifier".into(),
                behavior: MachineBehavior::Booster {
                    click_mult: 2.0,
                    global_prod_mult: 1.0,
                },
                buy_cost: Resources::flux(3_000),
                growth: 2.0,
                tier_mults: vec![1.0, 1.5, 2.0],
                unlock_at_flux_micro: 0,
            },
            MachineDef {
                code: "BEACON".into(),
                label: "Cosmic Beacon".into(),
                behavior: MachineBehavior::Cosmic { per_sec_micro: 100 },
                buy_cost: Resources::new(50_000, 10_000, 5_000),
                growth: 1.0,
                tier_mults: vec![1.0, 2.0, 4.0],
                unlock_at_flux_micro: 50_000,
            },
            MachineDef {
                code: "DRONES_MAG".into(),
                label: "Salvage Drones".into(),
                behavior: MachineBehavior::Discovery,
                buy_cost: Resources::flux(8_000),
                growth: 1.3,
                tier_mults: vec![1.0, 2.0, 4.0],
                unlock_at_flux_micro: 0,
            },
        ];

        let upgrades = vec![
            UpgradeDef {
                id: "SHARP_TAPS".into(),
                label: "Sharpened Taps".into(),
                cost: Resources::flux(1_000),
                unlock_at_flux_micro: 0,
                prerequisites: vec![],
                effects: vec![UpgradeEffect::ClickMult { mult: 2.0 }],
            },
            UpgradeDef {
                id: "BIG_SILOS".into(),
                label: "Reinforced Silos".into(),
                cost: Resources::flux(2_000),
                unlock_at_flux_micro: 0,
                prerequisites: vec![],
                effects: vec![UpgradeEffect::CapBonus {
                    resource: ResourceKind::Flux,
                    micro: 500_000,
                }],
            },
            UpgradeDef {
                id: "LEAN_FAB".into(),
                label: "Lean Fabrication".into(),
                cost: Resources::flux(2_000),
                unlock_at_flux_micro: 0,
                prerequisites: vec!["SHARP_TAPS".into()],
                effects: vec![UpgradeEffect::CostReduction {
                    code: "*".into(),
                    mult: 0.9,
                }],
            },
            UpgradeDef {
                id: "UNLOCK_T2_CUTTER".into(),
                label: "Cutter Mk II".into(),
                cost: Resources::flux(500),
                unlock_at_flux_micro: 0,
                prerequisites: vec![],
                effects: vec![UpgradeEffect::TierUnlock {
                    code: "CUTTER".into(),
                    tier: 2,
                }],
            },
            UpgradeDef {
                id: "UNLOCK_T3_CUTTER".into(),
                label: "Cutter Mk III".into(),
                cost: Resources::flux(5_000),
                unlock_at_flux_micro: 0,
                prerequisites: vec!["UNLOCK_T2_CUTTER".into()],
                effects: vec![UpgradeEffect::TierUnlock {
                    code: "CUTTER".into(),
                    tier: 3,
                }],
            },
            UpgradeDef {
                id: "DEEP_SCAN".into(),
                label: "Deep Scan".into(),
                cost: Resources::new(5_000, 0, 1_000),
                unlock_at_flux_micro: 20_000,
                prerequisites: vec![],
                effects: vec![UpgradeEffect::RevealChanceAdd { add: 0.2 }],
            },
        ];

        let contracts = vec![
            ContractDef {
                id: "FIRST_HAUL".into(),
                label: "First Haul".into(),
                duration_sec: 60.0,
                requirements: vec![ContractRequirement::EarnResource {
                    resource: ResourceKind::Flux,
                    target_micro: 5_000,
                }],
                rewards: Resources::new(0, 1_000, 500),
            },
            ContractDef {
                id: "FLEET".into(),
                label: "Build a Fleet".into(),
                duration_sec: 120.0,
                requirements: vec![ContractRequirement::OwnMachine {
                    code: "*".into(),
                    target: 3,
                }],
                rewards: Resources::flux(10_000),
            },
        ];

        let events = vec![
            EventDef {
                id: "SOLAR_FLARE".into(),
                label: "Solar Flare".into(),
                trigger: EventTrigger::Tap,
                weight: 3.0,
                duration_sec: 10.0,
                effects: vec![
                    EventEffect::ResourceBurst {
                        resource: ResourceKind::Flux,
                        micro: 5_000,
                    },
                    EventEffect::ProdBoost {
                        mult: 2.0,
                        duration_sec: 30.0,
                    },
                ],
            },
            EventDef {
                id: "ION_STORM".into(),
                label: "Ion Storm".into(),
                trigger: EventTrigger::Auto,
                weight: 1.0,
                duration_sec: 5.0,
                effects: vec![EventEffect::CapBoost {
                    resource: ResourceKind::Flux,
                    micro: 1_000_000,
                    duration_sec: 60.0,
                }],
            },
        ];

        let milestones = vec![
            MilestoneDef {
                id: "FIRST_TAPS".into(),
                label: "Getting Started".into(),
                threshold: MilestoneThreshold::TotalTaps { count: 10 },
                reward: Resources::flux(1_000),
            },
            MilestoneDef {
                id: "FLUX_10".into(),
                label: "Ten Flux".into(),
                threshold: MilestoneThreshold::ResourceEarned {
                    resource: ResourceKind::Flux,
                    micro: 10_000,
                },
                reward: Resources::new(0, 500, 0),
            },
        ];

        let wrecks = vec![
            WreckArchetype {
                id: "HULL".into(),
                label: "Derelict Hull".into(),
                hp_micro: 1_000,
                yield_per_tap: Resources::new(200, 100, 0),
                total_yield: Resources::new(1_000, 400, 0),
                weight: 3.0,
                despawn_on_depleted: false,
            },
            WreckArchetype {
                id: "PROBE".into(),
                label: "Lost Probe".into(),
                hp_micro: 2_000,
                yield_per_tap: Resources::new(0, 0, 300),
                total_yield: Resources::new(0, 0, 1_200),
                weight: 1.0,
                despawn_on_depleted: true,
            },
        ];

        let tier_unlocks = vec![TierUnlockCost {
            code: "CUTTER".into(),
            tier: 2,
            cost: Resources::flux(1_000),
        }];

        Catalogs::default()
            .with_balance(Self::test_balance())
            .with_machines(machines)
            .with_upgrades(upgrades)
            .with_contracts(contracts)
            .with_events(events)
            .with_milestones(milestones)
            .with_wrecks(wrecks)
            .with_tier_unlocks(tier_unlocks)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Cannot parse {}", path.display()))
}

fn read_optional<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<Option<T>> {
    if !path.exists() {
        log::debug!("optional catalog {} not present", path.display());
        return Ok(None);
    }
    read_json(path).map(Some)
}
