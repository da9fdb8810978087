//! Shared primitive types used across the entire simulation.

use serde::{Deserialize, Serialize};

/// A simulation tick. One tick = 1 / sim_hz seconds.
pub type Tick = u64;

/// Integer-scaled resource amount. 1 display unit = 1000 micro-units.
pub type Micro = u64;

/// The canonical run identifier.
pub type RunId = String;

/// Stable identifier of a spawned wreck.
pub type WreckId = u64;

pub const MICRO_PER_UNIT: Micro = 1_000;

/// Round a non-negative float to the nearest micro-unit.
/// Negative and NaN inputs collapse to zero.
pub fn round_micro(value: f64) -> Micro {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    value.round() as Micro
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Flux,
    Alloy,
    Signal,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Flux, ResourceKind::Alloy, ResourceKind::Signal];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Flux   => "flux",
            Self::Alloy  => "alloy",
            Self::Signal => "signal",
        }
    }
}

/// Amounts of the three currencies, in micro-units.
/// Used for balances, caps, costs and rewards alike.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resources {
    #[serde(default)]
    pub flux:   Micro,
    #[serde(default)]
    pub alloy:  Micro,
    #[serde(default)]
    pub signal: Micro,
}

impl Resources {
    pub const ZERO: Resources = Resources { flux: 0, alloy: 0, signal: 0 };

    pub fn new(flux: Micro, alloy: Micro, signal: Micro) -> Self {
        Self { flux, alloy, signal }
    }

    pub fn flux(flux: Micro) -> Self {
        Self { flux, ..Self::ZERO }
    }

    pub fn get(&self, kind: ResourceKind) -> Micro {
        match kind {
            ResourceKind::Flux   => self.flux,
            ResourceKind::Alloy  => self.alloy,
            ResourceKind::Signal => self.signal,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut Micro {
        match kind {
            ResourceKind::Flux   => &mut self.flux,
            ResourceKind::Alloy  => &mut self.alloy,
            ResourceKind::Signal => &mut self.signal,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.flux == 0 && self.alloy == 0 && self.signal == 0
    }

    /// True when every currency in `self` covers the matching one in `cost`.
    pub fn covers(&self, cost: &Resources) -> bool {
        self.flux >= cost.flux && self.alloy >= cost.alloy && self.signal >= cost.signal
    }

    pub fn saturating_add(&self, other: &Resources) -> Resources {
        Resources {
            flux:   self.flux.saturating_add(other.flux),
            alloy:  self.alloy.saturating_add(other.alloy),
            signal: self.signal.saturating_add(other.signal),
        }
    }

    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        Resources {
            flux:   self.flux.saturating_sub(other.flux),
            alloy:  self.alloy.saturating_sub(other.alloy),
            signal: self.signal.saturating_sub(other.signal),
        }
    }

    /// Multiply every currency by `factor`, rounding each term.
    pub fn scaled(&self, factor: f64) -> Resources {
        Resources {
            flux:   round_micro(self.flux as f64 * factor),
            alloy:  round_micro(self.alloy as f64 * factor),
            signal: round_micro(self.signal as f64 * factor),
        }
    }

    pub fn total(&self) -> Micro {
        self.flux.saturating_add(self.alloy).saturating_add(self.signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_micro_clamps_negative_and_nan() {
        assert_eq!(round_micro(-3.2), 0);
        assert_eq!(round_micro(f64::NAN), 0);
        assert_eq!(round_micro(2.5), 3);
        assert_eq!(round_micro(2.49), 2);
    }

    #[test]
    fn covers_requires_every_currency() {
        let wallet = Resources::new(100, 5, 0);
        assert!(wallet.covers(&Resources::new(100, 5, 0)));
        assert!(!wallet.covers(&Resources::new(100, 5, 1)));
        assert!(!wallet.covers(&Resources::new(101, 0, 0)));
    }
}
