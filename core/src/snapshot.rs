//! Snapshot serialization — full simulation state to/from JSON.
//!
//! A snapshot is taken every SNAPSHOT_INTERVAL ticks.
//! It captures the complete state needed to resume simulation
//! from that tick without replaying from tick 0.

use crate::{
    error::{SimError, SimResult},
    state::{SimStateV1, STATE_VERSION},
    types::{RunId, Tick},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Tick = 600; // one minute at 10 Hz

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimSnapshot {
    pub run_id: RunId,
    pub tick:   Tick,
    pub state:  SimStateV1,
}

impl SimSnapshot {
    pub fn new(run_id: RunId, state: &SimStateV1) -> Self {
        Self {
            run_id,
            tick: state.tick,
            state: state.clone(),
        }
    }

    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a stored snapshot. Snapshots written by a different state
    /// version are refused rather than misread.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let snapshot: SimSnapshot = serde_json::from_str(json)?;
        if snapshot.state.version != STATE_VERSION {
            return Err(SimError::UnsupportedVersion {
                found: snapshot.state.version,
            });
        }
        Ok(snapshot)
    }
}
