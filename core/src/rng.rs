//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through `Mulberry32` instances derived
//! from the run seed stored on the state.
//!
//! Each roll stream gets its own generator, re-derived every tick
//! from (seed + tick + salt). This means:
//!   - A stream's rolls never depend on how many rolls another stream made.
//!   - Every tick of every stream is reproducible in isolation.

use crate::types::Tick;
use rand::{RngCore, SeedableRng};

/// 32-bit state generator (mulberry32).
/// Same seed, same sequence, always. Any 32-bit seed is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    fn next_raw(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_float(&mut self) -> f64 {
        self.next_raw() as f64 / 4_294_967_296.0
    }

    /// Roll an integer in [min, max], both ends inclusive.
    /// A reversed range collapses to `min`.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = i128::from(max) - i128::from(min) + 1;
        let offset = ((self.next_float() * span as f64).floor() as i128).min(span - 1);
        (i128::from(min) + offset) as i64
    }

    /// Roll an index in [0, len). `len` must be > 0.
    pub fn next_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "len must be > 0");
        self.next_int(0, len as i64 - 1) as usize
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_float() < p
    }

    /// Pick an index with probability proportional to its weight.
    /// Returns None when no entry carries a positive weight.
    pub fn weighted_index<I>(&mut self, weights: I) -> Option<usize>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let weights = weights.into_iter();
        let total: f64 = weights.clone().filter(|w| *w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.next_float() * total;
        let mut last_positive = None;
        for (i, w) in weights.enumerate() {
            if w <= 0.0 {
                continue;
            }
            if roll < w {
                return Some(i);
            }
            roll -= w;
            last_positive = Some(i);
        }
        // Float drift can leave a sliver past the final bucket.
        last_positive
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.next_raw()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_raw() as u64;
        let hi = self.next_raw() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Stable salt assignments for the per-tick roll streams.
/// NEVER change a salt: doing so changes every recorded run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollStream {
    ContractReveal,
    EventSpawn,
    WreckSpawn,
}

impl RollStream {
    pub fn salt(&self) -> u32 {
        match self {
            Self::ContractReveal => 0,
            Self::EventSpawn     => 7919,
            Self::WreckSpawn     => 13337,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ContractReveal => "contract_reveal",
            Self::EventSpawn     => "event_spawn",
            Self::WreckSpawn     => "wreck_spawn",
        }
    }

    /// Derive this stream's generator for `tick` from the run seed.
    pub fn at_tick(&self, seed: u32, tick: Tick) -> Mulberry32 {
        Mulberry32::new(seed.wrapping_add(tick as u32).wrapping_add(self.salt()))
    }
}
