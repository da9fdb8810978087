//! Starforge: deterministic incremental-economy simulation core.
//!
//! Entry points:
//!   - `create_fresh_state(seed, catalogs)`
//!   - `apply_input(state, command, catalogs)`
//!   - `step_tick(state, catalogs)`
//!   - `get_derived(state, catalogs)`
//!
//! All four are pure: they read their inputs and return new values.
//! `engine::SimEngine` is an optional in-process host that owns one
//! authoritative state per run and persists commands, events and snapshots.

pub mod command;
pub mod config;
pub mod contract_subsystem;
pub mod derived;
pub mod economy;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_subsystem;
pub mod milestone_subsystem;
pub mod production_subsystem;
pub mod reducer;
pub mod rng;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod subsystem;
pub mod tick;
pub mod types;
pub mod wreck_subsystem;

pub use command::PlayerCommand;
pub use config::Catalogs;
pub use derived::{compute_derived, get_derived, DerivedMods};
pub use error::{SimError, SimResult};
pub use reducer::apply_input;
pub use state::{create_fresh_state, SimStateV1};
pub use tick::{step_tick, step_tick_with_events};
