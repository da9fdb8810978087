//! The session engine — one authoritative state per run.
//!
//! The engine is the in-process host around the pure core: it serialises
//! commands and ticks against a single `SimStateV1`, logs both to the store,
//! and snapshots periodically.
//!
//! RULES:
//!   - Commands and ticks are applied one at a time, in arrival order.
//!   - A command submitted at tick T is applied before tick T+1 is stepped.
//!     Replay depends on this.
//!   - The engine never edits the state itself; it only swaps in the value
//!     returned by the reducer or the stepper.

use crate::{
    command::PlayerCommand,
    config::Catalogs,
    derived::{get_derived, DerivedMods},
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    reducer::apply_input,
    snapshot::{SimSnapshot, SNAPSHOT_INTERVAL},
    state::{create_fresh_state, SimStateV1},
    store::SimStore,
    tick::{step_tick, step_tick_with_events},
    types::{RunId, Tick},
};
use std::sync::Arc;

pub struct SimEngine {
    pub run_id: RunId,
    catalogs:   Arc<Catalogs>,
    state:      SimStateV1,
    pub store:  SimStore,
}

impl SimEngine {
    /// Start a fresh run. The run row must already exist in `store`.
    pub fn new(run_id: RunId, seed: u32, catalogs: Arc<Catalogs>, store: SimStore) -> Self {
        let state = create_fresh_state(seed, &catalogs);
        Self { run_id, catalogs, state, store }
    }

    /// Build an engine over an in-memory store and the test catalogs.
    pub fn build_test(run_id: RunId, seed: u32) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, "test")?;
        Ok(Self::new(run_id, seed, Arc::new(Catalogs::default_test()), store))
    }

    /// Continue a run from its latest snapshot.
    pub fn resume(run_id: RunId, catalogs: Arc<Catalogs>, store: SimStore) -> SimResult<Self> {
        let (_, json) = store
            .latest_snapshot(&run_id)?
            .ok_or_else(|| SimError::SnapshotNotFound { run_id: run_id.clone() })?;
        let snapshot = SimSnapshot::from_json(&json)?;
        log::info!("run {run_id} resumed at tick {}", snapshot.tick);
        Ok(Self { run_id, catalogs, state: snapshot.state, store })
    }

    pub fn state(&self) -> &SimStateV1 {
        &self.state
    }

    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    pub fn derived(&self) -> DerivedMods {
        get_derived(&self.state, &self.catalogs)
    }

    /// Apply one player command. Returns whether it changed anything.
    pub fn submit(&mut self, command: PlayerCommand) -> SimResult<bool> {
        let next = apply_input(&self.state, &command, &self.catalogs)?;
        let accepted = next != self.state;
        self.store
            .append_command(&self.run_id, self.state.tick, &command, accepted)?;
        self.log_events(
            self.state.tick,
            &[SimEvent::CommandApplied {
                tick: self.state.tick,
                command_type: command.type_name().to_string(),
                accepted,
            }],
        )?;
        self.state = next;
        Ok(accepted)
    }

    /// Advance one tick. This is the core simulation step.
    pub fn tick(&mut self) -> SimResult<Vec<SimEvent>> {
        let (next, events) = step_tick_with_events(&self.state, &self.catalogs)?;
        self.state = next;
        let tick = self.state.tick;
        self.log_events(tick, &events)?;

        if tick.is_multiple_of(SNAPSHOT_INTERVAL) {
            self.take_snapshot()?;
        }
        Ok(events)
    }

    /// Run n ticks in a loop. Used for testing and fast-forward.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        if self.state.tick == 0 {
            let init = SimEvent::RunInitialized {
                run_id: self.run_id.clone(),
                seed: self.state.seed,
            };
            self.log_events(0, &[init])?;
        }
        for _ in 0..n {
            self.tick()?;
        }
        Ok(())
    }

    /// The host has pushed the current state to its clients.
    pub fn mark_synced(&mut self) {
        if self.state.dirty {
            let mut next = self.state.clone();
            next.dirty = false;
            self.state = next;
        }
    }

    pub fn take_snapshot(&self) -> SimResult<()> {
        let snapshot = SimSnapshot::new(self.run_id.clone(), &self.state);
        self.store
            .save_snapshot(&self.run_id, snapshot.tick, &snapshot.to_json()?)?;
        log::debug!("Snapshot saved at tick {}", snapshot.tick);
        Ok(())
    }

    fn log_events(&self, tick: Tick, events: &[SimEvent]) -> SimResult<()> {
        for event in events {
            let entry = EventLogEntry {
                id:         None,
                run_id:     self.run_id.clone(),
                tick,
                subsystem:  event.subsystem().to_string(),
                event_type: event.type_name().to_string(),
                payload:    serde_json::to_string(event)?,
            };
            self.store.append_event(&entry)?;
        }
        Ok(())
    }
}

/// Rebuild a run's state from its seed and command log alone, ending at
/// `final_tick`. Commands logged at tick T are applied before stepping to
/// T+1; a logged RESET rewinds the clock exactly as it did live.
pub fn replay(
    run_id: &str,
    seed: u32,
    catalogs: &Catalogs,
    store: &SimStore,
    final_tick: Tick,
) -> SimResult<SimStateV1> {
    let mut pending = store.commands_for_run(run_id)?.into_iter().peekable();
    let mut state = create_fresh_state(seed, catalogs);

    loop {
        while let Some(entry) = pending.next_if(|c| c.tick <= state.tick) {
            state = apply_input(&state, &entry.command, catalogs)?;
        }
        if pending.peek().is_none() && state.tick >= final_tick {
            break;
        }
        state = step_tick(&state, catalogs)?;
    }
    Ok(state)
}
