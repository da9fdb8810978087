//! sim-runner: headless simulation runner for Starforge.
//!
//! Usage:
//!   sim-runner --seed 12345 --ticks 6000 --db run.db
//!   sim-runner --seed 12345 --ticks 6000 --bot-seed 7 --data-dir ./data
//!   sim-runner --seed 12345 --ipc-mode

use anyhow::{Context, Result};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use starforge_core::{
    config::Catalogs,
    derived::DerivedMods,
    engine::SimEngine,
    state::SimStateV1,
    store::SimStore,
    types::Resources,
    PlayerCommand,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// One request line on stdin in IPC mode.
#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetState,
    Tick { count: u64 },
    Command { command: PlayerCommand },
    Quit,
}

/// What the client sees after every request.
#[derive(serde::Serialize)]
struct UiState<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    accepted:       Option<bool>,
    effective_caps: Resources,
    derived:        DerivedMods,
    state:          &'a SimStateV1,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u32);
    let ticks = parse_arg(&args, "--ticks", 6_000u64);
    let bot_seed = parse_arg(&args, "--bot-seed", u64::from(seed));
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");

    if !ipc_mode {
        println!("Starforge — sim-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!("  bot_seed:  {bot_seed}");
        println!();
    }

    let catalogs = Catalogs::load(data_dir)
        .with_context(|| format!("loading catalogs from {data_dir}"))?;

    let store = if db == ":memory:" {
        SimStore::in_memory()?
    } else {
        SimStore::open(db)?
    };
    store.migrate()?;

    let run_id = uuid::Uuid::new_v4().to_string();
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
    log::info!("run {run_id} started with seed {seed}");

    let mut engine = SimEngine::new(run_id, seed, Arc::new(catalogs), store);

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else {
        run_with_bot(&mut engine, ticks, bot_seed)?;
        engine.take_snapshot()?;
        print_summary(&engine, ticks)?;
    }

    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    engine.run_ticks(0)?;
    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        let accepted = match request {
            IpcRequest::Quit => break,
            IpcRequest::GetState => None,
            IpcRequest::Tick { count } => {
                for _ in 0..count {
                    engine.tick()?;
                }
                None
            }
            IpcRequest::Command { command } => Some(engine.submit(command)?),
        };

        let ui = UiState {
            accepted,
            effective_caps: engine.state().effective_caps(),
            derived: engine.derived(),
            state: engine.state(),
        };
        writeln!(stdout, "{}", serde_json::to_string(&ui)?)?;
        stdout.flush()?;
        engine.mark_synced();
    }
    Ok(())
}

/// Drive the run with a simple random player. Same bot seed, same run.
fn run_with_bot(engine: &mut SimEngine, ticks: u64, bot_seed: u64) -> Result<()> {
    let mut rng = Pcg64Mcg::seed_from_u64(bot_seed);
    engine.run_ticks(0)?;
    let mut accepted = 0u64;
    let mut submitted = 0u64;

    for _ in 0..ticks {
        // Roughly one action per second at 10 Hz.
        if rng.gen_bool(0.1) {
            let command = bot_command(&mut rng, engine.state(), engine.catalogs());
            submitted += 1;
            if engine.submit(command)? {
                accepted += 1;
            }
        }
        engine.tick()?;
    }
    log::info!("bot submitted {submitted} commands, {accepted} accepted");
    Ok(())
}

fn bot_command(rng: &mut Pcg64Mcg, state: &SimStateV1, catalogs: &Catalogs) -> PlayerCommand {
    if let Some(active) = &state.contracts.active {
        if active.completed {
            return PlayerCommand::ClaimContractReward;
        }
    }
    if state.events.active.as_ref().is_some_and(|e| !e.consumed) {
        return PlayerCommand::TapEvent;
    }
    if !state.milestones.pending_toast.is_empty() {
        return PlayerCommand::DismissMilestoneToast;
    }

    match rng.gen_range(0..10) {
        0..=3 => PlayerCommand::Tap { amount: None },
        4 | 5 if !catalogs.machines.is_empty() => {
            let def = &catalogs.machines[rng.gen_range(0..catalogs.machines.len())];
            let qty = if rng.gen_bool(0.2) { 999 } else { 1 };
            PlayerCommand::BuyMachine { code: def.code.clone(), qty }
        }
        6 if !catalogs.upgrades.is_empty() => {
            let def = &catalogs.upgrades[rng.gen_range(0..catalogs.upgrades.len())];
            PlayerCommand::BuyUpgrade { id: def.id.clone() }
        }
        7 if !state.machines.is_empty() => {
            let stack = &state.machines[rng.gen_range(0..state.machines.len())];
            PlayerCommand::UpgradeMachineTier { code: stack.code.clone() }
        }
        8 => match state.contracts.revealed.first() {
            Some(id) => PlayerCommand::StartContract { id: id.clone() },
            None => PlayerCommand::Tap { amount: None },
        },
        _ => match state.wrecks.wrecks.iter().find(|(_, w)| !w.depleted) {
            Some((id, _)) => PlayerCommand::TapWreck { id: *id },
            None => PlayerCommand::Tap { amount: None },
        },
    }
}

fn print_summary(engine: &SimEngine, ticks: u64) -> Result<()> {
    let state = engine.state();
    let run_id = &engine.run_id;
    let store = &engine.store;
    let micro = |v: u64| v as f64 / starforge_core::types::MICRO_PER_UNIT as f64;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {}", state.tick);
    println!("  flux:           {:.3} / {:.3}", micro(state.resources.flux), micro(state.caps.flux));
    println!("  alloy:          {:.3} / {:.3}", micro(state.resources.alloy), micro(state.caps.alloy));
    println!("  signal:         {:.3} / {:.3}", micro(state.resources.signal), micro(state.caps.signal));
    println!("  flux earned:    {:.3}", micro(state.stats.total_flux_earned));
    println!("  overflow lost:  {:.3}", micro(state.stats.overflow_lost));
    println!("  taps:           {}", state.stats.total_taps);

    println!();
    println!("=== HOLDINGS ===");
    if state.machines.is_empty() {
        println!("  (no machines)");
    }
    for stack in &state.machines {
        println!(
            "  {:<12} x{:<5} tier {} {}",
            stack.code,
            stack.count,
            stack.tier,
            if stack.enabled { "" } else { "(off)" }
        );
    }
    println!("  upgrades:       {}", state.upgrades_purchased.join(", "));

    println!();
    println!("=== ACTIVITY ===");
    println!("  contracts done: {}", state.contracts.completed.len());
    println!("  milestones:     {}", state.milestones.claimed.len());
    println!("  live wrecks:    {}", state.wrecks.wrecks.values().filter(|w| !w.depleted).count());
    for event_type in [
        "contract_revealed",
        "contract_expired",
        "event_spawned",
        "wreck_spawned",
        "wreck_harvested",
        "resources_overflowed",
    ] {
        println!("  {:<22} {}", event_type, store.event_count(run_id, event_type)?);
    }
    println!("  snapshots:      {}", store.snapshot_count(run_id)?);
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
