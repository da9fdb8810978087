//! Contract lifecycle: reveal rolls, snapshot-based progress, expiry, claim.

use starforge_core::{
    apply_input,
    config::Catalogs,
    create_fresh_state,
    event::SimEvent,
    state::MachineStack,
    step_tick, step_tick_with_events,
    types::Resources,
    PlayerCommand, SimStateV1,
};

fn contracts_only(ids: &[&str]) -> Catalogs {
    let mut c = Catalogs::default_test();
    c.contracts.retain(|def| ids.contains(&def.id.as_str()));
    c.events.clear();
    c.milestones.clear();
    c.wrecks.clear();
    c
}

fn certain_reveals(mut c: Catalogs, max_revealed: usize) -> Catalogs {
    let balance = c.balance.as_mut().unwrap();
    balance.contracts.base_reveal_chance = 1.0;
    balance.contracts.max_revealed = max_revealed;
    c
}

fn apply(state: &SimStateV1, cmd: PlayerCommand, c: &Catalogs) -> SimStateV1 {
    apply_input(state, &cmd, c).unwrap()
}

fn step_n(mut state: SimStateV1, c: &Catalogs, n: u64) -> SimStateV1 {
    for _ in 0..n {
        state = step_tick(&state, c).unwrap();
    }
    state
}

fn started(c: &Catalogs, id: &str, flux: u64) -> SimStateV1 {
    let mut state = create_fresh_state(1, c);
    state.resources.flux = flux;
    state.contracts.revealed.push(id.into());
    apply(&state, PlayerCommand::StartContract { id: id.into() }, c)
}

// ── Progress ────────────────────────────────────────────────────────────────

#[test]
fn progress_counts_only_what_was_earned_after_start() {
    let c = contracts_only(&["FIRST_HAUL"]);
    let state = started(&c, "FIRST_HAUL", 3_000);

    let state = apply(&state, PlayerCommand::Tap { amount: Some(4_000) }, &c);
    let state = step_tick(&state, &c).unwrap();
    assert!(!state.contracts.active.as_ref().unwrap().completed, "4000 of 5000");

    let state = apply(&state, PlayerCommand::Tap { amount: Some(1_000) }, &c);
    let (state, events) = step_tick_with_events(&state, &c).unwrap();
    assert!(state.contracts.active.as_ref().unwrap().completed);
    assert!(events.contains(&SimEvent::ContractCompleted {
        tick: 2,
        contract_id: "FIRST_HAUL".into(),
    }));

    let claimed = apply(&state, PlayerCommand::ClaimContractReward, &c);
    assert_eq!(claimed.resources, Resources::new(8_000, 1_000, 500));
    assert_eq!(claimed.contracts.completed, vec!["FIRST_HAUL".to_string()]);
}

#[test]
fn progress_is_measured_net_of_spending() {
    let c = contracts_only(&["FIRST_HAUL"]);
    let state = started(&c, "FIRST_HAUL", 0);
    let state = apply(&state, PlayerCommand::Tap { amount: Some(4_900) }, &c);
    // Buying a cutter spends 100 of the 4900.
    let state = apply(
        &state,
        PlayerCommand::BuyMachine { code: "CUTTER".into(), qty: 1 },
        &c,
    );
    let state = apply(&state, PlayerCommand::Tap { amount: Some(100) }, &c);
    let state = step_tick(&state, &c).unwrap();
    // 4900 - 100 + 100 + one tick of cutter output (100) = 5000.
    assert!(state.contracts.active.as_ref().unwrap().completed);
}

#[test]
fn ownership_requirements_use_current_counts() {
    let c = contracts_only(&["FLEET"]);
    let mut state = started(&c, "FLEET", 1_000);
    let mut cutters = MachineStack::new("CUTTER");
    cutters.count = 2;
    state.machines.push(cutters);

    let state = step_tick(&state, &c).unwrap();
    assert!(!state.contracts.active.as_ref().unwrap().completed);

    let state = apply(
        &state,
        PlayerCommand::BuyMachine { code: "CUTTER".into(), qty: 1 },
        &c,
    );
    let state = step_tick(&state, &c).unwrap();
    assert!(state.contracts.active.as_ref().unwrap().completed);
}

// ── Expiry ──────────────────────────────────────────────────────────────────

#[test]
fn unfinished_contract_expires_after_its_deadline() {
    let c = contracts_only(&["FIRST_HAUL"]);
    let state = started(&c, "FIRST_HAUL", 0);
    assert_eq!(state.contracts.active.as_ref().unwrap().ends_at_tick, 600);

    let at_deadline = step_n(state, &c, 600);
    assert!(at_deadline.contracts.active.is_some(), "still running on its last tick");

    let (expired, events) = step_tick_with_events(&at_deadline, &c).unwrap();
    assert!(expired.contracts.active.is_none());
    assert_eq!(expired.contracts.revealed, vec!["FIRST_HAUL".to_string()]);
    assert!(expired.contracts.completed.is_empty());
    assert!(events.contains(&SimEvent::ContractExpired {
        tick: 601,
        contract_id: "FIRST_HAUL".into(),
    }));

    // It can be retried.
    let retried = apply(&expired, PlayerCommand::StartContract { id: "FIRST_HAUL".into() }, &c);
    assert_eq!(retried.contracts.active.as_ref().unwrap().ends_at_tick, 601 + 600);
}

#[test]
fn completed_contract_never_expires() {
    let c = contracts_only(&["FIRST_HAUL"]);
    let state = started(&c, "FIRST_HAUL", 0);
    let state = apply(&state, PlayerCommand::Tap { amount: Some(5_000) }, &c);

    let later = step_n(state, &c, 1_000);
    let active = later.contracts.active.as_ref().expect("waits for the claim");
    assert!(active.completed);
}

// ── Reveal rolls ────────────────────────────────────────────────────────────

#[test]
fn reveal_rolls_follow_the_interval() {
    let c = certain_reveals(contracts_only(&["FIRST_HAUL", "FLEET"]), 3);
    let state = create_fresh_state(5, &c);

    let s = step_n(state, &c, 49);
    assert!(s.contracts.revealed.is_empty());
    assert_eq!(s.contracts.last_reveal_roll_tick, 0);

    let s = step_n(s, &c, 1);
    assert_eq!(s.contracts.revealed.len(), 1);
    assert_eq!(s.contracts.last_reveal_roll_tick, 50);

    let s = step_n(s, &c, 50);
    assert_eq!(s.contracts.revealed.len(), 2);

    let s = step_n(s, &c, 50);
    assert_eq!(s.contracts.revealed.len(), 2, "nothing left to reveal");
    assert_eq!(s.contracts.last_reveal_roll_tick, 150, "roll tick still advances");
}

#[test]
fn failed_reveal_roll_still_advances_roll_tick() {
    let mut c = contracts_only(&["FIRST_HAUL", "FLEET"]);
    c.balance.as_mut().unwrap().contracts.base_reveal_chance = 0.0;
    let s = step_n(create_fresh_state(5, &c), &c, 120);

    assert!(s.contracts.revealed.is_empty());
    assert_eq!(s.contracts.last_reveal_roll_tick, 100);
}

#[test]
fn reveal_bonus_is_added_to_the_base_chance() {
    // Seed 9 rolls 0.395 at tick 50: above the 0.35 base, below 0.35 + 0.2.
    let c = contracts_only(&["FIRST_HAUL", "FLEET"]);
    let plain = create_fresh_state(9, &c);
    let mut scanned = plain.clone();
    scanned.upgrades_purchased.push("DEEP_SCAN".into());

    assert!(step_n(plain, &c, 50).contracts.revealed.is_empty());
    assert_eq!(step_n(scanned, &c, 50).contracts.revealed.len(), 1);
}

#[test]
fn roll_tick_advances_without_any_contracts() {
    let c = contracts_only(&[]);
    assert!(c.contracts.is_empty());
    let s = step_n(create_fresh_state(5, &c), &c, 120);

    assert!(s.contracts.revealed.is_empty());
    assert_eq!(s.contracts.last_reveal_roll_tick, 100);
}

#[test]
fn reveals_stop_at_the_revealed_limit() {
    let c = certain_reveals(contracts_only(&["FIRST_HAUL", "FLEET"]), 1);
    let s = step_n(create_fresh_state(5, &c), &c, 200);
    assert_eq!(s.contracts.revealed.len(), 1);
}

#[test]
fn completed_contracts_are_never_revealed_again() {
    let c = certain_reveals(contracts_only(&["FIRST_HAUL"]), 3);
    let mut state = create_fresh_state(5, &c);
    state.contracts.completed.push("FIRST_HAUL".into());

    let s = step_n(state, &c, 300);
    assert!(s.contracts.revealed.is_empty());
    assert!(s.contracts.active.is_none());
}
