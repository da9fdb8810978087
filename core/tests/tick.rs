//! Tick stepper tests: production, clamping, boosts and the clock.

use starforge_core::{
    apply_input,
    config::{Catalogs, MachineBehavior, UpgradeDef, UpgradeEffect},
    create_fresh_state,
    rng::Mulberry32,
    state::{MachineStack, ProdBoost},
    step_tick, step_tick_with_events,
    event::SimEvent,
    types::Resources,
    PlayerCommand, SimError, SimStateV1,
};

// ── Test helpers ────────────────────────────────────────────────────────────

/// Test content with the random subsystems switched off.
fn economy_only() -> Catalogs {
    let mut c = Catalogs::default_test();
    c.contracts.clear();
    c.events.clear();
    c.milestones.clear();
    c.wrecks.clear();
    c
}

fn with_stack(state: &mut SimStateV1, code: &str, count: u64) {
    let mut stack = MachineStack::new(code);
    stack.count = count;
    state.machines.push(stack);
}

/// Register a free upgrade carrying `effect` and mark it purchased.
fn with_upgrade(c: &mut Catalogs, state: &mut SimStateV1, id: &str, effect: UpgradeEffect) {
    c.upgrades.push(UpgradeDef {
        id:                   id.into(),
        label:                String::new(),
        cost:                 Resources::ZERO,
        unlock_at_flux_micro: 0,
        prerequisites:        vec![],
        effects:              vec![effect],
    });
    state.upgrades_purchased.push(id.into());
}

fn step_n(mut state: SimStateV1, catalogs: &Catalogs, n: u64) -> SimStateV1 {
    for _ in 0..n {
        state = step_tick(&state, catalogs).unwrap();
    }
    state
}

// ── Clock and registration ──────────────────────────────────────────────────

#[test]
fn empty_catalogs_only_advance_the_clock() {
    let c = Catalogs::default();
    let state = create_fresh_state(9, &c);
    let next = step_tick(&state, &c).unwrap();

    let mut expected = state.clone();
    expected.tick = 1;
    assert_eq!(next, expected);
}

#[test]
fn balance_alone_moves_only_the_clocks() {
    let c = Catalogs::default().with_balance(Catalogs::test_balance());
    let state = create_fresh_state(9, &c);
    let next = step_n(state.clone(), &c, 250);

    let mut expected = state;
    expected.tick = 250;
    expected.contracts.last_reveal_roll_tick = 250;
    assert_eq!(next, expected);
}

#[test]
fn content_without_balance_is_an_error() {
    let mut c = Catalogs::default_test();
    c.balance = None;
    let state = create_fresh_state(1, &c);
    assert!(matches!(step_tick(&state, &c), Err(SimError::BalanceNotRegistered)));
}

#[test]
fn stepping_never_mutates_its_input() {
    let c = Catalogs::default_test();
    let mut state = create_fresh_state(3, &c);
    with_stack(&mut state, "CUTTER", 5);
    let before = state.clone();
    let _ = step_tick(&state, &c).unwrap();
    assert_eq!(state, before);
}

// ── Production ──────────────────────────────────────────────────────────────

#[test]
fn producer_yields_rate_times_dt_per_unit() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "CUTTER", 1);

    let one = step_tick(&state, &c).unwrap();
    assert_eq!(one.resources.flux, 100, "1000/s at 10 Hz");
    assert!(one.dirty);

    let ten = step_n(state, &c, 10);
    assert_eq!(ten.resources.flux, 1_000);
    assert_eq!(ten.stats.total_flux_earned, 1_000);
}

#[test]
fn production_scales_with_count_and_tier() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    let mut stack = MachineStack::new("CUTTER");
    stack.count = 3;
    stack.tier = 2;
    state.machines.push(stack);

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources.flux, 600, "100 × tier 2.0 × 3 units");
}

#[test]
fn disabled_stacks_produce_nothing() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "CUTTER", 10);
    state = apply_input(
        &state,
        &PlayerCommand::ToggleMachineEnabled { code: "CUTTER".into(), enabled: false },
        &c,
    )
    .unwrap();

    let next = step_n(state, &c, 20);
    assert_eq!(next.resources.flux, 0);
}

#[test]
fn converter_consumes_input_for_output() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "SMELTER", 1);
    state.resources.flux = 1_000;

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources.flux, 800);
    assert_eq!(next.resources.alloy, 100);

    state.resources.flux = 50;
    let starved = step_tick(&state, &c).unwrap();
    assert_eq!(starved.resources.flux, 0, "never consumes more than held");
    assert_eq!(starved.resources.alloy, 25);

    state.resources.flux = 0;
    let idle = step_tick(&state, &c).unwrap();
    assert_eq!(idle.resources, Resources::ZERO);
}

#[test]
fn contract_machines_produce_signal() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "RELAY", 2);

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources, Resources::new(0, 0, 100));
}

#[test]
fn cosmic_machines_feed_every_resource_without_multipliers() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    let mut beacon = MachineStack::new("BEACON");
    beacon.count = 2;
    beacon.tier = 3;
    state.machines.push(beacon);
    state.events.prod_boosts.push(ProdBoost {
        source:          "TEST".into(),
        mult:            5.0,
        expires_at_tick: 1_000,
    });

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources, Resources::new(20, 20, 20));
    assert_eq!(next.stats.total_flux_earned, 20);
}

#[test]
fn overflow_is_clamped_and_counted() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "CUTTER", 1);
    state.caps.flux = 10_000;
    state.resources.flux = 9_950;

    let (next, events) = step_tick_with_events(&state, &c).unwrap();
    assert_eq!(next.resources.flux, 10_000);
    assert_eq!(next.stats.overflow_lost, 50);
    assert_eq!(next.stats.total_flux_earned, 50, "only kept flux counts");
    assert!(events.contains(&SimEvent::ResourcesOverflowed { tick: 1, lost_micro: 50 }));
}

#[test]
fn prod_boost_applies_until_its_expiry_tick() {
    let c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "CUTTER", 1);
    state.events.prod_boosts.push(ProdBoost {
        source:          "SOLAR_FLARE".into(),
        mult:            2.0,
        expires_at_tick: 100,
    });

    let boosted = step_tick(&state, &c).unwrap();
    assert_eq!(boosted.resources.flux, 200);

    state.tick = 99;
    let (expired, events) = step_tick_with_events(&state, &c).unwrap();
    assert_eq!(expired.resources.flux, 100);
    assert!(expired.events.prod_boosts.is_empty(), "expired boosts are pruned");
    assert!(events.iter().any(|e| matches!(e, SimEvent::BoostsExpired { prod_boosts: 1, .. })));
}

// ── Multiplier chain ────────────────────────────────────────────────────────

#[test]
fn boosters_compound_by_tier_and_count() {
    let mut c = economy_only();
    for def in c.machines.iter_mut().filter(|m| m.code == "AMPLIFIER") {
        def.behavior = MachineBehavior::Booster { click_mult: 2.0, global_prod_mult: 2.0 };
    }
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "CUTTER", 1);
    let mut amp = MachineStack::new("AMPLIFIER");
    amp.count = 2;
    amp.tier = 2;
    state.machines.push(amp);

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources.flux, 800, "100 × (2^1.5)^2");

    state.machines[1].enabled = false;
    let off = step_tick(&state, &c).unwrap();
    assert_eq!(off.resources.flux, 100);
}

#[test]
fn global_upgrade_scales_every_producer() {
    let mut c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "CUTTER", 2);
    with_stack(&mut state, "RELAY", 2);
    with_upgrade(&mut c, &mut state, "OVERDRIVE", UpgradeEffect::GlobalProdMult { mult: 1.5 });

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources, Resources::new(300, 0, 150));
}

#[test]
fn machine_upgrade_scales_only_its_code() {
    let mut c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "CUTTER", 1);
    with_stack(&mut state, "RELAY", 2);
    with_upgrade(
        &mut c,
        &mut state,
        "CUTTER_TUNING",
        UpgradeEffect::MachineProdMult { code: "CUTTER".into(), mult: 3.0 },
    );

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources, Resources::new(300, 0, 100));

    with_upgrade(&mut c, &mut state, "OVERDRIVE", UpgradeEffect::GlobalProdMult { mult: 1.5 });
    let both = step_tick(&state, &c).unwrap();
    assert_eq!(both.resources, Resources::new(450, 0, 150));
}

#[test]
fn converter_efficiency_raises_output_not_intake() {
    let mut c = economy_only();
    let mut state = create_fresh_state(1, &c);
    with_stack(&mut state, "SMELTER", 1);
    state.resources.flux = 1_000;
    with_upgrade(
        &mut c,
        &mut state,
        "HOT_CRUCIBLE",
        UpgradeEffect::ConverterEfficiency { code: "SMELTER".into(), mult: 1.5 },
    );

    let next = step_tick(&state, &c).unwrap();
    assert_eq!(next.resources.flux, 800);
    assert_eq!(next.resources.alloy, 150, "200 in × 0.5 × 1.5");
}

// ── Dirty flag ──────────────────────────────────────────────────────────────

#[test]
fn dirty_is_sticky_and_set_by_resource_changes() {
    let c = economy_only();
    let state = create_fresh_state(1, &c);
    assert!(!step_tick(&state, &c).unwrap().dirty, "nothing changed");

    let mut dirty = state.clone();
    dirty.dirty = true;
    assert!(step_tick(&dirty, &c).unwrap().dirty, "never cleared by a tick");
}

// ── Invariants under a random player ────────────────────────────────────────

fn random_command(rng: &mut Mulberry32, state: &SimStateV1, catalogs: &Catalogs) -> PlayerCommand {
    let codes: Vec<&str> = catalogs.machines.iter().map(|m| m.code.as_str()).collect();
    let upgrades: Vec<&str> = catalogs.upgrades.iter().map(|u| u.id.as_str()).collect();
    match rng.next_index(9) {
        0 | 1 => PlayerCommand::Tap { amount: None },
        2 => PlayerCommand::BuyMachine {
            code: codes[rng.next_index(codes.len())].to_string(),
            qty:  if rng.chance(0.3) { 999 } else { 1 },
        },
        3 => PlayerCommand::UpgradeMachineTier {
            code: codes[rng.next_index(codes.len())].to_string(),
        },
        4 => PlayerCommand::BuyUpgrade {
            id: upgrades[rng.next_index(upgrades.len())].to_string(),
        },
        5 => match state.contracts.revealed.first() {
            Some(id) => PlayerCommand::StartContract { id: id.clone() },
            None => PlayerCommand::ClaimContractReward,
        },
        6 => PlayerCommand::TapEvent,
        7 => match state.wrecks.wrecks.keys().next() {
            Some(id) => PlayerCommand::TapWreck { id: *id },
            None => PlayerCommand::DismissMilestoneToast,
        },
        _ => PlayerCommand::ClaimContractReward,
    }
}

#[test]
fn resources_stay_within_effective_caps() {
    let c = Catalogs::default_test();
    let mut state = create_fresh_state(2024, &c);
    let mut rng = Mulberry32::new(99);

    for _ in 0..3_000 {
        for _ in 0..rng.next_index(3) {
            let cmd = random_command(&mut rng, &state, &c);
            state = apply_input(&state, &cmd, &c).unwrap();
            let caps = state.effective_caps();
            assert!(caps.covers(&state.resources), "after {cmd:?}: {state:?}");
        }
        state = step_tick(&state, &c).unwrap();
        let caps = state.effective_caps();
        assert!(caps.covers(&state.resources), "tick {}: {state:?}", state.tick);

        // Disjoint contract sets.
        let c_state = &state.contracts;
        if let Some(active) = &c_state.active {
            assert!(!c_state.revealed.contains(&active.id));
            assert!(!c_state.completed.contains(&active.id));
        }
        assert!(c_state.revealed.iter().all(|id| !c_state.completed.contains(id)));

        // Tiers stay in range.
        assert!(state.machines.iter().all(|m| (1..=3).contains(&m.tier)));
    }
    assert_eq!(state.tick, 3_000);
}
