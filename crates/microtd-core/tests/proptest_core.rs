//! Property-based tests for the simulation core.
//!
//! Random player sessions are driven against the canonical content and
//! against small hand-built bundles. Every property below must hold for any
//! command sequence a player could submit.

use microtd_core::config::SimConfig;
use microtd_core::definitions::EffectKind;
use microtd_core::economy::CoinReason;
use microtd_core::engine::GameState;
use microtd_core::entity::Enemy;
use microtd_core::event::{Event, EventKind, LivesReason};
use microtd_core::id::EnemyId;
use microtd_core::rng::SimRng;
use microtd_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum Op {
    Place { tower: usize, x: i32, y: i32 },
    Sell { x: i32, y: i32 },
    StartWave,
    ChooseRelic(u32),
    Wait(u64),
}

const TOWERS: [&str; 4] = ["cannon", "frost", "bomb", "railgun"];

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => (0..TOWERS.len(), -1..7i32, -1..7i32).prop_map(|(tower, x, y)| Op::Place { tower, x, y }),
        1 => (0..6i32, 0..6i32).prop_map(|(x, y)| Op::Sell { x, y }),
        3 => Just(Op::StartWave),
        1 => (0..4u32).prop_map(Op::ChooseRelic),
        3 => (1..400u64).prop_map(Op::Wait),
    ]
}

fn arb_session() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(arb_op(), 1..40)
}

fn play(seed: u64, ops: &[Op]) -> GameState {
    let mut game = new_canonical_game(seed);
    for op in ops {
        match op {
            Op::Place { tower, x, y } => {
                place_tower(&mut game, TOWERS[*tower], *x, *y);
            }
            Op::Sell { x, y } => {
                sell_tower(&mut game, *x, *y);
            }
            Op::StartWave => {
                start_wave(&mut game);
            }
            Op::ChooseRelic(index) => {
                choose_relic(&mut game, *index);
            }
            Op::Wait(n) => run_ticks(&mut game, *n),
        }
    }
    game
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // -----------------------------------------------------------------------
    // Test 1: identical seed and commands give identical runs
    // -----------------------------------------------------------------------
    #[test]
    fn same_inputs_same_run(seed in any::<u64>(), ops in arb_session()) {
        let a = play(seed, &ops);
        let b = play(seed, &ops);
        prop_assert_eq!(a.events(), b.events());
        prop_assert_eq!(a.state_hash(), b.state_hash());
        prop_assert_eq!(a.rng(), b.rng());
    }

    // -----------------------------------------------------------------------
    // Test 2: every coin event chains from the previous balance
    // -----------------------------------------------------------------------
    #[test]
    fn coin_events_chain(seed in any::<u64>(), ops in arb_session()) {
        let game = play(seed, &ops);
        let mut balance: i64 = 0;
        let mut earned: u64 = 0;
        for event in game.events().all() {
            if let Event::CoinsChanged { new_total, delta, reason, .. } = event {
                balance += delta;
                prop_assert_eq!(balance, *new_total as i64);
                if *delta > 0 && *reason != CoinReason::GameStart {
                    earned += *delta as u64;
                }
            }
        }
        prop_assert_eq!(balance, game.coins() as i64);
        prop_assert_eq!(earned, game.total_coins_earned());
    }

    // -----------------------------------------------------------------------
    // Test 3: lives only fall, and defeat is announced at most once
    // -----------------------------------------------------------------------
    #[test]
    fn lives_monotonic_and_single_defeat(seed in any::<u64>(), ops in arb_session()) {
        let game = play(seed, &ops);
        let mut last = u32::MAX;
        for event in game.events().all() {
            if let Event::LivesChanged { new_total, reason, .. } = event {
                if *reason == LivesReason::EnemyLeaked {
                    prop_assert!(*new_total <= last);
                }
                last = *new_total;
            }
        }
        prop_assert!(game.events().count_of(EventKind::GameOver) <= 1);
        prop_assert!(game.events().count_of(EventKind::RunCompleted) <= 1);
        if game.lives() == 0 {
            prop_assert_eq!(game.events().count_of(EventKind::GameOver), 1);
        }
    }

    // -----------------------------------------------------------------------
    // Test 4: enemy ids are handed out 1, 2, 3, ... in spawn order
    // -----------------------------------------------------------------------
    #[test]
    fn enemy_ids_sequential(seed in any::<u64>(), ops in arb_session()) {
        let game = play(seed, &ops);
        let ids: Vec<EnemyId> = game
            .events()
            .all()
            .iter()
            .filter_map(|e| match e {
                Event::EnemySpawned { enemy, .. } => Some(*enemy),
                _ => None,
            })
            .collect();
        for (i, id) in ids.iter().enumerate() {
            prop_assert_eq!(id.0, i as u32 + 1);
        }
    }

    // -----------------------------------------------------------------------
    // Test 5: the event stream never goes back in time
    // -----------------------------------------------------------------------
    #[test]
    fn events_and_commands_chronological(seed in any::<u64>(), ops in arb_session()) {
        let game = play(seed, &ops);
        let ticks: Vec<u64> = game.events().all().iter().map(Event::tick).collect();
        prop_assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
        prop_assert!(game.command_log().is_chronological());
        prop_assert_eq!(game.command_log().len(), ops.iter().filter(|o| !matches!(o, Op::Wait(_))).count());
    }

    // -----------------------------------------------------------------------
    // Test 6: only relic offers draw from the run RNG
    // -----------------------------------------------------------------------
    #[test]
    fn rng_untouched_without_offers(seed in any::<u64>(), ops in arb_session()) {
        let game = play(seed, &ops);
        if game.events().count_of(EventKind::RelicOffered) == 0 {
            prop_assert_eq!(game.rng(), &SimRng::new(seed));
        }
    }

    // -----------------------------------------------------------------------
    // Test 7: each spawn lands exactly on wave start plus its offset
    // -----------------------------------------------------------------------
    #[test]
    fn spawns_land_on_offsets(
        delay in 0..50u64,
        mut offsets in prop::collection::vec(0..300u64, 1..8),
    ) {
        let entries: Vec<(&str, u64)> = offsets.iter().map(|&t| ("crawler", t)).collect();
        let defs = build_definitions(|b| {
            b.register_map(line_map())
                .register_enemy(make_enemy("crawler", 10.0, 0.01, 1))
                .register_wave(wave(0, 5, &entries));
        });
        let mut game = GameState::new(9, defs, "line", SimConfig::default()).unwrap();
        run_ticks(&mut game, delay);
        prop_assert!(start_wave(&mut game).is_applied());
        run_ticks(&mut game, 301);

        let mut spawned: Vec<u64> = game
            .events()
            .all()
            .iter()
            .filter(|e| e.kind() == EventKind::EnemySpawned)
            .map(Event::tick)
            .collect();
        spawned.sort_unstable();
        offsets.sort_unstable();
        let expected: Vec<u64> = offsets.iter().map(|t| delay + t).collect();
        prop_assert_eq!(spawned, expected);
    }

    // -----------------------------------------------------------------------
    // Test 8: slows never stack; strongest magnitude, latest duration
    // -----------------------------------------------------------------------
    #[test]
    fn slows_keep_strongest(hits in prop::collection::vec((0..=100u32, 1..120u32), 1..10)) {
        let mut enemy = Enemy::spawn(EnemyId(1), &make_enemy("target", 100.0, 1.0, 0));
        for &(percent, duration) in &hits {
            enemy.apply_slow(fixed(percent as f64 / 100.0), duration);
        }
        let strongest = hits.iter().map(|&(p, _)| fixed(p as f64 / 100.0)).max().unwrap();
        let slow = enemy.slow.unwrap();
        prop_assert_eq!(slow.amount, strongest);
        prop_assert_eq!(slow.remaining_ticks, hits.last().unwrap().1);
        prop_assert!(enemy.effective_speed() <= enemy.base_speed);
        prop_assert!(enemy.effective_speed() >= fixed(0.0));
    }

    // -----------------------------------------------------------------------
    // Test 9: relic offers depend on the seed and the offer history only
    // -----------------------------------------------------------------------
    #[test]
    fn relic_offers_ignore_tower_play(seed in any::<u64>(), x in 0..6i32) {
        let defs = build_definitions(|b| {
            b.register_map(line_map())
                .register_enemy(make_enemy("dart", 1.0, 120.0, 0))
                .register_tower(make_tower("gun", 10, 1.0, 1.0, 1.0))
                .register_relic(make_relic("a", EffectKind::TowerDamageMultiplier, 1.5))
                .register_relic(make_relic("b", EffectKind::TowerRangeMultiplier, 1.5))
                .register_relic(make_relic("c", EffectKind::CoinMultiplier, 1.5))
                .register_relic(make_relic("d", EffectKind::StartingCoins, 10.0))
                .register_relic(make_relic("e", EffectKind::TowerFireRateMultiplier, 1.5));
            for i in 0..3 {
                b.register_wave(wave(i, 0, &[("dart", 0)]));
            }
        });
        let offer_after_two_waves = |build: bool| {
            let mut game = GameState::new(seed, defs.clone(), "line", SimConfig::default()).unwrap();
            if build {
                place_tower(&mut game, "gun", x, 0);
                place_tower(&mut game, "gun", x, 2);
                sell_tower(&mut game, x, 0);
            }
            for _ in 0..2 {
                start_wave(&mut game);
                run_ticks(&mut game, 5);
            }
            game.pending_offer().map(<[String]>::to_vec)
        };
        let plain = offer_after_two_waves(false);
        prop_assert!(plain.is_some());
        prop_assert_eq!(plain, offer_after_two_waves(true));
    }
}
