//! Property-based tests for save encoding, migration, and run crediting.

use microtd_core::summary::RunSummary;
use microtd_profile::CorruptionPolicy;
use microtd_profile::memory_store::MemoryProfileStore;
use microtd_profile::migration::MigrationRegistry;
use microtd_profile::run_manager::{RunApplication, RunManager};
use microtd_profile::schema::{LastRunMetadata, SaveFile};
use microtd_progression::{ProgressionProfile, ProgressionSystem};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_profile() -> impl Strategy<Value = ProgressionProfile> {
    (
        any::<u64>(),
        1..200u32,
        prop::collection::btree_set("[a-z_]{1,16}", 0..6),
    )
        .prop_map(|(xp, level, unlocks)| ProgressionProfile { xp, level, unlocks })
}

fn arb_last_run() -> impl Strategy<Value = Option<LastRunMetadata>> {
    prop::option::of((any::<u64>(), any::<bool>(), 0..50u32, any::<u64>()).prop_map(
        |(run_seed, did_win, waves_cleared, ticks_survived)| LastRunMetadata {
            run_seed,
            did_win,
            waves_cleared,
            ticks_survived,
        },
    ))
}

/// Small seed space so repeats of the previous seed come up often.
fn arb_runs() -> impl Strategy<Value = Vec<RunSummary>> {
    prop::collection::vec(
        (0..4u64, any::<bool>(), 0..13u32, 0..200u32, 0..4u32).prop_map(
            |(run_seed, did_win, waves_cleared, enemies_defeated, relics_collected)| RunSummary {
                run_seed,
                did_win,
                waves_cleared,
                enemies_defeated,
                total_coins_earned: 0,
                relics_collected,
                ticks_survived: 1_000,
            },
        ),
        1..20,
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // -----------------------------------------------------------------------
    // Test 1: a current save decodes to itself and re-encodes byte for byte
    // -----------------------------------------------------------------------
    #[test]
    fn save_file_survives_encoding(profile in arb_profile(), last_run in arb_last_run()) {
        let save = SaveFile::new(profile, last_run);
        let bytes = save.to_json_bytes().unwrap();
        let decoded = SaveFile::decode(&bytes, &MigrationRegistry::standard()).unwrap();
        prop_assert_eq!(&decoded, &save);
        prop_assert_eq!(decoded.to_json_bytes().unwrap(), bytes);
    }

    // -----------------------------------------------------------------------
    // Test 2: a bare version 0 profile keeps xp, level, and unlocks
    // -----------------------------------------------------------------------
    #[test]
    fn bare_profile_migration_keeps_progress(profile in arb_profile()) {
        let bare = serde_json::to_vec(&profile).unwrap();
        let save = SaveFile::decode(&bare, &MigrationRegistry::standard()).unwrap();
        prop_assert_eq!(save.schema_version, 1);
        prop_assert_eq!(save.profile.xp, profile.xp);
        prop_assert_eq!(save.profile.level, profile.level);
        prop_assert_eq!(&save.profile.unlocks, &profile.unlocks);
        prop_assert_eq!(save.last_run, None);
    }

    // -----------------------------------------------------------------------
    // Test 3: only a repeat of the last committed seed goes uncredited
    // -----------------------------------------------------------------------
    #[test]
    fn repeated_seed_is_credited_once(runs in arb_runs()) {
        let manager = RunManager::load(
            MemoryProfileStore::new(CorruptionPolicy::Throw),
            ProgressionSystem::default(),
        )
        .unwrap();
        let saves_before = manager.store().save_count();

        let mut last_seed = None;
        let mut expected_xp = 0u64;
        let mut applied = 0usize;
        for run in &runs {
            let outcome = manager.apply_run(run).unwrap();
            if last_seed == Some(run.run_seed) {
                prop_assert_eq!(outcome, RunApplication::Duplicate);
            } else {
                prop_assert!(outcome.is_applied());
                expected_xp += manager.system().rules().calculate_xp(run);
                applied += 1;
                last_seed = Some(run.run_seed);
            }
        }

        let profile = manager.profile();
        prop_assert_eq!(profile.xp, expected_xp);
        prop_assert_eq!(profile.level, manager.system().rules().level_for_xp(expected_xp));
        prop_assert_eq!(manager.store().save_count() - saves_before, applied);
        prop_assert_eq!(manager.last_run().map(|r| r.run_seed), last_seed);
    }
}
