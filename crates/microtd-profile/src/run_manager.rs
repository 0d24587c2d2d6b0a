//! Exactly-once application of finished runs to the stored profile.
//!
//! `apply_run` is keyed by run seed. A seed matching the last committed run
//! is a duplicate, and a seed already being applied on another thread is
//! rejected as in flight. Both return without touching the profile.
//!
//! Application is compute-then-commit: progression runs on a copy, the copy
//! is saved, and only a successful save replaces the in-memory profile and
//! last-run marker.

use std::collections::BTreeSet;
use std::sync::Mutex;

use microtd_core::summary::RunSummary;
use microtd_progression::{ProgressionEvent, ProgressionProfile, ProgressionSystem};

use crate::error::RunManagerError;
use crate::schema::LastRunMetadata;
use crate::store::{ProfileStore, lock};

/// Outcome of [`RunManager::apply_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunApplication {
    Applied(Vec<ProgressionEvent>),
    /// The last committed run has this seed.
    Duplicate,
    /// Another call is applying this seed right now.
    InFlight,
}

impl RunApplication {
    /// Events produced by the application. Empty unless applied.
    pub fn events(&self) -> &[ProgressionEvent] {
        match self {
            Self::Applied(events) => events,
            Self::Duplicate | Self::InFlight => &[],
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

#[derive(Debug, Clone, Default)]
struct Committed {
    profile: ProgressionProfile,
    last_run: Option<LastRunMetadata>,
}

/// Owns the live profile and the store it persists to. `Send + Sync`, so it
/// can sit behind an `Arc` on a persistence thread.
#[derive(Debug)]
pub struct RunManager<S: ProfileStore> {
    store: S,
    system: ProgressionSystem,
    committed: Mutex<Committed>,
    in_flight: Mutex<BTreeSet<u64>>,
    /// Serializes compute-save-commit so concurrent runs never overwrite
    /// each other's credit.
    apply_lock: Mutex<()>,
}

impl<S: ProfileStore> RunManager<S> {
    /// Load the stored profile and last-run marker.
    pub fn load(store: S, system: ProgressionSystem) -> Result<Self, RunManagerError> {
        let loaded = store.load(&system)?;
        Ok(Self {
            store,
            system,
            committed: Mutex::new(Committed {
                profile: loaded.profile,
                last_run: loaded.last_run,
            }),
            in_flight: Mutex::new(BTreeSet::new()),
            apply_lock: Mutex::new(()),
        })
    }

    /// Credit a finished run to the profile and persist it, once per seed.
    ///
    /// A save failure leaves the committed profile and marker untouched.
    pub fn apply_run(&self, summary: &RunSummary) -> Result<RunApplication, RunManagerError> {
        let seed = summary.run_seed;
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, seed) else {
            tracing::warn!(run_seed = seed, "run already being applied, skipping");
            return Ok(RunApplication::InFlight);
        };
        let _serial = lock(&self.apply_lock);

        let mut next = {
            let committed = lock(&self.committed);
            if committed.last_run.as_ref().is_some_and(|r| r.run_seed == seed) {
                tracing::warn!(run_seed = seed, "run already applied, skipping");
                return Ok(RunApplication::Duplicate);
            }
            committed.profile.clone()
        };

        let events = self.system.apply_run(summary, &mut next);
        let last_run = LastRunMetadata::from(summary);
        self.store.save(&next, Some(&last_run))?;

        tracing::info!(
            run_seed = seed,
            level = next.level,
            xp = next.xp,
            events = events.len(),
            "run applied"
        );
        let mut committed = lock(&self.committed);
        committed.profile = next;
        committed.last_run = Some(last_run);
        Ok(RunApplication::Applied(events))
    }

    /// Wipe stored and in-memory progress.
    pub fn reset_profile(&self) -> Result<(), RunManagerError> {
        let _serial = lock(&self.apply_lock);
        self.store.reset()?;
        *lock(&self.committed) = Committed::default();
        tracing::info!("profile reset");
        Ok(())
    }

    pub fn profile(&self) -> ProgressionProfile {
        lock(&self.committed).profile.clone()
    }

    pub fn last_run(&self) -> Option<LastRunMetadata> {
        lock(&self.committed).last_run.clone()
    }

    pub fn system(&self) -> &ProgressionSystem {
        &self.system
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Marks a seed as in flight until dropped.
struct InFlightGuard<'a> {
    seeds: &'a Mutex<BTreeSet<u64>>,
    seed: u64,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(seeds: &'a Mutex<BTreeSet<u64>>, seed: u64) -> Option<Self> {
        lock(seeds).insert(seed).then(|| Self { seeds, seed })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.seeds).remove(&self.seed);
    }
}
