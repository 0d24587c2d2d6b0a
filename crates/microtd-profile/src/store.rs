//! The storage seam for the cross-run profile.
//!
//! Call sites depend on [`ProfileStore`] only. [`JsonFileProfileStore`]
//! is the production implementation; [`MemoryProfileStore`] is the test
//! double.
//!
//! Every operation may block. Callers that tick a simulation should invoke
//! the store from another thread.
//!
//! [`JsonFileProfileStore`]: crate::file_store::JsonFileProfileStore
//! [`MemoryProfileStore`]: crate::memory_store::MemoryProfileStore

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use microtd_progression::{ProgressionProfile, ProgressionSystem};

use crate::error::ProfileStoreError;
use crate::schema::{LastRunMetadata, SaveFile};

/// What to do with saved data that exists but cannot be decoded. There is
/// no default: every store is built with an explicit choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionPolicy {
    /// Return the decode error to the caller.
    Throw,
    /// Move the unreadable data aside and start from a default profile.
    ResetAndBackup,
    /// Discard the unreadable data and start from a default profile.
    ResetSilently,
}

/// How a load recovered from unreadable data, if it had to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// The data was moved to `backup`, or left in place if the move failed.
    BackedUp { backup: Option<PathBuf> },
    Discarded,
}

/// Result of a successful load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProfile {
    pub profile: ProgressionProfile,
    pub last_run: Option<LastRunMetadata>,
    /// Set when the stored data was unreadable and the policy reset it.
    pub recovery: Option<Recovery>,
}

impl LoadedProfile {
    pub fn fresh() -> Self {
        Self {
            profile: ProgressionProfile::default(),
            last_run: None,
            recovery: None,
        }
    }

    pub(crate) fn recovered(recovery: Recovery) -> Self {
        Self {
            recovery: Some(recovery),
            ..Self::fresh()
        }
    }

    /// Accept a decoded save, granting any unlocks its level is owed.
    pub(crate) fn from_save(save: SaveFile, system: &ProgressionSystem) -> Self {
        let mut profile = save.profile;
        let granted = system.reconcile_unlocks(&mut profile);
        if !granted.is_empty() {
            tracing::info!(?granted, level = profile.level, "reconciled missing unlocks");
        }
        Self {
            profile,
            last_run: save.last_run,
            recovery: None,
        }
    }
}

/// Durable storage for one profile.
pub trait ProfileStore: Send + Sync {
    /// Load the stored profile, or a default one if nothing is stored.
    ///
    /// Unreadable data is handled by the store's [`CorruptionPolicy`].
    /// Storage that cannot be reached is always an error.
    fn load(&self, system: &ProgressionSystem) -> Result<LoadedProfile, ProfileStoreError>;

    /// Replace the stored profile. Either the whole new save becomes
    /// visible or the previous one stays intact.
    fn save(
        &self,
        profile: &ProgressionProfile,
        last_run: Option<&LastRunMetadata>,
    ) -> Result<(), ProfileStoreError>;

    /// Remove the stored profile. Removing nothing is not an error.
    fn reset(&self) -> Result<(), ProfileStoreError>;
}

/// Lock a mutex, recovering the data if a panicking holder poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
