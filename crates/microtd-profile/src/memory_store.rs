//! In-memory profile store for tests.
//!
//! Holds the last saved envelope as bytes so the decode path matches the
//! file store exactly. Switches force save failures or an unreachable
//! storage condition.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use microtd_progression::{ProgressionProfile, ProgressionSystem};

use crate::error::ProfileStoreError;
use crate::migration::MigrationRegistry;
use crate::schema::{LastRunMetadata, SaveFile};
use crate::store::{CorruptionPolicy, LoadedProfile, ProfileStore, Recovery, lock};

#[derive(Debug)]
pub struct MemoryProfileStore {
    policy: CorruptionPolicy,
    migrations: MigrationRegistry,
    data: Mutex<Option<Vec<u8>>>,
    backups: Mutex<Vec<Vec<u8>>>,
    fail_saves: AtomicBool,
    unavailable: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryProfileStore {
    pub fn new(policy: CorruptionPolicy) -> Self {
        Self {
            policy,
            migrations: MigrationRegistry::standard(),
            data: Mutex::new(None),
            backups: Mutex::new(Vec::new()),
            fail_saves: AtomicBool::new(false),
            unavailable: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
        }
    }

    /// A store that already holds `bytes`, valid or not.
    pub fn with_bytes(policy: CorruptionPolicy, bytes: impl Into<Vec<u8>>) -> Self {
        let store = Self::new(policy);
        *lock(&store.data) = Some(bytes.into());
        store
    }

    /// While set, every save fails with a write error and stores nothing.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// While set, every load fails as if the storage were locked.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn stored_bytes(&self) -> Option<Vec<u8>> {
        lock(&self.data).clone()
    }

    /// Unreadable data moved aside by `ResetAndBackup` loads.
    pub fn backups(&self) -> Vec<Vec<u8>> {
        lock(&self.backups).clone()
    }

    /// Successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, system: &ProgressionSystem) -> Result<LoadedProfile, ProfileStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Unavailable(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "storage locked",
            )));
        }

        let mut data = lock(&self.data);
        let Some(bytes) = data.as_ref() else {
            return Ok(LoadedProfile::fresh());
        };
        let err = match SaveFile::decode(bytes, &self.migrations) {
            Ok(save) => return Ok(LoadedProfile::from_save(save, system)),
            Err(err) => err,
        };

        match self.policy {
            CorruptionPolicy::Throw => Err(err),
            CorruptionPolicy::ResetAndBackup => {
                if let Some(bytes) = data.take() {
                    lock(&self.backups).push(bytes);
                }
                tracing::warn!(%err, "corrupt profile backed up, starting fresh");
                Ok(LoadedProfile::recovered(Recovery::BackedUp { backup: None }))
            }
            CorruptionPolicy::ResetSilently => {
                *data = None;
                tracing::warn!(%err, "corrupt profile discarded, starting fresh");
                Ok(LoadedProfile::recovered(Recovery::Discarded))
            }
        }
    }

    fn save(
        &self,
        profile: &ProgressionProfile,
        last_run: Option<&LastRunMetadata>,
    ) -> Result<(), ProfileStoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ProfileStoreError::Write(std::io::Error::other("saves disabled")));
        }
        let bytes = SaveFile::new(profile.clone(), last_run.cloned()).to_json_bytes()?;
        *lock(&self.data) = Some(bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn reset(&self) -> Result<(), ProfileStoreError> {
        *lock(&self.data) = None;
        Ok(())
    }
}
