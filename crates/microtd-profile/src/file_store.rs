//! JSON file profile store with atomic replace.
//!
//! A save writes the whole envelope to a uniquely named temp file in the
//! destination directory, fsyncs it, then renames it over the canonical
//! path. The temp file is removed on every failure path when it drops.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use microtd_progression::{ProgressionProfile, ProgressionSystem};

use crate::error::ProfileStoreError;
use crate::migration::MigrationRegistry;
use crate::schema::{LastRunMetadata, SaveFile, unix_millis};
use crate::store::{CorruptionPolicy, LoadedProfile, ProfileStore, Recovery};

/// Failure points a test can force during `save`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFault {
    /// Fail after the temp file is written and synced, before the rename.
    BeforeReplace,
}

#[derive(Debug)]
pub struct JsonFileProfileStore {
    path: PathBuf,
    policy: CorruptionPolicy,
    migrations: MigrationRegistry,
    fault: Option<SaveFault>,
}

impl JsonFileProfileStore {
    pub fn new(path: impl Into<PathBuf>, policy: CorruptionPolicy) -> Self {
        Self {
            path: path.into(),
            policy,
            migrations: MigrationRegistry::standard(),
            fault: None,
        }
    }

    /// Replace the migration chain used on load.
    pub fn with_migrations(mut self, migrations: MigrationRegistry) -> Self {
        self.migrations = migrations;
        self
    }

    #[cfg(any(test, feature = "test-utils"))]
    pub fn with_fault(mut self, fault: SaveFault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> CorruptionPolicy {
        self.policy
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| "profile.json".to_string(), |n| n.to_string_lossy().into_owned())
    }

    fn recover(&self, err: ProfileStoreError) -> Result<LoadedProfile, ProfileStoreError> {
        match self.policy {
            CorruptionPolicy::Throw => Err(err),
            CorruptionPolicy::ResetAndBackup => {
                let backup = match self.move_to_backup() {
                    Ok(backup) => {
                        tracing::warn!(%err, backup = %backup.display(), "corrupt profile backed up, starting fresh");
                        Some(backup)
                    }
                    Err(io_err) => {
                        tracing::warn!(%err, %io_err, "corrupt profile could not be backed up, starting fresh");
                        None
                    }
                };
                Ok(LoadedProfile::recovered(Recovery::BackedUp { backup }))
            }
            CorruptionPolicy::ResetSilently => {
                match fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(io_err) => tracing::warn!(%io_err, "corrupt profile could not be removed"),
                }
                tracing::warn!(%err, "corrupt profile discarded, starting fresh");
                Ok(LoadedProfile::recovered(Recovery::Discarded))
            }
        }
    }

    /// Rename the canonical file to `<stem>.corrupt.<unix-millis>.json`,
    /// adding a counter if that name is taken.
    fn move_to_backup(&self) -> io::Result<PathBuf> {
        let stem = self
            .path
            .file_stem()
            .map_or_else(|| "profile".to_string(), |s| s.to_string_lossy().into_owned());
        let stamp = unix_millis();
        let dir = self.directory();

        let mut candidate = dir.join(format!("{stem}.corrupt.{stamp}.json"));
        let mut n = 1u32;
        while candidate.exists() {
            candidate = dir.join(format!("{stem}.corrupt.{stamp}.{n}.json"));
            n += 1;
        }
        fs::rename(&self.path, &candidate)?;
        Ok(candidate)
    }
}

impl ProfileStore for JsonFileProfileStore {
    fn load(&self, system: &ProgressionSystem) -> Result<LoadedProfile, ProfileStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no saved profile, starting fresh");
                return Ok(LoadedProfile::fresh());
            }
            Err(e) => return Err(ProfileStoreError::Unavailable(e)),
        };

        match SaveFile::decode(&bytes, &self.migrations) {
            Ok(save) => {
                let loaded = LoadedProfile::from_save(save, system);
                tracing::info!(
                    path = %self.path.display(),
                    level = loaded.profile.level,
                    xp = loaded.profile.xp,
                    "profile loaded"
                );
                Ok(loaded)
            }
            Err(err) => self.recover(err),
        }
    }

    fn save(
        &self,
        profile: &ProgressionProfile,
        last_run: Option<&LastRunMetadata>,
    ) -> Result<(), ProfileStoreError> {
        let bytes = SaveFile::new(profile.clone(), last_run.cloned()).to_json_bytes()?;

        let dir = self.directory();
        fs::create_dir_all(dir).map_err(ProfileStoreError::Write)?;
        let mut temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", self.file_name()))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(ProfileStoreError::Write)?;
        temp.write_all(&bytes).map_err(ProfileStoreError::Write)?;
        temp.as_file().sync_all().map_err(ProfileStoreError::Write)?;

        if self.fault == Some(SaveFault::BeforeReplace) {
            return Err(ProfileStoreError::InjectedFault);
        }

        temp.persist(&self.path)
            .map_err(|e| ProfileStoreError::Write(e.error))?;
        tracing::info!(
            path = %self.path.display(),
            level = profile.level,
            xp = profile.xp,
            run_seed = last_run.map(|r| r.run_seed),
            "profile saved"
        );
        Ok(())
    }

    fn reset(&self) -> Result<(), ProfileStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "profile reset");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProfileStoreError::Write(e)),
        }
    }
}
