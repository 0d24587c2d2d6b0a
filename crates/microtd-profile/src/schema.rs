//! The versioned save envelope and its decode pipeline.
//!
//! On disk a save is pretty-printed JSON:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "profile": { "xp": 120, "level": 2, "unlocks": ["relic_uncommon_pack"] },
//!   "last_run": { "run_seed": 7, "did_win": false, "waves_cleared": 5, "ticks_survived": 4210 },
//!   "saved_at_unix_ms": 1760572800000
//! }
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use microtd_core::summary::RunSummary;
use microtd_progression::ProgressionProfile;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProfileStoreError;
use crate::migration::MigrationRegistry;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Just enough of the last applied run to detect a repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRunMetadata {
    pub run_seed: u64,
    pub did_win: bool,
    pub waves_cleared: u32,
    pub ticks_survived: u64,
}

impl From<&RunSummary> for LastRunMetadata {
    fn from(summary: &RunSummary) -> Self {
        Self {
            run_seed: summary.run_seed,
            did_win: summary.did_win,
            waves_cleared: summary.waves_cleared,
            ticks_survived: summary.ticks_survived,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFile {
    pub schema_version: u32,
    pub profile: ProgressionProfile,
    pub last_run: Option<LastRunMetadata>,
    pub saved_at_unix_ms: u64,
}

impl SaveFile {
    /// Wrap a profile at the current schema version, stamped now.
    pub fn new(profile: ProgressionProfile, last_run: Option<LastRunMetadata>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            profile,
            last_run,
            saved_at_unix_ms: unix_millis(),
        }
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>, ProfileStoreError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse stored bytes, migrating older schemas forward.
    ///
    /// Every failure here means the bytes are unusable: unparsable JSON, an
    /// unknown shape, a schema newer than this build, or a failed migration.
    pub fn decode(bytes: &[u8], migrations: &MigrationRegistry) -> Result<Self, ProfileStoreError> {
        let doc: Value = serde_json::from_slice(bytes)
            .map_err(|e| ProfileStoreError::Corrupt(format!("invalid JSON: {e}")))?;
        let version = schema_version_of(&doc)?;
        if version > CURRENT_SCHEMA_VERSION {
            return Err(ProfileStoreError::Corrupt(format!(
                "schema version {version} is newer than supported version {CURRENT_SCHEMA_VERSION}"
            )));
        }

        let doc = migrations.migrate(doc, version, CURRENT_SCHEMA_VERSION)?;
        serde_json::from_value(doc)
            .map_err(|e| ProfileStoreError::Corrupt(format!("invalid save envelope: {e}")))
    }
}

/// Enveloped saves carry their version; a bare profile object is version 0.
fn schema_version_of(doc: &Value) -> Result<u32, ProfileStoreError> {
    let Value::Object(fields) = doc else {
        return Err(ProfileStoreError::Corrupt("save is not a JSON object".into()));
    };
    match fields.get("schema_version") {
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| ProfileStoreError::Corrupt(format!("invalid schema version: {v}"))),
        None if fields.contains_key("xp") => Ok(0),
        None => Err(ProfileStoreError::Corrupt("missing schema version".into())),
    }
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
