//! Error types for profile persistence and run application.

use std::io;

/// Errors from a single migration step or from the migration chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from schema version {from} to version {to}")]
    NoMigrationPath { from: u32, to: u32 },
    #[error("migration from schema version {from} to version {to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },
}

/// Errors surfaced by a [`ProfileStore`](crate::store::ProfileStore).
///
/// `Unavailable` is a storage condition and is never treated as corrupt
/// data, whatever the corruption policy.
#[derive(Debug, thiserror::Error)]
pub enum ProfileStoreError {
    #[error("profile storage unavailable: {0}")]
    Unavailable(#[source] io::Error),

    #[error("profile data is corrupt: {0}")]
    Corrupt(String),

    #[error("profile write failed: {0}")]
    Write(#[source] io::Error),

    #[error("profile encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("injected save fault")]
    InjectedFault,
}

impl ProfileStoreError {
    /// Whether the stored bytes themselves are unusable, as opposed to the
    /// storage being unreachable.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupt(_) | Self::Migration(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunManagerError {
    #[error(transparent)]
    Store(#[from] ProfileStoreError),
}
