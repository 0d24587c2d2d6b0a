//! MicroTD Profile -- durable storage for cross-run progression.
//!
//! A finished run's [`RunSummary`](microtd_core::summary::RunSummary) reaches
//! the player's profile through a [`run_manager::RunManager`], which applies
//! it exactly once and persists the result through a [`store::ProfileStore`].
//!
//! # Key Types
//!
//! - [`store::ProfileStore`] -- load/save/reset seam with an explicit
//!   [`store::CorruptionPolicy`].
//! - [`file_store::JsonFileProfileStore`] -- atomic temp-file-and-rename JSON store.
//! - [`memory_store::MemoryProfileStore`] -- in-memory double with failure switches.
//! - [`schema::SaveFile`] -- versioned save envelope.
//! - [`migration::MigrationRegistry`] -- schema upgrade chain.
//! - [`run_manager::RunManager`] -- idempotent, compute-then-commit run application.

pub mod error;
pub mod file_store;
pub mod memory_store;
pub mod migration;
pub mod run_manager;
pub mod schema;
pub mod store;

pub use error::{MigrationError, ProfileStoreError, RunManagerError};
pub use store::{CorruptionPolicy, LoadedProfile, ProfileStore};
