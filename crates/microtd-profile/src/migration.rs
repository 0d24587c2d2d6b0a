//! Save-file schema migration framework.
//!
//! A registry of functions that each lift a decoded save document from
//! schema version N to N+1. Documents are migrated as untyped JSON so a
//! step never depends on the current Rust types.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::MigrationError;

/// Lifts a document by exactly one schema version.
pub type MigrationFn = fn(Value) -> Result<Value, MigrationError>;

/// Registry of migration steps keyed by source version.
#[derive(Debug, Clone)]
pub struct MigrationRegistry {
    migrations: BTreeMap<u32, MigrationFn>,
}

impl MigrationRegistry {
    /// No steps; only same-version documents pass.
    pub fn new() -> Self {
        Self {
            migrations: BTreeMap::new(),
        }
    }

    /// Every step needed to bring a shipped save up to
    /// [`CURRENT_SCHEMA_VERSION`](crate::schema::CURRENT_SCHEMA_VERSION).
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(0, bare_profile_to_envelope);
        registry
    }

    /// Register a step from `from_version` to `from_version + 1`.
    pub fn register(&mut self, from_version: u32, migrate: MigrationFn) {
        self.migrations.insert(from_version, migrate);
    }

    /// Check whether a complete path exists from `from` to `to`.
    pub fn can_migrate(&self, from: u32, to: u32) -> bool {
        if from >= to {
            return from == to;
        }
        (from..to).all(|v| self.migrations.contains_key(&v))
    }

    /// Chain registered steps from `from` to `to`. Returns the document
    /// unchanged if `from == to`.
    pub fn migrate(&self, doc: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
        if from == to {
            return Ok(doc);
        }
        if !self.can_migrate(from, to) {
            return Err(MigrationError::NoMigrationPath { from, to });
        }

        let mut current = doc;
        for version in from..to {
            let step = self
                .migrations
                .get(&version)
                .ok_or(MigrationError::NoMigrationPath { from, to })?;
            current = step(current)?;
        }
        Ok(current)
    }

    pub fn step_count(&self) -> usize {
        self.migrations.len()
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Version 0 saves were the bare profile object with no envelope.
fn bare_profile_to_envelope(doc: Value) -> Result<Value, MigrationError> {
    let failed = |reason: &str| MigrationError::MigrationFailed {
        from: 0,
        to: 1,
        reason: reason.to_string(),
    };
    let Value::Object(profile) = doc else {
        return Err(failed("expected a profile object"));
    };
    if !profile.contains_key("xp") {
        return Err(failed("profile has no xp field"));
    }

    let mut envelope = Map::new();
    envelope.insert("schema_version".into(), Value::from(1u32));
    envelope.insert("profile".into(), Value::Object(profile));
    envelope.insert("last_run".into(), Value::Null);
    envelope.insert("saved_at_unix_ms".into(), Value::from(0u64));
    Ok(Value::Object(envelope))
}

// ===========================================================================
// Tests
// ===========================================================================
