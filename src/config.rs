//! Sync layer configuration
//!
//! Read from the process environment (after loading `.env`), or from a
//! specific env file. Bad values fall back to the default with a warning.

use std::collections::{HashMap, HashSet};
use std::env;
use std::path::Path;
use tracing::warn;

use crate::entities::EntityKind;
use crate::events::DEFAULT_CAPACITY;
use crate::index::IndexInvalidation;
use crate::store::DeletePolicy;

pub const CONSERVATIVE_DELETE_VAR: &str = "HARVEST_CONSERVATIVE_DELETE";
pub const CREW_INDEX_INVALIDATION_VAR: &str = "HARVEST_CREW_INDEX_INVALIDATION";
pub const INITIALLY_ONLINE_VAR: &str = "HARVEST_INITIALLY_ONLINE";
pub const EVENT_CAPACITY_VAR: &str = "HARVEST_EVENT_CAPACITY";

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Stores that delete only after the backend confirms
    pub conservative_delete: HashSet<EntityKind>,
    /// How the crew index reacts to worker mutations
    pub crew_index: IndexInvalidation,
    /// Connectivity seed when the platform gives none
    pub initially_online: bool,
    /// Per-subscriber buffer of the event bus
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conservative_delete: HashSet::new(),
            crew_index: IndexInvalidation::Manual,
            initially_online: true,
            event_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read `path` as an env file; process variables fill the gaps.
    ///
    /// The file is not exported into the process environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, dotenv::Error> {
        let mut vars = HashMap::new();
        for item in dotenv::from_path_iter(path.as_ref())? {
            let (key, value) = item?;
            vars.insert(key, value);
        }
        Ok(Self::from_lookup(|key| vars.get(key).cloned().or_else(|| env::var(key).ok())))
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(CONSERVATIVE_DELETE_VAR) {
            for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match name.parse::<EntityKind>() {
                    Ok(kind) => {
                        config.conservative_delete.insert(kind);
                    }
                    Err(e) => warn!(var = CONSERVATIVE_DELETE_VAR, "{}; ignored", e),
                }
            }
        }

        if let Some(raw) = lookup(CREW_INDEX_INVALIDATION_VAR) {
            match raw.parse() {
                Ok(mode) => config.crew_index = mode,
                Err(e) => warn!(var = CREW_INDEX_INVALIDATION_VAR, "{}; using manual", e),
            }
        }

        if let Some(raw) = lookup(INITIALLY_ONLINE_VAR) {
            match parse_bool(&raw) {
                Some(online) => config.initially_online = online,
                None => warn!(var = INITIALLY_ONLINE_VAR, value = %raw, "not a boolean; assuming online"),
            }
        }

        if let Some(raw) = lookup(EVENT_CAPACITY_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.event_capacity = n,
                _ => warn!(var = EVENT_CAPACITY_VAR, value = %raw, "invalid capacity; using {}", DEFAULT_CAPACITY),
            }
        }

        config
    }

    /// Delete policy for the store of `kind`
    pub fn delete_policy(&self, kind: EntityKind) -> DeletePolicy {
        if self.conservative_delete.contains(&kind) {
            DeletePolicy::Conservative
        } else {
            DeletePolicy::Optimistic
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
