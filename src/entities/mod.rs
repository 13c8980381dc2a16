//! Entity type definitions
//!
//! Every record the backend persists implements [`Entity`], which names its
//! identity type, its creation payload and the remote commands that manage it.
//!
//! - [`Client`] - buyers of the production
//! - [`Crew`] - work units of laborers under an optional leader
//! - [`Worker`] - individual laborers with active/inactive status
//! - [`Production`] - recorded output batches
//! - [`Season`] - bounded periods framing crews and production
//! - [`GrapeType`], [`PackagingType`], [`Variety`] - coded lookups

pub mod client;
pub mod crew;
pub mod lookup;
pub mod production;
pub mod season;
pub mod worker;

pub use client::{Client, ClientDraft};
pub use crew::{Crew, CrewDraft};
pub use lookup::{CodedDraft, GrapeType, PackagingType, Variety};
pub use production::{Production, ProductionDraft};
pub use season::{Season, SeasonDraft};
pub use worker::{Worker, WorkerDraft, WorkerStatus};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Identity assigned by the backend on creation
pub type RecordId = i32;

/// The entity types managed by this layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Crew,
    Worker,
    Production,
    Season,
    GrapeType,
    PackagingType,
    Variety,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Client,
        EntityKind::Crew,
        EntityKind::Worker,
        EntityKind::Production,
        EntityKind::Season,
        EntityKind::GrapeType,
        EntityKind::PackagingType,
        EntityKind::Variety,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Crew => "crew",
            EntityKind::Worker => "worker",
            EntityKind::Production => "production",
            EntityKind::Season => "season",
            EntityKind::GrapeType => "grape_type",
            EntityKind::PackagingType => "packaging_type",
            EntityKind::Variety => "variety",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        EntityKind::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("Unknown entity kind: {}", s))
    }
}

/// Command used to list children by a parent id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLookup {
    /// Remote command name
    pub command: &'static str,
    /// Argument name carrying the parent id
    pub arg: &'static str,
    /// Field on the child record holding the parent id
    pub field: &'static str,
}

/// Status field used by the backend to soft-delete rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftDelete {
    pub field: &'static str,
    pub active: &'static str,
    pub inactive: &'static str,
}

/// The remote operation names for one entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSet {
    pub list: &'static str,
    pub get_by_id: &'static str,
    pub insert: &'static str,
    pub update: &'static str,
    pub delete: &'static str,
    pub list_inactive: Option<&'static str>,
    pub list_all: Option<&'static str>,
    pub reactivate: Option<&'static str>,
    pub list_by_parent: Option<ParentLookup>,
    pub soft_delete: Option<SoftDelete>,
    /// Insert/update answer with the stored record instead of a message
    pub echoes_record: bool,
}

impl CommandSet {
    /// A command set with only the five required operations
    pub const fn basic(
        list: &'static str,
        get_by_id: &'static str,
        insert: &'static str,
        update: &'static str,
        delete: &'static str,
    ) -> Self {
        Self {
            list,
            get_by_id,
            insert,
            update,
            delete,
            list_inactive: None,
            list_all: None,
            reactivate: None,
            list_by_parent: None,
            soft_delete: None,
            echoes_record: false,
        }
    }

    pub fn all_commands(&self) -> Vec<&'static str> {
        let mut commands = vec![self.list, self.get_by_id, self.insert, self.update, self.delete];
        commands.extend(self.list_inactive);
        commands.extend(self.list_all);
        commands.extend(self.reactivate);
        commands.extend(self.list_by_parent.map(|p| p.command));
        commands
    }
}

/// Common trait for all records managed by an entity store
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Backend-assigned identity
    type Id: Copy
        + Eq
        + Hash
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Creation/update payload
    type Draft: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    const KIND: EntityKind;
    const COMMANDS: CommandSet;

    fn id(&self) -> Self::Id;

    /// Whether the record is in the active partition
    fn is_active(&self) -> bool {
        true
    }
}

/// Audit timestamps stamped by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stamps {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
