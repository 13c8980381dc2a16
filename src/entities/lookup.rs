//! Coded lookup taxonomies
//!
//! Grape types, packaging types and varieties all share the same
//! `{codigo, nombre}` shape and differ only in the commands that manage them.

use serde::{Deserialize, Serialize};

use super::{CommandSet, Entity, EntityKind, RecordId, Stamps};

/// Payload shared by every coded lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodedDraft {
    #[serde(rename = "codigo")]
    pub code: i32,
    #[serde(rename = "nombre")]
    pub name: String,
}

impl CodedDraft {
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }
}

macro_rules! coded_lookup {
    ($(#[$meta:meta])* $name:ident, $kind:expr, $stem:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
        pub struct $name {
            pub id: RecordId,
            #[serde(rename = "codigo")]
            pub code: i32,
            #[serde(rename = "nombre")]
            pub name: String,
            #[serde(flatten)]
            pub stamps: Stamps,
        }

        impl Entity for $name {
            type Id = RecordId;
            type Draft = CodedDraft;

            const KIND: EntityKind = $kind;
            const COMMANDS: CommandSet = CommandSet::basic(
                concat!("get_", $stem),
                concat!("get_", $stem, "_by_id"),
                concat!("post_", $stem),
                concat!("put_", $stem),
                concat!("delete_", $stem),
            );

            fn id(&self) -> RecordId {
                self.id
            }
        }
    };
}

coded_lookup!(
    /// Grape type (e.g. red globe, flame seedless)
    GrapeType,
    EntityKind::GrapeType,
    "tipo_uva"
);

coded_lookup!(
    /// Packaging type a batch is boxed in
    PackagingType,
    EntityKind::PackagingType,
    "tipo_empaque"
);

coded_lookup!(
    /// Vine variety a crew works
    Variety,
    EntityKind::Variety,
    "variedad"
);
