//! Client - buyers the production is packed for

use serde::{Deserialize, Serialize};

use super::{CommandSet, Entity, EntityKind, RecordId, Stamps};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: RecordId,
    #[serde(rename = "codigo")]
    pub code: i32,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(flatten)]
    pub stamps: Stamps,
}

/// Payload for creating or updating a [`Client`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientDraft {
    #[serde(rename = "codigo")]
    pub code: i32,
    #[serde(rename = "nombre")]
    pub name: String,
}

impl ClientDraft {
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
        }
    }
}

impl Entity for Client {
    type Id = RecordId;
    type Draft = ClientDraft;

    const KIND: EntityKind = EntityKind::Client;
    const COMMANDS: CommandSet = CommandSet::basic(
        "get_cliente",
        "get_cliente_by_id",
        "post_cliente",
        "put_cliente",
        "delete_cliente",
    );

    fn id(&self) -> RecordId {
        self.id
    }
}
