//! Production - a recorded output batch

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CommandSet, Entity, EntityKind, RecordId, Stamps};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Production {
    pub id: RecordId,
    #[serde(rename = "cuadrilla_id")]
    pub crew_id: RecordId,
    #[serde(rename = "temporada_id")]
    pub season_id: RecordId,
    #[serde(rename = "tipo_uva_id")]
    pub grape_type_id: RecordId,
    #[serde(rename = "tipo_empaque_id")]
    pub packaging_type_id: RecordId,
    #[serde(rename = "cliente_id")]
    pub client_id: RecordId,
    #[serde(rename = "cantidad")]
    pub quantity: f64,
    #[serde(rename = "cajas_no_aceptadas", default)]
    pub rejected_boxes: i32,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stamps: Stamps,
}

/// Payload for creating or updating a [`Production`] batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionDraft {
    #[serde(rename = "cuadrilla_id")]
    pub crew_id: RecordId,
    #[serde(rename = "temporada_id")]
    pub season_id: RecordId,
    #[serde(rename = "tipo_uva_id")]
    pub grape_type_id: RecordId,
    #[serde(rename = "tipo_empaque_id")]
    pub packaging_type_id: RecordId,
    #[serde(rename = "cliente_id")]
    pub client_id: RecordId,
    #[serde(rename = "cantidad")]
    pub quantity: f64,
    #[serde(rename = "cajas_no_aceptadas", default)]
    pub rejected_boxes: i32,
    #[serde(rename = "fecha")]
    pub date: NaiveDate,
}

impl Entity for Production {
    type Id = RecordId;
    type Draft = ProductionDraft;

    const KIND: EntityKind = EntityKind::Production;
    const COMMANDS: CommandSet = CommandSet {
        echoes_record: true,
        ..CommandSet::basic(
            "get_produccion",
            "get_produccion_by_id",
            "post_produccion",
            "put_produccion",
            "delete_produccion",
        )
    };

    fn id(&self) -> RecordId {
        self.id
    }
}
