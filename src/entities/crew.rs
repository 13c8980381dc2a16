//! Crew - a work unit of laborers tied to a variety and season

use serde::{Deserialize, Serialize};

use super::{CommandSet, Entity, EntityKind, RecordId, Stamps};

/// Backend command reporting how many workers a crew deletion would orphan
pub const DELETE_WARNING_COMMAND: &str = "get_cuadrilla_delete_warning";
/// Backend command that unassigns a crew's workers and deletes it
pub const FORCE_DELETE_COMMAND: &str = "force_delete_cuadrilla";
/// Backend command that unassigns every worker of a crew
pub const REASSIGN_MEMBERS_COMMAND: &str = "reassign_jornaleros_from_cuadrilla";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Crew {
    pub id: RecordId,
    /// Worker leading the crew
    #[serde(rename = "lider_cuadrilla", default)]
    pub leader_id: Option<RecordId>,
    #[serde(rename = "lote")]
    pub lot: String,
    #[serde(rename = "variedad")]
    pub variety: String,
    #[serde(rename = "temporada_id", default)]
    pub season_id: Option<RecordId>,
    #[serde(rename = "produccion_cuadrilla", default)]
    pub crew_yield: Option<f64>,
    #[serde(rename = "integrantes", default)]
    pub member_count: Option<i32>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

/// Payload for creating or updating a [`Crew`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewDraft {
    #[serde(rename = "lider_cuadrilla", default)]
    pub leader_id: Option<RecordId>,
    #[serde(rename = "lote")]
    pub lot: String,
    #[serde(rename = "variedad")]
    pub variety: String,
    #[serde(rename = "temporada_id", default)]
    pub season_id: Option<RecordId>,
    #[serde(rename = "produccion_cuadrilla", default)]
    pub crew_yield: Option<f64>,
    #[serde(rename = "integrantes", default)]
    pub member_count: Option<i32>,
}

impl CrewDraft {
    pub fn new(lot: impl Into<String>, variety: impl Into<String>) -> Self {
        Self {
            leader_id: None,
            lot: lot.into(),
            variety: variety.into(),
            season_id: None,
            crew_yield: None,
            member_count: None,
        }
    }

    pub fn led_by(mut self, worker_id: RecordId) -> Self {
        self.leader_id = Some(worker_id);
        self
    }

    pub fn in_season(mut self, season_id: RecordId) -> Self {
        self.season_id = Some(season_id);
        self
    }
}

impl Entity for Crew {
    type Id = RecordId;
    type Draft = CrewDraft;

    const KIND: EntityKind = EntityKind::Crew;
    const COMMANDS: CommandSet = CommandSet::basic(
        "get_cuadrillas",
        "get_cuadrilla_by_id",
        "post_cuadrilla",
        "put_cuadrilla",
        "delete_cuadrilla",
    );

    fn id(&self) -> RecordId {
        self.id
    }
}
