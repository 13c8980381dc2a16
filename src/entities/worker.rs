//! Worker - an individual laborer
//!
//! Workers are soft-deleted: the backend flips their status to inactive and
//! they can be reactivated later.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CommandSet, Entity, EntityKind, ParentLookup, RecordId, SoftDelete, Stamps};

/// Employment status of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WorkerStatus {
    #[default]
    #[serde(rename = "Activo")]
    Active,
    #[serde(rename = "Inactivo")]
    Inactive,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Active => write!(f, "Activo"),
            WorkerStatus::Inactive => write!(f, "Inactivo"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: RecordId,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "edad")]
    pub age: i32,
    #[serde(rename = "estado")]
    pub status: WorkerStatus,
    #[serde(rename = "fecha_contratacion")]
    pub hire_date: NaiveDate,
    #[serde(rename = "produccion_jornalero", default)]
    pub yield_count: Option<f64>,
    #[serde(rename = "errores", default)]
    pub error_count: Option<i32>,
    #[serde(rename = "cuadrilla_id", default)]
    pub crew_id: Option<RecordId>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

/// Payload for creating or updating a [`Worker`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerDraft {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "edad")]
    pub age: i32,
    #[serde(rename = "estado", default)]
    pub status: WorkerStatus,
    #[serde(rename = "fecha_contratacion")]
    pub hire_date: NaiveDate,
    #[serde(rename = "errores", default)]
    pub error_count: Option<i32>,
    #[serde(rename = "cuadrilla_id", default)]
    pub crew_id: Option<RecordId>,
}

impl WorkerDraft {
    pub fn new(name: impl Into<String>, age: i32, hire_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            age,
            status: WorkerStatus::Active,
            hire_date,
            error_count: None,
            crew_id: None,
        }
    }

    pub fn in_crew(mut self, crew_id: RecordId) -> Self {
        self.crew_id = Some(crew_id);
        self
    }
}

impl Entity for Worker {
    type Id = RecordId;
    type Draft = WorkerDraft;

    const KIND: EntityKind = EntityKind::Worker;
    const COMMANDS: CommandSet = CommandSet {
        list_inactive: Some("get_inactive_jornaleros"),
        list_all: Some("get_all_jornaleros"),
        reactivate: Some("reactivate_jornalero"),
        list_by_parent: Some(ParentLookup {
            command: "get_jornaleros_by_cuadrilla",
            arg: "cuadrillaId",
            field: "cuadrilla_id",
        }),
        soft_delete: Some(SoftDelete {
            field: "estado",
            active: "Activo",
            inactive: "Inactivo",
        }),
        ..CommandSet::basic(
            "get_jornaleros",
            "get_jornalero_by_id",
            "post_jornalero",
            "put_jornalero",
            "delete_jornalero",
        )
    };

    fn id(&self) -> RecordId {
        self.id
    }

    fn is_active(&self) -> bool {
        self.status == WorkerStatus::Active
    }
}
