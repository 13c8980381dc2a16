//! Season - a bounded period framing crew and production activity

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{CommandSet, Entity, EntityKind, RecordId, Stamps};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Season {
    pub id: RecordId,
    #[serde(rename = "fecha_inicial")]
    pub start_date: NaiveDate,
    #[serde(rename = "fecha_final", default)]
    pub end_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Season {
    /// Open seasons have no end date yet
    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && self.end_date.map_or(true, |end| date <= end)
    }
}

/// Payload for creating or updating a [`Season`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonDraft {
    #[serde(rename = "fecha_inicial")]
    pub start_date: NaiveDate,
    #[serde(rename = "fecha_final", default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl SeasonDraft {
    pub fn new(start_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: None,
        }
    }

    pub fn ending(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

impl Entity for Season {
    type Id = RecordId;
    type Draft = SeasonDraft;

    const KIND: EntityKind = EntityKind::Season;
    const COMMANDS: CommandSet = CommandSet::basic(
        "get_temporadas",
        "get_temporada_by_id",
        "post_temporada",
        "put_temporada",
        "delete_temporada",
    );

    fn id(&self) -> RecordId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_open_season_contains_future_dates() {
        let season = Season {
            id: 1,
            start_date: date(2025, 5, 1),
            end_date: None,
            stamps: Stamps::default(),
        };
        assert!(season.is_open());
        assert!(season.contains(date(2026, 1, 1)));
        assert!(!season.contains(date(2025, 4, 30)));
    }

    #[test]
    fn test_closed_season_bounds_are_inclusive() {
        let season = Season {
            id: 2,
            start_date: date(2025, 5, 1),
            end_date: Some(date(2025, 8, 31)),
            stamps: Stamps::default(),
        };
        assert!(season.contains(date(2025, 8, 31)));
        assert!(!season.contains(date(2025, 9, 1)));
    }
}
