use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{location_sample::LocationSample, pet::PetId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkDetails {
    pub title: String,
    pub description: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub start_location: Option<LocationSample>,
    pub end_location: Option<LocationSample>,
}

/// A stopped walk, packaged for the storage collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkPayload {
    pub pet_id: PetId,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub distance_meters: f64,
    pub details: WalkDetails,
    pub samples: Vec<LocationSample>,
}

impl WalkPayload {
    pub fn route_summary(&self) -> RouteSummary {
        RouteSummary {
            start_location: self.samples.first().copied(),
            end_location: self.samples.last().copied(),
        }
    }

    pub fn title_or_default(&self) -> String {
        if self.details.title.trim().is_empty() {
            format!("Unnamed {}", self.started_at.date_naive())
        } else {
            self.details.title.clone()
        }
    }
}

/// A walk as it was stored. `samples` is loaded separately from the location table.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkRecord {
    pub walk_id: i64,
    #[cfg_attr(feature = "sqlx", sqlx(try_from = "String"))]
    pub pet_id: PetId,
    pub title: String,
    pub description: String,
    pub notes: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: i64,
    pub distance: f64,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub route_data: RouteSummary,

    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub samples: Vec<LocationSample>,
}
