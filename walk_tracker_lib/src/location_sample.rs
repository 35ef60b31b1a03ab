use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// One timestamped position fix. Samples are never changed after they are recorded,
/// and their order in a route is the order they were captured in.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Horizontal accuracy in meters, as reported by the provider. None when
    /// unknown, which includes GPX imports.
    pub accuracy: Option<f64>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            accuracy: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn captured_at_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// x is longitude, y is latitude
    pub fn position(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    pub fn from_position(position: Point, timestamp: DateTime<Utc>) -> Self {
        Self::new(position.y(), position.x(), timestamp)
    }
}
