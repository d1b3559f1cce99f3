use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::geo_point::{self, GeoPoint, PointDecodeError};

pub const DEFAULT_SAMPLE_STATUS: &str = "active";

/// One timestamped position + sensor reading. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub id: i64,
    pub company_id: Option<i64>,
    pub vehicle_id: i64,
    pub driver_id: i64,
    pub offer_id: Option<i64>,
    pub trip_id: Option<i64>,
    pub battery_level: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub coordinates: GeoPoint,
    pub status: String,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Row shape of `gps_logs` with the point rendered through `ST_AsText`.
#[derive(Debug, FromRow)]
pub struct TelemetryRow {
    pub id: i64,
    pub company_id: Option<i64>,
    pub vehicle_id: i64,
    pub driver_id: i64,
    pub offer_id: Option<i64>,
    pub trip_id: Option<i64>,
    pub battery_level: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub coordinates: Option<String>,
    pub status: String,
    pub logged_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TelemetryRow> for TelemetrySample {
    type Error = PointDecodeError;

    fn try_from(row: TelemetryRow) -> Result<Self, Self::Error> {
        // A NULL column was written from the (0,0) sentinel.
        let coordinates = geo_point::decode_optional(row.coordinates.as_deref())?.unwrap_or_default();

        Ok(Self {
            id: row.id,
            company_id: row.company_id,
            vehicle_id: row.vehicle_id,
            driver_id: row.driver_id,
            offer_id: row.offer_id,
            trip_id: row.trip_id,
            battery_level: row.battery_level,
            speed: row.speed,
            heading: row.heading,
            accuracy: row.accuracy,
            coordinates,
            status: row.status,
            logged_at: row.logged_at,
            created_at: row.created_at,
        })
    }
}

/// Ingestion input. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTelemetrySample {
    pub company_id: Option<i64>,
    pub vehicle_id: i64,
    pub driver_id: i64,
    pub offer_id: Option<i64>,
    pub trip_id: Option<i64>,
    pub battery_level: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub accuracy: Option<f64>,
    pub coordinates: GeoPoint,
    pub status: Option<String>,
    pub logged_at: Option<DateTime<Utc>>,
}

impl NewTelemetrySample {
    pub fn status_or_default(&self) -> &str {
        self.status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SAMPLE_STATUS)
    }
}
