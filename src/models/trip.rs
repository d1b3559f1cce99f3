use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

use crate::error::TrackingError;
use crate::models::geo_point::{self, GeoPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = TrackingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TripStatus::Active),
            "completed" => Ok(TripStatus::Completed),
            other => Err(TrackingError::Validation(format!(
                "unknown trip status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: i64,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub from_location: Option<GeoPoint>,
    pub to_location: Option<GeoPoint>,
    pub distance_km: Option<f64>,
    pub status: TripStatus,
    pub meta_fields: Value,
    pub gps_logs_snapshot: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct TripRow {
    pub id: i64,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub distance_km: Option<f64>,
    pub status: String,
    pub meta_fields: Json<Value>,
    pub gps_logs_snapshot: Option<Json<Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = TrackingError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            driver_id: row.driver_id,
            vehicle_id: row.vehicle_id,
            from_address: row.from_address,
            to_address: row.to_address,
            from_country: row.from_country,
            to_country: row.to_country,
            start_date: row.start_date,
            end_date: row.end_date,
            from_location: geo_point::decode_optional(row.from_location.as_deref())?,
            to_location: geo_point::decode_optional(row.to_location.as_deref())?,
            distance_km: row.distance_km,
            status: row.status.parse()?,
            meta_fields: row.meta_fields.0,
            gps_logs_snapshot: row.gps_logs_snapshot.map(|j| j.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Link between a trip and one of the offers it fulfils.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripOfferLink {
    pub trip_id: i64,
    pub offer_id: i64,
    pub is_main: bool,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverSummary {
    pub id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: i64,
    pub plate_number: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripOfferDetail {
    #[serde(skip)]
    pub trip_id: i64,
    pub offer_id: i64,
    pub is_main: bool,
    pub status: String,
    pub offer_status: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
}

/// Trip with its driver, vehicle and linked offers nested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetailed {
    #[serde(flatten)]
    pub trip: Trip,
    pub driver: Option<DriverSummary>,
    pub vehicle: Option<VehicleSummary>,
    pub offers: Vec<TripOfferDetail>,
}

/// Trip row joined with its driver and vehicle columns.
#[derive(Debug, FromRow)]
pub struct TripDetailedRow {
    #[sqlx(flatten)]
    pub trip: TripRow,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub vehicle_plate_number: Option<String>,
    pub vehicle_model: Option<String>,
    pub joined_driver_id: Option<i64>,
    pub joined_vehicle_id: Option<i64>,
}

impl TripDetailedRow {
    pub fn into_detailed(self, offers: Vec<TripOfferDetail>) -> Result<TripDetailed, TrackingError> {
        let driver = self.joined_driver_id.map(|id| DriverSummary {
            id,
            name: self.driver_name,
            phone: self.driver_phone,
        });
        let vehicle = self.joined_vehicle_id.map(|id| VehicleSummary {
            id,
            plate_number: self.vehicle_plate_number,
            model: self.vehicle_model,
        });

        Ok(TripDetailed {
            trip: Trip::try_from(self.trip)?,
            driver,
            vehicle,
            offers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripOfferInput {
    pub offer_id: i64,
    #[serde(default)]
    pub is_main: bool,
    pub status: Option<String>,
}

/// Input for starting a trip. Every explicit field overrides the primary
/// offer's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartTripInput {
    pub offers: Vec<TripOfferInput>,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub from_location: Option<GeoPoint>,
    pub to_location: Option<GeoPoint>,
    pub distance_km: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub meta_fields: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!("active".parse::<TripStatus>().unwrap(), TripStatus::Active);
        assert_eq!("completed".parse::<TripStatus>().unwrap(), TripStatus::Completed);
        assert!(matches!(
            "cancelled".parse::<TripStatus>(),
            Err(TrackingError::Validation(_))
        ));
    }

    #[test]
    fn test_start_input_from_json() {
        let input: StartTripInput = serde_json::from_str(
            r#"{"offers":[{"offerId":5,"isMain":true}],"vehicleId":3}"#,
        )
        .unwrap();
        assert_eq!(input.offers.len(), 1);
        assert!(input.offers[0].is_main);
        assert_eq!(input.vehicle_id, Some(3));
        assert_eq!(input.driver_id, None);
    }
}
