//! Sparse filter objects, one per query surface. `None` means "do not filter".

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::trip::TripStatus;

/// Which company column a bare `company_id` applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompanyRole {
    /// Owner of the offer (`offers.company_id`).
    Shipper,
    /// Company executing the offer (`offers.exec_company_id`).
    Carrier,
}

/// Offer-level criteria, resolved to offer IDs before the parent query runs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfferFilter {
    pub company_id: Option<i64>,
    pub exec_company_id: Option<i64>,
    pub role: Option<CompanyRole>,
    /// Matches either the origin or the destination country.
    pub country: Option<String>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub state: Option<String>,
    /// Substring of either address.
    pub address: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_to: Option<DateTime<Utc>>,
    pub delivery_from: Option<DateTime<Utc>>,
    pub delivery_to: Option<DateTime<Utc>>,
    pub cost_min: Option<f64>,
    pub cost_max: Option<f64>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub search: Option<String>,
}

impl OfferFilter {
    /// `role` alone only qualifies `company_id`, so it does not count.
    pub fn is_empty(&self) -> bool {
        self.company_id.is_none()
            && self.exec_company_id.is_none()
            && self.country.is_none()
            && self.from_country.is_none()
            && self.to_country.is_none()
            && self.state.is_none()
            && is_blank(self.address.as_deref())
            && self.valid_from.is_none()
            && self.valid_to.is_none()
            && self.delivery_from.is_none()
            && self.delivery_to.is_none()
            && self.cost_min.is_none()
            && self.cost_max.is_none()
            && self.price_min.is_none()
            && self.price_max.is_none()
            && is_blank(self.search.as_deref())
    }
}

/// Whitespace-only substring terms are dropped by the compiler, so they do
/// not make a filter non-empty.
fn is_blank(term: Option<&str>) -> bool {
    term.map_or(true, |t| t.trim().is_empty())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TripFilter {
    pub id: Option<i64>,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub status: Option<TripStatus>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,

    pub from_address: Option<String>,
    pub to_address: Option<String>,

    pub start_date_from: Option<DateTime<Utc>>,
    pub start_date_to: Option<DateTime<Utc>>,
    pub end_date_from: Option<DateTime<Utc>>,
    pub end_date_to: Option<DateTime<Utc>>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub distance_min: Option<f64>,
    pub distance_max: Option<f64>,

    pub ids: Option<Vec<i64>>,
    pub exclude_ids: Option<Vec<i64>>,
    pub driver_ids: Option<Vec<i64>>,
    pub exclude_driver_ids: Option<Vec<i64>>,
    pub vehicle_ids: Option<Vec<i64>>,
    pub exclude_vehicle_ids: Option<Vec<i64>>,
    pub statuses: Option<Vec<TripStatus>>,

    /// Radius search around the trip origin.
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,

    pub search: Option<String>,
    pub offer: Option<OfferFilter>,

    pub order_by: Option<String>,
    pub order_dir: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelemetryFilter {
    pub id: Option<i64>,
    pub trip_id: Option<i64>,
    pub company_id: Option<i64>,
    pub offer_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub status: Option<String>,

    pub logged_from: Option<DateTime<Utc>>,
    pub logged_to: Option<DateTime<Utc>>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub speed_min: Option<f64>,
    pub speed_max: Option<f64>,
    pub battery_min: Option<f64>,
    pub battery_max: Option<f64>,

    pub trip_ids: Option<Vec<i64>>,
    pub company_ids: Option<Vec<i64>>,
    pub offer_ids: Option<Vec<i64>>,
    pub driver_ids: Option<Vec<i64>>,
    pub exclude_driver_ids: Option<Vec<i64>>,
    pub vehicle_ids: Option<Vec<i64>>,
    pub exclude_vehicle_ids: Option<Vec<i64>>,

    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,

    pub search: Option<String>,
    pub offer: Option<OfferFilter>,

    pub order_by: Option<String>,
    pub order_dir: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Restricts the last-position query. An empty selector covers all telemetry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LastPositionSelector {
    pub trip_ids: Option<Vec<i64>>,
    pub company_ids: Option<Vec<i64>>,
    pub offer_ids: Option<Vec<i64>>,
    pub driver_ids: Option<Vec<i64>>,
    pub vehicle_ids: Option<Vec<i64>>,
    pub offer: Option<OfferFilter>,
    pub logged_after: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_filter_emptiness() {
        assert!(OfferFilter::default().is_empty());

        let role_only = OfferFilter {
            role: Some(CompanyRole::Carrier),
            ..Default::default()
        };
        assert!(role_only.is_empty());

        let with_country = OfferFilter {
            country: Some("MX".to_string()),
            ..Default::default()
        };
        assert!(!with_country.is_empty());
    }

    #[test]
    fn test_blank_terms_leave_offer_filter_empty() {
        let blank = OfferFilter {
            search: Some("   ".to_string()),
            address: Some("\t".to_string()),
            ..Default::default()
        };
        assert!(blank.is_empty());

        let padded = OfferFilter {
            search: Some("  cement ".to_string()),
            ..Default::default()
        };
        assert!(!padded.is_empty());
    }

    #[test]
    fn test_trip_filter_from_sparse_json() {
        let filter: TripFilter =
            serde_json::from_str(r#"{"driverId":42,"statuses":["active"],"offer":{"state":"open"}}"#)
                .unwrap();
        assert_eq!(filter.driver_id, Some(42));
        assert_eq!(filter.statuses, Some(vec![TripStatus::Active]));
        assert_eq!(filter.offer.unwrap().state.as_deref(), Some("open"));
        assert_eq!(filter.vehicle_id, None);
    }
}
