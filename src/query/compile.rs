//! One compiler per query surface. Each emits fragments in the fixed stage
//! order: guard, offer IDs, equality, substring, range, membership, radius,
//! free-text search.

use crate::models::filters::{CompanyRole, LastPositionSelector, OfferFilter, TelemetryFilter, TripFilter};
use crate::query::builder::{CompiledPredicates, PredicateBuilder};
use crate::query::sort::SortColumn;

pub const TRIP_SORT_COLUMNS: &[SortColumn] = &[
    ("id", "t.id"),
    ("createdAt", "t.created_at"),
    ("updatedAt", "t.updated_at"),
    ("startDate", "t.start_date"),
    ("endDate", "t.end_date"),
    ("distanceKm", "t.distance_km"),
    ("status", "t.status"),
    ("driverId", "t.driver_id"),
    ("vehicleId", "t.vehicle_id"),
];

pub const TELEMETRY_SORT_COLUMNS: &[SortColumn] = &[
    ("id", "g.id"),
    ("loggedAt", "g.logged_at"),
    ("createdAt", "g.created_at"),
    ("speed", "g.speed"),
    ("batteryLevel", "g.battery_level"),
    ("tripId", "g.trip_id"),
    ("driverId", "g.driver_id"),
    ("vehicleId", "g.vehicle_id"),
];

const TRIP_SEARCH_COLUMNS: &[&str] = &[
    "t.from_address",
    "t.to_address",
    "t.from_country",
    "t.to_country",
    "d.name",
    "v.plate_number",
];

const TELEMETRY_SEARCH_COLUMNS: &[&str] = &["g.status", "d.name", "v.plate_number"];

const OFFER_SEARCH_COLUMNS: &[&str] = &[
    "o.title",
    "o.from_address",
    "o.to_address",
    "d.name",
    "v.plate_number",
];

const TELEMETRY_GUARD: &str = "COALESCE(t.deleted, false) = false";

pub fn compile_offer_filter(f: &OfferFilter) -> CompiledPredicates {
    let mut b = PredicateBuilder::new();
    b.guard("o.deleted = false");

    match (f.role, f.exec_company_id) {
        (Some(CompanyRole::Shipper), _) => b.eq("o.company_id", f.company_id),
        (Some(CompanyRole::Carrier), _) => b.eq("o.exec_company_id", f.company_id),
        // Either side may own the offer.
        (None, None) => b.eq_any_column(&["o.company_id", "o.exec_company_id"], f.company_id),
        (None, Some(_)) => b.eq("o.company_id", f.company_id),
    };
    b.eq("o.exec_company_id", f.exec_company_id)
        .eq_any_column(&["o.from_country", "o.to_country"], f.country.as_deref())
        .eq("o.from_country", f.from_country.as_deref())
        .eq("o.to_country", f.to_country.as_deref())
        .eq("o.status", f.state.as_deref())
        .contains_any(&["o.from_address", "o.to_address"], f.address.as_deref())
        .range("o.valid_until", f.valid_from, f.valid_to)
        .range("o.delivery_date", f.delivery_from, f.delivery_to)
        .range("o.cost", f.cost_min, f.cost_max)
        .range("o.price", f.price_min, f.price_max)
        .search(OFFER_SEARCH_COLUMNS, f.search.as_deref());

    b.build()
}

pub fn compile_trip_filter(f: &TripFilter, offer_ids: Option<&[i64]>) -> CompiledPredicates {
    let mut b = PredicateBuilder::new();
    b.guard("t.deleted = false")
        .offer_ids(
            "t.id IN (SELECT l.trip_id FROM trip_offers l WHERE l.offer_id = ANY($?))",
            offer_ids,
        )
        .eq("t.id", f.id)
        .eq("t.driver_id", f.driver_id)
        .eq("t.vehicle_id", f.vehicle_id)
        .eq("t.status", f.status.map(|s| s.as_str()))
        .eq("t.from_country", f.from_country.as_deref())
        .eq("t.to_country", f.to_country.as_deref())
        .contains("t.from_address", f.from_address.as_deref())
        .contains("t.to_address", f.to_address.as_deref())
        .range("t.start_date", f.start_date_from, f.start_date_to)
        .range("t.end_date", f.end_date_from, f.end_date_to)
        .range("t.created_at", f.created_from, f.created_to)
        .range("t.distance_km", f.distance_min, f.distance_max)
        .within("t.id", f.ids.clone())
        .not_within("t.id", f.exclude_ids.clone())
        .within("t.driver_id", f.driver_ids.clone())
        .not_within("t.driver_id", f.exclude_driver_ids.clone())
        .within("t.vehicle_id", f.vehicle_ids.clone())
        .not_within("t.vehicle_id", f.exclude_vehicle_ids.clone())
        .within(
            "t.status",
            f.statuses
                .as_ref()
                .map(|s| s.iter().map(|s| s.as_str().to_string()).collect::<Vec<_>>()),
        )
        .within_radius("t.from_location", f.lat, f.lng, f.radius_km)
        .search(TRIP_SEARCH_COLUMNS, f.search.as_deref());

    b.build()
}

pub fn compile_telemetry_filter(f: &TelemetryFilter, offer_ids: Option<&[i64]>) -> CompiledPredicates {
    let mut b = PredicateBuilder::new();
    b.guard(TELEMETRY_GUARD)
        .offer_ids("g.offer_id = ANY($?)", offer_ids)
        .eq("g.id", f.id)
        .eq("g.trip_id", f.trip_id)
        .eq("g.company_id", f.company_id)
        .eq("g.offer_id", f.offer_id)
        .eq("g.driver_id", f.driver_id)
        .eq("g.vehicle_id", f.vehicle_id)
        .eq("g.status", f.status.as_deref())
        .range("g.logged_at", f.logged_from, f.logged_to)
        .range("g.created_at", f.created_from, f.created_to)
        .range("g.speed", f.speed_min, f.speed_max)
        .range("g.battery_level", f.battery_min, f.battery_max)
        .within("g.trip_id", f.trip_ids.clone())
        .within("g.company_id", f.company_ids.clone())
        .within("g.offer_id", f.offer_ids.clone())
        .within("g.driver_id", f.driver_ids.clone())
        .not_within("g.driver_id", f.exclude_driver_ids.clone())
        .within("g.vehicle_id", f.vehicle_ids.clone())
        .not_within("g.vehicle_id", f.exclude_vehicle_ids.clone())
        .within_radius("g.coordinates", f.lat, f.lng, f.radius_km)
        .search(TELEMETRY_SEARCH_COLUMNS, f.search.as_deref());

    b.build()
}

pub fn compile_last_position_selector(s: &LastPositionSelector, offer_ids: Option<&[i64]>) -> CompiledPredicates {
    let mut b = PredicateBuilder::new();
    b.guard(TELEMETRY_GUARD)
        .offer_ids("g.offer_id = ANY($?)", offer_ids)
        .range("g.logged_at", s.logged_after, None)
        .within("g.trip_id", s.trip_ids.clone())
        .within("g.company_id", s.company_ids.clone())
        .within("g.offer_id", s.offer_ids.clone())
        .within("g.driver_id", s.driver_ids.clone())
        .within("g.vehicle_id", s.vehicle_ids.clone());

    b.build()
}
