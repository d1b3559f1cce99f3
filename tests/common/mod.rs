//! Shared helpers for store-backed tests.
//!
//! These tests need Postgres with PostGIS. Point `DATABASE_URL` at a scratch
//! database; the schema migration runs on first connect. Without
//! `DATABASE_URL` every test returns early with a notice.

use chrono::{DateTime, Utc};
use geotrack::models::geo_point::{self, GeoPoint};
use geotrack::models::telemetry::NewTelemetrySample;
use geotrack::query::QueryLimits;
use geotrack::TrackingService;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[allow(dead_code)]
pub fn database_available() -> bool {
    std::env::var("DATABASE_URL").is_ok()
}

/// Skip test with message if no database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        if !crate::common::database_available() {
            eprintln!("Skipping: DATABASE_URL not set");
            return;
        }
    };
}

#[allow(dead_code)]
pub async fn test_service() -> TrackingService {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    TrackingService::new(pool, QueryLimits::default())
}

#[allow(dead_code)]
pub async fn insert_driver(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO drivers (name, phone) VALUES ($1, '555-0100') RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("insert driver")
}

#[allow(dead_code)]
pub async fn insert_vehicle(pool: &PgPool, plate: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO vehicles (plate_number, model) VALUES ($1, 'Cascadia') RETURNING id")
        .bind(plate)
        .fetch_one(pool)
        .await
        .expect("insert vehicle")
}

#[derive(Debug, Clone, Default)]
#[allow(dead_code)]
pub struct OfferFixture {
    pub company_id: Option<i64>,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub title: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_country: Option<String>,
    pub from_location: Option<GeoPoint>,
    pub distance_km: Option<f64>,
    pub status: Option<String>,
}

#[allow(dead_code)]
pub async fn insert_offer(pool: &PgPool, offer: OfferFixture) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO offers (company_id, driver_id, vehicle_id, title, from_address, to_address, \
         from_country, from_location, distance_km, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, ST_GeogFromText($8), $9, COALESCE($10, 'open')) RETURNING id",
    )
    .bind(offer.company_id)
    .bind(offer.driver_id)
    .bind(offer.vehicle_id)
    .bind(offer.title)
    .bind(offer.from_address)
    .bind(offer.to_address)
    .bind(offer.from_country)
    .bind(geo_point::encode_optional(offer.from_location.as_ref()))
    .bind(offer.distance_km)
    .bind(offer.status)
    .fetch_one(pool)
    .await
    .expect("insert offer")
}

#[allow(dead_code)]
pub async fn soft_delete_trip(pool: &PgPool, trip_id: i64) {
    sqlx::query("UPDATE trips SET deleted = true WHERE id = $1")
        .bind(trip_id)
        .execute(pool)
        .await
        .expect("soft delete trip");
}

/// Globally unique suffix for fixture names.
#[allow(dead_code)]
pub fn unique_tag() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[allow(dead_code)]
pub fn sample(
    vehicle_id: i64,
    driver_id: i64,
    trip_id: Option<i64>,
    logged_at: DateTime<Utc>,
    lat: f64,
    lng: f64,
) -> NewTelemetrySample {
    NewTelemetrySample {
        vehicle_id,
        driver_id,
        trip_id,
        speed: Some(42.5),
        battery_level: Some(80.0),
        coordinates: GeoPoint::new(lat, lng),
        logged_at: Some(logged_at),
        ..Default::default()
    }
}
