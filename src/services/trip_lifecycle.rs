//! Trip start/end. Each operation is one unit of work on a single
//! transaction, settled through `db::settle`.

use futures::TryStreamExt;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgConnection;
use tracing::{info, warn};

use crate::db::{self, queries, DbPool};
use crate::error::{Result, TrackingError};
use crate::models::geo_point::{self, GeoPoint};
use crate::models::offer::OfferDefaults;
use crate::models::telemetry::{TelemetryRow, TelemetrySample};
use crate::models::trip::{StartTripInput, TripOfferInput, TripStatus};

const DEFAULT_LINK_STATUS: &str = "active";

/// Fully resolved trip row, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTrip {
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub distance_km: f64,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub meta_fields: Value,
}

/// Checks the offer list and settles which link is main: at most one offer
/// may be flagged, and the first offer is promoted when none is.
pub fn normalize_links(offers: &[TripOfferInput]) -> Result<Vec<TripOfferInput>> {
    if offers.is_empty() {
        return Err(TrackingError::Validation(
            "a trip needs at least one offer".to_string(),
        ));
    }

    let flagged = offers.iter().filter(|o| o.is_main).count();
    if flagged > 1 {
        return Err(TrackingError::Validation(format!(
            "{} offers flagged as main, expected at most one",
            flagged
        )));
    }

    let mut links = offers.to_vec();
    if flagged == 0 {
        links[0].is_main = true;
    }
    Ok(links)
}

/// Explicit input wins, then the primary offer, then null (zero for distance).
pub fn resolve_new_trip(input: &StartTripInput, primary: &OfferDefaults) -> Result<NewTrip> {
    Ok(NewTrip {
        driver_id: input.driver_id.or(primary.driver_id),
        vehicle_id: input.vehicle_id.or(primary.vehicle_id),
        from_address: input.from_address.clone().or_else(|| primary.from_address.clone()),
        to_address: input.to_address.clone().or_else(|| primary.to_address.clone()),
        from_country: input.from_country.clone().or_else(|| primary.from_country.clone()),
        to_country: input.to_country.clone().or_else(|| primary.to_country.clone()),
        from_location: resolve_location(input.from_location.as_ref(), primary.from_location.as_deref())?,
        to_location: resolve_location(input.to_location.as_ref(), primary.to_location.as_deref())?,
        distance_km: input.distance_km.or(primary.distance_km).unwrap_or(0.0),
        start_date: input.start_date,
        meta_fields: input
            .meta_fields
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default())),
    })
}

/// An explicit (0,0) point counts as absent.
fn resolve_location(explicit: Option<&GeoPoint>, fallback: Option<&str>) -> Result<Option<String>> {
    if let Some(token) = geo_point::encode_optional(explicit) {
        return Ok(Some(token));
    }
    let fallback = geo_point::decode_optional(fallback)?;
    Ok(geo_point::encode_optional(fallback.as_ref()))
}

pub async fn start_trip(pool: &DbPool, input: &StartTripInput) -> Result<i64> {
    let links = normalize_links(&input.offers)?;

    let mut tx = pool.begin().await.map_err(TrackingError::step("begin"))?;
    let result = start_trip_tx(&mut tx, input, &links).await;
    let trip_id = db::settle(tx, result).await?;

    info!(
        "Started trip {} with {} offer(s), primary offer {}",
        trip_id,
        links.len(),
        links[0].offer_id
    );
    Ok(trip_id)
}

async fn start_trip_tx(
    conn: &mut PgConnection,
    input: &StartTripInput,
    links: &[TripOfferInput],
) -> Result<i64> {
    // 1. Primary offer defaults
    let primary_id = links[0].offer_id;
    let primary: OfferDefaults = sqlx::query_as(queries::SELECT_OFFER_DEFAULTS)
        .bind(primary_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(TrackingError::step("load primary offer"))?
        .ok_or_else(|| TrackingError::NotFound(format!("offer {}", primary_id)))?;

    let trip = resolve_new_trip(input, &primary)?;

    // 2. Trip
    let trip_id: i64 = sqlx::query_scalar(queries::INSERT_TRIP)
        .bind(trip.driver_id)
        .bind(trip.vehicle_id)
        .bind(&trip.from_address)
        .bind(&trip.to_address)
        .bind(&trip.from_country)
        .bind(&trip.to_country)
        .bind(trip.start_date)
        .bind(&trip.from_location)
        .bind(&trip.to_location)
        .bind(trip.distance_km)
        .bind(Json(&trip.meta_fields))
        .fetch_one(&mut *conn)
        .await
        .map_err(TrackingError::step("insert trip"))?;

    // 3. One link per offer
    for link in links {
        sqlx::query(queries::INSERT_TRIP_OFFER)
            .bind(trip_id)
            .bind(link.offer_id)
            .bind(link.is_main)
            .bind(link.status.as_deref().unwrap_or(DEFAULT_LINK_STATUS))
            .execute(&mut *conn)
            .await
            .map_err(TrackingError::step("insert trip offer link"))?;
    }

    Ok(trip_id)
}

/// Completes a trip owned by `driver_id` and freezes its telemetry.
///
/// `company_id` is accepted for the caller's audit trail but ownership is
/// decided by driver alone.
pub async fn end_trip(pool: &DbPool, trip_id: i64, driver_id: i64, company_id: Option<i64>) -> Result<()> {
    let mut tx = pool.begin().await.map_err(TrackingError::step("begin"))?;
    let result = end_trip_tx(&mut tx, trip_id, driver_id).await;
    let samples = db::settle(tx, result).await.map_err(|e| {
        if matches!(e, TrackingError::NotFoundOrForbidden) {
            warn!(
                "End of trip {} refused for driver {} (company {:?})",
                trip_id, driver_id, company_id
            );
        }
        e
    })?;

    info!(
        "Ended trip {} for driver {} with {} telemetry sample(s) in snapshot",
        trip_id, driver_id, samples
    );
    Ok(())
}

async fn end_trip_tx(conn: &mut PgConnection, trip_id: i64, driver_id: i64) -> Result<usize> {
    // 1. Lock and authorize
    let row: Option<(Option<i64>, String)> = sqlx::query_as(queries::SELECT_TRIP_FOR_UPDATE)
        .bind(trip_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(TrackingError::step("lock trip"))?;

    let status = match row {
        Some((Some(owner), status)) if owner == driver_id => status,
        _ => return Err(TrackingError::NotFoundOrForbidden),
    };
    if status.parse::<TripStatus>()? == TripStatus::Completed {
        return Err(TrackingError::Conflict(format!(
            "trip {} is already completed",
            trip_id
        )));
    }

    // 2. Snapshot
    let samples = load_trip_telemetry(conn, trip_id).await?;
    let snapshot = build_snapshot(&samples)?;

    // 3. Status flip
    let updated = sqlx::query(queries::COMPLETE_TRIP)
        .bind(trip_id)
        .bind(Json(snapshot))
        .execute(&mut *conn)
        .await
        .map_err(TrackingError::step("complete trip"))?;

    if updated.rows_affected() != 1 {
        return Err(TrackingError::Conflict(format!(
            "trip {} changed state concurrently",
            trip_id
        )));
    }

    Ok(samples.len())
}

async fn load_trip_telemetry(conn: &mut PgConnection, trip_id: i64) -> Result<Vec<TelemetrySample>> {
    let sql = format!(
        "SELECT {} FROM gps_logs g WHERE g.trip_id = $1 ORDER BY g.logged_at ASC, g.id ASC",
        queries::TELEMETRY_COLUMNS
    );

    let mut rows = sqlx::query_as::<_, TelemetryRow>(&sql)
        .bind(trip_id)
        .fetch(&mut *conn);

    let mut samples = Vec::new();
    while let Some(row) = rows
        .try_next()
        .await
        .map_err(TrackingError::step("load trip telemetry"))?
    {
        samples.push(TelemetrySample::try_from(row)?);
    }
    Ok(samples)
}

/// Serialized form stored in `trips.gps_logs_snapshot`.
pub fn build_snapshot(samples: &[TelemetrySample]) -> Result<Value> {
    Ok(serde_json::to_value(samples)?)
}
