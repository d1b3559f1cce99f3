pub mod last_position;
pub mod offer_correlator;
pub mod telemetry;
pub mod trip_lifecycle;
pub mod trip_queries;

use crate::db::DbPool;
use crate::error::Result;
use crate::models::filters::{LastPositionSelector, TelemetryFilter, TripFilter};
use crate::models::telemetry::{NewTelemetrySample, TelemetrySample};
use crate::models::trip::{StartTripInput, Trip, TripDetailed};
use crate::query::QueryLimits;

/// Entry point for the calling layer. Holds no state besides the pool handle
/// and page limits; every call is re-derived from the store.
#[derive(Debug, Clone)]
pub struct TrackingService {
    pool: DbPool,
    limits: QueryLimits,
}

impl TrackingService {
    pub fn new(pool: DbPool, limits: QueryLimits) -> Self {
        Self { pool, limits }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn start_trip(&self, input: &StartTripInput) -> Result<i64> {
        trip_lifecycle::start_trip(&self.pool, input).await
    }

    pub async fn end_trip(&self, trip_id: i64, driver_id: i64, company_id: Option<i64>) -> Result<()> {
        trip_lifecycle::end_trip(&self.pool, trip_id, driver_id, company_id).await
    }

    pub async fn ingest_telemetry(&self, samples: &[NewTelemetrySample]) -> Result<usize> {
        telemetry::ingest_telemetry(&self.pool, samples).await
    }

    pub async fn query_trips(&self, filter: &TripFilter) -> Result<Vec<Trip>> {
        trip_queries::query_trips(&self.pool, filter, &self.limits).await
    }

    pub async fn query_trips_detailed(&self, filter: &TripFilter) -> Result<Vec<TripDetailed>> {
        trip_queries::query_trips_detailed(&self.pool, filter, &self.limits).await
    }

    pub async fn query_telemetry(&self, filter: &TelemetryFilter) -> Result<Vec<TelemetrySample>> {
        telemetry::query_telemetry(&self.pool, filter, &self.limits).await
    }

    pub async fn resolve_last_positions(&self, selector: &LastPositionSelector) -> Result<Vec<TelemetrySample>> {
        last_position::resolve_last_positions(&self.pool, selector).await
    }
}
