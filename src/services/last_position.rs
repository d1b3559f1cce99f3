use tracing::debug;

use crate::db::{queries, DbPool};
use crate::error::{Result, TrackingError};
use crate::models::filters::LastPositionSelector;
use crate::models::telemetry::{TelemetryRow, TelemetrySample};
use crate::query::builder::bind_query_as;
use crate::query::compile::compile_last_position_selector;
use crate::query::SqlValue;
use crate::services::offer_correlator::{correlate_offers, OfferCorrelation};

const ENTITY_KEY: &str = "COALESCE(g.trip_id, 0), COALESCE(g.driver_id, 0), COALESCE(g.vehicle_id, 0)";

/// Builds the DISTINCT ON query, or `None` when offer criteria matched
/// nothing.
pub fn last_position_select(
    selector: &LastPositionSelector,
    correlation: &OfferCorrelation,
) -> Option<(String, Vec<SqlValue>)> {
    if correlation.is_no_match() {
        return None;
    }

    let compiled = compile_last_position_selector(selector, correlation.ids());
    if compiled.filter_count == 0 {
        debug!("Resolving last positions across all telemetry");
    }

    let sql = format!(
        "SELECT DISTINCT ON ({key}) {cols} {from} {clause} ORDER BY {key}, g.logged_at DESC, g.id DESC",
        key = ENTITY_KEY,
        cols = queries::TELEMETRY_COLUMNS,
        from = queries::TELEMETRY_FROM,
        clause = compiled.clause,
    );
    Some((sql, compiled.args))
}

/// Freshest sample per (trip, driver, vehicle) triple, missing IDs counting
/// as 0. Without a selector every tracked entity is scanned, with no time
/// bound unless `logged_after` is given.
pub async fn resolve_last_positions(
    pool: &DbPool,
    selector: &LastPositionSelector,
) -> Result<Vec<TelemetrySample>> {
    let correlation = correlate_offers(pool, selector.offer.as_ref()).await?;
    let (sql, args) = match last_position_select(selector, &correlation) {
        Some(select) => select,
        None => return Ok(Vec::new()),
    };

    let rows = bind_query_as(sqlx::query_as::<_, TelemetryRow>(&sql), &args)
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| TelemetrySample::try_from(row).map_err(TrackingError::from))
        .collect()
}
