use sqlx::PgConnection;
use tracing::{debug, info};

use crate::db::{self, queries, DbPool};
use crate::error::{Result, TrackingError};
use crate::models::filters::TelemetryFilter;
use crate::models::geo_point;
use crate::models::telemetry::{NewTelemetrySample, TelemetryRow, TelemetrySample};
use crate::query::builder::bind_query_as;
use crate::query::compile::{compile_telemetry_filter, TELEMETRY_SORT_COLUMNS};
use crate::query::{OrderBy, Page, QueryLimits, SqlValue};
use crate::services::offer_correlator::{correlate_offers, OfferCorrelation};

/// Inserts the whole batch in one transaction. Any failing sample rolls back
/// every sample before it. An empty batch succeeds without touching the store.
pub async fn ingest_telemetry(pool: &DbPool, samples: &[NewTelemetrySample]) -> Result<usize> {
    if samples.is_empty() {
        debug!("Empty telemetry batch, nothing to ingest");
        return Ok(0);
    }

    let mut tx = pool.begin().await.map_err(TrackingError::step("begin"))?;
    let result = insert_batch(&mut tx, samples).await;
    let inserted = db::settle(tx, result).await?;

    info!("Ingested {} telemetry sample(s)", inserted);
    Ok(inserted)
}

async fn insert_batch(conn: &mut PgConnection, samples: &[NewTelemetrySample]) -> Result<usize> {
    for (index, sample) in samples.iter().enumerate() {
        let inserted = sqlx::query(queries::INSERT_TELEMETRY)
            .bind(sample.company_id)
            .bind(sample.vehicle_id)
            .bind(sample.driver_id)
            .bind(sample.offer_id)
            .bind(sample.trip_id)
            .bind(sample.battery_level)
            .bind(sample.speed)
            .bind(sample.heading)
            .bind(sample.accuracy)
            .bind(geo_point::encode(&sample.coordinates))
            .bind(sample.status_or_default())
            .bind(sample.logged_at)
            .execute(&mut *conn)
            .await
            .map_err(TrackingError::step("insert telemetry sample"))?;

        // The insert is conditional on the referenced trip being live.
        if inserted.rows_affected() == 0 {
            return Err(TrackingError::Validation(format!(
                "sample {} references missing or deleted trip {:?}",
                index, sample.trip_id
            )));
        }
    }
    Ok(samples.len())
}

/// Builds the paged telemetry SELECT, or `None` when offer criteria matched
/// nothing and the query must not run.
pub fn telemetry_select(
    filter: &TelemetryFilter,
    correlation: &OfferCorrelation,
    limits: &QueryLimits,
) -> Option<(String, Vec<SqlValue>)> {
    if correlation.is_no_match() {
        return None;
    }

    let mut compiled = compile_telemetry_filter(filter, correlation.ids());
    let order = OrderBy::resolve(
        filter.order_by.as_deref(),
        filter.order_dir.as_deref(),
        TELEMETRY_SORT_COLUMNS,
    );
    let page = Page::resolve(filter.limit, filter.offset, limits);
    let limit = compiled.limit_clause(page.limit, page.offset);

    let sql = format!(
        "SELECT {} {} {} {}, g.id DESC {}",
        queries::TELEMETRY_COLUMNS,
        queries::TELEMETRY_FROM,
        compiled.clause,
        order.to_sql(),
        limit
    );
    Some((sql, compiled.args))
}

pub async fn query_telemetry(
    pool: &DbPool,
    filter: &TelemetryFilter,
    limits: &QueryLimits,
) -> Result<Vec<TelemetrySample>> {
    let correlation = correlate_offers(pool, filter.offer.as_ref()).await?;
    let (sql, args) = match telemetry_select(filter, &correlation, limits) {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_skips_the_telemetry_query() {
        let filter = TelemetryFilter {
            vehicle_id: Some(7),
            ..Default::default()
        };
        let limits = QueryLimits::default();
        assert!(telemetry_select(&filter, &OfferCorrelation::NoMatch, &limits).is_none());

        let (sql, args) = telemetry_select(&filter, &OfferCorrelation::Unfiltered, &limits).unwrap();
        assert!(!sql.contains("offer_id = ANY"));
        // vehicle id, limit, offset
        assert_eq!(args.len(), 3);
    }
}
