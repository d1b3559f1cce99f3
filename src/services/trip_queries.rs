use std::collections::HashMap;

use crate::db::{queries, DbPool};
use crate::error::{Result, TrackingError};
use crate::models::filters::TripFilter;
use crate::models::trip::{Trip, TripDetailed, TripDetailedRow, TripOfferDetail, TripRow};
use crate::query::builder::bind_query_as;
use crate::query::compile::{compile_trip_filter, TRIP_SORT_COLUMNS};
use crate::query::{OrderBy, Page, QueryLimits, SqlValue};
use crate::services::offer_correlator::{correlate_offers, OfferCorrelation};

/// Builds the SELECT for `filter`, or `None` when offer criteria matched
/// nothing and the trip query must not run.
pub fn trip_select(
    filter: &TripFilter,
    correlation: &OfferCorrelation,
    limits: &QueryLimits,
    extra_columns: Option<&str>,
) -> Option<(String, Vec<SqlValue>)> {
    if correlation.is_no_match() {
        return None;
    }

    let mut compiled = compile_trip_filter(filter, correlation.ids());
    let order = OrderBy::resolve(
        filter.order_by.as_deref(),
        filter.order_dir.as_deref(),
        TRIP_SORT_COLUMNS,
    );
    let page = Page::resolve(filter.limit, filter.offset, limits);
    let limit = compiled.limit_clause(page.limit, page.offset);

    let columns = match extra_columns {
        Some(extra) => format!("{}, {}", queries::TRIP_COLUMNS, extra),
        None => queries::TRIP_COLUMNS.to_string(),
    };
    let sql = format!(
        "SELECT {} {} {} {}, t.id DESC {}",
        columns,
        queries::TRIP_FROM,
        compiled.clause,
        order.to_sql(),
        limit
    );
    Some((sql, compiled.args))
}

pub async fn query_trips(pool: &DbPool, filter: &TripFilter, limits: &QueryLimits) -> Result<Vec<Trip>> {
    let correlation = correlate_offers(pool, filter.offer.as_ref()).await?;
    let (sql, args) = match trip_select(filter, &correlation, limits, None) {
        Some(select) => select,
        None => return Ok(Vec::new()),
    };

    let rows = bind_query_as(sqlx::query_as::<_, TripRow>(&sql), &args)
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(Trip::try_from).collect()
}

/// Trips with driver, vehicle and offer links nested. Links are fetched in
/// one extra round trip for the whole page.
pub async fn query_trips_detailed(
    pool: &DbPool,
    filter: &TripFilter,
    limits: &QueryLimits,
) -> Result<Vec<TripDetailed>> {
    let correlation = correlate_offers(pool, filter.offer.as_ref()).await?;
    let (sql, args) = match trip_select(filter, &correlation, limits, Some(queries::TRIP_DETAIL_COLUMNS)) {
        Some(select) => select,
        None => return Ok(Vec::new()),
    };

    let rows = bind_query_as(sqlx::query_as::<_, TripDetailedRow>(&sql), &args)
        .fetch_all(pool)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let trip_ids: Vec<i64> = rows.iter().map(|r| r.trip.id).collect();
    let links: Vec<TripOfferDetail> = sqlx::query_as(queries::SELECT_TRIP_OFFER_DETAILS)
        .bind(trip_ids.as_slice())
        .fetch_all(pool)
        .await?;

    let mut by_trip: HashMap<i64, Vec<TripOfferDetail>> = HashMap::new();
    for link in links {
        by_trip.entry(link.trip_id).or_default().push(link);
    }

    rows.into_iter()
        .map(|row| {
            let offers = by_trip.remove(&row.trip.id).unwrap_or_default();
            row.into_detailed(offers)
        })
        .collect::<std::result::Result<Vec<_>, TrackingError>>()
}
