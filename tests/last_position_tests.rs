//! Last-known position per tracked entity.

use chrono::{Duration, TimeZone, Utc};
use geotrack::models::filters::LastPositionSelector;

mod common;
use common::{insert_driver, insert_vehicle, sample, test_service, unique_tag};

#[tokio::test]
async fn test_latest_sample_wins_per_triple() {
    require_database!();

    let service = test_service().await;
    let pool = service.pool();
    let driver = insert_driver(pool, "Last").await;
    let vehicle = insert_vehicle(pool, &format!("PL-{}", unique_tag())).await;
    let t1 = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap();
    let t2 = t1 + Duration::minutes(5);
    let t3 = t2 + Duration::minutes(5);

    // Newest first so insertion order cannot decide the winner.
    service
        .ingest_telemetry(&[
            sample(vehicle, driver, None, t3, 19.43, -99.13),
            sample(vehicle, driver, None, t1, 19.41, -99.11),
            sample(vehicle, driver, None, t2, 19.42, -99.12),
        ])
        .await
        .unwrap();

    let last = service
        .resolve_last_positions(&LastPositionSelector {
            vehicle_ids: Some(vec![vehicle]),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(last.len(), 1);
    assert_eq!(last[0].logged_at, t3);
    assert!((last[0].coordinates.lat - 19.43).abs() < 1e-9);
}

#[tokio::test]
async fn test_one_row_per_distinct_entity() {
    require_database!();

    let service = test_service().await;
    let pool = service.pool();
    let driver_a = insert_driver(pool, "A").await;
    let driver_b = insert_driver(pool, "B").await;
    let vehicle = insert_vehicle(pool, &format!("PL-{}", unique_tag())).await;
    let t = Utc.with_ymd_and_hms(2025, 7, 2, 10, 0, 0).unwrap();

    service
        .ingest_telemetry(&[
            sample(vehicle, driver_a, None, t, 19.4, -99.1),
            sample(vehicle, driver_a, None, t + Duration::seconds(30), 19.4, -99.1),
            sample(vehicle, driver_b, None, t, 19.5, -99.2),
        ])
        .await
        .unwrap();

    let mut last = service
        .resolve_last_positions(&LastPositionSelector {
            vehicle_ids: Some(vec![vehicle]),
            ..Default::default()
        })
        .await
        .unwrap();
    last.sort_by_key(|s| s.driver_id);

    assert_eq!(last.len(), 2);
    assert_eq!(last[0].driver_id, driver_a);
    assert_eq!(last[0].logged_at, t + Duration::seconds(30));
    assert_eq!(last[1].driver_id, driver_b);
}

#[tokio::test]
async fn test_logged_after_bounds_the_scan() {
    require_database!();

    let service = test_service().await;
    let pool = service.pool();
    let driver = insert_driver(pool, "Bound").await;
    let vehicle = insert_vehicle(pool, &format!("PL-{}", unique_tag())).await;
    let t = Utc.with_ymd_and_hms(2025, 7, 3, 10, 0, 0).unwrap();

    service
        .ingest_telemetry(&[sample(vehicle, driver, None, t, 19.4, -99.1)])
        .await
        .unwrap();

    let last = service
        .resolve_last_positions(&LastPositionSelector {
            vehicle_ids: Some(vec![vehicle]),
            logged_after: Some(t + Duration::hours(1)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(last.is_empty());
}
