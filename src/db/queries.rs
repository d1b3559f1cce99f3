pub const TELEMETRY_COLUMNS: &str = r#"
g.id, g.company_id, g.vehicle_id, g.driver_id, g.offer_id, g.trip_id,
g.battery_level, g.speed, g.heading, g.accuracy,
ST_AsText(g.coordinates) AS coordinates,
g.status, g.logged_at, g.created_at
"#;

pub const TELEMETRY_FROM: &str = r#"
FROM gps_logs g
LEFT JOIN trips t ON t.id = g.trip_id
LEFT JOIN drivers d ON d.id = g.driver_id
LEFT JOIN vehicles v ON v.id = g.vehicle_id
"#;

pub const TRIP_COLUMNS: &str = r#"
t.id, t.driver_id, t.vehicle_id, t.from_address, t.to_address,
t.from_country, t.to_country, t.start_date, t.end_date,
ST_AsText(t.from_location) AS from_location,
ST_AsText(t.to_location) AS to_location,
t.distance_km, t.status, t.meta_fields, t.gps_logs_snapshot,
t.created_at, t.updated_at
"#;

pub const TRIP_DETAIL_COLUMNS: &str = r#"
d.id AS joined_driver_id, d.name AS driver_name, d.phone AS driver_phone,
v.id AS joined_vehicle_id, v.plate_number AS vehicle_plate_number, v.model AS vehicle_model
"#;

pub const TRIP_FROM: &str = r#"
FROM trips t
LEFT JOIN drivers d ON d.id = t.driver_id
LEFT JOIN vehicles v ON v.id = t.vehicle_id
"#;

pub const OFFER_FROM: &str = r#"
FROM offers o
LEFT JOIN drivers d ON d.id = o.driver_id
LEFT JOIN vehicles v ON v.id = o.vehicle_id
"#;

pub const SELECT_OFFER_DEFAULTS: &str = r#"
SELECT id, driver_id, vehicle_id, from_address, to_address, from_country, to_country,
       ST_AsText(from_location) AS from_location,
       ST_AsText(to_location) AS to_location,
       distance_km
FROM offers
WHERE id = $1 AND deleted = false;
"#;

pub const INSERT_TRIP: &str = r#"
INSERT INTO trips (
    driver_id, vehicle_id, from_address, to_address, from_country, to_country,
    start_date, from_location, to_location, distance_km, status, meta_fields,
    created_at, updated_at, deleted
) VALUES (
    $1, $2, $3, $4, $5, $6,
    COALESCE($7, NOW()), ST_GeogFromText($8), ST_GeogFromText($9), $10, 'active', $11,
    NOW(), NOW(), false
)
RETURNING id;
"#;

pub const INSERT_TRIP_OFFER: &str = r#"
INSERT INTO trip_offers (trip_id, offer_id, is_main, status)
VALUES ($1, $2, $3, $4);
"#;

pub const SELECT_TRIP_FOR_UPDATE: &str = r#"
SELECT driver_id, status FROM trips WHERE id = $1 AND deleted = false FOR UPDATE;
"#;

pub const COMPLETE_TRIP: &str = r#"
UPDATE trips
SET status = 'completed',
    end_date = NOW(),
    gps_logs_snapshot = $2,
    updated_at = NOW()
WHERE id = $1 AND status = 'active';
"#;

pub const INSERT_TELEMETRY: &str = r#"
INSERT INTO gps_logs (
    company_id, vehicle_id, driver_id, offer_id, trip_id,
    battery_level, speed, heading, accuracy, coordinates,
    status, logged_at, created_at
)
SELECT $1::bigint, $2::bigint, $3::bigint, $4::bigint, $5::bigint,
       $6::float8, $7::float8, $8::float8, $9::float8, ST_GeogFromText($10::text),
       $11::text, COALESCE($12::timestamptz, NOW()), NOW()
WHERE $5::bigint IS NULL
   OR EXISTS (SELECT 1 FROM trips WHERE id = $5::bigint AND deleted = false);
"#;

pub const SELECT_TRIP_OFFER_DETAILS: &str = r#"
SELECT l.trip_id, l.offer_id, l.is_main, l.status,
       o.status AS offer_status, o.from_address, o.to_address
FROM trip_offers l
LEFT JOIN offers o ON o.id = l.offer_id
WHERE l.trip_id = ANY($1)
ORDER BY l.trip_id, l.is_main DESC, l.offer_id;
"#;
