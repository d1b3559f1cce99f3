use sqlx::FromRow;

/// Offer columns a trip can inherit when started without overrides.
#[derive(Debug, Clone, Default, FromRow)]
pub struct OfferDefaults {
    pub id: i64,
    pub driver_id: Option<i64>,
    pub vehicle_id: Option<i64>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    pub from_country: Option<String>,
    pub to_country: Option<String>,
    pub from_location: Option<String>, // ST_AsText
    pub to_location: Option<String>,   // ST_AsText
    pub distance_km: Option<f64>,
}
