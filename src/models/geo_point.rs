//! Geographic point and its textual store representation.
//!
//! Points are written as `POINT(lng lat)` tokens through `ST_GeogFromText` and
//! read back through `ST_AsText`. The legacy tuple form `(lng, lat)` is still
//! accepted on read. Binary (WKB/EWKB) payloads are never decoded here: they
//! mean a query forgot to render the column as text.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PointDecodeError {
    #[error("received a binary-encoded point; re-request the column rendered as text (ST_AsText)")]
    Binary,

    #[error("malformed point text: '{0}'")]
    Malformed(String),

    #[error("point out of range: lat={lat}, lng={lng}")]
    OutOfRange { lat: f64, lng: f64 },
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// (0,0) doubles as "no point". Real points on the equator/meridian
    /// crossing are indistinguishable from it.
    pub fn is_null(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// Encodes a point as a `POINT(lng lat)` token, or `None` for the null sentinel.
pub fn encode(point: &GeoPoint) -> Option<String> {
    if point.is_null() {
        return None;
    }
    Some(format!("POINT({} {})", point.lng, point.lat))
}

/// Encodes an optional point; absent and sentinel points both become NULL.
pub fn encode_optional(point: Option<&GeoPoint>) -> Option<String> {
    point.and_then(encode)
}

/// Decodes the tagged form first, then the legacy tuple form.
pub fn decode(raw: &str) -> Result<GeoPoint, PointDecodeError> {
    let text = raw.trim();

    if looks_like_wkb_hex(text) {
        return Err(PointDecodeError::Binary);
    }

    let (lng, lat) = parse_tagged(text)
        .or_else(|| parse_legacy_tuple(text))
        .ok_or_else(|| PointDecodeError::Malformed(text.to_string()))?;

    if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
        return Err(PointDecodeError::OutOfRange { lat, lng });
    }

    Ok(GeoPoint { lat, lng })
}

/// NULL columns decode to `None`.
pub fn decode_optional(raw: Option<&str>) -> Result<Option<GeoPoint>, PointDecodeError> {
    raw.map(decode).transpose()
}

fn parse_tagged(text: &str) -> Option<(f64, f64)> {
    // EWKT carries an SRID prefix: SRID=4326;POINT(...)
    let text = match text.split_once(';') {
        Some((srid, rest)) if srid.trim().to_ascii_uppercase().starts_with("SRID=") => rest.trim(),
        _ => text,
    };

    if !text.get(..5)?.eq_ignore_ascii_case("POINT") {
        return None;
    }
    let body = text[5..].trim_start();
    let inner = body.strip_prefix('(')?.strip_suffix(')')?;

    let mut parts = inner.split_whitespace();
    let lng = parts.next()?.parse::<f64>().ok()?;
    let lat = parts.next()?.parse::<f64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lng, lat))
}

fn parse_legacy_tuple(text: &str) -> Option<(f64, f64)> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let (lng, lat) = inner.split_once(',')?;
    Some((lng.trim().parse().ok()?, lat.trim().parse().ok()?))
}

/// Hex WKB starts with a byte-order marker (00 or 01) and a point is at least
/// 21 bytes (42 hex chars).
fn looks_like_wkb_hex(text: &str) -> bool {
    let text = text.strip_prefix("\\x").unwrap_or(text);
    text.len() >= 42
        && text.len() % 2 == 0
        && (text.starts_with("00") || text.starts_with("01"))
        && text.bytes().all(|b| b.is_ascii_hexdigit())
}
