use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::geo_point::GeoPoint;
use crate::models::telemetry::NewTelemetrySample;

/// Kafka telemetry payload: either a batch envelope or one bare sample.
/// An object carrying `samples` is always read as an envelope, so a bad
/// sample surfaces its own parse error.
#[derive(Debug, Deserialize)]
#[serde(try_from = "Value")]
pub enum TelemetryMessage {
    Batch(TelemetryEnvelope),
    Single(TelemetryPayload),
}

impl TryFrom<Value> for TelemetryMessage {
    type Error = serde_json::Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        if value.get("samples").is_some() {
            serde_json::from_value(value).map(TelemetryMessage::Batch)
        } else {
            serde_json::from_value(value).map(TelemetryMessage::Single)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TelemetryEnvelope {
    pub uuid: Option<String>,
    pub samples: Vec<TelemetryPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryPayload {
    #[serde(default, deserialize_with = "parse_i64_option")]
    pub company_id: Option<i64>,
    #[serde(default, deserialize_with = "parse_i64_option")]
    pub vehicle_id: Option<i64>,
    #[serde(default, deserialize_with = "parse_i64_option")]
    pub driver_id: Option<i64>,
    #[serde(default, deserialize_with = "parse_i64_option")]
    pub offer_id: Option<i64>,
    #[serde(default, deserialize_with = "parse_i64_option")]
    pub trip_id: Option<i64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub battery_level: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub heading: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub accuracy: Option<f64>,
    #[serde(default, alias = "latitude", deserialize_with = "parse_f64_option")]
    pub lat: Option<f64>,
    #[serde(default, alias = "longitude", deserialize_with = "parse_f64_option")]
    pub lng: Option<f64>,
    pub status: Option<String>,
    pub logged_at: Option<String>,
}

impl TelemetryMessage {
    pub fn uuid(&self) -> Option<&str> {
        match self {
            TelemetryMessage::Batch(envelope) => envelope.uuid.as_deref(),
            TelemetryMessage::Single(_) => None,
        }
    }

    pub fn into_payloads(self) -> Vec<TelemetryPayload> {
        match self {
            TelemetryMessage::Batch(envelope) => envelope.samples,
            TelemetryMessage::Single(payload) => vec![payload],
        }
    }
}

impl TelemetryPayload {
    pub fn into_sample(self) -> Result<NewTelemetrySample, String> {
        let vehicle_id = self.vehicle_id.ok_or("missing vehicleId")?;
        let driver_id = self.driver_id.ok_or("missing driverId")?;

        let logged_at = match self.logged_at.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_logged_at(raw).ok_or_else(|| format!("invalid loggedAt: '{}'", raw))?),
        };

        Ok(NewTelemetrySample {
            company_id: self.company_id,
            vehicle_id,
            driver_id,
            offer_id: self.offer_id,
            trip_id: self.trip_id,
            battery_level: self.battery_level,
            speed: self.speed,
            heading: self.heading,
            accuracy: self.accuracy,
            coordinates: GeoPoint::new(self.lat.unwrap_or(0.0), self.lng.unwrap_or(0.0)),
            status: self.status,
            logged_at,
        })
    }
}

/// RFC 3339 first, then the naive device formats (assumed UTC).
fn parse_logged_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|t| t.and_utc())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrNumber::Float(f)) => Ok(Some(f)),
        Some(StringOrNumber::Int(i)) => Ok(Some(i as f64)),
        Some(StringOrNumber::String(s)) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                s.trim().parse::<f64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
        None => Ok(None),
    }
}

fn parse_i64_option<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrNumber::Int(i)) => Ok(Some(i)),
        Some(StringOrNumber::Float(f)) => Err(serde::de::Error::custom(format!(
            "expected an integer id, got {}",
            f
        ))),
        Some(StringOrNumber::String(s)) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                s.trim().parse::<i64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parsing_batch_with_string_numbers() {
        let payload = r#"
        {
            "uuid": "d52b1454-d43d-50fa-99ca-79515c904162",
            "samples": [
                {
                    "vehicleId": "10",
                    "driverId": 42,
                    "tripId": "7",
                    "latitude": "+20.652494",
                    "longitude": "-100.391404",
                    "speed": "0.00",
                    "batteryLevel": 87,
                    "loggedAt": "2025-11-29 06:15:15"
                },
                {
                    "vehicleId": 10,
                    "driverId": 42,
                    "lat": 20.7,
                    "lng": -100.4,
                    "heading": "",
                    "loggedAt": "2025-11-29T06:16:15Z"
                }
            ]
        }
        "#;

        let msg: TelemetryMessage = serde_json::from_str(payload).unwrap();
        assert_eq!(msg.uuid(), Some("d52b1454-d43d-50fa-99ca-79515c904162"));

        let samples: Vec<_> = msg
            .into_payloads()
            .into_iter()
            .map(|p| p.into_sample().unwrap())
            .collect();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].coordinates, GeoPoint::new(20.652494, -100.391404));
        assert_eq!(samples[0].speed, Some(0.0));
        assert_eq!(samples[0].battery_level, Some(87.0));
        assert_eq!(samples[0].trip_id, Some(7));
        assert_eq!(
            samples[0].logged_at,
            Some(Utc.with_ymd_and_hms(2025, 11, 29, 6, 15, 15).unwrap())
        );
        assert_eq!(samples[1].heading, None);
        assert_eq!(
            samples[1].logged_at,
            Some(Utc.with_ymd_and_hms(2025, 11, 29, 6, 16, 15).unwrap())
        );
    }

    #[test]
    fn test_parsing_single_sample() {
        let msg: TelemetryMessage =
            serde_json::from_str(r#"{"vehicleId":1,"driverId":2,"lat":1.5,"lng":2.5}"#).unwrap();
        assert!(msg.uuid().is_none());
        let payloads = msg.into_payloads();
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_bad_sample_in_envelope_reports_its_own_error() {
        let payload = r#"{"uuid":"x","samples":[{"vehicleId":"ten","driverId":2}]}"#;
        let err = serde_json::from_str::<TelemetryMessage>(payload).unwrap_err().to_string();
        assert!(err.contains("invalid digit"), "unexpected error: {}", err);
    }

    #[test]
    fn test_missing_driver_is_rejected() {
        let msg: TelemetryMessage =
            serde_json::from_str(r#"{"vehicleId":1,"lat":1.5,"lng":2.5}"#).unwrap();
        let err = msg.into_payloads().pop().unwrap().into_sample().unwrap_err();
        assert!(err.contains("driverId"));
    }

    #[test]
    fn test_invalid_logged_at_is_rejected() {
        let msg: TelemetryMessage =
            serde_json::from_str(r#"{"vehicleId":1,"driverId":2,"loggedAt":"yesterday"}"#).unwrap();
        let err = msg.into_payloads().pop().unwrap().into_sample().unwrap_err();
        assert!(err.contains("loggedAt"));
    }
}
