use crate::error::TrackingError;
use crate::models::message::TelemetryMessage;
use crate::models::telemetry::NewTelemetrySample;
use crate::services::TrackingService;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct DecodedBatch {
    pub batch_id: Uuid,
    pub samples: Vec<NewTelemetrySample>,
}

/// Decodes one Kafka payload into an ingestion batch. A single invalid
/// sample rejects the whole payload.
pub fn decode_batch(payload: &[u8]) -> Result<DecodedBatch, String> {
    let message: TelemetryMessage =
        serde_json::from_slice(payload).map_err(|e| format!("unparsable payload: {}", e))?;

    // Producers send v4/v5 ids; anything else gets a fresh one for log correlation.
    let batch_id = message
        .uuid()
        .and_then(|u| Uuid::parse_str(u).ok())
        .unwrap_or_else(Uuid::new_v4);

    let samples = message
        .into_payloads()
        .into_iter()
        .enumerate()
        .map(|(i, p)| p.into_sample().map_err(|reason| format!("sample {}: {}", i, reason)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DecodedBatch { batch_id, samples })
}

/// Ingests one payload. Bad data is logged and dropped; store failures are
/// returned so the consumer can count them.
pub async fn process_message(service: &TrackingService, payload: &[u8]) -> anyhow::Result<usize> {
    // 1. Parse
    let batch = match decode_batch(payload) {
        Ok(b) => b,
        Err(reason) => {
            warn!("Skipping telemetry message: {}", reason);
            return Ok(0);
        }
    };

    debug!(
        "Processing telemetry batch {} with {} sample(s)",
        batch.batch_id,
        batch.samples.len()
    );

    // 2. Ingest all-or-nothing
    match service.ingest_telemetry(&batch.samples).await {
        Ok(n) => Ok(n),
        Err(TrackingError::Validation(reason)) => {
            warn!("Rejected telemetry batch {}: {}", batch.batch_id, reason);
            Ok(0)
        }
        Err(e) => Err(anyhow::Error::new(e).context(format!("telemetry batch {}", batch.batch_id))),
    }
}
