use crate::config::AppConfig;
use crate::processor::message_processor;
use crate::services::TrackingService;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::time::Duration;
use tracing::{error, info, warn};

/// Consumes telemetry batches and hands each one to ingestion.
///
/// Broker errors count towards a circuit breaker; after
/// `kafka_max_retries` consecutive failures the loop sleeps for the cooldown.
/// Messages are ingested in order, one transaction per message.
pub async fn start_kafka_consumer(config: &AppConfig, service: TrackingService) -> anyhow::Result<()> {
    info!("Initializing Kafka consumer for topic: {}", config.kafka_topic);

    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", &config.kafka_bootstrap_servers)
        .set("group.id", &config.kafka_group_id)
        .set("auto.offset.reset", &config.kafka_auto_offset_reset)
        // SASL Configuration
        .set("security.protocol", &config.kafka_security_protocol)
        .set("sasl.mechanism", &config.kafka_sasl_mechanism)
        .set("sasl.username", &config.kafka_username)
        .set("sasl.password", &config.kafka_password);

    let consumer: StreamConsumer = client_config.create()?;

    consumer.subscribe(&[&config.kafka_topic])?;
    info!("Subscribed to topic: {}", config.kafka_topic);

    let mut breaker = CircuitBreaker::new(config.kafka_max_retries);
    let cooldown_duration = Duration::from_secs(config.kafka_circuit_breaker_cooldown);

    loop {
        if breaker.is_open() {
            warn!(
                "Circuit breaker tripped ({} consecutive failures)! Sleeping for {} seconds...",
                breaker.failures(),
                config.kafka_circuit_breaker_cooldown
            );
            tokio::time::sleep(cooldown_duration).await;
            breaker.reset();
            info!("Circuit breaker reset. Resuming consumption.");
        }

        match consumer.recv().await {
            Ok(m) => {
                breaker.record_success();

                let payload = match m.payload() {
                    None => {
                        warn!("Received empty payload from Kafka");
                        continue;
                    }
                    Some(p) => p,
                };

                if let Err(e) = message_processor::process_message(&service, payload).await {
                    error!(
                        "Error ingesting message at {}/{}: {:#}",
                        m.partition(),
                        m.offset(),
                        e
                    );
                }
            }
            Err(e) => {
                breaker.record_failure();
                error!(
                    "Kafka error: {}. Incrementing failure count ({} / {})",
                    e,
                    breaker.failures(),
                    config.kafka_max_retries
                );

                // Small delay to prevent tight loop in case of minor network glitches
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}

#[derive(Debug)]
struct CircuitBreaker {
    consecutive_failures: u32,
    max_failures: u32,
}

impl CircuitBreaker {
    fn new(max_failures: u32) -> Self {
        Self {
            consecutive_failures: 0,
            max_failures,
        }
    }

    fn is_open(&self) -> bool {
        self.consecutive_failures >= self.max_failures
    }

    fn failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
    }
}
