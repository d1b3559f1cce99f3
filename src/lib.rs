//! Geospatial trip and telemetry core: telemetry ingestion, trip lifecycle,
//! offer correlation, filtered history queries and last-known positions over
//! a Postgres/PostGIS store.

pub mod config;
pub mod db;
pub mod error;
pub mod kafka;
pub mod models;
pub mod processor;
pub mod query;
pub mod services;

pub use error::{Result, TrackingError};
pub use services::TrackingService;
