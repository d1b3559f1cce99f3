pub mod filters;
pub mod geo_point;
pub mod message;
pub mod offer;
pub mod telemetry;
pub mod trip;
