use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

use crate::query::QueryLimits;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub kafka_bootstrap_servers: String,
    pub kafka_topic: String,
    pub kafka_group_id: String,
    pub kafka_auto_offset_reset: String,
    pub kafka_sasl_mechanism: String,
    pub kafka_username: String,
    pub kafka_password: String,
    pub kafka_security_protocol: String,
    pub kafka_max_retries: u32,
    pub kafka_circuit_breaker_cooldown: u64,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_statement_timeout_ms: u64,
    pub query_default_limit: i64,
    pub query_max_limit: i64,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let kafka_bootstrap_servers =
            env::var("KAFKA_BOOTSTRAP_SERVERS").unwrap_or_else(|_| "localhost:9092".to_string());
        let kafka_topic =
            env::var("KAFKA_TOPIC").unwrap_or_else(|_| "geotrack-telemetry".to_string());
        let kafka_group_id =
            env::var("KAFKA_GROUP_ID").unwrap_or_else(|_| "geotrack-ingest".to_string());
        let kafka_auto_offset_reset =
            env::var("KAFKA_AUTO_OFFSET_RESET").unwrap_or_else(|_| "latest".to_string());
        let kafka_sasl_mechanism =
            env::var("KAFKA_SASL_MECHANISM").unwrap_or_else(|_| "SCRAM-SHA-256".to_string());
        let kafka_username = env::var("KAFKA_USERNAME").unwrap_or_default();
        let kafka_password = env::var("KAFKA_PASSWORD").unwrap_or_default();
        let kafka_security_protocol =
            env::var("KAFKA_SECURITY_PROTOCOL").unwrap_or_else(|_| "SASL_PLAINTEXT".to_string());
        let kafka_max_retries = env_or("KAFKA_MAX_RETRIES", 5);
        let kafka_circuit_breaker_cooldown = env_or("KAFKA_CIRCUIT_BREAKER_COOLDOWN", 300);

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
                let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
                let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "geotrack".to_string());
                let db_user = env::var("DB_USER").unwrap_or_else(|_| "geotrack".to_string());
                let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "geotrack".to_string());

                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    db_user, db_pwd, db_host, db_port, db_name
                )
            }
        };
        let db_max_connections = env_or("DB_MAX_CONNECTIONS", 50);
        let db_statement_timeout_ms = env_or("DB_STATEMENT_TIMEOUT_MS", 30_000);

        let defaults = QueryLimits::default();
        let query_default_limit = env_or("QUERY_DEFAULT_LIMIT", defaults.default_limit);
        let query_max_limit = env_or("QUERY_MAX_LIMIT", defaults.max_limit);

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            kafka_bootstrap_servers,
            kafka_topic,
            kafka_group_id,
            kafka_auto_offset_reset,
            kafka_sasl_mechanism,
            kafka_username,
            kafka_password,
            kafka_security_protocol,
            kafka_max_retries,
            kafka_circuit_breaker_cooldown,
            database_url,
            db_max_connections,
            db_statement_timeout_ms,
            query_default_limit,
            query_max_limit,
            log_level,
        })
    }

    /// Page-size bounds; a default above the maximum is clamped down to it.
    pub fn query_limits(&self) -> QueryLimits {
        QueryLimits {
            default_limit: self.query_default_limit.min(self.query_max_limit).max(1),
            max_limit: self.query_max_limit.max(1),
        }
    }
}

/// Parses an env var, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back() {
        assert_eq!(env_or("GEOTRACK_TEST_UNSET_VAR", 7u32), 7);

        env::set_var("GEOTRACK_TEST_BAD_NUMBER", "seven");
        assert_eq!(env_or("GEOTRACK_TEST_BAD_NUMBER", 7u32), 7);

        env::set_var("GEOTRACK_TEST_GOOD_NUMBER", " 12 ");
        assert_eq!(env_or("GEOTRACK_TEST_GOOD_NUMBER", 7u32), 12);
    }

    #[test]
    fn test_query_limits_clamp_default() {
        let mut config = AppConfig::load().unwrap();
        config.query_default_limit = 900;
        config.query_max_limit = 200;
        let limits = config.query_limits();
        assert_eq!(limits.default_limit, 200);
        assert_eq!(limits.max_limit, 200);
    }
}
