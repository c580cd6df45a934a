use krishi_catalog::capacity::CapacityPolicy;
use krishi_match::scorer::MatchWeights;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub matching: MatchWeights,
    #[serde(default)]
    pub capacity: CapacityPolicy,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub booking: BookingRules,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_url: None,
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AdvisorConfig {
    /// Base URL of the pricing oracle. Unset disables suggestions.
    pub endpoint: Option<String>,
    #[serde(default = "default_advisor_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_advisor_timeout_ms() -> u64 { 8000 }

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: default_advisor_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookingRules {
    #[serde(default = "default_max_cas_retries")]
    pub max_cas_retries: usize,
}

fn default_max_cas_retries() -> usize { 3 }

impl Default for BookingRules {
    fn default() -> Self {
        Self { max_cas_retries: default_max_cas_retries() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Layer `{dir}/default`, `{dir}/{RUN_MODE}`, `{dir}/local`, then `KRISHI__*` env vars.
    pub fn load_from(dir: &str) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name(&format!("{}/default", dir)))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name(&format!("{}/local", dir)).required(false))
            // e.g. KRISHI__SERVER__PORT=8080
            .add_source(config::Environment::with_prefix("KRISHI").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_in_defaults_load() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../config");
        let config = Config::load_from(dir).unwrap();

        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.matching, MatchWeights::default());
        assert_eq!(config.capacity, CapacityPolicy::default());
        assert_eq!(config.booking.max_cas_retries, 3);
        assert_eq!(config.advisor.timeout_ms, 8000);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let raw = r#"
            [server]
            port = 8080

            [auth]
            jwt_secret = "test"
        "#;
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.store.max_connections, 5);
        assert!(config.advisor.endpoint.is_none());
        assert_eq!(config.matching.category, 0.5);
        assert_eq!(config.capacity.throughputs[0].keyword, "drone");
    }
}
