use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::models::ScoringWeights;
use crate::quota::service::DEFAULT_MAX_WRITE_RETRIES;
use crate::quota::FeatureKey;

const ENV_PREFIX: &str = "UNIMATCH";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub catalog: CatalogSettings,
    pub collection: CollectionSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub quota: QuotaSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    /// Per-tier limit overrides, e.g. `[tiers.premium] comparisons = 20`
    #[serde(default)]
    pub tiers: HashMap<String, HashMap<FeatureKey, i64>>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    pub endpoint: String,
    pub api_key: String,
    pub project_id: String,
    pub database_id: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    pub academic_profiles: String,
    pub universities: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Shared tier; the cache runs in-process only when unset
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool { true }

/// Where usage ledgers live
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerSettings {
    #[serde(default)]
    pub backend: LedgerBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotaSettings {
    #[serde(default = "default_max_write_retries")]
    pub max_write_retries: u32,
}

impl Default for QuotaSettings {
    fn default() -> Self {
        Self {
            max_write_retries: default_max_write_retries(),
        }
    }
}

fn default_max_write_retries() -> u32 { DEFAULT_MAX_WRITE_RETRIES }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_cgpa_weight")]
    pub cgpa: u32,
    #[serde(default = "default_english_weight")]
    pub english: u32,
    #[serde(default = "default_budget_weight")]
    pub budget: u32,
    #[serde(default = "default_gre_weight")]
    pub gre: u32,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            cgpa: default_cgpa_weight(),
            english: default_english_weight(),
            budget: default_budget_weight(),
            gre: default_gre_weight(),
        }
    }
}

impl From<&WeightsConfig> for ScoringWeights {
    fn from(config: &WeightsConfig) -> Self {
        ScoringWeights {
            cgpa: config.cgpa,
            english: config.english,
            budget: config.budget,
            gre: config.gre,
        }
    }
}

fn default_cgpa_weight() -> u32 { 40 }
fn default_english_weight() -> u32 { 30 }
fn default_budget_weight() -> u32 { 20 }
fn default_gre_weight() -> u32 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with UNIMATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., UNIMATCH__SERVER__PORT -> server.port
            .add_source(environment())
            .build()?;

        apply_env_overrides(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        settings.try_deserialize()
    }

    pub fn scoring_weights(&self) -> ScoringWeights {
        ScoringWeights::from(&self.scoring.weights)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Let the conventional `DATABASE_URL` win over `database.url`
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    let mut builder = Config::builder().add_source(settings);

    if let Ok(database_url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", database_url)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    const SAMPLE: &str = r#"
        [server]
        host = "127.0.0.1"
        port = 8080

        [catalog]
        endpoint = "https://store.test/v1"
        api_key = "key"
        project_id = "project"
        database_id = "db"

        [collection]
        academic_profiles = "academic_profiles"
        universities = "universities"

        [database]
        url = "postgres://localhost/unimatch"

        [ledger]
        backend = "memory"

        [scoring.weights]
        cgpa = 50

        [tiers.premium]
        comparisons = 25
    "#;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_weights() {
        let weights = ScoringWeights::from(&WeightsConfig::default());
        assert_eq!(weights, ScoringWeights::default());
    }

    #[test]
    fn test_default_logging() {
        let logging = LoggingSettings::default();
        assert_eq!(logging.level, "info");
        assert_eq!(logging.format, "json");
    }

    #[test]
    fn test_parse_sample() {
        let settings = parse(SAMPLE);

        assert_eq!(settings.ledger.backend, LedgerBackend::Memory);
        assert_eq!(settings.quota.max_write_retries, DEFAULT_MAX_WRITE_RETRIES);
        assert!(settings.cache.enabled);
        assert!(settings.cache.redis_url.is_none());

        let weights = settings.scoring_weights();
        assert_eq!(weights.cgpa, 50);
        assert_eq!(weights.english, 30);

        assert_eq!(
            settings.tiers["premium"].get(&FeatureKey::Comparisons),
            Some(&25)
        );
    }
}
