use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{enrich::PickStrategy, storage};

const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_JOB_TIMEOUT_MS: u64 = 200;
const DEFAULT_DEADLINE_MS: u64 = 1000;
const DEFAULT_POOL_MAX_IDLE: usize = 64;
const DEFAULT_GENERATED_SIZE: usize = 10_000;
/// Simulated services answer within 0-40ms
const DEFAULT_MAX_LATENCY_MS: u64 = 40;
/// 5% of simulated calls fail
const DEFAULT_FAILURE_RATE: f64 = 0.05;
const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("config file is not valid utf8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("config is malformed: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("{0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned when the caller does not ask for a page size
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Concurrent lookup workers per request
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Timeout for the lookups of a single item, in milliseconds
    #[serde(default = "default_job_timeout_ms")]
    pub job_timeout_ms: u64,

    /// Overall enrichment deadline per request, in milliseconds
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,

    /// Drop items whose stock lookup failed instead of reporting stock 0
    #[serde(default = "default_true")]
    pub require_availability: bool,

    /// Idle result records kept for reuse
    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            job_timeout_ms: DEFAULT_JOB_TIMEOUT_MS,
            deadline_ms: DEFAULT_DEADLINE_MS,
            require_availability: true,
            pool_max_idle: DEFAULT_POOL_MAX_IDLE,
        }
    }
}

impl EnrichmentConfig {
    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecommendationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub strategy: PickStrategy,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: PickStrategy::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// JSON corpus file. A corpus is generated when unset.
    #[serde(default)]
    pub path: Option<String>,

    /// Number of products to generate when no path is set
    #[serde(default = "default_generated_size")]
    pub generated_size: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: None,
            generated_size: DEFAULT_GENERATED_SIZE,
        }
    }
}

/// Behaviour of the built-in simulated detail and stock services.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_max_latency_ms")]
    pub max_latency_ms: u64,

    /// Probability of a failed lookup [0.0, 1.0]
    #[serde(default = "default_failure_rate")]
    pub failure_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_latency_ms: DEFAULT_MAX_LATENCY_MS,
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_job_timeout_ms() -> u64 {
    DEFAULT_JOB_TIMEOUT_MS
}

fn default_deadline_ms() -> u64 {
    DEFAULT_DEADLINE_MS
}

fn default_pool_max_idle() -> usize {
    DEFAULT_POOL_MAX_IDLE
}

fn default_generated_size() -> usize {
    DEFAULT_GENERATED_SIZE
}

fn default_max_latency_ms() -> u64 {
    DEFAULT_MAX_LATENCY_MS
}

fn default_failure_rate() -> f64 {
    DEFAULT_FAILURE_RATE
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub recommendation: RecommendationConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search: SearchConfig::default(),
            enrichment: EnrichmentConfig::default(),
            recommendation: RecommendationConfig::default(),
            corpus: CorpusConfig::default(),
            simulation: SimulationConfig::default(),
            listen: default_listen(),
            base_path: String::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.default_page_size == 0 {
            return Err(invalid("search.default_page_size must be greater than 0"));
        }

        let enrichment = &self.enrichment;
        if enrichment.workers == 0 {
            return Err(invalid("enrichment.workers must be greater than 0"));
        }
        if enrichment.job_timeout_ms == 0 {
            return Err(invalid("enrichment.job_timeout_ms must be greater than 0"));
        }

        let sim = &self.simulation;
        if !(0.0..=1.0).contains(&sim.failure_rate) {
            return Err(ConfigError::Invalid(format!(
                "simulation.failure_rate must be between 0.0 and 1.0, got {}",
                sim.failure_rate
            )));
        }

        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "listen must be a socket address, got '{}'",
                self.listen
            )));
        }

        Ok(())
    }

    pub fn load_with(base_path: &str) -> Result<Self, ConfigError> {
        let store = storage::BackendLocal::new(base_path)?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(
                CONFIG_FILE,
                serde_yml::to_string(&Self::default())?.as_bytes(),
            )?;
        }

        let config_str = String::from_utf8(store.read(CONFIG_FILE)?)?;
        let mut config: Self = serde_yml::from_str(&config_str)?;

        config.base_path = base_path.to_string();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
