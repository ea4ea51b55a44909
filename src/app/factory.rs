use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use homedir::my_home;

use crate::{
    app::{AppError, CatalogService},
    config::Config,
    providers::{SimulatedAvailabilityProvider, SimulatedDetailProvider, SimulationProfile},
    semantic::Corpus,
};

/// Builds the service and its collaborators from configuration.
pub struct AppFactory;

impl AppFactory {
    /// Base directory holding `config.yaml`.
    ///
    /// `CATALOG_BASE_PATH` overrides `~/.local/share/catalog-search`.
    pub fn get_base_path() -> Result<String, AppError> {
        if let Ok(base_path) = std::env::var("CATALOG_BASE_PATH") {
            return Ok(base_path);
        }

        let home = my_home()
            .map_err(|err| anyhow!("Could not determine home directory: {err}"))?
            .ok_or_else(|| anyhow!("Home directory path is empty"))?;
        Ok(format!("{}/.local/share/catalog-search", home.to_string_lossy()))
    }

    pub fn create_config() -> Result<Config, AppError> {
        Self::create_config_at(&Self::get_base_path()?)
    }

    pub fn create_config_at(base_path: &str) -> Result<Config, AppError> {
        std::fs::create_dir_all(base_path)?;
        Ok(Config::load_with(base_path)?)
    }

    /// Load the configured corpus file, or generate one.
    pub fn load_corpus(config: &Config) -> Result<Corpus, AppError> {
        let corpus = match &config.corpus.path {
            Some(path) => {
                let path = Self::resolve(config, path);
                Corpus::load(Path::new(&path)).inspect_err(|err| {
                    log::error!("failed to load corpus from {path}: {err}");
                })?
            }
            None => Corpus::generate(config.corpus.generated_size),
        };

        corpus.warm_norms();
        log::info!("corpus ready: {} products", corpus.len());

        Ok(corpus)
    }

    /// Service backed by the simulated detail and stock services.
    pub fn create_service(config: &Config) -> Result<CatalogService, AppError> {
        let corpus = Arc::new(Self::load_corpus(config)?);

        let profile = SimulationProfile {
            max_latency: Duration::from_millis(config.simulation.max_latency_ms),
            failure_rate: config.simulation.failure_rate,
        };

        Ok(CatalogService::new(
            corpus,
            Arc::new(SimulatedDetailProvider::new(profile)),
            Arc::new(SimulatedAvailabilityProvider::new(profile)),
            config,
        ))
    }

    // relative corpus paths live next to config.yaml
    fn resolve(config: &Config, path: &str) -> String {
        if Path::new(path).is_absolute() || config.base_path().is_empty() {
            return path.to_string();
        }
        format!("{}/{path}", config.base_path())
    }
}
