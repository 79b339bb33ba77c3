use crate::{
    analyzer::ProviderChain,
    app::{errors::AppError, recommender::Recommender},
    config::Config,
    fingerprint::SnapshotError,
    scrape::HttpFetcher,
    storage,
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::sync::Arc;

pub const BASE_PATH_ENV: &str = "RECOMMENDER_BASE_PATH";

/// Wires configuration, network clients and the persisted index together.
pub struct AppFactory;

impl AppFactory {
    /// Build a ready recommender. Restores the index snapshot when
    /// persistence is enabled.
    pub fn create_recommender(paths: &AppPaths) -> Result<Recommender> {
        let config = Config::load_with(&paths.base_path)?;

        let fetcher = Arc::new(HttpFetcher::new(&config.scrape)?);
        let analyzer = Arc::new(ProviderChain::from_env(&config.providers)?);

        let persist = config.index.persist;
        let snapshot_file = config.index.file.clone();

        let mut recommender = Recommender::new(config, fetcher, analyzer);

        if persist {
            let store = storage::BackendLocal::new(&paths.base_path)
                .context("Failed to open application base directory")?;
            recommender = recommender.with_snapshot(Box::new(store), &snapshot_file);
            Self::restore(&recommender)?;
        }

        Ok(recommender)
    }

    /// A snapshot written by an older format or a different encoder can never
    /// be loaded; start over instead of refusing to run.
    fn restore(recommender: &Recommender) -> Result<()> {
        match recommender.restore_index() {
            Ok(_) => Ok(()),
            Err(AppError::Snapshot(
                err @ (SnapshotError::EncoderMismatch
                | SnapshotError::VersionMismatch(..)
                | SnapshotError::DimensionMismatch { .. }),
            )) => {
                log::warn!("{err}, starting with an empty index");
                Ok(())
            }
            Err(err) => Err(err).context("Failed to restore fingerprint index"),
        }
    }

    /// Get application paths with validation
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;

        // Ensure base directory exists
        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths { base_path })
    }

    fn get_base_path() -> Result<String> {
        if let Ok(base_path) = std::env::var(BASE_PATH_ENV) {
            return Ok(base_path);
        }

        let home = my_home()
            .map_err(|e| anyhow::anyhow!("Could not determine home directory: {e:?}"))?
            .context("Home directory path is empty")?;

        Ok(format!("{}/.local/share/recommender", home.to_string_lossy()))
    }
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: String,
}
