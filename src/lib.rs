pub mod cli;
pub mod core;
pub mod providers;
pub mod service;
pub mod store;

use crate::core::cache::Cache;
use crate::core::config::AppConfig;
use crate::core::fund::FundDataProvider;
use anyhow::{Context, Result};
use service::SavedFundsService;
use std::sync::Arc;
use store::{KeyValueStore, SavedFundsStore, UserDirectory};
use tracing::{debug, info};

pub enum AppCommand {
    Register { username: String },
    Search { query: String },
    Details { scheme_code: String },
    Save { scheme_code: String, fund_id: Option<String> },
    Saved { with_nav: bool },
    Remove { fund_id: String },
}

/// Everything a command needs, opened once per process.
pub struct App {
    config: AppConfig,
    provider: Arc<dyn FundDataProvider>,
    directory: UserDirectory,
    service: SavedFundsService,
}

impl App {
    pub fn open(config: AppConfig) -> Result<Self> {
        let data_path = config.data_path()?;
        let store = KeyValueStore::open(&data_path)
            .with_context(|| format!("Failed to open data store at {}", data_path.display()))?;
        Self::with_store(config, &store)
    }

    pub fn with_store(config: AppConfig, store: &KeyValueStore) -> Result<Self> {
        let cache = Arc::new(Cache::new());
        let provider = Arc::new(providers::MfApiProvider::new(
            config.mfapi_base_url(),
            cache,
        )?);
        Self::with_parts(config, store, provider)
    }

    pub fn with_parts(
        config: AppConfig,
        store: &KeyValueStore,
        provider: Arc<dyn FundDataProvider>,
    ) -> Result<Self> {
        let directory = UserDirectory::new(store)?;
        let service = SavedFundsService::new(
            Arc::new(directory.identity()),
            Arc::new(SavedFundsStore::new(store)?),
        );
        Ok(Self {
            config,
            provider,
            directory,
            service,
        })
    }

    pub fn directory(&self) -> &UserDirectory {
        &self.directory
    }

    pub fn service(&self) -> &SavedFundsService {
        &self.service
    }

    /// Runs a command. `credential` is the caller's bearer token, if any.
    pub async fn run(&self, command: AppCommand, credential: Option<&str>) -> Result<()> {
        let provider = self.provider.as_ref();
        match command {
            AppCommand::Register { username } => {
                cli::user::register(&self.directory, &username).await
            }
            AppCommand::Search { query } => {
                cli::search::run(provider, &query, self.config.search_limit).await
            }
            AppCommand::Details { scheme_code } => {
                cli::details::run(provider, &scheme_code, self.config.nav_history_rows).await
            }
            AppCommand::Save {
                scheme_code,
                fund_id,
            } => {
                cli::saved::save(
                    &self.service,
                    provider,
                    credential,
                    &scheme_code,
                    fund_id.as_deref(),
                )
                .await
            }
            AppCommand::Saved { with_nav } => {
                cli::saved::list(&self.service, provider, credential, with_nav).await
            }
            AppCommand::Remove { fund_id } => {
                cli::saved::remove(&self.service, credential, &fund_id).await
            }
        }
    }
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    credential: Option<&str>,
) -> Result<()> {
    info!("mfbook starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    App::open(config)?.run(command, credential).await
}
