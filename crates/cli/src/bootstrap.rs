use std::sync::Arc;
use std::time::Duration;

use talentscout_agent::{build_llm_client, IntakeRuntime, LlmError, QuestionGenerator, QuestionPolicy};
use talentscout_core::config::{AppConfig, ConfigError, LoadOptions};
use talentscout_core::handoff::{DataHandler, DiscardingDataHandler};
use talentscout_core::taxonomy::{TaxonomyError, TechTaxonomy};
use talentscout_db::{
    connect_from_config, migrations, RecordVault, SqlCandidateRepository, VaultError,
};
use thiserror::Error;
use tracing::info;

/// Where finished records go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persistence {
    Database,
    Discard,
}

pub struct Application {
    pub config: AppConfig,
    pub taxonomy: Arc<TechTaxonomy>,
    pub runtime: IntakeRuntime,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
    #[error("llm client could not be built: {0}")]
    Llm(#[from] LlmError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Vault(#[from] VaultError),
}

impl BootstrapError {
    /// Stable class and exit code for command output.
    pub fn classify(&self) -> (&'static str, u8) {
        match self {
            Self::Config(_) => ("config_validation", 2),
            Self::DatabaseConnect(_) => ("db_connectivity", 4),
            Self::Migration(_) => ("migration", 5),
            Self::Taxonomy(_) => ("taxonomy", 7),
            Self::Vault(_) => ("vault", 10),
            Self::Llm(_) => ("llm_config", 11),
        }
    }
}

pub async fn bootstrap(
    options: LoadOptions,
    persistence: Persistence,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config, persistence).await
}

pub async fn bootstrap_with_config(
    config: AppConfig,
    persistence: Persistence,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        persistence = ?persistence,
        "starting intake bootstrap"
    );

    let taxonomy = load_taxonomy(&config)?;
    info!(
        event_name = "system.bootstrap.taxonomy_loaded",
        correlation_id = "bootstrap",
        technologies = taxonomy.len(),
        "tech taxonomy loaded"
    );

    let data_handler: Arc<dyn DataHandler> = match persistence {
        Persistence::Database => Arc::new(open_repository(&config).await?),
        Persistence::Discard => Arc::new(DiscardingDataHandler),
    };

    let generator = build_generator(&config, Arc::clone(&taxonomy))?;
    let runtime = IntakeRuntime::new(Arc::clone(&taxonomy), generator, data_handler)
        .with_app_name(config.app.name.clone());

    Ok(Application { config, taxonomy, runtime })
}

pub fn load_taxonomy(config: &AppConfig) -> Result<Arc<TechTaxonomy>, TaxonomyError> {
    TechTaxonomy::load(config.taxonomy.path.as_deref()).map(Arc::new)
}

pub fn build_generator(
    config: &AppConfig,
    taxonomy: Arc<TechTaxonomy>,
) -> Result<QuestionGenerator, LlmError> {
    let generator =
        QuestionGenerator::new(taxonomy, QuestionPolicy::from_config(&config.interview));
    if !config.llm_enabled() {
        return Ok(generator);
    }
    let client = build_llm_client(&config.llm)?;
    Ok(generator.with_llm(client, Duration::from_secs(config.llm.timeout_secs)))
}

/// Connects, applies migrations, and opens the record vault.
pub async fn open_repository(config: &AppConfig) -> Result<SqlCandidateRepository, BootstrapError> {
    let pool = connect_from_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let vault = RecordVault::from_config(&config.privacy)?;
    Ok(SqlCandidateRepository::new(pool, vault, config.privacy.data_retention_days))
}
