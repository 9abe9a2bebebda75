use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use cotar_core::config::{AppConfig, ConfigError, LoadOptions};
use cotar_core::ports::{
    AttachmentStore, CepLookup, EligibilityGateway, EscrowGateway, SessionPort,
};
use cotar_db::{connect_for, migrations, DbPool};
use cotar_gateway::{
    FsAttachmentStore, HttpCepLookup, HttpEligibilityGateway, HttpEscrowGateway,
    HttpSessionGateway,
};

/// Shared handler state: the pool plus every external collaborator as an
/// injected trait object.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub eligibility: Arc<dyn EligibilityGateway>,
    pub cep: Arc<dyn CepLookup>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub sessions: Arc<dyn SessionPort>,
    pub escrow: Option<Arc<dyn EscrowGateway>>,
    pub public_base_url: String,
}

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_for(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let escrow = HttpEscrowGateway::from_config(&config.escrow)
        .map(|gateway| Arc::new(gateway) as Arc<dyn EscrowGateway>);
    info!(
        event_name = "system.bootstrap.escrow_mode",
        enabled = escrow.is_some(),
        "escrow gateway initialized"
    );

    let state = AppState {
        db_pool,
        eligibility: Arc::new(HttpEligibilityGateway::new(&config.eligibility)),
        cep: Arc::new(HttpCepLookup::new(&config.cep)),
        attachments: Arc::new(FsAttachmentStore::new(&config.storage)),
        sessions: Arc::new(HttpSessionGateway::new(&config.auth)),
        escrow,
        public_base_url: config.server.public_base_url.trim_end_matches('/').to_string(),
    };

    Ok(Application { config, state })
}

#[cfg(test)]
mod tests {
    use cotar_core::config::{ConfigOverrides, LoadOptions};

    use super::bootstrap;

    #[tokio::test]
    async fn bootstrap_migrates_and_wires_state() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with in-memory database");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('quote', 'invitation_letter', 'quote_token', 'supplier_response')",
        )
        .fetch_one(&app.state.db_pool)
        .await
        .expect("expected foundation tables after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose baseline response-path tables");

        assert!(app.state.escrow.is_none(), "escrow defaults to disabled");
        app.state.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_rejects_invalid_database_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://localhost/cotar".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("database.url"));
    }
}
