mod bootstrap;
mod escrow;
mod health;
mod letters;
mod register;
mod respond;
#[cfg(test)]
mod test_support;

use std::future::IntoFuture;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tower_http::services::ServeDir;

use bootstrap::AppState;
use cotar_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use cotar_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

/// Full route surface: public response pages, letter API, registration,
/// escrow admin, health, and the static upload directory.
fn app_router(state: AppState, upload_dir: &Path, public_path: &str) -> Router {
    Router::new()
        .merge(respond::router())
        .merge(letters::router())
        .merge(register::router())
        .merge(escrow::router())
        .with_state(state.clone())
        .merge(health::router(state.db_pool))
        .nest_service(public_path, ServeDir::new(upload_dir))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = app_router(
        app.state.clone(),
        &app.config.storage.root_dir,
        &app.config.storage.public_path,
    );

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        public_base_url = %app.config.server.public_base_url,
        "cotar-server listening"
    );

    let (signal_tx, signal_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                let _ = signal_tx.send(());
            })
            .into_future(),
    );

    // Resolves on ctrl-c; also resolves (with an error) if the server
    // future completed on its own and dropped the sender.
    let _ = signal_rx.await;
    tracing::info!(event_name = "system.server.stopping", "cotar-server draining connections");

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_elapsed) => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = grace.as_secs(),
                "connections did not drain in time, shutting down anyway"
            );
        }
    }

    tracing::info!(event_name = "system.server.stopped", "cotar-server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    use crate::test_support::migrated_state;

    #[tokio::test]
    async fn router_serves_health_alongside_the_api_surface() {
        let state = migrated_state().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let router = super::app_router(state, dir.path(), "/uploads");

        let response = router
            .clone()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::builder().uri("/r/missing").body(Body::empty()).expect("request"))
            .await
            .expect("respond route");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
