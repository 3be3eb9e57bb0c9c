mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use farmaturno_scraper::{Collector, CollectorSettings, Connector};
use farmaturno_store::DatasetStore;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = farmaturno_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let store = DatasetStore::from_app_config(&config);
    let collector = Arc::new(Collector::new(
        Connector::from_app_config(&config),
        store.clone(),
        CollectorSettings::from_app_config(&config),
    ));

    tracing::info!(
        env = %config.env,
        backend = %config.fetch_backend,
        dataset = %store.path().display(),
        public_dir = %config.public_dir.display(),
        "farmaturno server starting"
    );

    let mut scheduler = scheduler::build_scheduler(Arc::clone(&collector), &config).await?;
    if config.run_on_startup {
        scheduler::spawn_startup_run(Arc::clone(&collector));
    }

    let app = build_app(AppState { store }, &config.public_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
