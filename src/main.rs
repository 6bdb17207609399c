use {
    giveaway_checkout::{
        AppState,
        adapters::{http, razorpay_client::RazorpayClient},
        config::{AppConfig, StorageBackend},
        domain::store::ParticipantStore,
        infra::{memory::document_store::MemoryDocumentStore, postgres::store::PgStore},
    },
    std::{process, sync::Arc},
    tokio::signal,
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            process::exit(1);
        }
    };

    let store: Arc<dyn ParticipantStore> = match &config.storage {
        StorageBackend::Postgres { database_url } => {
            match PgStore::connect(database_url, config.db_max_connections).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!(error = %e, "failed to connect to database");
                    process::exit(1);
                }
            }
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, data is lost on restart");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    let gateway = match RazorpayClient::new(&config.gateway) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "failed to build gateway client");
            process::exit(1);
        }
    };

    let state = AppState::new(store.clone(), gateway, config.checkout_settings());
    let app = http::router(state);

    let listener = match tokio::net::TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %config.bind_addr, error = %e, "failed to bind");
            process::exit(1);
        }
    };
    tracing::info!(addr = %config.bind_addr, currency = %config.currency, "listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
    }

    store.close().await;
    tracing::info!("shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
