use std::{net::SocketAddr, path::PathBuf, process, sync::Arc};

use anyhow::Result;
use crosspost_broker::{
    config::{AppConfig, ProviderDirectory, StoreBackend},
    http::{self, AppContext},
    oauth::HttpGateway,
    service::TokenService,
    storage::{CredentialStore, FsStore, MemoryStore},
    telemetry,
};
use tokio::signal;

#[tokio::main]
async fn main() {
    telemetry::init();
    if let Err(error) = run().await {
        tracing::error!("broker shut down with error: {error:#}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = AppConfig::load()?;

    let store: Arc<dyn CredentialStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Fs => Arc::new(FsStore::new(PathBuf::from(&config.store.path))?),
    };
    let directory = Arc::new(ProviderDirectory::new(config.tenants.clone()));
    let service = Arc::new(TokenService::new(
        store,
        directory,
        Arc::new(HttpGateway::new()),
    ));

    let router = http::router(AppContext { service });
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(?addr, tenants = config.tenants.len(), "crosspost broker listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
