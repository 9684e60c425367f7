//! Trellis API service entry point.
//!
//! # Purpose
//! Wires configuration, storage, and the HTTP router, then serves the API and
//! the Prometheus metrics listener until Ctrl-C.
use anyhow::Context;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use trellis_api::app::{AppState, SERVICE_NAME, build_router};
use trellis_api::config::ApiConfig;
use trellis_api::observability;
use trellis_api::store::DirectoryStore;
use trellis_api::store::memory::InMemoryStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env_or_yaml().context("trellis api config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: ApiConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability(SERVICE_NAME)?;
    let state = build_state(&config)?;
    tracing::info!(backend = state.store.backend_name(), "storage ready");
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "trellis api listening");
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

fn build_state(config: &ApiConfig) -> anyhow::Result<AppState> {
    let store: Arc<dyn DirectoryStore> = match &config.seed_path {
        Some(path) => Arc::new(InMemoryStore::from_seed_file(path)?),
        None => {
            tracing::warn!("no seed file configured; starting with an empty store");
            Arc::new(InMemoryStore::new())
        }
    };
    AppState::new(config, store)
}
