pub mod analysis;
pub mod commands;
pub mod models;

use commands::{
    api::{router, AppState},
    db::Store,
    indexer::Indexer,
    near::NearRpcClient,
    scheduler::{new_refresh_status, run_refresh_loop},
    settings::EffectiveSettings,
};
use std::sync::Arc;

/// Bind the listener, start background indexing, then serve until shutdown.
/// Only a failure to open the store or bind the port ends the process.
pub async fn run(settings: EffectiveSettings) -> anyhow::Result<()> {
    let store = Arc::new(
        Store::open(&settings.db_path)
            .map_err(|e| anyhow::anyhow!("could not open store at {}: {e}", settings.db_path))?,
    );
    let client = NearRpcClient::new(&settings.rpc_url, settings.rpc_timeout)
        .map_err(|e| anyhow::anyhow!("could not build RPC client: {e}"))?;
    let indexer = Arc::new(Indexer::new(
        Arc::new(client),
        Arc::clone(&store),
        settings.indexer.clone(),
    ));
    let refresh = new_refresh_status();

    let addr = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("could not bind {addr}: {e}"))?;
    log::info!("GRI API listening on http://{addr}");

    tokio::spawn(run_refresh_loop(
        indexer,
        Arc::clone(&refresh),
        settings.poll_interval,
        settings.liveness_check,
    ));

    let app = router(AppState { store, refresh }, &settings.cors_origins);
    axum::serve(listener, app).await?;
    Ok(())
}
