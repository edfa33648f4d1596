//! Course server binary.

use course_server::{
    AppState, Settings, create_router_with_limit, metrics::init_metrics, run_server,
    startup::build_service, telemetry::init_tracing,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.logging)?;

    tracing::info!("Starting course server v{}", course_server::version());
    tracing::info!(
        store = ?settings.store.backend,
        cache = ?settings.cache.backend,
        collection = %settings.service.collection,
        "Configuration loaded"
    );

    let prometheus = init_metrics()?;
    let (service, store) = build_service(&settings).await?;
    let state = AppState::new(service, settings.service.request_timeout);
    let app = create_router_with_limit(state, prometheus, settings.server.body_limit_bytes);

    let served = run_server(
        settings.server.addr,
        app,
        settings.server.shutdown_timeout,
    )
    .await;

    store.close().await;
    tracing::info!("Server stopped");
    served.map_err(Into::into)
}
