use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer};

use crate::handlers::{
    courses::{create_course, delete_course, get_course, list_courses, update_course},
    health::health_check,
    metrics::metrics_handler,
};
use crate::middleware::{LoggingLayer, RequestIdLayer};
use crate::state::AppState;

/// Default limit on request bodies.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Creates the router with the default body limit.
pub fn create_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    create_router_with_limit(state, prometheus_handle, DEFAULT_BODY_LIMIT)
}

/// Creates the router, rejecting request bodies over `body_limit` bytes.
pub fn create_router_with_limit(
    state: AppState,
    prometheus_handle: PrometheusHandle,
    body_limit: usize,
) -> Router {
    let middleware_stack = ServiceBuilder::new()
        .layer(RequestIdLayer)
        .layer(LoggingLayer);

    // Router for metrics endpoint (different state)
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    let app_router = Router::new()
        .route("/health", get(health_check))
        .route(
            "/courses",
            get(list_courses).post(create_course).put(update_course),
        )
        .route("/courses/{name}", get(get_course).delete(delete_course))
        .with_state(state);

    // The last layer added is the outermost one, so a panic anywhere below
    // the recovery layer, middleware included, becomes a 500.
    Router::new()
        .merge(app_router)
        .merge(metrics_router)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn(
            crate::metrics::http::http_metrics_middleware,
        ))
        .layer(middleware_stack)
        .layer(CatchPanicLayer::new())
}

/// Serves `app` on `addr` until Ctrl+C or SIGTERM, then lets in-flight
/// requests finish for at most `shutdown_timeout`.
pub async fn run_server(
    addr: SocketAddr,
    app: Router,
    shutdown_timeout: Duration,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => result,
        _ = async {
            // Only start the drain timer once shutdown has begun.
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(shutdown_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            tracing::warn!(?shutdown_timeout, "Graceful shutdown timed out");
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
