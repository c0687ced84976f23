//! Router assembly and the serve loop.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::Method;
use axum::http::header::CONTENT_TYPE;
use axum::routing::{get, put};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::storage::Store;

use handlers::{
    AppState, create_order, create_product, health, list_orders, list_products, not_found,
    search_products, update_product,
};

/// Build the full application router.
///
/// The store handle is the router's only dependency; it is passed in
/// explicitly so tests can swap backends.
pub fn build_router(store: Arc<dyn Store>, config: &Config) -> Router {
    let state = AppState { store };

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(Any)
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", put(update_product))
        .route("/orders", get(list_orders).post(create_order))
        .route("/search", get(search_products))
        .route("/health", get(health))
        .with_state(state);

    Router::new()
        .merge(api)
        .route_service("/", ServeFile::new(config.static_dir.join("index.html")))
        .nest_service("/images", ServeDir::new(config.static_dir.join("images")))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until SIGINT/SIGTERM.
pub async fn serve(router: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::warn!("failed to install signal handler: {e}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
