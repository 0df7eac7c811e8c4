//! HTTP surface of the realtime hub: the WebSocket upgrade, hub introspection,
//! the broadcast ingress used by other processes, and the OpenAPI docs.

use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use log::*;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub use service::AppState;

mod controller;
mod error;
mod params;
pub mod router;

pub use error::{Error, Result};

/// Binds the configured interface and port and serves until `shutdown` resolves.
pub async fn init_server<F>(app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let server_url = format!("{interface}:{}", app_state.config.port);
    let listener = TcpListener::bind(&server_url).await?;

    info!("Server starting... listening for connections on http://{server_url}");

    serve(listener, app_state, shutdown).await
}

/// Serves on an already bound listener.
pub async fn serve<F>(listener: TcpListener, app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cors_layer = cors_layer(&app_state.config.allowed_origins);
    let router = router::define_routes(app_state).layer(cors_layer);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_credentials(true)
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_origin(origins)
}
