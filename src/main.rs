use domain::gateway::broadcast_relay::{BroadcastRelay, RelayEventHandler};
use domain::room_access::DatabaseRoomAuthorizer;
use events::EventPublisher;
use hub::{Hub, HubEventHandler, HubHandle};
use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting up SkillSwap realtime hub ({} environment)...",
        config.runtime_env()
    );

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let (hub, hub_handle) = Hub::new(config.ws_control_channel_capacity);
    let hub_task = tokio::spawn(hub.run());

    let mut event_publisher =
        EventPublisher::new().with_handler(Arc::new(HubEventHandler::new(hub_handle.clone())));
    match BroadcastRelay::from_config(&config) {
        Ok(Some(relay)) => {
            info!("Relaying domain events to {}", relay.url());
            event_publisher = event_publisher.with_handler(Arc::new(RelayEventHandler::new(relay)));
        }
        Ok(None) => debug!("broadcast_relay_url not set, relaying disabled"),
        Err(e) => {
            error!("Invalid broadcast relay configuration: {e}");
            std::process::exit(1);
        }
    }

    let room_authorizer = Arc::new(DatabaseRoomAuthorizer::new(Arc::clone(&db)));
    let app_state = AppState::new(
        config,
        hub_handle.clone(),
        room_authorizer,
        Arc::new(event_publisher),
    );

    if let Err(e) = web::init_server(app_state, shutdown_signal(hub_handle)).await {
        error!("Server error: {e}");
    }

    if let Err(e) = hub_task.await {
        error!("Hub task failed: {e}");
    }
    info!("Shutdown complete");
}

/// Resolves on Ctrl-C or SIGTERM after asking the hub to close every connection.
async fn shutdown_signal(hub: HubHandle) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received, closing hub connections");
    hub.shutdown().await;
}
