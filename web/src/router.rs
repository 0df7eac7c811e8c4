use crate::{controller::health_check_controller, params, AppState};
use axum::{
    routing::{get, post},
    Router,
};

use crate::controller::{broadcast_controller, status_controller, websocket_controller};

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "SkillSwap Realtime API"
        ),
        paths(
            health_check_controller::health_check,
            websocket_controller::connect,
            status_controller::status,
            status_controller::clients,
            broadcast_controller::broadcast,
        ),
        components(
            schemas(
                hub::HubStatus,
                hub::ClientsSnapshot,
                hub::ClientInfo,
                params::broadcast::BroadcastParams,
            )
        ),
        tags(
            (name = "skillswap_realtime", description = "SkillSwap real-time rooms for conversations and posts")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(websocket_routes(app_state.clone()))
        .merge(hub_status_routes(app_state.clone()))
        .merge(broadcast_routes(app_state))
        // FIXME: protect the status endpoints once an admin session exists
        .merge(RapiDoc::with_openapi("/api-docs/openapi2.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn websocket_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_controller::connect))
        .with_state(app_state)
}

fn hub_status_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws/status", get(status_controller::status))
        .route("/ws/clients", get(status_controller::clients))
        .with_state(app_state)
}

fn broadcast_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/ws/broadcast", post(broadcast_controller::broadcast))
        .with_state(app_state)
}
