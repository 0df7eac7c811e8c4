use crate::controller::ApiResponse;
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use log::*;

/// GET a diagnostic snapshot of connection and room counts
#[utoipa::path(
    get,
    path = "/ws/status",
    responses(
        (status = 200, description = "Current hub connection and room counts", body = hub::HubStatus),
        (status = 503, description = "Hub is not running")
    )
)]
pub async fn status(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let status = app_state.hub.status().await?;

    debug!(
        "Hub status: {} clients in {} rooms",
        status.total_clients, status.total_rooms
    );

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), status)))
}

/// GET every connected client with its joined rooms
#[utoipa::path(
    get,
    path = "/ws/clients",
    responses(
        (status = 200, description = "Connected clients, oldest first", body = hub::ClientsSnapshot),
        (status = 503, description = "Hub is not running")
    )
)]
pub async fn clients(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let clients = app_state.hub.clients().await?;

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), clients)))
}
