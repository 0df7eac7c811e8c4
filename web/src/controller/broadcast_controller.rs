use crate::controller::ApiResponse;
use crate::params::broadcast::BroadcastParams;
use crate::{AppState, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use hub::{Envelope, Error as HubError, EventKind, ProtocolErrorKind, RoomId};
use serde_json::{json, Value};

use log::*;

/// POST publish a domain event into a room on behalf of another process
#[utoipa::path(
    post,
    path = "/ws/broadcast",
    request_body = BroadcastParams,
    responses(
        (status = 202, description = "Event queued for delivery to the room"),
        (status = 403, description = "Ingress disabled or auth_token mismatch"),
        (status = 422, description = "Invalid room_name or non-relayable event_name"),
        (status = 503, description = "Hub is not running")
    )
)]
pub async fn broadcast(
    State(app_state): State<AppState>,
    Json(params): Json<BroadcastParams>,
) -> Result<impl IntoResponse, Error> {
    let Some(expected_token) = app_state.config.broadcast_auth_token() else {
        warn!(
            "Rejecting broadcast to {}: broadcast_auth_token is not configured",
            params.room_name
        );
        return Err(Error::Forbidden);
    };
    if params.auth_token.as_deref() != Some(expected_token.as_str()) {
        warn!("Rejecting broadcast to {}: bad auth_token", params.room_name);
        return Err(Error::Forbidden);
    }

    let room = RoomId::parse(&params.room_name)?;
    let kind = EventKind::relayable(&params.event_name).ok_or_else(|| {
        HubError::protocol(
            ProtocolErrorKind::UnrelayableEvent,
            format!("{} cannot be broadcast", params.event_name),
        )
    })?;
    let data = match params.data {
        Value::Null => json!({}),
        data => data,
    };

    debug!("Relaying {} into {room}", params.event_name);
    app_state
        .hub
        .broadcast(Envelope::to_room(room, kind, data))
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::<()>::no_content(StatusCode::ACCEPTED.into())),
    ))
}
