use crate::params::websocket::ConnectParams;
use crate::{AppState, Error};
use axum::extract::ws::{self, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{future, SinkExt, StreamExt};
use hub::{CloseFrame, Frame, Session};
use std::sync::Arc;

use log::*;

/// GET upgrade to a hub WebSocket connection
#[utoipa::path(
    get,
    path = "/ws",
    params(ConnectParams),
    responses(
        (status = 101, description = "Switching protocols to a hub connection"),
        (status = 400, description = "Missing or blank user_id"),
        (status = 426, description = "Upgrade Required")
    )
)]
pub async fn connect(
    State(app_state): State<AppState>,
    Query(params): Query<ConnectParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, Error> {
    let Some(user_id) = params.principal().map(str::to_owned) else {
        debug!("Refusing WebSocket upgrade without a user_id");
        return Err(Error::BadRequest("user_id is required".to_string()));
    };

    let settings = app_state.config.hub_settings();
    let max_message_bytes = settings.max_message_bytes;
    let session = Session::new(
        app_state.hub.clone(),
        Arc::clone(&app_state.room_authorizer),
        settings,
        user_id,
    );

    Ok(ws
        .max_message_size(max_message_bytes)
        .on_upgrade(move |socket| serve(session, socket)))
}

async fn serve(session: Session, socket: WebSocket) {
    let (sink, stream) = socket.split();
    let stream = stream.map(|message| message.map(into_frame));
    let sink = sink.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(into_message(frame))));

    let reason = session.run(stream, sink).await;
    debug!("WebSocket session ended: {reason}");
}

fn into_frame(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Binary(bytes) => Frame::Binary(bytes.to_vec()),
        Message::Ping(bytes) => Frame::Ping(bytes.to_vec()),
        Message::Pong(bytes) => Frame::Pong(bytes.to_vec()),
        Message::Close(close) => Frame::Close(close.map(|close| CloseFrame {
            code: close.code,
            reason: close.reason.as_str().to_owned(),
        })),
    }
}

fn into_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(bytes) => Message::Binary(bytes.into()),
        Frame::Ping(bytes) => Message::Ping(bytes.into()),
        Frame::Pong(bytes) => Message::Pong(bytes.into()),
        Frame::Close(close) => Message::Close(close.map(|close| ws::CloseFrame {
            code: close.code,
            reason: close.reason.into(),
        })),
    }
}
