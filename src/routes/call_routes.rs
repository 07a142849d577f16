use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rocket::serde::json::Json;
use rocket::{get, post, State};
use rocket_ws::{Message as WsMessage, WebSocket};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::call_room::CallRoomRegistry;
use crate::error::{AppError, AppResult};
use crate::identity;
use crate::models::{CallStateView, ClientFrame, ServerFrame};

use super::BearerAuth;

#[derive(serde::Deserialize)]
pub struct InitiateCallRequest {
    #[serde(rename = "calleePubkey")]
    pub callee_pubkey: String,
    #[serde(rename = "callerName")]
    pub caller_name: Option<String>,
}

#[derive(serde::Serialize)]
pub struct InitiateCallResponse {
    #[serde(rename = "roomId")]
    pub room_id: String,
    #[serde(rename = "callState")]
    pub call_state: CallStateView,
}

/// Not part of spec.md's endpoint table, but the call state machine has
/// no other entry point: some caller has to mint a `roomId`. Bearer-
/// authed so the caller identity comes from the session, matching
/// every other mutating endpoint in this gateway.
#[post("/call/initiate", format = "json", data = "<body>")]
pub fn call_initiate(
    call_rooms: &State<Arc<CallRoomRegistry>>,
    auth: BearerAuth,
    body: Json<InitiateCallRequest>,
) -> AppResult<Json<InitiateCallResponse>> {
    let callee = identity::normalize_identity(&body.callee_pubkey)
        .ok_or_else(|| AppError::BadRequest("invalid callee pubkey".into()))?;
    let room_id = Uuid::new_v4().to_string();
    let call_state = call_rooms.initiate(&room_id, &auth.0, &callee, body.caller_name.clone());
    Ok(Json(InitiateCallResponse { room_id, call_state }))
}

#[get("/call/signal/<room_id>?<participant>")]
pub fn call_signal(
    call_rooms: &State<Arc<CallRoomRegistry>>,
    ws: WebSocket,
    room_id: String,
    participant: String,
) -> rocket_ws::Channel<'static> {
    let call_rooms = call_rooms.inner().clone();

    ws.channel(move |stream| {
        Box::pin(async move {
            if !call_rooms.is_participant(&room_id, &participant) {
                return Ok(());
            }
            let Some(room) = call_rooms.get(&room_id) else {
                return Ok(());
            };

            let (mut outbound_sink, mut inbound_stream) = stream.split();
            let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();
            let generation = room.attach(&participant, tx).await;

            let writer = tokio::spawn(async move {
                while let Some(frame) = rx.recv().await {
                    let payload = serde_json::to_string(&frame).unwrap_or_default();
                    if outbound_sink.send(WsMessage::Text(payload)).await.is_err() {
                        break;
                    }
                }
            });

            let mut clean_close = false;
            while let Some(message) = inbound_stream.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => {
                        if let Ok(frame) = serde_json::from_str::<ClientFrame>(&text) {
                            room.frame(&participant, generation, frame);
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        clean_close = true;
                        break;
                    }
                    Ok(_) => {}
                    Err(_) => break,
                }
            }

            room.disconnect(&participant, generation, clean_close);
            writer.abort();
            Ok(())
        })
    })
}
