use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, Extension},
    response::IntoResponse,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_database::SharedStore;
use shared_models::auth::{Capability, Role, User};
use shared_models::error::AppError;

use crate::models::{RelayFrame, RelayStats, Room};
use crate::services::NotificationRelay;

/// Rooms a user listens on: admins share one room, doctors and patients get the
/// room of their own directory record.
pub async fn rooms_for(user: &User, store: &SharedStore) -> Result<Vec<Room>, AppError> {
    match user.role {
        Role::Admin => Ok(vec![Room::Admins]),
        Role::Doctor => {
            let doctor = store
                .find_doctor_by_user(user.id)
                .await?
                .ok_or_else(|| AppError::NotFound("No doctor profile linked to this account".to_string()))?;
            Ok(vec![Room::Doctor(doctor.id)])
        }
        Role::Patient => {
            let patient = store
                .find_patient_by_user(user.id)
                .await?
                .ok_or_else(|| AppError::NotFound("No patient profile linked to this account".to_string()))?;
            Ok(vec![Room::Patient(patient.id)])
        }
    }
}

#[axum::debug_handler]
pub async fn connect(
    Extension(user): Extension<User>,
    Extension(store): Extension<SharedStore>,
    Extension(relay): Extension<NotificationRelay>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let rooms = rooms_for(&user, &store).await?;
    info!("Websocket upgrade for user {} ({}) on {:?}", user.id, user.role, rooms);

    Ok(ws.on_upgrade(move |socket| forward_events(socket, relay, rooms)))
}

/// Forwards relay events to the socket until either side goes away.
async fn forward_events(socket: WebSocket, relay: NotificationRelay, rooms: Vec<Room>) {
    let (mut sink, mut stream) = socket.split();
    let mut subscription = relay.subscribe(rooms).await;
    let subscriber_id = subscription.id;

    loop {
        tokio::select! {
            event = subscription.receiver.recv() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&RelayFrame::AppointmentUpdated(event)) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("Failed to encode notification frame: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    relay.unsubscribe(subscriber_id).await;
    let _ = sink.close().await;
    debug!("Websocket subscriber {} disconnected", subscriber_id);
}

#[axum::debug_handler]
pub async fn relay_stats(
    Extension(user): Extension<User>,
    Extension(relay): Extension<NotificationRelay>,
) -> Result<Json<Value>, AppError> {
    user.require(Capability::ViewAllRecords)?;

    let stats = RelayStats {
        active_subscribers: relay.active_subscribers().await,
    };
    Ok(Json(json!(stats)))
}
