//! Realtime websocket endpoint.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{ChannelFilter, Table};
use crate::realtime::{Delivery, Subscription};
use crate::AppState;

/// Query parameters naming the channel to join.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelQuery {
    pub table: String,
    #[serde(default)]
    pub debate_id: Option<String>,
}

/// GET /api/realtime?table=..&debateId=.. - Stream change events over a websocket.
pub async fn realtime_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ChannelQuery>,
) -> Result<Response, AppError> {
    let table = Table::parse(&query.table)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown table {:?}", query.table)))?;
    let filter = ChannelFilter {
        table,
        debate_id: query.debate_id,
    };

    // Subscribe before the upgrade so no event between handshake and loop is lost.
    let subscription = state.repo.realtime().subscribe(filter);
    Ok(ws.on_upgrade(move |socket| ws_connection(socket, subscription)))
}

async fn ws_connection(mut socket: WebSocket, mut subscription: Subscription) {
    tracing::debug!(filter = ?subscription.filter(), "Realtime channel opened");

    loop {
        tokio::select! {
            // Forward matching change events to the client
            delivery = subscription.recv() => {
                let payload = match delivery {
                    Some(Delivery::Event(event)) => serde_json::json!({
                        "type": "change",
                        "event": event,
                    }),
                    Some(Delivery::Missed(count)) => serde_json::json!({
                        "type": "events_missed",
                        "count": count,
                    }),
                    None => break,
                };
                if socket.send(WsMessage::Text(payload.to_string().into())).await.is_err() {
                    break; // client disconnected
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(WsMessage::Ping(data))) => {
                        let _ = socket.send(WsMessage::Pong(data)).await;
                    }
                    _ => {}
                }
            }
        }
    }

    tracing::debug!(filter = ?subscription.filter(), "Realtime channel closed");
}
