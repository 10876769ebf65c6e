//! The session endpoint: `GET /game/ws` upgrades to a bidirectional JSON
//! message channel.
//!
//! One reader loop per connection; a dedicated writer task drains the
//! connection's outbound queue so broadcasts never block on a slow peer.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info};

use crate::hub::Disposition;
use crate::protocol::Envelope;

use super::AppState;

/// `GET /game/ws`
pub async fn upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !state.origins.allows(origin) {
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }

    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (conn, mut outbound) = state.hub.connect();
    info!(conn_id = conn.id(), "Session connection established");

    let writer = tokio::spawn(async move {
        while let Some(envelope) = outbound.recv().await {
            let Ok(text) = serde_json::to_string(&envelope) else {
                break;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                debug!(conn_id = conn.id(), %err, "Session read error");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                // A malformed envelope marks a broken peer and ends the
                // connection; payload-level problems are answered with
                // Error envelopes by the hub.
                let Ok(envelope) = serde_json::from_str::<Envelope>(&text) else {
                    debug!(conn_id = conn.id(), "Malformed session envelope");
                    break;
                };
                if state.hub.handle_message(&conn, envelope).await == Disposition::Terminate {
                    break;
                }
            }
            Message::Binary(_) => {
                debug!(conn_id = conn.id(), "Binary session messages are not supported");
                break;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    let conn_id = conn.id();
    state.hub.disconnect(conn_id).await;
    // With the hub's clones gone, dropping our handle closes the queue and
    // lets the writer task drain and exit.
    drop(conn);
    let _ = writer.await;
    info!(conn_id, "Session connection closed");
}
