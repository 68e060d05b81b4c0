use crate::app_state::AppState;
use crate::broadcast::Viewer;

use anyhow::Result;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Upgrades to a viewer session that receives every board broadcast from now on.
///
/// The viewer is registered before the upgrade response goes out, so a move
/// accepted after the client sees the handshake is always delivered to it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl axum::response::IntoResponse {
    let viewer = state.hub.register();
    info!("🔗 Viewer {} connecting.", viewer.id);

    ws.on_upgrade(move |socket| async move {
        let id = viewer.id;
        if let Err(e) = handle_socket(socket, viewer).await {
            error!("❌ Viewer {} session failed: {}", id, e);
        }
        state.hub.unregister(id);
        info!("Viewer {} disconnected.", id);
    })
}

async fn handle_socket(socket: WebSocket, mut viewer: Viewer) -> Result<()> {
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            update = viewer.updates.recv() => {
                let Some(snapshot) = update else {
                    debug!("Viewer {} was dropped by the hub.", viewer.id);
                    break;
                };
                debug!("📤 Sending board update to viewer {}", viewer.id);
                sender.send(Message::Text(snapshot.to_string().into())).await?;
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        sender.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(reason))) => {
                        debug!("Viewer {} closed: {:?}", viewer.id, reason);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                }
            }
        }
    }

    Ok(())
}
