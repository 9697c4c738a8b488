use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use std::fmt::Display;
use std::sync::Arc;

use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::broadcast::{Broadcaster, ClientId, Registration};
use crate::protocol::UpdateEvent;
use crate::state::AppState;

/// GET /ws - Persistent push channel.
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let broadcaster = state.broadcaster.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, broadcaster))
}

async fn send_event<S>(sender: &mut S, event: &UpdateEvent) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    let text = match event.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to encode {:?}: {}", event.kind(), e);
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await
}

/// Put the queued snapshot on the wire within the handshake timeout.
/// Registration only counts once this succeeds; otherwise the client is
/// unregistered and `false` is returned.
async fn handshake<S>(
    broadcaster: &Broadcaster,
    id: ClientId,
    receiver: &mut mpsc::Receiver<Arc<UpdateEvent>>,
    sender: &mut S,
) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let delivery = async move {
        match receiver.recv().await {
            Some(initial) => send_event(sender, &initial)
                .await
                .map_err(|e| e.to_string()),
            None => Err("queue closed before snapshot".to_string()),
        }
    };
    match tokio::time::timeout(broadcaster.handshake_timeout(), delivery).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!("Client {} failed registration: {}", id, e);
            broadcaster.unregister(id);
            false
        }
        Err(_) => {
            tracing::warn!("Client {} timed out receiving the snapshot", id);
            broadcaster.unregister(id);
            false
        }
    }
}

async fn handle_socket(socket: WebSocket, broadcaster: Broadcaster) {
    let Registration { id, mut receiver } = broadcaster.register();
    let (mut sender, mut inbound) = socket.split();

    if !handshake(&broadcaster, id, &mut receiver, &mut sender).await {
        return;
    }

    loop {
        tokio::select! {
            event = receiver.recv() => match event {
                Some(event) => {
                    if let Err(e) = send_event(&mut sender, &event).await {
                        tracing::debug!("Write to client {} failed: {}", id, e);
                        break;
                    }
                }
                // Dropped by the broadcaster.
                None => break,
            },
            msg = inbound.next() => match msg {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!("Client {} socket error: {}", id, e);
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    broadcaster.unregister(id);
    let _ = sender.close().await;
}
