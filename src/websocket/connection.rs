use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::{ClientMessage, ServerMessage};
use super::relay::Relay;

/// Events queued per connection before new ones are dropped.
pub const OUTBOUND_CAPACITY: usize = 256;

/// One authenticated socket, as seen by the relay.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: String,
    pub user_id: String,
    outbound: mpsc::Sender<ServerMessage>,
}

impl Connection {
    pub fn new(user_id: String, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            outbound,
        }
    }

    pub fn outbound(&self) -> mpsc::Sender<ServerMessage> {
        self.outbound.clone()
    }

    /// Queues an event for this connection only.
    pub fn reply(&self, message: ServerMessage) {
        if let Err(e) = self.outbound.try_send(message) {
            tracing::debug!(connection_id = %self.id, "Dropped reply: {}", e);
        }
    }
}

pub async fn handle_connection(socket: WebSocket, user_id: String, relay: Arc<Relay>) {
    let (sender, receiver) = socket.split();
    serve(sender, receiver, user_id, relay).await;
}

async fn serve<S, R>(mut sender: S, mut receiver: R, user_id: String, relay: Arc<Relay>)
where
    S: Sink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_CAPACITY);

    let connection = Connection::new(user_id, tx);

    tracing::info!(
        connection_id = %connection.id,
        user_id = %connection.user_id,
        "Client connected"
    );

    connection.reply(ServerMessage::Connected {
        user_id: connection.user_id.clone(),
        connection_id: connection.id.clone(),
    });

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!("Failed to encode event: {}", e),
            }
        }
    });

    let recv_relay = relay.clone();
    let recv_connection = connection.clone();

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => recv_relay.handle(&recv_connection, client_msg).await,
                    Err(e) => {
                        tracing::debug!(
                            connection_id = %recv_connection.id,
                            "Unreadable client event: {}",
                            e
                        );
                        recv_connection.reply(ServerMessage::Error {
                            message: "Unrecognised event".to_string(),
                        });
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    relay.disconnect(&connection);

    tracing::info!(
        connection_id = %connection.id,
        user_id = %connection.user_id,
        "Client disconnected"
    );
}
