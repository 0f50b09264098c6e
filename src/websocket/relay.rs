use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::connection::Connection;
use super::events::{ClientMessage, ServerMessage};
use super::rooms::RoomBroadcaster;
use crate::database::DbPool;
use crate::models::message::MessageWithSender;
use crate::services::{chat, messaging};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{require_id, validate_message_content};

/// Serialises append + publish per chat so members see messages in the order
/// they were stored. Chats never wait on each other. An entry lives only while
/// some turn for that chat is held or awaited.
#[derive(Default)]
struct RoomSequencer {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RoomSequencer {
    async fn acquire(&self, room_id: &str) -> Turn<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(room_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        // Built before waiting so a cancelled wait still cleans up.
        let mut turn = Turn {
            sequencer: self,
            room_id: room_id.to_string(),
            lock,
            guard: None,
        };
        turn.guard = Some(turn.lock.clone().lock_owned().await);
        turn
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

struct Turn<'a> {
    sequencer: &'a RoomSequencer,
    room_id: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self
            .sequencer
            .locks
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        // Only the map and this turn still point at the lock: nobody is waiting.
        let idle = Arc::strong_count(&self.lock) == 2
            && locks
                .get(&self.room_id)
                .is_some_and(|current| Arc::ptr_eq(current, &self.lock));
        if idle {
            locks.remove(&self.room_id);
        }
    }
}

/// Moves chat messages between connections: joins rooms, stores what is sent
/// and publishes it to the room.
pub struct Relay {
    db: DbPool,
    rooms: Arc<dyn RoomBroadcaster>,
    sequencer: RoomSequencer,
}

impl Relay {
    pub fn new(db: DbPool, rooms: Arc<dyn RoomBroadcaster>) -> Self {
        Self {
            db,
            rooms,
            sequencer: RoomSequencer::default(),
        }
    }

    /// Handles one inbound event. Failures never escape: they are logged and,
    /// where useful, reported back to `connection` alone.
    pub async fn handle(&self, connection: &Connection, message: ClientMessage) {
        match message {
            ClientMessage::JoinRoom { chat_id } => {
                if let Err(e) = self.join(connection, &chat_id).await {
                    tracing::warn!(
                        connection_id = %connection.id,
                        chat_id = %chat_id,
                        "Join rejected: {}",
                        e
                    );
                    connection.reply(ServerMessage::Error {
                        message: e.public_message(),
                    });
                }
            }
            ClientMessage::LeaveRoom { chat_id } => self.leave(connection, &chat_id),
            ClientMessage::SendMessage {
                chat_id,
                sender,
                content,
            } => {
                let result = match sender.as_deref() {
                    Some(claimed) if claimed != connection.user_id => Err(AppError::Forbidden(
                        "Sender does not match the authenticated user".to_string(),
                    )),
                    _ => self.send(&connection.user_id, &chat_id, &content).await,
                };

                match result {
                    Ok(message) => connection.reply(ServerMessage::MessageSent {
                        chat_id,
                        message_id: message.message.id,
                    }),
                    Err(e) => {
                        tracing::warn!(
                            connection_id = %connection.id,
                            chat_id = %chat_id,
                            "Send rejected: {}",
                            e
                        );
                        connection.reply(ServerMessage::MessageRejected {
                            chat_id,
                            reason: e.public_message(),
                        });
                    }
                }
            }
            ClientMessage::Heartbeat => connection.reply(ServerMessage::Pong),
        }
    }

    pub async fn join(&self, connection: &Connection, chat_id: &str) -> AppResult<()> {
        let chat_id = require_id("chatId", Some(chat_id))?;
        chat::require_participant(&self.db, chat_id, &connection.user_id).await?;

        // Checked again under the turn: a delete may have landed meanwhile.
        let _turn = self.sequencer.acquire(chat_id).await;
        let chat = chat::require_participant(&self.db, chat_id, &connection.user_id).await?;

        self.rooms
            .join(&chat.id, &connection.id, connection.outbound());

        tracing::info!(
            connection_id = %connection.id,
            user_id = %connection.user_id,
            chat_id = %chat.id,
            "Joined room"
        );
        Ok(())
    }

    pub fn leave(&self, connection: &Connection, chat_id: &str) {
        self.rooms.leave(chat_id, &connection.id);
        tracing::debug!(connection_id = %connection.id, chat_id, "Left room");
    }

    /// Stores a message from `sender_id` and publishes it to everyone in the
    /// chat's room, the sender's own connections included.
    pub async fn send(
        &self,
        sender_id: &str,
        chat_id: &str,
        content: &str,
    ) -> AppResult<MessageWithSender> {
        let chat_id = require_id("chatId", Some(chat_id))?;
        let content = validate_message_content(content)?;
        chat::require_participant(&self.db, chat_id, sender_id).await?;

        // append_message checks membership again, under the turn.
        let _turn = self.sequencer.acquire(chat_id).await;

        let stored = messaging::append_message(&self.db, chat_id, sender_id, content).await?;
        let message = messaging::get_message_with_sender(&self.db, &stored.id).await?;

        let delivered = self
            .rooms
            .publish(chat_id, ServerMessage::ReceiveMessage(message.clone()));

        tracing::debug!(
            chat_id,
            message_id = %message.message.id,
            delivered,
            "Message relayed"
        );

        Ok(message)
    }

    /// Deletes the chat, tells its room and empties it. Runs under the chat's
    /// turn so no join or send can slip in between.
    pub async fn delete_chat(&self, chat_id: &str, requester_id: &str) -> AppResult<()> {
        chat::require_participant(&self.db, chat_id, requester_id).await?;

        let _turn = self.sequencer.acquire(chat_id).await;
        chat::delete_chat(&self.db, chat_id, requester_id).await?;

        self.rooms.publish(
            chat_id,
            ServerMessage::ChatDeleted {
                chat_id: chat_id.to_string(),
            },
        );
        self.rooms.close_room(chat_id);
        Ok(())
    }

    pub fn disconnect(&self, connection: &Connection) {
        self.rooms.disconnect(&connection.id);
    }
}
