use serde::{Deserialize, Serialize};

use crate::models::message::MessageWithSender;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    JoinRoom {
        chat_id: String,
    },
    LeaveRoom {
        chat_id: String,
    },
    SendMessage {
        chat_id: String,
        /// Must match the authenticated user when present.
        sender: Option<String>,
        content: String,
    },
    Heartbeat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    Connected {
        user_id: String,
        connection_id: String,
    },
    ReceiveMessage(MessageWithSender),
    MessageSent {
        chat_id: String,
        message_id: String,
    },
    MessageRejected {
        chat_id: String,
        reason: String,
    },
    ChatDeleted {
        chat_id: String,
    },
    Error {
        message: String,
    },
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let join: ClientMessage =
            serde_json::from_str(r#"{"type":"joinRoom","chatId":"c1"}"#).unwrap();
        assert!(matches!(join, ClientMessage::JoinRoom { chat_id } if chat_id == "c1"));

        let send: ClientMessage = serde_json::from_str(
            r#"{"type":"sendMessage","chatId":"c1","sender":"1","content":"Hi"}"#,
        )
        .unwrap();
        assert!(matches!(
            send,
            ClientMessage::SendMessage { sender: Some(ref s), ref content, .. } if s == "1" && content == "Hi"
        ));

        let anonymous: ClientMessage =
            serde_json::from_str(r#"{"type":"sendMessage","chatId":"c1","content":"Hi"}"#)
                .unwrap();
        assert!(matches!(
            anonymous,
            ClientMessage::SendMessage { sender: None, .. }
        ));
    }

    #[test]
    fn test_missing_content_does_not_parse() {
        assert!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"sendMessage","chatId":"c1"}"#)
                .is_err()
        );
    }

    #[test]
    fn test_server_message_wire_format() {
        let rejected = serde_json::to_value(ServerMessage::MessageRejected {
            chat_id: "c1".into(),
            reason: "empty".into(),
        })
        .unwrap();
        assert_eq!(rejected["type"], "messageRejected");
        assert_eq!(rejected["chatId"], "c1");

        let pong = serde_json::to_value(ServerMessage::Pong).unwrap();
        assert_eq!(pong["type"], "pong");
    }
}
