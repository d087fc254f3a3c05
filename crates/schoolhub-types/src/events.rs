use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Role, UserSummary};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Authenticated {
        #[serde(rename = "userId")]
        user_id: Uuid,
        role: Role,
    },

    /// Authentication attempt failed; the connection stays open
    AuthError(String),

    /// Senders with unread messages for the director, pushed on director login
    UnreadStudents(Vec<UserSummary>),

    /// A message addressed to this user was persisted
    ReceiveMessage(ChatMessage),

    /// Acknowledges a `send_message` to the originating connection
    MessageSent(ChatMessage),

    /// A send or read acknowledgement failed
    MessageError(String),

    /// Inbox badge for the director: this sender now has unread messages
    NewUnreadStudent(UserSummary),

    /// One of this user's messages was read by its recipient
    MessageRead {
        #[serde(rename = "messageId")]
        message_id: Uuid,
    },

    /// Acknowledges a `mark_as_read` to the requester
    MessageMarkedAsRead {
        #[serde(rename = "messageId")]
        message_id: Uuid,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Authenticate the connection with a bearer token
    Authenticate(String),

    /// Send a direct message. Ids arrive unparsed so malformed ones can be
    /// reported back instead of failing the whole frame.
    SendMessage {
        #[serde(rename = "recipientId", default)]
        recipient_id: Option<String>,
        text: String,
    },

    /// Mark a message as read
    MarkAsRead(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_use_snake_case_tags() {
        let cmd: GatewayCommand = serde_json::from_str(
            r#"{"type":"send_message","data":{"recipientId":"abc","text":"Hello"}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            GatewayCommand::SendMessage {
                recipient_id: Some("abc".into()),
                text: "Hello".into(),
            }
        );

        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"authenticate","data":"tok"}"#).unwrap();
        assert_eq!(cmd, GatewayCommand::Authenticate("tok".into()));
    }

    #[test]
    fn recipient_may_be_omitted() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"send_message","data":{"text":"hi"}}"#).unwrap();
        assert_eq!(
            cmd,
            GatewayCommand::SendMessage {
                recipient_id: None,
                text: "hi".into(),
            }
        );
    }

    #[test]
    fn read_receipt_payload_is_keyed_by_message_id() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(GatewayEvent::MessageRead { message_id: id }).unwrap();
        assert_eq!(json["type"], "message_read");
        assert_eq!(json["data"]["messageId"], id.to_string());
    }
}
