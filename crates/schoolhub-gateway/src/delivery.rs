use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use schoolhub_types::events::GatewayEvent;
use schoolhub_types::models::{ChatMessage, Role};

use crate::error::GatewayError;
use crate::session::Session;

pub const MAX_MESSAGE_CHARS: usize = 4000;

impl Session {
    /// Delivery router. The message is persisted before anything is pushed;
    /// once persisted the sender is always acknowledged, whether or not the
    /// recipient could be reached.
    ///
    /// Without `recipient_id`, a student's message goes to the director
    /// associated at authentication time.
    pub async fn send_message(
        &mut self,
        recipient_id: Option<&str>,
        text: &str,
    ) -> Result<ChatMessage, GatewayError> {
        let user = self.user()?;
        let sender_id = user.user_id;
        let sender_name = user.display_name.clone();

        let recipient_id = match recipient_id {
            Some(raw) => raw
                .trim()
                .parse::<Uuid>()
                .map_err(|_| GatewayError::InvalidRecipient)?,
            None => user.director_id.ok_or(GatewayError::InvalidRecipient)?,
        };
        if recipient_id == sender_id {
            return Err(GatewayError::InvalidRecipient);
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(GatewayError::EmptyMessage);
        }
        if text.chars().count() > MAX_MESSAGE_CHARS {
            return Err(GatewayError::MessageTooLong);
        }

        let message_id = Uuid::new_v4();
        let message = self
            .hub()
            .store(move |db| {
                db.insert_message(
                    &message_id.to_string(),
                    &sender_id.to_string(),
                    &recipient_id.to_string(),
                    &text,
                    Utc::now(),
                )?
                .into_chat_message()
            })
            .await?;

        info!("Message sent from {} to user {}", sender_name, recipient_id);

        let registry = self.hub().registry();
        let delivered = registry
            .send_to_user(recipient_id, GatewayEvent::ReceiveMessage(message.clone()))
            .await;
        if delivered > 0 {
            info!("Message {} delivered to {} connection(s)", message.id, delivered);
        }

        self.emit(GatewayEvent::MessageSent(message.clone()));

        match self.hub().resolve_identity(recipient_id).await {
            Ok(Some(recipient)) if recipient.role == Role::Director => {
                registry
                    .send_to_user(
                        recipient_id,
                        GatewayEvent::NewUnreadStudent(message.sender.clone()),
                    )
                    .await;
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!("Recipient {} of message {} does not exist", recipient_id, message.id);
            }
            Err(e) => {
                warn!("Could not resolve recipient {}: {}", recipient_id, e);
            }
        }

        Ok(message)
    }
}
