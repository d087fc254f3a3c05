use tracing::info;
use uuid::Uuid;

use schoolhub_types::events::GatewayEvent;
use schoolhub_types::models::ChatMessage;

use crate::error::GatewayError;
use crate::session::Session;

impl Session {
    /// Read-state tracker. Marks the message read (a no-op if it already is),
    /// tells the original sender if they are online, and acknowledges the
    /// requester.
    pub async fn mark_read(&mut self, message_id: &str) -> Result<ChatMessage, GatewayError> {
        let reader = self.user()?.display_name.clone();

        let message_id = message_id
            .trim()
            .parse::<Uuid>()
            .map_err(|_| GatewayError::MessageNotFound)?;

        let message = self
            .hub()
            .store(move |db| {
                db.mark_message_read(&message_id.to_string())?
                    .map(|row| row.into_chat_message())
                    .transpose()
            })
            .await?
            .ok_or(GatewayError::MessageNotFound)?;

        self.hub()
            .registry()
            .send_to_user(message.sender.id, GatewayEvent::MessageRead { message_id })
            .await;

        self.emit(GatewayEvent::MessageMarkedAsRead { message_id });
        info!("Message {} marked as read by {}", message_id, reader);

        Ok(message)
    }
}
