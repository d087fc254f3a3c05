use tracing::{debug, warn};
use uuid::Uuid;

use schoolhub_types::events::{GatewayCommand, GatewayEvent};
use schoolhub_types::models::Role;

use crate::error::GatewayError;
use crate::hub::Hub;
use crate::registry::{BoundConnection, ConnectionId, Outbox};

/// Identity held by an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    pub display_name: String,
    /// Students only: the director that `send_message` without a recipient
    /// is routed to. Captured at authentication time.
    pub director_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(AuthenticatedUser),
}

/// State machine for one live connection. Commands are applied one at a time,
/// so a connection's sends are persisted in the order they arrived.
pub struct Session {
    id: ConnectionId,
    state: SessionState,
    outbox: Outbox,
    hub: Hub,
}

impl Session {
    pub fn new(hub: Hub, outbox: Outbox) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Unauthenticated,
            outbox,
            hub,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Apply one inbound command. Failures are reported back to the client
    /// as `auth_error` or `message_error`; unknown message ids are ignored.
    pub async fn handle(&mut self, cmd: GatewayCommand) {
        match cmd {
            GatewayCommand::Authenticate(token) => {
                let result = self.authenticate(&token).await.map(|_| ());
                if let Err(e) = result {
                    warn!("Connection {} failed to authenticate: {}", self.id, e);
                    self.emit(GatewayEvent::AuthError(e.to_string()));
                }
            }

            GatewayCommand::SendMessage { recipient_id, text } => {
                if let Err(e) = self.send_message(recipient_id.as_deref(), &text).await {
                    warn!("Connection {} send rejected: {}", self.id, e);
                    self.emit(GatewayEvent::MessageError(e.to_string()));
                }
            }

            GatewayCommand::MarkAsRead(message_id) => match self.mark_read(&message_id).await {
                Ok(_) => {}
                Err(GatewayError::MessageNotFound) => {
                    debug!("Connection {} marked unknown message {} as read", self.id, message_id);
                }
                Err(e) => {
                    warn!("Connection {} mark_as_read failed: {}", self.id, e);
                    self.emit(GatewayEvent::MessageError(e.to_string()));
                }
            },
        }
    }

    /// Disconnect: drop this connection from the registry and hand back
    /// what it was bound to, if anything.
    pub async fn close(self) -> Option<BoundConnection> {
        self.hub.registry().unbind(self.id).await
    }

    pub(crate) fn user(&self) -> Result<&AuthenticatedUser, GatewayError> {
        match &self.state {
            SessionState::Authenticated(user) => Ok(user),
            SessionState::Unauthenticated => Err(GatewayError::NotAuthenticated),
        }
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub(crate) fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Queue an event for this connection only. A closed socket drops it.
    pub(crate) fn emit(&self, event: GatewayEvent) {
        let _ = self.outbox.send(event);
    }
}
