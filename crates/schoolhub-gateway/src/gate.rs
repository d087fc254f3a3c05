use tracing::{info, warn};

use schoolhub_types::events::GatewayEvent;
use schoolhub_types::models::Role;

use crate::credential::verify_token;
use crate::error::GatewayError;
use crate::session::{AuthenticatedUser, Session, SessionState};

impl Session {
    /// Connection gate. The connection is bound to the registry before the
    /// director's unread summary is read, so a message persisted concurrently
    /// is either in the summary or pushed live (possibly both). If the summary
    /// cannot be read the binding is dropped again and the session is left
    /// unauthenticated, so the client may simply retry.
    pub async fn authenticate(&mut self, token: &str) -> Result<&AuthenticatedUser, GatewayError> {
        let claims = verify_token(self.hub().jwt_secret(), token)?;

        let identity = self
            .hub()
            .resolve_identity(claims.sub)
            .await?
            .ok_or(GatewayError::UnknownUser)?;

        if identity.role != claims.role {
            warn!(
                "Token for {} claims role {} but stored role is {}; using stored role",
                identity.id, claims.role, identity.role
            );
        }

        let director_id = match identity.role {
            Role::Student => self
                .hub()
                .find_director()
                .await?
                .map(|d| d.id)
                .filter(|id| *id != identity.id),
            Role::Director => None,
        };

        let user = AuthenticatedUser {
            user_id: identity.id,
            role: identity.role,
            display_name: identity.display_name(),
            director_id,
        };

        // Queued ahead of the bind so no live push can overtake it.
        self.emit(GatewayEvent::Authenticated {
            user_id: user.user_id,
            role: user.role,
        });
        self.hub()
            .registry()
            .bind(self.id(), &identity, self.outbox().clone())
            .await;

        if user.role == Role::Director {
            match self.hub().compute_unread(user.user_id).await {
                Ok(unread) => {
                    info!("Director connected. Unread messages from {} students", unread.len());
                    self.emit(GatewayEvent::UnreadStudents(unread));
                }
                Err(e) => {
                    self.hub().registry().unbind(self.id()).await;
                    self.set_state(SessionState::Unauthenticated);
                    return Err(e);
                }
            }
        } else if director_id.is_none() {
            info!("Student {} connected with no director available", user.display_name);
        }

        info!("User authenticated: {} ({})", user.display_name, user.role);
        self.set_state(SessionState::Authenticated(user));
        self.user()
    }
}
