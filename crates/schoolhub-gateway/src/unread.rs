use uuid::Uuid;

use schoolhub_types::models::UserSummary;

use crate::error::GatewayError;
use crate::hub::Hub;

impl Hub {
    /// Unread aggregator: distinct senders with `sent` messages addressed to
    /// `director_id`, oldest unread first. Read-only, so it is safe to call on
    /// every director login and from the HTTP layer.
    pub async fn compute_unread(&self, director_id: Uuid) -> Result<Vec<UserSummary>, GatewayError> {
        self.store(move |db| {
            db.get_unread_senders(&director_id.to_string())?
                .into_iter()
                .map(|row| row.into_summary())
                .collect()
        })
        .await
    }
}
