//! Database row types. These map directly to SQLite rows and are kept apart
//! from the schoolhub-types wire models so the DB layer stays independent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use schoolhub_types::api::Profile;
use schoolhub_types::models::{ChatMessage, UserIdentity, UserSummary};

/// Display name used when a message references a user that no longer exists.
pub const UNKNOWN_NAME: &str = "unknown";

pub struct UserRow {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: String,
    pub login: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    pub fn identity(&self) -> Result<UserIdentity> {
        Ok(UserIdentity {
            id: parse_uuid(&self.id, "user id")?,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role.parse().map_err(anyhow::Error::msg)?,
        })
    }

    pub fn profile(&self) -> Result<Profile> {
        Ok(Profile {
            id: parse_uuid(&self.id, "user id")?,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            grade: self.grade.clone(),
            login: self.login.clone(),
            role: self.role.parse().map_err(anyhow::Error::msg)?,
        })
    }
}

/// A message joined with its sender's and recipient's names. Names are `None`
/// when the referenced user row is gone.
pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub sender_first_name: Option<String>,
    pub sender_last_name: Option<String>,
    pub recipient_id: String,
    pub recipient_first_name: Option<String>,
    pub recipient_last_name: Option<String>,
    pub status: String,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_chat_message(self) -> Result<ChatMessage> {
        let sender = summary(&self.sender_id, self.sender_first_name, self.sender_last_name)?;
        let recipient = summary(
            &self.recipient_id,
            self.recipient_first_name,
            self.recipient_last_name,
        )?;

        Ok(ChatMessage {
            id: parse_uuid(&self.id, "message id")?,
            text: self.text,
            sender,
            recipient,
            status: self.status.parse().map_err(anyhow::Error::msg)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct SenderRow {
    pub sender_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SenderRow {
    pub fn into_summary(self) -> Result<UserSummary> {
        summary(&self.sender_id, self.first_name, self.last_name)
    }
}

fn summary(id: &str, first: Option<String>, last: Option<String>) -> Result<UserSummary> {
    Ok(UserSummary {
        id: parse_uuid(id, "user id")?,
        first_name: first.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        last_name: last.unwrap_or_default(),
    })
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("corrupt {} '{}'", what, raw))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("corrupt created_at '{}'", raw))
}
