use thiserror::Error;

use crate::delivery::MAX_MESSAGE_CHARS;

/// Failures of gateway operations. The `Display` text is what the client sees
/// in `auth_error` / `message_error`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Invalid token")]
    InvalidCredential,
    #[error("User not found")]
    UnknownUser,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error("Invalid recipient ID")]
    InvalidRecipient,
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Message text exceeds {} characters", MAX_MESSAGE_CHARS)]
    MessageTooLong,
    #[error("Message not found")]
    MessageNotFound,
    #[error("Message store unavailable")]
    StoreUnavailable,
}
