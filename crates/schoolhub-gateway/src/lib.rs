//! Real-time direct messaging between students and the director.
//!
//! A [`Session`] is the per-connection state machine. It authenticates through
//! the connection gate, routes `send_message` through the delivery router and
//! `mark_as_read` through the read-state tracker. Live connections are indexed
//! by user in the shared [`ConnectionRegistry`]; the message store remains the
//! only source of truth, so everything a client sees can be rebuilt from it.

pub mod connection;
pub mod credential;
pub mod delivery;
pub mod error;
pub mod gate;
pub mod hub;
pub mod read_state;
pub mod registry;
pub mod session;
pub mod unread;

pub use error::GatewayError;
pub use hub::Hub;
pub use registry::ConnectionRegistry;
pub use session::{AuthenticatedUser, Session, SessionState};
