//! WebSocket layer: authenticated upgrade, per-connection tasks and
//! client frames.
//!
//! The endpoint at `/ws?token=<jwt>` registers the connection with the
//! [`crate::domain::PresenceHub`], streams [`crate::domain::ServerEvent`]s
//! to the client and accepts `typing` frames.

pub mod connection;
pub mod handler;
pub mod messages;
