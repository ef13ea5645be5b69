//! Domain layer: identifiers, relationship and chat types, the pairwise
//! match state machine, live event envelopes and the presence hub.
//!
//! Nothing in this module performs I/O except [`PresenceHub`], which only
//! enqueues onto in-process channels.

pub mod chat;
pub mod connection;
pub mod ids;
pub mod live_event;
pub mod match_machine;
pub mod presence_hub;

pub use chat::{ChatPreview, Message, MessagePage};
pub use connection::{Connection, ConnectionStatus, InterestKind};
pub use ids::{ChatId, ConnectionId, MessageId, UserId, UserPair};
pub use live_event::ServerEvent;
pub use match_machine::{PairAction, PairEdges, PairOutcome};
pub use presence_hub::{ConnectionHandle, PresenceHub};
