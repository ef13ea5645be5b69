//! Data Transfer Objects for REST request/response serialization.
//!
//! Field names are camelCase on the wire; ids are plain JSON numbers.

pub mod chat_dto;
pub mod common_dto;
pub mod connection_dto;
pub mod presence_dto;

pub use chat_dto::*;
pub use common_dto::*;
pub use connection_dto::*;
pub use presence_dto::*;
