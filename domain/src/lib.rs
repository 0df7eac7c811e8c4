//! Domain layer of the realtime service: the collaborators the hub relies on.
//!
//! - [`room_access`] answers `CanJoin` against the SkillSwap database.
//! - [`gateway::broadcast_relay`] mirrors domain events to another process over HTTP.

pub use entity_api::Id;

pub mod error;
pub mod gateway;
pub mod room_access;
