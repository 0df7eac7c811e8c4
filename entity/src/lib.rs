//! Models for the tables the realtime hub reads. The schema is owned by the
//! main SkillSwap API; this crate never migrates it.

pub mod prelude;

pub mod conversations;
pub mod posts;

/// A type alias that represents any Entity's internal id field data type.
/// Aliased so that it's easy to change the underlying type if necessary.
pub type Id = i32;
