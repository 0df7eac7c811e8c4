pub use entity::{conversations, posts, Id};

pub mod conversation;
pub mod error;
pub mod post;
