pub use super::conversations::Entity as Conversations;
pub use super::posts::Entity as Posts;
