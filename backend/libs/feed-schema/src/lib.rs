//! Entity schemas shared by the HobbyConnect feed crates
//!
//! Defines the typed shape of every document the client reads from the
//! backing store:
//! - `Post`, `Comment`, `User` with defaulting rules for optional fields
//! - The closed `Hobby` tag enumeration used for discovery
//! - `ChangeEvent`, the typed form of a pushed added/modified/removed change
//! - Local content limits and the validation run before any remote write

pub mod change;
pub mod limits;
pub mod models;
pub mod tags;
pub mod validation;

pub use change::{ChangeEvent, ChangeKind};
pub use models::{AuthIdentity, Comment, Entity, ImagePayload, NewPost, Post, User};
pub use tags::{Hobby, TagSet};
pub use validation::{ValidationError, ValidationResult};

/// Collection holding post documents
pub const POSTS_COLLECTION: &str = "posts";

/// Collection holding user documents
pub const USERS_COLLECTION: &str = "users";

/// Sub-collection path holding the comments of one post
pub fn comments_collection(post_id: &str) -> String {
    format!("{}/{}/comments", POSTS_COLLECTION, post_id)
}
