use crate::limits::ANONYMOUS;
use crate::tags::{lenient_tags, Hobby, TagSet};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// A typed document with a store-assigned identity.
///
/// The identity lives outside the document fields, so decoders set it after
/// deserializing the field map. `Default` plus `set_id` gives the
/// identity-only form a removal is reported with.
pub trait Entity: DeserializeOwned + Default + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

/// Post entity - a feed item authored by a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author_id: String,
    #[serde(default = "anonymous", deserialize_with = "display_name")]
    pub author_name: String,
    #[serde(default, rename = "authorPhotoURL")]
    pub author_photo_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Store-assigned insertion timestamp; `None` until the write is stamped
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comment_count: u64,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.contains(user_id)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Body text, empty when the post is image-only
    pub fn body(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

impl Entity for Post {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Comment entity - owned by its parent post for lifecycle purposes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(skip)]
    pub id: String,
    /// Back-reference to the parent post, taken from the collection path
    #[serde(skip)]
    pub post_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author_id: String,
    #[serde(default = "anonymous", deserialize_with = "display_name")]
    pub author_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Comment {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// User entity - profile plus declared interests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub id: String,
    #[serde(default = "anonymous", deserialize_with = "display_name")]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub hobbies: TagSet,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl User {
    /// True until the user has picked at least one hobby
    pub fn needs_onboarding(&self) -> bool {
        self.hobbies.is_empty()
    }

    /// Tags this user shares with `tags`, in tag order
    pub fn shared_tags(&self, tags: &TagSet) -> Vec<Hobby> {
        self.hobbies.intersection(tags).copied().collect()
    }

    pub fn has_tag(&self, tag: Hobby) -> bool {
        self.hobbies.contains(&tag)
    }
}

impl Entity for User {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Identity handed over by the auth collaborator after sign-in
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub age: Option<u32>,
}

/// Encoded image produced by the upload collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub content_type: String,
    /// Encoded payload (e.g. a data URL); its length is the size checked
    pub data: String,
}

/// Content for a post about to be written
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPost {
    pub content: String,
    pub image: Option<ImagePayload>,
}

fn anonymous() -> String {
    ANONYMOUS.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn display_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name: Option<String> = Option::deserialize(deserializer)?;
    Ok(name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(anonymous))
}

// Sign-up forms have written ages both as numbers and as strings.
fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_post_defaults_for_missing_fields() {
        let post: Post = serde_json::from_value(json!({})).unwrap();
        assert_eq!(post.author_name, "Anonymous");
        assert!(post.content.is_none());
        assert!(post.created_at.is_none());
        assert!(post.likes.is_empty());
        assert_eq!(post.comment_count, 0);
    }

    #[test]
    fn test_post_nulls_are_defaults() {
        let post: Post = serde_json::from_value(json!({
            "authorId": null,
            "authorName": null,
            "authorPhotoURL": null,
            "likes": null,
            "commentCount": null,
        }))
        .unwrap();
        assert_eq!(post.author_id, "");
        assert_eq!(post.author_name, "Anonymous");
        assert!(post.likes.is_empty());
    }

    #[test]
    fn test_post_full_document() {
        let post: Post = serde_json::from_value(json!({
            "authorId": "u1",
            "authorName": "Ada",
            "content": "hello",
            "likes": ["u2", "u3", "u2"],
            "commentCount": 4,
            "createdAt": "2024-05-01T10:00:00.000000000Z",
        }))
        .unwrap();
        assert_eq!(post.author_id, "u1");
        assert_eq!(post.body(), "hello");
        assert_eq!(post.like_count(), 2);
        assert!(post.is_liked_by("u3"));
        assert_eq!(post.comment_count, 4);
        assert!(post.created_at.is_some());
    }

    #[test]
    fn test_user_lenient_fields() {
        let user: User = serde_json::from_value(json!({
            "name": "  ",
            "age": "27",
            "hobbies": ["Gaming", "Skydiving", 7, "Music"],
        }))
        .unwrap();
        assert_eq!(user.name, "Anonymous");
        assert_eq!(user.age, Some(27));
        assert_eq!(user.hobbies.len(), 2);
        assert!(user.has_tag(Hobby::Gaming));
        assert!(!user.needs_onboarding());
    }

    #[test]
    fn test_user_shared_tags() {
        let user: User = serde_json::from_value(json!({
            "hobbies": ["Gaming", "Music", "Yoga"],
        }))
        .unwrap();
        let mine: TagSet = [Hobby::Music, Hobby::Yoga, Hobby::Art].into_iter().collect();
        assert_eq!(user.shared_tags(&mine), vec![Hobby::Music, Hobby::Yoga]);
    }

    #[test]
    fn test_id_is_not_a_document_field() {
        let mut post: Post = serde_json::from_value(json!({"id": "ignored"})).unwrap();
        assert_eq!(post.id(), "");
        post.set_id("p1".into());
        let value = serde_json::to_value(&post).unwrap();
        assert!(value.get("id").is_none());
    }
}
