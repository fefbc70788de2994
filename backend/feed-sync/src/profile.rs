//! User profiles
//!
//! Hobby tags and the avatar live on the user's own document, so unlike likes
//! they are written as plain field updates.

use crate::cache::CacheEntry;
use crate::config::ProfileConfig;
use crate::decode::{decode, decode_all};
use crate::error::SyncResult;
use crate::snapshot::{SnapshotLoader, CREATED_AT_FIELD};
use doc_store::{Document, DocumentStore, Fields, NewDocument, Query};
use feed_schema::validation::validate_avatar;
use feed_schema::{
    AuthIdentity, ImagePayload, Post, TagSet, User, ValidationError, POSTS_COLLECTION,
    USERS_COLLECTION,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileStats {
    pub posts: usize,
    pub hobbies: usize,
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn DocumentStore>,
    loader: SnapshotLoader,
    config: ProfileConfig,
}

impl ProfileService {
    pub fn new(store: Arc<dyn DocumentStore>, config: ProfileConfig) -> Self {
        Self {
            loader: SnapshotLoader::new(Arc::clone(&store)),
            store,
            config,
        }
    }

    /// Load a user, failing with `Timeout` past the configured deadline
    pub async fn load_user(&self, uid: &str) -> SyncResult<User> {
        self.loader.load_user(uid, self.config.load_timeout).await
    }

    /// Load the signed-in user, creating their document on first sign-in
    pub async fn ensure_user(&self, identity: &AuthIdentity) -> SyncResult<User> {
        match self.load_user(&identity.uid).await {
            Ok(user) => Ok(user),
            Err(err) if err.is_not_found() => {
                info!(user_id = %identity.uid, "Creating user document");
                let doc = NewDocument::from_json(json!({
                    "uid": identity.uid,
                    "name": identity.display_name,
                    "email": identity.email,
                    "age": identity.age,
                    "hobbies": [],
                    "photoURL": identity.photo_url,
                }))?
                .with_server_timestamp(CREATED_AT_FIELD);

                let fields = doc.fields.clone();
                self.store.put(USERS_COLLECTION, &identity.uid, doc).await?;
                decode(&Document::new(identity.uid.clone(), fields))
            }
            Err(err) => Err(err),
        }
    }

    /// Replace the user's hobby tags; at least one is required
    pub async fn save_hobbies(&self, uid: &str, tags: &TagSet) -> SyncResult<()> {
        if tags.is_empty() {
            return Err(ValidationError::Empty("hobby selection").into());
        }

        let names: Vec<Value> = tags
            .iter()
            .map(|tag| Value::String(tag.name().to_string()))
            .collect();
        let mut fields = Fields::new();
        fields.insert("hobbies".to_string(), Value::Array(names));

        self.store.update_fields(USERS_COLLECTION, uid, fields).await?;
        info!(user_id = %uid, count = tags.len(), "Hobbies saved");
        Ok(())
    }

    pub fn needs_onboarding(&self, user: &User) -> bool {
        user.needs_onboarding()
    }

    /// The user's own posts, newest first
    pub async fn user_posts(&self, user: &User) -> SyncResult<Vec<Post>> {
        let query = Query::collection(POSTS_COLLECTION).where_eq("authorId", user.id.as_str());
        let docs = self.store.fetch(&query).await?;

        let mut posts: Vec<Post> = decode_all(&docs);
        posts.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Ok(posts)
    }

    pub async fn profile_stats(&self, user: &User) -> SyncResult<ProfileStats> {
        let posts = self.user_posts(user).await?;
        Ok(ProfileStats {
            posts: posts.len(),
            hobbies: user.hobbies.len(),
        })
    }

    /// Store a new avatar after the local size and type check
    pub async fn set_avatar(&self, uid: &str, image: &ImagePayload) -> SyncResult<()> {
        validate_avatar(image)?;

        let mut fields = Fields::new();
        fields.insert("photoURL".to_string(), Value::String(image.data.clone()));
        self.store.update_fields(USERS_COLLECTION, uid, fields).await?;

        info!(user_id = %uid, bytes = image.data.len(), "Avatar updated");
        Ok(())
    }
}
