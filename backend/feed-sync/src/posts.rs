use crate::error::SyncResult;
use crate::snapshot::CREATED_AT_FIELD;
use doc_store::{DocumentStore, NewDocument};
use feed_schema::validation::validate_post;
use feed_schema::{NewPost, User, POSTS_COLLECTION};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Writes new posts; they reach the feed through the change stream
#[derive(Clone)]
pub struct PostComposer {
    store: Arc<dyn DocumentStore>,
}

impl PostComposer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validate locally, then create the post with a store-stamped
    /// `createdAt`. Returns the new post id.
    pub async fn create_post(&self, author: &User, post: &NewPost) -> SyncResult<String> {
        let body = validate_post(post)?;

        let doc = NewDocument::from_json(json!({
            "authorId": author.id,
            "authorName": author.name,
            "authorPhotoURL": author.photo_url,
            "content": body,
            "imageUrl": post.image.as_ref().map(|image| image.data.as_str()),
            "likes": [],
            "commentCount": 0,
        }))?
        .with_server_timestamp(CREATED_AT_FIELD);

        let id = self.store.create(POSTS_COLLECTION, doc).await?;
        info!(post_id = %id, author_id = %author.id, has_image = post.image.is_some(), "Post created");
        Ok(id)
    }
}
