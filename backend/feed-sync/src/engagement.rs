//! Likes and comments
//!
//! Both go through commutative store primitives only:
//! - a like toggle is a set-add or set-remove of one user id on `likes`
//! - a comment is created in the same atomic commit as a `+1` on
//!   `commentCount`
//!
//! Nothing here touches the local cache. The resulting document change comes
//! back through the feed subscription like any other write.

use crate::decode::decode_all;
use crate::engine::FeedView;
use crate::error::{SyncError, SyncResult};
use crate::snapshot::CREATED_AT_FIELD;
use doc_store::{Direction, DocumentStore, NewDocument, Query, SetOp, Write};
use feed_schema::validation::validate_comment;
use feed_schema::{comments_collection, Comment, User, POSTS_COLLECTION};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const LIKES_FIELD: &str = "likes";
const COMMENT_COUNT_FIELD: &str = "commentCount";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeAction {
    Liked,
    Unliked,
}

#[derive(Clone)]
pub struct EngagementAggregator {
    store: Arc<dyn DocumentStore>,
}

impl EngagementAggregator {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Toggle `user_id`'s like on a cached post.
    ///
    /// Membership is read from the cache; the write is a set add/remove so
    /// concurrent togglers never overwrite each other.
    pub async fn toggle_like<V>(
        &self,
        feed: &V,
        post_id: &str,
        user_id: &str,
    ) -> SyncResult<LikeAction>
    where
        V: FeedView + ?Sized,
    {
        let post = feed
            .post(post_id)
            .ok_or_else(|| SyncError::not_found(POSTS_COLLECTION, post_id))?;

        let (op, action) = if post.is_liked_by(user_id) {
            (SetOp::Remove, LikeAction::Unliked)
        } else {
            (SetOp::Add, LikeAction::Liked)
        };

        self.store
            .mutate_set_field(
                POSTS_COLLECTION,
                post_id,
                LIKES_FIELD,
                op,
                Value::String(user_id.to_string()),
            )
            .await?;

        debug!(post_id = %post_id, user_id = %user_id, action = ?action, "Like toggled");
        Ok(action)
    }

    /// Add a comment and bump the post's comment count in one commit.
    ///
    /// Returns the new comment's id.
    pub async fn add_comment(&self, post_id: &str, author: &User, text: &str) -> SyncResult<String> {
        let text = validate_comment(text)?;

        let doc = NewDocument::from_json(json!({
            "authorId": author.id,
            "authorName": author.name,
            "text": text,
        }))?
        .with_server_timestamp(CREATED_AT_FIELD);

        let created = self
            .store
            .commit(vec![
                Write::Create {
                    collection: comments_collection(post_id),
                    doc,
                },
                Write::Increment {
                    collection: POSTS_COLLECTION.to_string(),
                    id: post_id.to_string(),
                    field: COMMENT_COUNT_FIELD.to_string(),
                    delta: 1,
                },
            ])
            .await?;

        let comment_id = created
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Store("comment create returned no id".to_string()))?;

        info!(post_id = %post_id, comment_id = %comment_id, "Comment added");
        Ok(comment_id)
    }

    /// Comments on a post, oldest first
    pub async fn load_comments(&self, post_id: &str) -> SyncResult<Vec<Comment>> {
        let query = Query::collection(comments_collection(post_id))
            .order_by(CREATED_AT_FIELD, Direction::Ascending);
        let docs = self.store.fetch(&query).await?;

        let mut comments: Vec<Comment> = decode_all(&docs);
        for comment in &mut comments {
            comment.post_id = post_id.to_string();
        }
        Ok(comments)
    }
}
