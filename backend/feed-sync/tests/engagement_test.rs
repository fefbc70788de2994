//! Engagement tests
//!
//! Concurrent likes and comments must both land, and a like toggle must
//! only ever be a set operation on the store.

use async_trait::async_trait;
use doc_store::{
    ChangeStream, Document, DocumentStore, MemoryStore, NewDocument, Query, SetOp, StoreResult,
    Write,
};
use feed_schema::{Post, User, POSTS_COLLECTION};
use feed_sync::config::FeedConfig;
use feed_sync::{EngagementAggregator, FeedEngine, LikeAction, OrderedCache};
use mockall::mock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Store {}

    #[async_trait]
    impl DocumentStore for Store {
        async fn fetch(&self, query: &Query) -> StoreResult<Vec<Document>>;
        async fn subscribe(&self, query: &Query) -> StoreResult<ChangeStream>;
        async fn get(&self, collection: &str, id: &str) -> StoreResult<Document>;
        async fn commit(&self, writes: Vec<Write>) -> StoreResult<Vec<String>>;
    }
}

fn user(id: &str, name: &str) -> User {
    let mut user: User =
        serde_json::from_value(json!({ "name": name })).expect("Failed to build user");
    user.id = id.to_string();
    user
}

fn cached_post(id: &str, likes: &[&str]) -> OrderedCache<Post> {
    let mut post: Post = serde_json::from_value(json!({
        "authorId": "author",
        "content": "hello",
        "likes": likes,
    }))
    .expect("Failed to build post");
    post.id = id.to_string();

    let mut cache = OrderedCache::new(10);
    cache.insert(post);
    cache
}

async fn started_feed(store: &MemoryStore) -> FeedEngine {
    let doc = NewDocument::from_json(json!({
        "authorId": "author",
        "authorName": "Author",
        "content": "board games tonight",
        "likes": [],
        "commentCount": 0,
        "createdAt": "2024-01-01T00:00:00.000000000Z",
    }))
    .expect("Failed to build post");
    store
        .put(POSTS_COLLECTION, "p1", doc)
        .await
        .expect("Failed to write post");

    let engine = FeedEngine::new(Arc::new(store.clone()), FeedConfig::default());
    engine.start().await.expect("Failed to start feed");
    engine
}

#[tokio::test]
async fn test_concurrent_likes_are_both_kept() {
    let store = MemoryStore::new();
    let engine = started_feed(&store).await;
    let aggregator = EngagementAggregator::new(Arc::new(store.clone()));

    let (first, second) = tokio::join!(
        aggregator.toggle_like(&engine, "p1", "u1"),
        aggregator.toggle_like(&engine, "p1", "u2"),
    );
    assert_eq!(first.expect("First like failed"), LikeAction::Liked);
    assert_eq!(second.expect("Second like failed"), LikeAction::Liked);

    let doc = store
        .get(POSTS_COLLECTION, "p1")
        .await
        .expect("Failed to read post");
    let likes: Vec<&str> = doc
        .get("likes")
        .and_then(|v| v.as_array())
        .expect("likes is an array")
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(likes.len(), 2);
    assert!(likes.contains(&"u1") && likes.contains(&"u2"));

    // The change flows back into the feed through the subscription
    let mut updates = engine.watch();
    tokio::time::timeout(
        Duration::from_secs(2),
        updates.wait_for(|feed| feed.entries.first().map(Post::like_count) == Some(2)),
    )
    .await
    .expect("Like count never reached the feed")
    .expect("Feed engine dropped");
}

#[tokio::test]
async fn test_like_toggle_unlikes_when_already_liked() {
    let store = MemoryStore::new();
    let engine = started_feed(&store).await;
    let aggregator = EngagementAggregator::new(Arc::new(store.clone()));

    aggregator
        .toggle_like(&engine, "p1", "u1")
        .await
        .expect("Failed to like");

    let mut updates = engine.watch();
    tokio::time::timeout(
        Duration::from_secs(2),
        updates.wait_for(|feed| feed.entries.iter().any(|p| p.is_liked_by("u1"))),
    )
    .await
    .expect("Like never reached the feed")
    .expect("Feed engine dropped");

    let action = aggregator
        .toggle_like(&engine, "p1", "u1")
        .await
        .expect("Failed to unlike");
    assert_eq!(action, LikeAction::Unliked);

    let doc = store
        .get(POSTS_COLLECTION, "p1")
        .await
        .expect("Failed to read post");
    assert_eq!(doc.get("likes"), Some(&json!([])));
}

#[tokio::test]
async fn test_concurrent_comments_both_count() {
    let store = MemoryStore::new();
    let _engine = started_feed(&store).await;
    let aggregator = EngagementAggregator::new(Arc::new(store.clone()));
    let ada = user("u1", "Ada");
    let grace = user("u2", "Grace");

    let (first, second) = tokio::join!(
        aggregator.add_comment("p1", &ada, "I'm in"),
        aggregator.add_comment("p1", &grace, "Me too"),
    );
    let first = first.expect("First comment failed");
    let second = second.expect("Second comment failed");
    assert_ne!(first, second);

    let doc = store
        .get(POSTS_COLLECTION, "p1")
        .await
        .expect("Failed to read post");
    assert_eq!(doc.get("commentCount"), Some(&json!(2)));

    let comments = aggregator
        .load_comments("p1")
        .await
        .expect("Failed to load comments");
    assert_eq!(comments.len(), 2);
    assert!(comments.iter().all(|c| c.post_id == "p1"));
    assert!(comments.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn test_like_is_a_single_set_add() {
    let mut store = MockStore::new();
    store
        .expect_commit()
        .withf(|writes: &Vec<Write>| {
            matches!(
                writes.as_slice(),
                [Write::SetField { op: SetOp::Add, field, value, .. }]
                    if field == "likes" && value == &json!("u1")
            )
        })
        .times(1)
        .returning(|_| Ok(Vec::new()));

    let aggregator = EngagementAggregator::new(Arc::new(store));
    let action = aggregator
        .toggle_like(&cached_post("p1", &["u2"]), "p1", "u1")
        .await
        .expect("Failed to like");
    assert_eq!(action, LikeAction::Liked);
}

#[tokio::test]
async fn test_unlike_is_a_single_set_remove() {
    let mut store = MockStore::new();
    store
        .expect_commit()
        .withf(|writes: &Vec<Write>| {
            matches!(
                writes.as_slice(),
                [Write::SetField { op: SetOp::Remove, .. }]
            )
        })
        .times(1)
        .returning(|_| Ok(Vec::new()));

    let aggregator = EngagementAggregator::new(Arc::new(store));
    let action = aggregator
        .toggle_like(&cached_post("p1", &["u1"]), "p1", "u1")
        .await
        .expect("Failed to unlike");
    assert_eq!(action, LikeAction::Unliked);
}

#[tokio::test]
async fn test_comment_commits_create_and_increment_together() {
    let mut store = MockStore::new();
    store
        .expect_commit()
        .withf(|writes: &Vec<Write>| {
            matches!(
                writes.as_slice(),
                [Write::Create { collection, .. }, Write::Increment { id, delta: 1, .. }]
                    if collection == "posts/p1/comments" && id == "p1"
            )
        })
        .times(1)
        .returning(|_| Ok(vec!["c1".to_string()]));

    let aggregator = EngagementAggregator::new(Arc::new(store));
    let id = aggregator
        .add_comment("p1", &user("u1", "Ada"), "  see you there  ")
        .await
        .expect("Failed to comment");
    assert_eq!(id, "c1");
}
