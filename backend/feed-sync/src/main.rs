use anyhow::{Context, Result};
use doc_store::{DocumentStore, MemoryStore, NewDocument};
use feed_schema::{AuthIdentity, Hobby, NewPost, TagSet, USERS_COLLECTION};
use feed_sync::{
    telemetry, FeedSnapshot, MatchOutcome, Session, SyncConfig, SyncMetrics, TagFilter,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Wait until the feed satisfies `ready`, or give up after a second
async fn wait_for_feed<F>(updates: &mut watch::Receiver<FeedSnapshot>, ready: F) -> Result<()>
where
    F: FnMut(&FeedSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(1), updates.wait_for(ready))
        .await
        .context("feed did not update in time")?
        .context("feed engine dropped")?;
    Ok(())
}

async fn seed_users(store: &MemoryStore) -> Result<()> {
    let users = [
        ("alice", "Alice", json!(["Gaming", "Music"])),
        ("bob", "Bob", json!(["Music"])),
        ("carol", "Carol", json!(["Sports"])),
    ];
    for (uid, name, hobbies) in users {
        let doc = NewDocument::from_json(json!({
            "uid": uid,
            "name": name,
            "hobbies": hobbies,
        }))?;
        store.put(USERS_COLLECTION, uid, doc).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = SyncConfig::from_env().context("Failed to load configuration")?;
    telemetry::init_tracing(&config.log)?;
    info!(
        page_size = config.feed.page_size,
        cache_cap = config.feed.cache_cap,
        "Starting feed sync demo"
    );

    let registry = Registry::new();
    SyncMetrics::register(&registry).context("Failed to register metrics")?;

    let store = MemoryStore::new();
    seed_users(&store).await?;

    let identity = AuthIdentity {
        uid: "demo".to_string(),
        display_name: Some("Demo User".to_string()),
        ..Default::default()
    };
    let mut session = Session::open(Arc::new(store.clone()), &config, &identity).await?;

    if session.needs_onboarding() {
        let tags: TagSet = [Hobby::Gaming, Hobby::Music].into_iter().collect();
        session.save_hobbies(tags).await?;
    }

    let mut updates = session.feed().watch();

    let post_id = session
        .create_post(&NewPost {
            content: "Anyone up for a board game night?".to_string(),
            image: None,
        })
        .await?;
    wait_for_feed(&mut updates, |feed| {
        feed.entries.iter().any(|post| post.id == post_id)
    })
    .await?;

    session.toggle_like(&post_id).await?;
    session.add_comment(&post_id, "Count me in!").await?;
    wait_for_feed(&mut updates, |feed| {
        feed.entries
            .iter()
            .any(|post| post.id == post_id && post.like_count() == 1 && post.comment_count == 1)
    })
    .await?;

    for post in session.feed().snapshot().entries.iter() {
        info!(
            post_id = %post.id,
            author = %post.author_name,
            likes = post.like_count(),
            comments = post.comment_count,
            "{}",
            post.body()
        );
    }
    for comment in session.load_comments(&post_id).await? {
        info!(author = %comment.author_name, "{}", comment.text);
    }

    match session.discover().await? {
        MatchOutcome::NoTagsRequested => info!("No hobbies selected; nothing to match"),
        MatchOutcome::Ranked(users) => {
            for ranked in &users {
                let preview = ranked.preview(3);
                info!(
                    user = %ranked.user.name,
                    shared = ranked.overlap(),
                    shown = ?preview.shown,
                    more = preview.more,
                    "Discovery match"
                );
            }
        }
    }
    let music_fans = session.filter_matches(TagFilter::Only(Hobby::Music));
    info!(count = music_fans.len(), "Users who like music");

    let stats = session.profile_stats().await?;
    info!(posts = stats.posts, hobbies = stats.hobbies, "Profile stats");

    session.logout().await;

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    info!("Metrics:\n{}", String::from_utf8_lossy(&buffer));
    Ok(())
}
