//! Per-user session scope
//!
//! A session is opened once the auth collaborator has an identity and owns
//! everything tied to that user: the feed cache and its subscription, the
//! last discovery results and the write-side services. Logging out stops
//! the feed before the cache is dropped, so a detached subscription can never
//! write into a cache that belongs to someone else.

use crate::config::SyncConfig;
use crate::discovery::{DiscoveryMatcher, MatchOutcome, RankedUser, TagFilter};
use crate::engagement::{EngagementAggregator, LikeAction};
use crate::engine::FeedEngine;
use crate::error::SyncResult;
use crate::posts::PostComposer;
use crate::profile::{ProfileService, ProfileStats};
use doc_store::DocumentStore;
use feed_schema::{AuthIdentity, Comment, ImagePayload, NewPost, Post, TagSet, User};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Session {
    user: User,
    feed: FeedEngine,
    discovery: DiscoveryMatcher,
    engagement: EngagementAggregator,
    posts: PostComposer,
    profiles: ProfileService,
}

impl Session {
    /// Load or create the user document, then start the live feed.
    ///
    /// A failed feed snapshot does not fail the session as long as the
    /// subscription is up; the cache fills from live events instead.
    pub async fn open(
        store: Arc<dyn DocumentStore>,
        config: &SyncConfig,
        identity: &AuthIdentity,
    ) -> SyncResult<Self> {
        let profiles = ProfileService::new(Arc::clone(&store), config.profile.clone());
        let user = profiles.ensure_user(identity).await?;

        let feed = FeedEngine::new(Arc::clone(&store), config.feed.clone());
        if let Err(err) = feed.start().await {
            if !feed.is_live() {
                return Err(err);
            }
            warn!(user_id = %user.id, error = %err, "Feed snapshot unavailable; continuing live");
        }

        info!(user_id = %user.id, onboarding = user.needs_onboarding(), "Session opened");
        Ok(Self {
            discovery: DiscoveryMatcher::new(Arc::clone(&store), config.discovery.clone()),
            engagement: EngagementAggregator::new(Arc::clone(&store)),
            posts: PostComposer::new(store),
            profiles,
            feed,
            user,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn feed(&self) -> &FeedEngine {
        &self.feed
    }

    pub fn needs_onboarding(&self) -> bool {
        self.profiles.needs_onboarding(&self.user)
    }

    /// Save the hobby selection; the previous selection is the starting point
    pub async fn save_hobbies(&mut self, tags: TagSet) -> SyncResult<()> {
        self.profiles.save_hobbies(&self.user.id, &tags).await?;
        self.user.hobbies = tags;
        Ok(())
    }

    pub async fn set_avatar(&mut self, image: &ImagePayload) -> SyncResult<()> {
        self.profiles.set_avatar(&self.user.id, image).await?;
        self.user.photo_url = Some(image.data.clone());
        Ok(())
    }

    pub async fn profile_stats(&self) -> SyncResult<ProfileStats> {
        self.profiles.profile_stats(&self.user).await
    }

    /// Own posts for the profile view, newest first
    pub async fn my_posts(&self) -> SyncResult<Vec<Post>> {
        self.profiles.user_posts(&self.user).await
    }

    pub async fn create_post(&self, post: &NewPost) -> SyncResult<String> {
        self.posts.create_post(&self.user, post).await
    }

    /// Fire-and-forget from the caller's view; the result shows up in the feed
    pub async fn toggle_like(&self, post_id: &str) -> SyncResult<LikeAction> {
        self.engagement
            .toggle_like(&self.feed, post_id, &self.user.id)
            .await
    }

    pub async fn add_comment(&self, post_id: &str, text: &str) -> SyncResult<String> {
        self.engagement.add_comment(post_id, &self.user, text).await
    }

    pub async fn load_comments(&self, post_id: &str) -> SyncResult<Vec<Comment>> {
        self.engagement.load_comments(post_id).await
    }

    pub async fn discover(&mut self) -> SyncResult<MatchOutcome> {
        self.discovery.refresh(&self.user).await
    }

    pub fn filter_matches(&self, tag_filter: TagFilter) -> Vec<RankedUser> {
        self.discovery.filter(tag_filter)
    }

    pub fn discovery(&self) -> &DiscoveryMatcher {
        &self.discovery
    }

    /// Stop the feed and discard all per-user state
    pub async fn logout(self) {
        self.feed.stop().await;
        info!(user_id = %self.user.id, "Session closed");
    }
}
