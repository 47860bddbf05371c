//! Follow-gated access to tweets and the social graph.
//!
//! A viewer may read a tweet, its likes and its replies only if they follow
//! the tweet's author. The condition lives inside each store query, so the
//! decision and the read are one operation. Hidden content and missing
//! content both come back as [`AppError::NotVisible`].

use std::sync::Arc;

use tracing::debug;

use crate::constants::FEED_LIMIT;
use crate::domain::{FeedEntry, ProfileName, ReplyEntry, TweetId, TweetStats, UserId};
use crate::error::{AppError, ResultExt};
use crate::observability::metrics::{record, MetricName};
use crate::storage::Store;

const FETCH_TWEETS_FAILED: &str = "Error fetching tweets";
const FETCH_TWEET_FAILED: &str = "Error fetching tweet";

pub struct VisibilityEngine {
    store: Arc<dyn Store>,
}

impl VisibilityEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn can_view_tweet(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> Result<bool, AppError> {
        self.store
            .can_view_tweet(viewer, tweet_id)
            .await
            .or_internal(FETCH_TWEET_FAILED)
    }

    /// The most recent tweets by accounts `viewer` follows, newest first.
    pub async fn feed_for(&self, viewer: UserId) -> Result<Vec<FeedEntry>, AppError> {
        self.store
            .feed_for(viewer, FEED_LIMIT)
            .await
            .or_internal(FETCH_TWEETS_FAILED)
    }

    /// Every tweet by `user_id`. Reading your own timeline needs no follow edge.
    pub async fn own_tweets_of(&self, user_id: UserId) -> Result<Vec<TweetStats>, AppError> {
        self.store
            .tweets_by(user_id)
            .await
            .or_internal(FETCH_TWEETS_FAILED)
    }

    pub async fn following_of(&self, user_id: UserId) -> Result<Vec<ProfileName>, AppError> {
        self.store
            .following_of(user_id)
            .await
            .or_internal("Error fetching following users")
    }

    pub async fn followers_of(&self, user_id: UserId) -> Result<Vec<ProfileName>, AppError> {
        self.store
            .followers_of(user_id)
            .await
            .or_internal("Error fetching followers")
    }

    pub async fn tweet_detail(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> Result<TweetStats, AppError> {
        match self.store.visible_tweet(viewer, tweet_id).await {
            Ok(Some(tweet)) => Ok(tweet),
            Ok(None) => Err(denied(viewer, tweet_id)),
            Err(e) => Err(e).or_internal(FETCH_TWEET_FAILED),
        }
    }

    /// Usernames of everyone who liked the tweet. An empty list is reported
    /// the same way as a hidden tweet.
    pub async fn tweet_likes(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> Result<Vec<String>, AppError> {
        match self.store.visible_likes(viewer, tweet_id).await {
            Ok(likes) if !likes.is_empty() => Ok(likes),
            Ok(_) => Err(denied(viewer, tweet_id)),
            Err(e) => Err(e).or_internal(FETCH_TWEET_FAILED),
        }
    }

    pub async fn tweet_replies(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> Result<Vec<ReplyEntry>, AppError> {
        match self.store.visible_replies(viewer, tweet_id).await {
            Ok(replies) if !replies.is_empty() => Ok(replies),
            Ok(_) => Err(denied(viewer, tweet_id)),
            Err(e) => Err(e).or_internal(FETCH_TWEET_FAILED),
        }
    }
}

fn denied(viewer: UserId, tweet_id: TweetId) -> AppError {
    debug!(viewer, tweet_id, "Tweet not visible to viewer");
    record(MetricName::VisibilityDenied, None);
    AppError::NotVisible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::storage::InMemoryStore;

    struct World {
        engine: VisibilityEngine,
        store: Arc<dyn Store>,
        viewer: UserId,
        followed: UserId,
        stranger: UserId,
    }

    async fn add_user(store: &Arc<dyn Store>, username: &str) -> UserId {
        store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                name: format!("{username} name"),
                gender: "other".to_string(),
            })
            .await
            .unwrap()
    }

    async fn world() -> World {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let viewer = add_user(&store, "viewer").await;
        let followed = add_user(&store, "followed").await;
        let stranger = add_user(&store, "stranger").await;
        store.follow(viewer, followed).await.unwrap();
        World {
            engine: VisibilityEngine::new(Arc::clone(&store)),
            store,
            viewer,
            followed,
            stranger,
        }
    }

    #[tokio::test]
    async fn hidden_and_missing_tweets_look_the_same() {
        let w = world().await;
        let hidden = w
            .store
            .create_tweet(w.stranger, "secret", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let hidden_err = w.engine.tweet_detail(w.viewer, hidden).await.unwrap_err();
        let missing_err = w.engine.tweet_detail(w.viewer, 9_999).await.unwrap_err();
        assert!(matches!(hidden_err, AppError::NotVisible));
        assert!(matches!(missing_err, AppError::NotVisible));
        assert_eq!(hidden_err.to_string(), missing_err.to_string());
        assert!(!w.engine.can_view_tweet(w.viewer, hidden).await.unwrap());
    }

    #[tokio::test]
    async fn followed_tweet_detail_carries_counts() {
        let w = world().await;
        let tweet = w
            .store
            .create_tweet(w.followed, "hello", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();
        w.store
            .record_like(w.viewer, tweet, "2024-01-01T00:01:00.000Z")
            .await
            .unwrap();
        w.store
            .record_like(w.stranger, tweet, "2024-01-01T00:02:00.000Z")
            .await
            .unwrap();

        let detail = w.engine.tweet_detail(w.viewer, tweet).await.unwrap();
        assert_eq!(detail.tweet, "hello");
        assert_eq!(detail.likes, 2);
        assert_eq!(detail.replies, 0);
        assert!(w.engine.can_view_tweet(w.viewer, tweet).await.unwrap());
    }

    #[tokio::test]
    async fn empty_likes_are_reported_as_not_visible() {
        let w = world().await;
        let tweet = w
            .store
            .create_tweet(w.followed, "unloved", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();
        assert!(matches!(
            w.engine.tweet_likes(w.viewer, tweet).await,
            Err(AppError::NotVisible)
        ));
        assert!(matches!(
            w.engine.tweet_replies(w.viewer, tweet).await,
            Err(AppError::NotVisible)
        ));
    }

    #[tokio::test]
    async fn own_timeline_bypasses_follow_gate() {
        let w = world().await;
        w.store
            .create_tweet(w.stranger, "talking to myself", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();
        let own = w.engine.own_tweets_of(w.stranger).await.unwrap();
        assert_eq!(own.len(), 1);
        assert!(w.engine.feed_for(w.viewer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn graph_listings_are_one_hop() {
        let w = world().await;
        w.store.follow(w.followed, w.stranger).await.unwrap();

        let following = w.engine.following_of(w.viewer).await.unwrap();
        assert_eq!(following, vec![ProfileName { name: "followed name".to_string() }]);
        let followers = w.engine.followers_of(w.followed).await.unwrap();
        assert_eq!(followers, vec![ProfileName { name: "viewer name".to_string() }]);
    }

    #[tokio::test]
    async fn feed_never_exceeds_limit() {
        let w = world().await;
        for i in 0..10 {
            let date_time = format!("2024-01-01T00:00:{i:02}.000Z");
            w.store
                .create_tweet(w.followed, &format!("t{i}"), &date_time)
                .await
                .unwrap();
        }
        let feed = w.engine.feed_for(w.viewer).await.unwrap();
        assert_eq!(feed.len(), FEED_LIMIT);
        assert_eq!(feed[0].tweet, "t9");
        assert!(feed.windows(2).all(|p| p[0].date_time > p[1].date_time));
    }
}
