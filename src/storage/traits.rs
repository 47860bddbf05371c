use super::StoreResult;
use crate::domain::*;
use async_trait::async_trait;

/// Storage trait backing every handler. Implementations must keep the
/// viewer-scoped reads self-contained: no row about a tweet is returned
/// unless the viewer follows its author.
#[async_trait]
pub trait Store: Send + Sync {
    // Credential operations
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Fails with `StoreError::UsernameTaken` if the username already exists.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserId>;

    // Social graph operations
    /// Adds the edge `follower -> followed`. Existing edges are left as they are.
    async fn follow(&self, follower: UserId, followed: UserId) -> StoreResult<()>;
    async fn following_of(&self, user_id: UserId) -> StoreResult<Vec<ProfileName>>;
    async fn followers_of(&self, user_id: UserId) -> StoreResult<Vec<ProfileName>>;

    // Follow-gated reads
    async fn can_view_tweet(&self, viewer: UserId, tweet_id: TweetId) -> StoreResult<bool>;
    /// Newest first, ties broken by higher tweet id.
    async fn feed_for(&self, viewer: UserId, limit: usize) -> StoreResult<Vec<FeedEntry>>;
    async fn visible_tweet(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> StoreResult<Option<TweetStats>>;
    async fn visible_likes(&self, viewer: UserId, tweet_id: TweetId) -> StoreResult<Vec<String>>;
    async fn visible_replies(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> StoreResult<Vec<ReplyEntry>>;

    // Owner-scoped content operations
    async fn tweets_by(&self, user_id: UserId) -> StoreResult<Vec<TweetStats>>;
    /// Id of a tweet by `user_id` with exactly this text and timestamp.
    async fn find_tweet(
        &self,
        user_id: UserId,
        text: &str,
        date_time: &str,
    ) -> StoreResult<Option<TweetId>>;
    async fn create_tweet(
        &self,
        user_id: UserId,
        text: &str,
        date_time: &str,
    ) -> StoreResult<TweetId>;
    /// Returns false when no tweet with that id is owned by `user_id`.
    async fn delete_tweet(&self, user_id: UserId, tweet_id: TweetId) -> StoreResult<bool>;

    // Engagement records (no HTTP surface; used by seeding)
    async fn record_like(
        &self,
        user_id: UserId,
        tweet_id: TweetId,
        date_time: &str,
    ) -> StoreResult<()>;
    async fn record_reply(
        &self,
        user_id: UserId,
        tweet_id: TweetId,
        reply: &str,
        date_time: &str,
    ) -> StoreResult<()>;
}
