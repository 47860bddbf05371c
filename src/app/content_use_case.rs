use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::domain::{TweetId, UserId};
use crate::error::{AppError, ResultExt};
use crate::observability::metrics::{record, MetricName};
use crate::storage::Store;

/// Server-assigned tweet timestamp, e.g. `2024-03-01T09:15:00.123Z`.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Use case for writes scoped to the authenticated author
pub struct ContentUseCase {
    store: Arc<dyn Store>,
}

impl ContentUseCase {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_tweet(&self, author: UserId, text: &str) -> Result<TweetId, AppError> {
        let tweet_id = self
            .store
            .create_tweet(author, text, &now_iso8601())
            .await
            .or_internal("Error creating tweet")?;
        record(MetricName::TweetsCreated, None);
        info!(author, tweet_id, "Created tweet");
        Ok(tweet_id)
    }

    /// Delete a tweet the caller owns. Someone else's tweet and a missing
    /// tweet both yield [`AppError::NotVisible`].
    pub async fn delete_tweet(&self, owner: UserId, tweet_id: TweetId) -> Result<(), AppError> {
        let deleted = self
            .store
            .delete_tweet(owner, tweet_id)
            .await
            .or_internal("Error deleting tweet")?;
        if !deleted {
            return Err(AppError::NotVisible);
        }
        record(MetricName::TweetsDeleted, None);
        info!(owner, tweet_id, "Deleted tweet");
        Ok(())
    }
}
