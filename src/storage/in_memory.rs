use super::traits::Store;
use super::{StoreError, StoreResult};
use crate::domain::*;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

struct TweetRow {
    user_id: UserId,
    tweet: String,
    date_time: String,
}

struct ReplyRow {
    user_id: UserId,
    tweet_id: TweetId,
    reply: String,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    // Insertion order is kept so listings match the SQLite row order.
    follows: Vec<(UserId, UserId)>,
    follow_index: BTreeSet<(UserId, UserId)>,
    tweets: BTreeMap<TweetId, TweetRow>,
    likes: Vec<(UserId, TweetId)>,
    replies: Vec<ReplyRow>,
    next_user_id: UserId,
    next_tweet_id: TweetId,
}

impl Tables {
    fn is_following(&self, follower: UserId, followed: UserId) -> bool {
        self.follow_index.contains(&(follower, followed))
    }

    fn visible(&self, viewer: UserId, tweet_id: TweetId) -> Option<&TweetRow> {
        self.tweets
            .get(&tweet_id)
            .filter(|t| self.is_following(viewer, t.user_id))
    }

    fn stats(&self, tweet_id: TweetId, row: &TweetRow) -> TweetStats {
        TweetStats {
            tweet: row.tweet.clone(),
            likes: self.likes.iter().filter(|(_, t)| *t == tweet_id).count() as i64,
            replies: self.replies.iter().filter(|r| r.tweet_id == tweet_id).count() as i64,
            date_time: row.date_time.clone(),
        }
    }

    fn name_of(&self, user_id: UserId) -> String {
        self.users
            .get(&user_id)
            .map(|u| u.name.clone())
            .unwrap_or_default()
    }

    fn require_user(&self, user_id: UserId) -> StoreResult<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!("user {user_id}")))
        }
    }

    fn require_tweet(&self, tweet_id: TweetId) -> StoreResult<()> {
        if self.tweets.contains_key(&tweet_id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!("tweet {tweet_id}")))
        }
    }
}

/// In-memory store for development/testing. Applies the same follow-edge
/// scoping and referential checks as the SQLite schema.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::TaskFailed("in-memory store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables()?;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let mut tables = self.tables()?;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UsernameTaken);
        }
        tables.next_user_id += 1;
        let user_id = tables.next_user_id;
        debug!("Created user {} with id {}", user.username, user_id);
        tables.users.insert(
            user_id,
            User {
                user_id,
                username: user.username,
                password: user.password_hash,
                name: user.name,
                gender: user.gender,
            },
        );
        Ok(user_id)
    }

    async fn follow(&self, follower: UserId, followed: UserId) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.require_user(follower)?;
        tables.require_user(followed)?;
        if tables.follow_index.insert((follower, followed)) {
            tables.follows.push((follower, followed));
        }
        Ok(())
    }

    async fn following_of(&self, user_id: UserId) -> StoreResult<Vec<ProfileName>> {
        let tables = self.tables()?;
        Ok(tables
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .map(|(_, followed)| ProfileName {
                name: tables.name_of(*followed),
            })
            .collect())
    }

    async fn followers_of(&self, user_id: UserId) -> StoreResult<Vec<ProfileName>> {
        let tables = self.tables()?;
        Ok(tables
            .follows
            .iter()
            .filter(|(_, followed)| *followed == user_id)
            .map(|(follower, _)| ProfileName {
                name: tables.name_of(*follower),
            })
            .collect())
    }

    async fn can_view_tweet(&self, viewer: UserId, tweet_id: TweetId) -> StoreResult<bool> {
        Ok(self.tables()?.visible(viewer, tweet_id).is_some())
    }

    async fn feed_for(&self, viewer: UserId, limit: usize) -> StoreResult<Vec<FeedEntry>> {
        let tables = self.tables()?;
        let mut rows: Vec<(TweetId, &TweetRow)> = tables
            .tweets
            .iter()
            .filter(|(_, t)| tables.is_following(viewer, t.user_id))
            .map(|(id, t)| (*id, t))
            .collect();
        rows.sort_by(|(a_id, a), (b_id, b)| {
            b.date_time.cmp(&a.date_time).then_with(|| b_id.cmp(a_id))
        });
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, t)| FeedEntry {
                username: tables
                    .users
                    .get(&t.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
                tweet: t.tweet.clone(),
                date_time: t.date_time.clone(),
            })
            .collect())
    }

    async fn visible_tweet(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> StoreResult<Option<TweetStats>> {
        let tables = self.tables()?;
        Ok(tables
            .visible(viewer, tweet_id)
            .map(|row| tables.stats(tweet_id, row)))
    }

    async fn visible_likes(&self, viewer: UserId, tweet_id: TweetId) -> StoreResult<Vec<String>> {
        let tables = self.tables()?;
        if tables.visible(viewer, tweet_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(tables
            .likes
            .iter()
            .filter(|(_, t)| *t == tweet_id)
            .filter_map(|(user_id, _)| tables.users.get(user_id).map(|u| u.username.clone()))
            .collect())
    }

    async fn visible_replies(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> StoreResult<Vec<ReplyEntry>> {
        let tables = self.tables()?;
        if tables.visible(viewer, tweet_id).is_none() {
            return Ok(Vec::new());
        }
        Ok(tables
            .replies
            .iter()
            .filter(|r| r.tweet_id == tweet_id)
            .map(|r| ReplyEntry {
                name: tables.name_of(r.user_id),
                reply: r.reply.clone(),
            })
            .collect())
    }

    async fn tweets_by(&self, user_id: UserId) -> StoreResult<Vec<TweetStats>> {
        let tables = self.tables()?;
        Ok(tables
            .tweets
            .iter()
            .filter(|(_, t)| t.user_id == user_id)
            .map(|(id, t)| tables.stats(*id, t))
            .collect())
    }

    async fn find_tweet(
        &self,
        user_id: UserId,
        text: &str,
        date_time: &str,
    ) -> StoreResult<Option<TweetId>> {
        let tables = self.tables()?;
        Ok(tables
            .tweets
            .iter()
            .find(|(_, t)| t.user_id == user_id && t.tweet == text && t.date_time == date_time)
            .map(|(id, _)| *id))
    }

    async fn create_tweet(
        &self,
        user_id: UserId,
        text: &str,
        date_time: &str,
    ) -> StoreResult<TweetId> {
        let mut tables = self.tables()?;
        tables.require_user(user_id)?;
        tables.next_tweet_id += 1;
        let tweet_id = tables.next_tweet_id;
        tables.tweets.insert(
            tweet_id,
            TweetRow {
                user_id,
                tweet: text.to_string(),
                date_time: date_time.to_string(),
            },
        );
        debug!("Created tweet {} for user {}", tweet_id, user_id);
        Ok(tweet_id)
    }

    async fn delete_tweet(&self, user_id: UserId, tweet_id: TweetId) -> StoreResult<bool> {
        let mut tables = self.tables()?;
        let owned = tables
            .tweets
            .get(&tweet_id)
            .is_some_and(|t| t.user_id == user_id);
        if !owned {
            return Ok(false);
        }
        tables.tweets.remove(&tweet_id);
        tables.likes.retain(|(_, t)| *t != tweet_id);
        tables.replies.retain(|r| r.tweet_id != tweet_id);
        Ok(true)
    }

    async fn record_like(
        &self,
        user_id: UserId,
        tweet_id: TweetId,
        _date_time: &str,
    ) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.require_user(user_id)?;
        tables.require_tweet(tweet_id)?;
        tables.likes.push((user_id, tweet_id));
        Ok(())
    }

    async fn record_reply(
        &self,
        user_id: UserId,
        tweet_id: TweetId,
        reply: &str,
        _date_time: &str,
    ) -> StoreResult<()> {
        let mut tables = self.tables()?;
        tables.require_user(user_id)?;
        tables.require_tweet(tweet_id)?;
        tables.replies.push(ReplyRow {
            user_id,
            tweet_id,
            reply: reply.to_string(),
        });
        Ok(())
    }
}
