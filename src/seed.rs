//! Load users, follow edges, tweets and engagement from a TOML fixture.
//!
//! The HTTP surface has no endpoints for follows, likes or replies, so this
//! is how a database gets its social graph.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::app::content_use_case::now_iso8601;
use crate::auth::hash_password;
use crate::domain::{NewUser, TweetId, UserId};
use crate::storage::{Store, StoreError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFixture {
    pub users: Vec<SeedUser>,
    pub follows: Vec<SeedFollow>,
    pub tweets: Vec<SeedTweet>,
    pub likes: Vec<SeedLike>,
    pub replies: Vec<SeedReply>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub gender: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedFollow {
    pub follower: String,
    pub following: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedTweet {
    /// Fixture-local handle used by likes and replies.
    pub key: String,
    pub author: String,
    pub tweet: String,
    pub date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedLike {
    pub user: String,
    pub tweet: String,
    pub date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedReply {
    pub user: String,
    pub tweet: String,
    pub reply: String,
    pub date_time: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub users_skipped: usize,
    pub follows: usize,
    pub tweets: usize,
    pub tweets_skipped: usize,
    pub likes: usize,
    pub replies: usize,
    /// Likes and replies not written because their tweet was reused.
    pub engagement_skipped: usize,
}

impl SeedFixture {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture '{}'", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid seed fixture")
    }
}

/// Parse a fixture timestamp into the stored `YYYY-MM-DDTHH:MM:SS.mmmZ` form.
///
/// Accepts RFC 3339 with any offset, or a naive `YYYY-MM-DD HH:MM:SS`
/// (optionally with `T` and fractional seconds) read as UTC. `None` means now.
pub fn normalize_timestamp(raw: Option<&str>) -> Result<String> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(now_iso8601());
    };
    let parsed = match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|naive| naive.and_utc())
            .ok_or_else(|| anyhow!("Unrecognised timestamp '{raw}'"))?,
    };
    Ok(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

fn timestamps<'a, I>(values: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    values.into_iter().map(normalize_timestamp).collect()
}

/// Write `fixture` into `store`.
///
/// Users are matched by username and tweets by author, text and fixed
/// timestamp; matches are reused rather than inserted again, and the likes
/// and replies of a reused tweet are skipped. Tweets without a `date_time`
/// are always inserted. Every timestamp is validated before anything is
/// written.
pub async fn apply(store: &dyn Store, fixture: &SeedFixture) -> Result<SeedSummary> {
    let tweet_times = timestamps(fixture.tweets.iter().map(|t| t.date_time.as_deref()))?;
    let like_times = timestamps(fixture.likes.iter().map(|l| l.date_time.as_deref()))?;
    let reply_times = timestamps(fixture.replies.iter().map(|r| r.date_time.as_deref()))?;

    let mut summary = SeedSummary::default();
    let mut users: HashMap<&str, UserId> = HashMap::new();

    for user in &fixture.users {
        if let Some(existing) = store.find_user_by_username(&user.username).await? {
            warn!("User {} already exists, reusing id {}", user.username, existing.user_id);
            users.insert(&user.username, existing.user_id);
            summary.users_skipped += 1;
            continue;
        }
        let password_hash = hash_password(&user.password).await?;
        let user_id = match store
            .create_user(NewUser {
                username: user.username.clone(),
                password_hash,
                name: user.name.clone(),
                gender: user.gender.clone(),
            })
            .await
        {
            Ok(id) => id,
            Err(StoreError::UsernameTaken) => {
                return Err(anyhow!("User {} was created concurrently", user.username))
            }
            Err(e) => return Err(e.into()),
        };
        users.insert(&user.username, user_id);
        summary.users_created += 1;
    }

    let lookup = |username: &str| -> Result<UserId> {
        users
            .get(username)
            .copied()
            .ok_or_else(|| anyhow!("Fixture references unknown user '{username}'"))
    };

    for edge in &fixture.follows {
        store.follow(lookup(&edge.follower)?, lookup(&edge.following)?).await?;
        summary.follows += 1;
    }

    let mut tweets: HashMap<&str, TweetId> = HashMap::new();
    let mut inserted: HashSet<&str> = HashSet::new();
    for (tweet, date_time) in fixture.tweets.iter().zip(&tweet_times) {
        let author = lookup(&tweet.author)?;
        let existing = match tweet.date_time {
            Some(_) => store.find_tweet(author, &tweet.tweet, date_time).await?,
            None => None,
        };
        let tweet_id = match existing {
            Some(id) => {
                debug!("Tweet {} already seeded as {}", tweet.key, id);
                summary.tweets_skipped += 1;
                id
            }
            None => {
                let id = store.create_tweet(author, &tweet.tweet, date_time).await?;
                inserted.insert(&tweet.key);
                summary.tweets += 1;
                id
            }
        };
        tweets.insert(&tweet.key, tweet_id);
    }

    let tweet_lookup = |key: &str| -> Result<Option<TweetId>> {
        let id = tweets
            .get(key)
            .copied()
            .ok_or_else(|| anyhow!("Fixture references unknown tweet '{key}'"))?;
        Ok(inserted.contains(key).then_some(id))
    };

    for (like, date_time) in fixture.likes.iter().zip(&like_times) {
        let user_id = lookup(&like.user)?;
        let Some(tweet_id) = tweet_lookup(&like.tweet)? else {
            summary.engagement_skipped += 1;
            continue;
        };
        store.record_like(user_id, tweet_id, date_time).await?;
        summary.likes += 1;
    }

    for (reply, date_time) in fixture.replies.iter().zip(&reply_times) {
        let user_id = lookup(&reply.user)?;
        let Some(tweet_id) = tweet_lookup(&reply.tweet)? else {
            summary.engagement_skipped += 1;
            continue;
        };
        store
            .record_reply(user_id, tweet_id, &reply.reply, date_time)
            .await?;
        summary.replies += 1;
    }

    info!(?summary, "Seed fixture applied");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    const FIXTURE: &str = r#"
        [[users]]
        username = "alice"
        password = "alice-pass"
        name = "Alice"
        gender = "female"

        [[users]]
        username = "bob"
        password = "bob-pass"
        name = "Bob"
        gender = "male"

        [[follows]]
        follower = "bob"
        following = "alice"

        [[tweets]]
        key = "a1"
        author = "alice"
        tweet = "Hello from Alice"
        date_time = "2021-04-07 14:50:15"

        [[likes]]
        user = "bob"
        tweet = "a1"

        [[replies]]
        user = "bob"
        tweet = "a1"
        reply = "Hi Alice"
    "#;

    #[tokio::test]
    async fn applies_fixture_and_gates_by_follow() {
        let store = InMemoryStore::new();
        let fixture = SeedFixture::from_toml_str(FIXTURE).unwrap();
        let summary = apply(&store, &fixture).await.unwrap();
        assert_eq!(summary.users_created, 2);
        assert_eq!((summary.follows, summary.tweets), (1, 1));
        assert_eq!((summary.likes, summary.replies), (1, 1));

        let bob = store.find_user_by_username("bob").await.unwrap().unwrap();
        let feed = store.feed_for(bob.user_id, 4).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].username, "alice");
        assert_eq!(feed[0].date_time, "2021-04-07T14:50:15.000Z");
    }

    #[tokio::test]
    async fn reapplying_reuses_users_tweets_and_engagement() {
        let store = InMemoryStore::new();
        let fixture = SeedFixture::from_toml_str(FIXTURE).unwrap();
        apply(&store, &fixture).await.unwrap();
        let summary = apply(&store, &fixture).await.unwrap();
        assert_eq!(summary.users_created, 0);
        assert_eq!(summary.users_skipped, 2);
        assert_eq!((summary.tweets, summary.tweets_skipped), (0, 1));
        assert_eq!((summary.likes, summary.replies), (0, 0));
        assert_eq!(summary.engagement_skipped, 2);

        let alice = store.find_user_by_username("alice").await.unwrap().unwrap();
        let tweets = store.tweets_by(alice.user_id).await.unwrap();
        assert_eq!(tweets.len(), 1);
        assert_eq!((tweets[0].likes, tweets[0].replies), (1, 1));
    }

    #[test]
    fn timestamps_are_normalized_to_utc_millis() {
        let cases = [
            ("2024-01-01 23:00:00", "2024-01-01T23:00:00.000Z"),
            ("2024-01-01T01:00:00.000Z", "2024-01-01T01:00:00.000Z"),
            ("2024-01-01T01:00:00+02:00", "2023-12-31T23:00:00.000Z"),
            ("2024-01-01T08:30:15.25", "2024-01-01T08:30:15.250Z"),
        ];
        for (raw, expected) in cases {
            assert_eq!(normalize_timestamp(Some(raw)).unwrap(), expected, "{raw}");
        }
        assert!(normalize_timestamp(None).unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn mixed_timestamp_formats_keep_feed_order() {
        let store = InMemoryStore::new();
        let fixture = SeedFixture::from_toml_str(
            r#"
            [[users]]
            username = "reader"
            password = "reader-pass"
            name = "Reader"
            gender = "female"

            [[users]]
            username = "writer"
            password = "writer-pass"
            name = "Writer"
            gender = "male"

            [[follows]]
            follower = "reader"
            following = "writer"

            [[tweets]]
            key = "late"
            author = "writer"
            tweet = "late 23:00"
            date_time = "2024-01-01 23:00:00"

            [[tweets]]
            key = "early"
            author = "writer"
            tweet = "early 01:00"
            date_time = "2024-01-01T01:00:00.000Z"
            "#,
        )
        .unwrap();
        apply(&store, &fixture).await.unwrap();

        let reader = store.find_user_by_username("reader").await.unwrap().unwrap();
        let feed = store.feed_for(reader.user_id, 4).await.unwrap();
        let order: Vec<&str> = feed.iter().map(|e| e.tweet.as_str()).collect();
        assert_eq!(order, vec!["late 23:00", "early 01:00"]);
    }

    #[tokio::test]
    async fn unparsable_timestamp_fails_before_writing() {
        let store = InMemoryStore::new();
        let fixture = SeedFixture::from_toml_str(
            r#"
            [[users]]
            username = "writer"
            password = "writer-pass"
            name = "Writer"
            gender = "male"

            [[tweets]]
            key = "junk"
            author = "writer"
            tweet = "junk"
            date_time = "yesterday"
            "#,
        )
        .unwrap();
        let err = apply(&store, &fixture).await.unwrap_err();
        assert!(err.to_string().contains("yesterday"));
        assert!(store.find_user_by_username("writer").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_reference_is_an_error() {
        let store = InMemoryStore::new();
        let fixture = SeedFixture::from_toml_str(
            r#"
            [[follows]]
            follower = "ghost"
            following = "nobody"
            "#,
        )
        .unwrap();
        let err = apply(&store, &fixture).await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
