use super::traits::Store;
use super::{StoreError, StoreResult};
use crate::domain::*;
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const SCHEMA_SQL: &str = include_str!("../../migrations/001_create_schema.sql");

/// SQLite-backed store. The connection is shared behind a mutex and every
/// query runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`. `":memory:"` opens a
    /// private in-memory database.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening SQLite database at {}", path.display());
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create any missing tables and indexes. Safe to run repeatedly.
    pub fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations...");
        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::TaskFailed("connection mutex poisoned".to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::TaskFailed("connection mutex poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.to_string();
        self.with_conn(move |conn| {
            let user = conn
                .query_row(
                    "SELECT user_id, username, password, name, gender
                     FROM user WHERE username = ?1",
                    params![username],
                    |row| {
                        Ok(User {
                            user_id: row.get(0)?,
                            username: row.get(1)?,
                            password: row.get(2)?,
                            name: row.get(3)?,
                            gender: row.get(4)?,
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
        .await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        self.with_conn(move |conn| {
            match conn.execute(
                "INSERT INTO user (name, username, password, gender) VALUES (?1, ?2, ?3, ?4)",
                params![user.name, user.username, user.password_hash, user.gender],
            ) {
                Ok(_) => {
                    let id = conn.last_insert_rowid();
                    debug!("Created user {} with id {}", user.username, id);
                    Ok(id)
                }
                Err(e) if is_constraint_violation(&e) => Err(StoreError::UsernameTaken),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn follow(&self, follower: UserId, followed: UserId) -> StoreResult<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follower (follower_user_id, following_user_id)
                 VALUES (?1, ?2)",
                params![follower, followed],
            )?;
            Ok(())
        })
        .await
    }

    async fn following_of(&self, user_id: UserId) -> StoreResult<Vec<ProfileName>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT u.name
                 FROM follower f
                 JOIN user u ON u.user_id = f.following_user_id
                 WHERE f.follower_user_id = ?1
                 ORDER BY f.follower_id",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| Ok(ProfileName { name: row.get(0)? }))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn followers_of(&self, user_id: UserId) -> StoreResult<Vec<ProfileName>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT u.name
                 FROM follower f
                 JOIN user u ON u.user_id = f.follower_user_id
                 WHERE f.following_user_id = ?1
                 ORDER BY f.follower_id",
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| Ok(ProfileName { name: row.get(0)? }))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn can_view_tweet(&self, viewer: UserId, tweet_id: TweetId) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            let visible: bool = conn.query_row(
                "SELECT EXISTS (
                    SELECT 1
                    FROM tweet t
                    JOIN follower f ON f.following_user_id = t.user_id
                    WHERE t.tweet_id = ?1 AND f.follower_user_id = ?2
                 )",
                params![tweet_id, viewer],
                |row| row.get(0),
            )?;
            Ok(visible)
        })
        .await
    }

    async fn feed_for(&self, viewer: UserId, limit: usize) -> StoreResult<Vec<FeedEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT u.username, t.tweet, t.date_time
                 FROM tweet t
                 JOIN follower f ON f.following_user_id = t.user_id
                 JOIN user u ON u.user_id = t.user_id
                 WHERE f.follower_user_id = ?1
                 ORDER BY t.date_time DESC, t.tweet_id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![viewer, limit], |row| {
                    Ok(FeedEntry {
                        username: row.get(0)?,
                        tweet: row.get(1)?,
                        date_time: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn visible_tweet(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> StoreResult<Option<TweetStats>> {
        self.with_conn(move |conn| {
            let tweet = conn
                .query_row(
                    r#"SELECT t.tweet,
                        (SELECT COUNT(*) FROM "like" l WHERE l.tweet_id = t.tweet_id) AS likes,
                        (SELECT COUNT(*) FROM reply r WHERE r.tweet_id = t.tweet_id) AS replies,
                        t.date_time
                     FROM tweet t
                     JOIN follower f ON f.following_user_id = t.user_id
                     WHERE t.tweet_id = ?1 AND f.follower_user_id = ?2"#,
                    params![tweet_id, viewer],
                    |row| {
                        Ok(TweetStats {
                            tweet: row.get(0)?,
                            likes: row.get(1)?,
                            replies: row.get(2)?,
                            date_time: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(tweet)
        })
        .await
    }

    async fn visible_likes(&self, viewer: UserId, tweet_id: TweetId) -> StoreResult<Vec<String>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                r#"SELECT u.username
                   FROM "like" l
                   JOIN user u ON u.user_id = l.user_id
                   JOIN tweet t ON t.tweet_id = l.tweet_id
                   JOIN follower f ON f.following_user_id = t.user_id
                   WHERE l.tweet_id = ?1 AND f.follower_user_id = ?2
                   ORDER BY l.like_id"#,
            )?;
            let rows = stmt
                .query_map(params![tweet_id, viewer], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn visible_replies(
        &self,
        viewer: UserId,
        tweet_id: TweetId,
    ) -> StoreResult<Vec<ReplyEntry>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT u.name, r.reply
                 FROM reply r
                 JOIN user u ON u.user_id = r.user_id
                 JOIN tweet t ON t.tweet_id = r.tweet_id
                 JOIN follower f ON f.following_user_id = t.user_id
                 WHERE r.tweet_id = ?1 AND f.follower_user_id = ?2
                 ORDER BY r.reply_id",
            )?;
            let rows = stmt
                .query_map(params![tweet_id, viewer], |row| {
                    Ok(ReplyEntry {
                        name: row.get(0)?,
                        reply: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn tweets_by(&self, user_id: UserId) -> StoreResult<Vec<TweetStats>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                r#"SELECT t.tweet,
                      (SELECT COUNT(*) FROM "like" l WHERE l.tweet_id = t.tweet_id) AS likes,
                      (SELECT COUNT(*) FROM reply r WHERE r.tweet_id = t.tweet_id) AS replies,
                      t.date_time
                   FROM tweet t
                   WHERE t.user_id = ?1
                   ORDER BY t.tweet_id"#,
            )?;
            let rows = stmt
                .query_map(params![user_id], |row| {
                    Ok(TweetStats {
                        tweet: row.get(0)?,
                        likes: row.get(1)?,
                        replies: row.get(2)?,
                        date_time: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
    }

    async fn find_tweet(
        &self,
        user_id: UserId,
        text: &str,
        date_time: &str,
    ) -> StoreResult<Option<TweetId>> {
        let text = text.to_string();
        let date_time = date_time.to_string();
        self.with_conn(move |conn| {
            let id = conn
                .query_row(
                    "SELECT tweet_id FROM tweet
                     WHERE user_id = ?1 AND tweet = ?2 AND date_time = ?3
                     ORDER BY tweet_id LIMIT 1",
                    params![user_id, text, date_time],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id)
        })
        .await
    }

    async fn create_tweet(
        &self,
        user_id: UserId,
        text: &str,
        date_time: &str,
    ) -> StoreResult<TweetId> {
        let text = text.to_string();
        let date_time = date_time.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tweet (tweet, user_id, date_time) VALUES (?1, ?2, ?3)",
                params![text, user_id, date_time],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Created tweet {} for user {}", id, user_id);
            Ok(id)
        })
        .await
    }

    async fn delete_tweet(&self, user_id: UserId, tweet_id: TweetId) -> StoreResult<bool> {
        self.with_conn(move |conn| {
            let changes = conn.execute(
                "DELETE FROM tweet WHERE tweet_id = ?1 AND user_id = ?2",
                params![tweet_id, user_id],
            )?;
            Ok(changes > 0)
        })
        .await
    }

    async fn record_like(
        &self,
        user_id: UserId,
        tweet_id: TweetId,
        date_time: &str,
    ) -> StoreResult<()> {
        let date_time = date_time.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                r#"INSERT INTO "like" (tweet_id, user_id, date_time) VALUES (?1, ?2, ?3)"#,
                params![tweet_id, user_id, date_time],
            )?;
            Ok(())
        })
        .await
    }

    async fn record_reply(
        &self,
        user_id: UserId,
        tweet_id: TweetId,
        reply: &str,
        date_time: &str,
    ) -> StoreResult<()> {
        let reply = reply.to_string();
        let date_time = date_time.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO reply (tweet_id, reply, user_id, date_time) VALUES (?1, ?2, ?3, ?4)",
                params![tweet_id, reply, user_id, date_time],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "hash".to_string(),
            name: format!("{username} name"),
            gender: "female".to_string(),
        }
    }

    async fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.run_migrations().unwrap();
        store
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let store = store().await;
        store.run_migrations().unwrap();
    }

    #[tokio::test]
    async fn duplicate_username_hits_unique_constraint() {
        let store = store().await;
        store.create_user(new_user("ada")).await.unwrap();
        let err = store.create_user(new_user("ada")).await.unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken));
    }

    #[tokio::test]
    async fn feed_is_limited_and_newest_first() {
        let store = store().await;
        let viewer = store.create_user(new_user("viewer")).await.unwrap();
        let author = store.create_user(new_user("author")).await.unwrap();
        let stranger = store.create_user(new_user("stranger")).await.unwrap();
        store.follow(viewer, author).await.unwrap();

        for day in 1..=6 {
            let ts = format!("2024-01-0{day}T10:00:00.000Z");
            store.create_tweet(author, &format!("day {day}"), &ts).await.unwrap();
        }
        store
            .create_tweet(stranger, "hidden", "2024-02-01T00:00:00.000Z")
            .await
            .unwrap();

        let feed = store.feed_for(viewer, 4).await.unwrap();
        let texts: Vec<_> = feed.iter().map(|f| f.tweet.as_str()).collect();
        assert_eq!(texts, vec!["day 6", "day 5", "day 4", "day 3"]);
        assert!(feed.iter().all(|f| f.username == "author"));
    }

    #[tokio::test]
    async fn likes_require_follow_edge() {
        let store = store().await;
        let viewer = store.create_user(new_user("viewer")).await.unwrap();
        let author = store.create_user(new_user("author")).await.unwrap();
        let tweet = store
            .create_tweet(author, "hello", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();
        store
            .record_like(viewer, tweet, "2024-01-01T01:00:00.000Z")
            .await
            .unwrap();

        assert!(store.visible_likes(viewer, tweet).await.unwrap().is_empty());
        assert!(!store.can_view_tweet(viewer, tweet).await.unwrap());

        store.follow(viewer, author).await.unwrap();
        assert_eq!(store.visible_likes(viewer, tweet).await.unwrap(), vec!["viewer"]);
        assert!(store.can_view_tweet(viewer, tweet).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_tweet_cascades_to_engagement() {
        let store = store().await;
        let viewer = store.create_user(new_user("viewer")).await.unwrap();
        let author = store.create_user(new_user("author")).await.unwrap();
        store.follow(viewer, author).await.unwrap();
        let tweet = store
            .create_tweet(author, "bye", "2024-01-01T00:00:00.000Z")
            .await
            .unwrap();
        store
            .record_reply(viewer, tweet, "see you", "2024-01-01T00:05:00.000Z")
            .await
            .unwrap();

        assert!(!store.delete_tweet(viewer, tweet).await.unwrap());
        assert!(store.delete_tweet(author, tweet).await.unwrap());
        assert!(store.visible_replies(viewer, tweet).await.unwrap().is_empty());
        assert!(store.tweets_by(author).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_follow_edges_collapse() {
        let store = store().await;
        let a = store.create_user(new_user("a")).await.unwrap();
        let b = store.create_user(new_user("b")).await.unwrap();
        store.follow(a, b).await.unwrap();
        store.follow(a, b).await.unwrap();
        assert_eq!(store.following_of(a).await.unwrap().len(), 1);
        assert_eq!(
            store.followers_of(b).await.unwrap(),
            vec![ProfileName { name: "a name".to_string() }]
        );
    }
}
