//! Domain data shapes shared by the store, the visibility engine and the handlers.

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type TweetId = i64;

/// A stored account. `password` holds the Argon2 PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub password: String,
    pub name: String,
    pub gender: String,
}

/// Account fields accepted at registration, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub gender: String,
}

/// One row of a follower's feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub username: String,
    pub tweet: String,
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

/// A tweet together with its engagement counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TweetStats {
    pub tweet: String,
    pub likes: i64,
    pub replies: i64,
    #[serde(rename = "dateTime")]
    pub date_time: String,
}

/// Display name of a user on the other end of a follow edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEntry {
    pub name: String,
    pub reply: String,
}
