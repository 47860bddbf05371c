//! Request and response bodies for the HTTP surface.

use crate::domain::ReplyEntry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub name: String,
    pub gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "jwtToken")]
    pub jwt_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTweetRequest {
    pub tweet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikesResponse {
    pub likes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepliesResponse {
    pub replies: Vec<ReplyEntry>,
}
