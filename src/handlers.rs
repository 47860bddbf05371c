use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use tracing::debug;

use crate::app::{AccountsUseCase, ContentUseCase, VisibilityEngine};
use crate::auth::AuthUser;
use crate::constants::{MSG_TWEET_CREATED, MSG_TWEET_REMOVED, MSG_USER_CREATED};
use crate::domain::{FeedEntry, ProfileName, TweetId, TweetStats};
use crate::error::AppError;
use crate::models::{
    CreateTweetRequest, LikesResponse, LoginRequest, LoginResponse, RegisterRequest,
    RepliesResponse,
};
use crate::state::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        debug!(error = %rejection, "Rejected request body");
        AppError::MalformedPayload
    })
}

/// Non-numeric ids cannot name a tweet, so they get the same answer as an unknown id.
fn tweet_id(raw: &str) -> Result<TweetId, AppError> {
    raw.parse().map_err(|_| AppError::NotVisible)
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "twitter_clone",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<&'static str, AppError> {
    let request = body(payload)?;
    AccountsUseCase::from_state(&state).register(request).await?;
    Ok(MSG_USER_CREATED)
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let request = body(payload)?;
    let jwt_token = AccountsUseCase::from_state(&state).login(request).await?;
    Ok(Json(LoginResponse { jwt_token }))
}

pub async fn feed(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<FeedEntry>>, AppError> {
    let feed = VisibilityEngine::new(state.store).feed_for(user.user_id).await?;
    Ok(Json(feed))
}

pub async fn following(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ProfileName>>, AppError> {
    let names = VisibilityEngine::new(state.store)
        .following_of(user.user_id)
        .await?;
    Ok(Json(names))
}

pub async fn followers(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ProfileName>>, AppError> {
    let names = VisibilityEngine::new(state.store)
        .followers_of(user.user_id)
        .await?;
    Ok(Json(names))
}

pub async fn tweet_detail(
    State(state): State<AppState>,
    user: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<TweetStats>, AppError> {
    let tweet = VisibilityEngine::new(state.store)
        .tweet_detail(user.user_id, tweet_id(&raw_id)?)
        .await?;
    Ok(Json(tweet))
}

pub async fn tweet_likes(
    State(state): State<AppState>,
    user: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<LikesResponse>, AppError> {
    let likes = VisibilityEngine::new(state.store)
        .tweet_likes(user.user_id, tweet_id(&raw_id)?)
        .await?;
    Ok(Json(LikesResponse { likes }))
}

pub async fn tweet_replies(
    State(state): State<AppState>,
    user: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<Json<RepliesResponse>, AppError> {
    let replies = VisibilityEngine::new(state.store)
        .tweet_replies(user.user_id, tweet_id(&raw_id)?)
        .await?;
    Ok(Json(RepliesResponse { replies }))
}

pub async fn own_tweets(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<TweetStats>>, AppError> {
    let tweets = VisibilityEngine::new(state.store)
        .own_tweets_of(user.user_id)
        .await?;
    Ok(Json(tweets))
}

pub async fn create_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CreateTweetRequest>, JsonRejection>,
) -> Result<&'static str, AppError> {
    let request = body(payload)?;
    ContentUseCase::new(state.store)
        .create_tweet(user.user_id, &request.tweet)
        .await?;
    Ok(MSG_TWEET_CREATED)
}

pub async fn delete_tweet(
    State(state): State<AppState>,
    user: AuthUser,
    Path(raw_id): Path<String>,
) -> Result<&'static str, AppError> {
    ContentUseCase::new(state.store)
        .delete_tweet(user.user_id, tweet_id(&raw_id)?)
        .await?;
    Ok(MSG_TWEET_REMOVED)
}
