//! Tweet resource handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::db::{NewTweet, TweetChanges};
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::routes::AppState;
use crate::views::TweetView;

/// Request body for creating or fully replacing a tweet
#[derive(Debug, Deserialize, Validate)]
pub struct TweetBody {
    #[validate(length(min = 1, max = 140))]
    pub source: String,

    #[validate(length(min = 1, max = 50))]
    pub external_id: String,

    #[validate(length(min = 1))]
    pub text: String,

    pub created_at: chrono::DateTime<chrono::Utc>,

    #[validate(range(min = 0))]
    pub retweet_count: i32,

    #[validate(range(min = 0))]
    pub favorite_count: i32,

    #[serde(default)]
    pub in_reply_to_user_id: Option<String>,

    #[serde(default)]
    pub is_retweet: bool,
}

impl TweetBody {
    fn into_new_tweet(self) -> NewTweet {
        NewTweet {
            source: self.source,
            external_id: self.external_id,
            text: self.text,
            created_at: self.created_at.into(),
            retweet_count: self.retweet_count,
            favorite_count: self.favorite_count,
            in_reply_to_user_id: self.in_reply_to_user_id,
            is_retweet: self.is_retweet,
        }
    }
}

/// Request body for a partial tweet update
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TweetPatchBody {
    #[validate(length(min = 1, max = 140))]
    pub source: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub external_id: Option<String>,

    #[validate(length(min = 1))]
    pub text: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    #[validate(range(min = 0))]
    pub retweet_count: Option<i32>,

    #[validate(range(min = 0))]
    pub favorite_count: Option<i32>,

    pub in_reply_to_user_id: Option<String>,

    pub is_retweet: Option<bool>,
}

impl TweetPatchBody {
    fn into_changes(self) -> TweetChanges {
        TweetChanges {
            source: self.source,
            external_id: self.external_id,
            text: self.text,
            created_at: self.created_at.map(Into::into),
            retweet_count: self.retweet_count,
            favorite_count: self.favorite_count,
            in_reply_to_user_id: self.in_reply_to_user_id.map(Some),
            is_retweet: self.is_retweet,
        }
    }
}

fn validate<T: Validate>(body: &T) -> Result<()> {
    body.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}

/// List all tweets in primary-key order
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<TweetView>>> {
    let tweets = state.repo.list_tweets().await?;
    Ok(Json(tweets.iter().map(TweetView::from).collect()))
}

/// Get a tweet by ID
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TweetView>> {
    let tweet = state
        .repo
        .find_tweet(id)
        .await?
        .ok_or(AppError::TweetNotFound { id })?;
    Ok(Json(TweetView::from(&tweet)))
}

/// Create a tweet, then republish the recent-tweets snapshot
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<TweetBody>,
) -> Result<(StatusCode, Json<TweetView>)> {
    validate(&body)?;

    let tweet = state.repo.insert_tweet(body.into_new_tweet()).await?;
    metrics::record_write("tweet", "create");
    tracing::info!(tweet_id = tweet.id, "Tweet created");

    state.hook.tweets_changed().await?;

    Ok((StatusCode::CREATED, Json(TweetView::from(&tweet))))
}

/// Fully replace a tweet, then republish the recent-tweets snapshot
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<TweetBody>,
) -> Result<Json<TweetView>> {
    validate(&body)?;

    let tweet = state
        .repo
        .replace_tweet(id, body.into_new_tweet())
        .await?
        .ok_or(AppError::TweetNotFound { id })?;
    metrics::record_write("tweet", "update");

    state.hook.tweets_changed().await?;

    Ok(Json(TweetView::from(&tweet)))
}

/// Partially update a tweet, then republish the recent-tweets snapshot
pub async fn partial_update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<TweetPatchBody>,
) -> Result<Json<TweetView>> {
    validate(&body)?;

    let tweet = state
        .repo
        .patch_tweet(id, body.into_changes())
        .await?
        .ok_or(AppError::TweetNotFound { id })?;
    metrics::record_write("tweet", "update");

    state.hook.tweets_changed().await?;

    Ok(Json(TweetView::from(&tweet)))
}

/// Delete a tweet; its annotations are cascade-deleted with it
pub async fn destroy(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if !state.repo.delete_tweet(id).await? {
        return Err(AppError::TweetNotFound { id });
    }
    metrics::record_write("tweet", "delete");
    tracing::info!(tweet_id = id, "Tweet deleted");

    Ok(StatusCode::NO_CONTENT)
}
