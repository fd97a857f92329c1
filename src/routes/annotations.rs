//! Annotation resource handlers
//!
//! Responses embed the full tweet, re-read from the store at request time.
//! `author` and `publish_date` are server-assigned and not client-writable.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::db::AnnotationChanges;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::routes::AppState;
use crate::views::AnnotationView;

/// Request body for creating or fully replacing an annotation
#[derive(Debug, Deserialize, Validate)]
pub struct AnnotationBody {
    /// ID of the annotated tweet
    pub tweet: i32,

    #[validate(length(min = 1))]
    pub annotation: String,
}

/// Request body for a partial annotation update
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AnnotationPatchBody {
    pub tweet: Option<i32>,

    #[validate(length(min = 1))]
    pub annotation: Option<String>,
}

fn validate<T: Validate>(body: &T) -> Result<()> {
    body.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}

/// Reject writes that point at a tweet that does not exist
async fn check_tweet_exists(state: &AppState, tweet_id: i32) -> Result<()> {
    if state.repo.find_tweet(tweet_id).await?.is_none() {
        return Err(AppError::Validation {
            message: format!("tweet {} does not exist", tweet_id),
            field: Some("tweet".into()),
        });
    }
    Ok(())
}

async fn view_of(state: &AppState, id: i32) -> Result<AnnotationView> {
    let (annotation, tweet, author) = state
        .repo
        .annotation_with_refs(id)
        .await?
        .ok_or_else(|| AppError::Internal {
            message: format!("annotation {} vanished after write", id),
        })?;
    Ok(AnnotationView::new(&annotation, &tweet, author.as_ref()))
}

/// List all annotations, tweets embedded in full
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<AnnotationView>>> {
    let rows = state.repo.annotations_with_refs().await?;
    Ok(Json(
        rows.iter()
            .map(|(annotation, tweet, author)| {
                AnnotationView::new(annotation, tweet, author.as_ref())
            })
            .collect(),
    ))
}

/// Get an annotation by ID
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AnnotationView>> {
    let (annotation, tweet, author) = state
        .repo
        .annotation_with_refs(id)
        .await?
        .ok_or(AppError::AnnotationNotFound { id })?;
    Ok(Json(AnnotationView::new(&annotation, &tweet, author.as_ref())))
}

/// Create an annotation, then republish the annotations snapshot
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<AnnotationBody>,
) -> Result<(StatusCode, Json<AnnotationView>)> {
    validate(&body)?;
    check_tweet_exists(&state, body.tweet).await?;

    let annotation = state
        .repo
        .insert_annotation(body.tweet, body.annotation)
        .await?;
    metrics::record_write("annotation", "create");
    tracing::info!(annotation_id = annotation.id, tweet_id = body.tweet, "Annotation created");

    state.hook.annotations_changed().await?;

    Ok((StatusCode::CREATED, Json(view_of(&state, annotation.id).await?)))
}

/// Fully replace an annotation's writable fields, then republish the
/// annotations snapshot. `publish_date` keeps its creation value.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<AnnotationBody>,
) -> Result<Json<AnnotationView>> {
    validate(&body)?;
    check_tweet_exists(&state, body.tweet).await?;

    state
        .repo
        .update_annotation(
            id,
            AnnotationChanges {
                tweet_id: Some(body.tweet),
                annotation: Some(body.annotation),
            },
        )
        .await?
        .ok_or(AppError::AnnotationNotFound { id })?;
    metrics::record_write("annotation", "update");

    state.hook.annotations_changed().await?;

    Ok(Json(view_of(&state, id).await?))
}

/// Partially update an annotation, then republish the annotations snapshot
pub async fn partial_update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<AnnotationPatchBody>,
) -> Result<Json<AnnotationView>> {
    validate(&body)?;
    if let Some(tweet_id) = body.tweet {
        check_tweet_exists(&state, tweet_id).await?;
    }

    state
        .repo
        .update_annotation(
            id,
            AnnotationChanges {
                tweet_id: body.tweet,
                annotation: body.annotation,
            },
        )
        .await?
        .ok_or(AppError::AnnotationNotFound { id })?;
    metrics::record_write("annotation", "update");

    state.hook.annotations_changed().await?;

    Ok(Json(view_of(&state, id).await?))
}

/// Delete an annotation
pub async fn destroy(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if !state.repo.delete_annotation(id).await? {
        return Err(AppError::AnnotationNotFound { id });
    }
    metrics::record_write("annotation", "delete");

    Ok(StatusCode::NO_CONTENT)
}
