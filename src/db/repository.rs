//! Repository pattern for database operations
//!
//! All reads and writes for tweets, annotations, and users go through here,
//! so the handlers and the snapshot writer share one data-access surface.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;

use super::models::{
    Annotation, AnnotationActiveModel, AnnotationColumn, AnnotationEntity, Tweet,
    TweetActiveModel, TweetColumn, TweetEntity, User, UserActiveModel, UserColumn, UserEntity,
};
use crate::errors::{AppError, Result};

/// A tweet about to be stored, as accepted from the API or the bulk loader
#[derive(Debug, Clone)]
pub struct NewTweet {
    pub source: String,
    pub external_id: String,
    pub text: String,
    pub created_at: sea_orm::prelude::DateTimeWithTimeZone,
    pub retweet_count: i32,
    pub favorite_count: i32,
    pub in_reply_to_user_id: Option<String>,
    pub is_retweet: bool,
}

impl NewTweet {
    fn into_active_model(self) -> TweetActiveModel {
        TweetActiveModel {
            source: Set(self.source),
            external_id: Set(self.external_id),
            text: Set(self.text),
            created_at: Set(self.created_at),
            retweet_count: Set(self.retweet_count),
            favorite_count: Set(self.favorite_count),
            in_reply_to_user_id: Set(self.in_reply_to_user_id),
            is_retweet: Set(self.is_retweet),
            ..Default::default()
        }
    }
}

/// Field-level changes for a partial tweet update.
///
/// `in_reply_to_user_id` is doubly optional: the outer level is "change it
/// or not", the inner level is the stored nullable value.
#[derive(Debug, Clone, Default)]
pub struct TweetChanges {
    pub source: Option<String>,
    pub external_id: Option<String>,
    pub text: Option<String>,
    pub created_at: Option<sea_orm::prelude::DateTimeWithTimeZone>,
    pub retweet_count: Option<i32>,
    pub favorite_count: Option<i32>,
    pub in_reply_to_user_id: Option<Option<String>>,
    pub is_retweet: Option<bool>,
}

/// Field-level changes for an annotation update. `publish_date` is
/// deliberately absent: it is immutable after creation.
#[derive(Debug, Clone, Default)]
pub struct AnnotationChanges {
    pub tweet_id: Option<i32>,
    pub annotation: Option<String>,
}

/// The FK guarantees a live tweet; a miss here means the schema was
/// created without the cascade constraint.
fn resolve_tweet(annotation: &Annotation, tweet: Option<Tweet>) -> Result<Tweet> {
    tweet.ok_or_else(|| AppError::Internal {
        message: format!("annotation {} references a missing tweet", annotation.id),
    })
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    conn: DatabaseConnection,
}

impl Repository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Ping the database (used by the readiness probe)
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }

    // ========================================================================
    // Tweet operations
    // ========================================================================

    /// List all tweets in primary-key order
    pub async fn list_tweets(&self) -> Result<Vec<Tweet>> {
        TweetEntity::find()
            .order_by_asc(TweetColumn::Id)
            .all(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Find a tweet by ID
    pub async fn find_tweet(&self, id: i32) -> Result<Option<Tweet>> {
        TweetEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// The most recently created tweets, newest first
    pub async fn recent_tweets(&self, limit: u64) -> Result<Vec<Tweet>> {
        TweetEntity::find()
            .order_by_desc(TweetColumn::CreatedAt)
            .limit(limit)
            .all(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Insert a new tweet
    pub async fn insert_tweet(&self, tweet: NewTweet) -> Result<Tweet> {
        tweet
            .into_active_model()
            .insert(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Find a stored tweet matching every field of `tweet`.
    ///
    /// This is the bulk loader's dedupe lookup: a row counts as the same
    /// record only when the whole tuple matches, not just `external_id`.
    pub async fn find_tweet_matching(&self, tweet: &NewTweet) -> Result<Option<Tweet>> {
        let reply_filter = match &tweet.in_reply_to_user_id {
            Some(user_id) => TweetColumn::InReplyToUserId.eq(user_id.as_str()),
            None => TweetColumn::InReplyToUserId.is_null(),
        };

        TweetEntity::find()
            .filter(TweetColumn::Source.eq(tweet.source.as_str()))
            .filter(TweetColumn::ExternalId.eq(tweet.external_id.as_str()))
            .filter(TweetColumn::Text.eq(tweet.text.as_str()))
            .filter(TweetColumn::CreatedAt.eq(tweet.created_at))
            .filter(TweetColumn::RetweetCount.eq(tweet.retweet_count))
            .filter(TweetColumn::FavoriteCount.eq(tweet.favorite_count))
            .filter(reply_filter)
            .filter(TweetColumn::IsRetweet.eq(tweet.is_retweet))
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Insert-if-absent keyed on the full record. Existing rows are never
    /// modified. Returns the row and whether it was inserted.
    pub async fn upsert_tweet(&self, tweet: NewTweet) -> Result<(Tweet, bool)> {
        if let Some(existing) = self.find_tweet_matching(&tweet).await? {
            return Ok((existing, false));
        }
        let inserted = self.insert_tweet(tweet).await?;
        Ok((inserted, true))
    }

    /// Replace every field of an existing tweet
    pub async fn replace_tweet(&self, id: i32, tweet: NewTweet) -> Result<Option<Tweet>> {
        let Some(existing) = self.find_tweet(id).await? else {
            return Ok(None);
        };

        let mut active: TweetActiveModel = existing.into();
        active.source = Set(tweet.source);
        active.external_id = Set(tweet.external_id);
        active.text = Set(tweet.text);
        active.created_at = Set(tweet.created_at);
        active.retweet_count = Set(tweet.retweet_count);
        active.favorite_count = Set(tweet.favorite_count);
        active.in_reply_to_user_id = Set(tweet.in_reply_to_user_id);
        active.is_retweet = Set(tweet.is_retweet);

        Ok(Some(active.update(&self.conn).await?))
    }

    /// Apply a partial update to an existing tweet
    pub async fn patch_tweet(&self, id: i32, changes: TweetChanges) -> Result<Option<Tweet>> {
        let Some(existing) = self.find_tweet(id).await? else {
            return Ok(None);
        };

        let mut active: TweetActiveModel = existing.into();
        if let Some(source) = changes.source {
            active.source = Set(source);
        }
        if let Some(external_id) = changes.external_id {
            active.external_id = Set(external_id);
        }
        if let Some(text) = changes.text {
            active.text = Set(text);
        }
        if let Some(created_at) = changes.created_at {
            active.created_at = Set(created_at);
        }
        if let Some(retweet_count) = changes.retweet_count {
            active.retweet_count = Set(retweet_count);
        }
        if let Some(favorite_count) = changes.favorite_count {
            active.favorite_count = Set(favorite_count);
        }
        if let Some(in_reply_to_user_id) = changes.in_reply_to_user_id {
            active.in_reply_to_user_id = Set(in_reply_to_user_id);
        }
        if let Some(is_retweet) = changes.is_retweet {
            active.is_retweet = Set(is_retweet);
        }

        Ok(Some(active.update(&self.conn).await?))
    }

    /// Delete a tweet. Annotations referencing it go with it (FK cascade).
    /// Returns whether a row was deleted.
    pub async fn delete_tweet(&self, id: i32) -> Result<bool> {
        let result = TweetEntity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Annotation operations
    // ========================================================================

    /// All annotations with their tweet and (if set) author, in primary-key
    /// order. The tweet is read fresh here, never cached.
    pub async fn annotations_with_refs(&self) -> Result<Vec<(Annotation, Tweet, Option<User>)>> {
        let rows = AnnotationEntity::find()
            .find_also_related(TweetEntity)
            .order_by_asc(AnnotationColumn::Id)
            .all(&self.conn)
            .await?;

        let author_ids: Vec<i32> = rows
            .iter()
            .filter_map(|(annotation, _)| annotation.author_id)
            .collect();
        let authors: HashMap<i32, User> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            UserEntity::find()
                .filter(UserColumn::Id.is_in(author_ids))
                .all(&self.conn)
                .await?
                .into_iter()
                .map(|user| (user.id, user))
                .collect()
        };

        rows.into_iter()
            .map(|(annotation, tweet)| {
                let tweet = resolve_tweet(&annotation, tweet)?;
                let author = annotation
                    .author_id
                    .and_then(|author_id| authors.get(&author_id).cloned());
                Ok((annotation, tweet, author))
            })
            .collect()
    }

    /// One annotation with its tweet and author
    pub async fn annotation_with_refs(
        &self,
        id: i32,
    ) -> Result<Option<(Annotation, Tweet, Option<User>)>> {
        let Some((annotation, tweet)) = AnnotationEntity::find_by_id(id)
            .find_also_related(TweetEntity)
            .one(&self.conn)
            .await?
        else {
            return Ok(None);
        };

        let author = match annotation.author_id {
            Some(author_id) => self.find_user(author_id).await?,
            None => None,
        };
        let tweet = resolve_tweet(&annotation, tweet)?;

        Ok(Some((annotation, tweet, author)))
    }

    /// Create an annotation. `publish_date` is assigned here, and the author
    /// starts unset (it is not client-writable).
    pub async fn insert_annotation(&self, tweet_id: i32, text: String) -> Result<Annotation> {
        let annotation = AnnotationActiveModel {
            tweet_id: Set(tweet_id),
            annotation: Set(text),
            author_id: Set(None),
            publish_date: Set(chrono::Utc::now().into()),
            ..Default::default()
        };
        annotation.insert(&self.conn).await.map_err(Into::into)
    }

    /// Apply changes to an annotation. `publish_date` is never touched.
    pub async fn update_annotation(
        &self,
        id: i32,
        changes: AnnotationChanges,
    ) -> Result<Option<Annotation>> {
        let Some(existing) = AnnotationEntity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: AnnotationActiveModel = existing.into();
        if let Some(tweet_id) = changes.tweet_id {
            active.tweet_id = Set(tweet_id);
        }
        if let Some(text) = changes.annotation {
            active.annotation = Set(text);
        }

        Ok(Some(active.update(&self.conn).await?))
    }

    /// Assign or clear an annotation's author
    pub async fn set_annotation_author(
        &self,
        id: i32,
        author_id: Option<i32>,
    ) -> Result<Option<Annotation>> {
        let Some(existing) = AnnotationEntity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: AnnotationActiveModel = existing.into();
        active.author_id = Set(author_id);

        Ok(Some(active.update(&self.conn).await?))
    }

    /// Delete an annotation. Returns whether a row was deleted.
    pub async fn delete_annotation(&self, id: i32) -> Result<bool> {
        let result = AnnotationEntity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // User operations
    // ========================================================================

    pub async fn create_user(
        &self,
        first_name: String,
        last_name: String,
        email: String,
    ) -> Result<User> {
        let user = UserActiveModel {
            first_name: Set(first_name),
            last_name: Set(last_name),
            email: Set(email),
            ..Default::default()
        };
        user.insert(&self.conn).await.map_err(Into::into)
    }

    pub async fn find_user(&self, id: i32) -> Result<Option<User>> {
        UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .map_err(Into::into)
    }

    /// Delete a user. Annotations they authored survive with the author
    /// reference cleared (FK set-null).
    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        let result = UserEntity::delete_by_id(id).exec(&self.conn).await?;
        Ok(result.rows_affected > 0)
    }
}
