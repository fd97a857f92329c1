//! Wire-shape projections
//!
//! Pure mappings from stored models to the JSON shapes served by the API
//! and written into the snapshot files. Keeping them in one place means a
//! tweet serializes identically everywhere it appears, embedded or not.

use serde::{Deserialize, Serialize};

use crate::db::models::{Annotation, Tweet, User};

/// A tweet with every stored field, timestamps as RFC 3339
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetView {
    pub id: i32,
    pub source: String,
    pub external_id: String,
    pub text: String,
    pub created_at: String,
    pub retweet_count: i32,
    pub favorite_count: i32,
    pub in_reply_to_user_id: Option<String>,
    pub is_retweet: bool,
}

impl From<&Tweet> for TweetView {
    fn from(tweet: &Tweet) -> Self {
        Self {
            id: tweet.id,
            source: tweet.source.clone(),
            external_id: tweet.external_id.clone(),
            text: tweet.text.clone(),
            created_at: tweet.created_at.to_rfc3339(),
            retweet_count: tweet.retweet_count,
            favorite_count: tweet.favorite_count,
            in_reply_to_user_id: tweet.in_reply_to_user_id.clone(),
            is_retweet: tweet.is_retweet,
        }
    }
}

/// The author fields the annotation wire shape exposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorView {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for AuthorView {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// An annotation as served by the API: the tweet is embedded in full,
/// the author (when present) as name and email. No internal id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationView {
    pub tweet: TweetView,
    pub annotation: String,
    pub author: Option<AuthorView>,
    pub publish_date: String,
}

impl AnnotationView {
    pub fn new(annotation: &Annotation, tweet: &Tweet, author: Option<&User>) -> Self {
        Self {
            tweet: TweetView::from(tweet),
            annotation: annotation.annotation.clone(),
            author: author.map(AuthorView::from),
            publish_date: annotation.publish_date.to_rfc3339(),
        }
    }
}

/// An annotation as written into the snapshot file: the tweet is embedded
/// in full, the author only as an id reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSnapshotView {
    pub tweet: TweetView,
    pub annotation: String,
    pub author: Option<i32>,
    pub publish_date: String,
}

impl AnnotationSnapshotView {
    pub fn new(annotation: &Annotation, tweet: &Tweet) -> Self {
        Self {
            tweet: TweetView::from(tweet),
            annotation: annotation.annotation.clone(),
            author: annotation.author_id,
            publish_date: annotation.publish_date.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_tweet() -> Tweet {
        Tweet {
            id: 1,
            source: "Twitter Web Client".into(),
            external_id: "1050118621198921728".into(),
            text: "To make room for more expression, we will now count all emojis as equal".into(),
            created_at: chrono::Utc.with_ymd_and_hms(2018, 10, 10, 20, 19, 24).unwrap().into(),
            retweet_count: 12,
            favorite_count: 42,
            in_reply_to_user_id: None,
            is_retweet: false,
        }
    }

    #[test]
    fn tweet_view_carries_every_field() {
        let view = TweetView::from(&sample_tweet());
        assert_eq!(view.id, 1);
        assert_eq!(view.external_id, "1050118621198921728");
        assert_eq!(view.created_at, "2018-10-10T20:19:24+00:00");
        assert!(!view.is_retweet);
    }

    #[test]
    fn annotation_view_embeds_tweet_and_author() {
        let tweet = sample_tweet();
        let annotation = Annotation {
            id: 3,
            tweet_id: tweet.id,
            annotation: "context on the emoji change".into(),
            author_id: Some(5),
            publish_date: chrono::Utc.with_ymd_and_hms(2019, 1, 2, 3, 4, 5).unwrap().into(),
        };
        let user = User {
            id: 5,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
        };

        let view = AnnotationView::new(&annotation, &tweet, Some(&user));
        assert_eq!(view.tweet.text, tweet.text);
        assert_eq!(view.author.as_ref().unwrap().email, "ada@example.com");
        assert_eq!(view.publish_date, "2019-01-02T03:04:05+00:00");

        let without_author = AnnotationView::new(&annotation, &tweet, None);
        assert!(without_author.author.is_none());
    }

    #[test]
    fn snapshot_view_references_author_by_id() {
        let tweet = sample_tweet();
        let annotation = Annotation {
            id: 3,
            tweet_id: tweet.id,
            annotation: "context".into(),
            author_id: Some(5),
            publish_date: chrono::Utc.with_ymd_and_hms(2019, 1, 2, 3, 4, 5).unwrap().into(),
        };

        let view = AnnotationSnapshotView::new(&annotation, &tweet);
        assert_eq!(view.author, Some(5));
        assert_eq!(view.tweet.id, tweet.id);
    }
}
