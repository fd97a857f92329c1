//! End-to-end tests for the REST API, the snapshot files, and the bulk
//! loader, driven through the real router against in-memory SQLite.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use sea_orm::{ConnectOptions, Database};
use tower::ServiceExt;

use tweetvault::config::AppConfig;
use tweetvault::db::{self, Repository};
use tweetvault::loader;
use tweetvault::routes::{create_router, AppState};
use tweetvault::snapshots::{
    Materializer, NoopHook, SnapshotHook, ANNOTATIONS_FILE, RECENT_TWEETS_FILE,
};

async fn setup() -> (axum::Router, Repository, tempfile::TempDir) {
    // A single pooled connection keeps the in-memory database alive and
    // visible to every query.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1);
    let conn = Database::connect(opts).await.unwrap();
    db::ensure_schema(&conn).await.unwrap();
    let repo = Repository::new(conn);

    let dir = tempfile::tempdir().unwrap();
    let hook: Arc<dyn SnapshotHook> =
        Arc::new(Materializer::new(repo.clone(), dir.path().to_path_buf()));

    let state = AppState {
        config: Arc::new(AppConfig::default()),
        repo: repo.clone(),
        hook,
    };

    (create_router(state), repo, dir)
}

async fn call(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let body = match body {
        Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
        None => Body::empty(),
    };
    let req = builder.body(body).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        serde_json::json!(null)
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::json!(null))
    };
    (status, json)
}

fn tweet_body(i: i32) -> serde_json::Value {
    serde_json::json!({
        "source": "Twitter Web Client",
        "external_id": format!("10000{i}"),
        "text": format!("tweet number {i}"),
        "created_at": format!("2020-03-01T10:{:02}:{:02}Z", i / 60, i % 60),
        "retweet_count": 0,
        "favorite_count": 0,
    })
}

fn read_snapshot(dir: &tempfile::TempDir, name: &str) -> serde_json::Value {
    let raw = std::fs::read_to_string(dir.path().join(name)).unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ── Tweets ──

#[tokio::test]
async fn create_tweet_appears_in_listing_and_snapshot() {
    let (router, _repo, dir) = setup().await;

    let (status, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["text"], "tweet number 1");
    assert_eq!(created["is_retweet"], false);

    let (status, listed) = call(&router, "GET", "/api/tweets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["external_id"], "100001");

    let snapshot = read_snapshot(&dir, RECENT_TWEETS_FILE);
    let tweets = snapshot.as_array().unwrap();
    assert_eq!(tweets.len(), 1);
    assert_eq!(tweets[0]["text"], "tweet number 1");
}

#[tokio::test]
async fn snapshot_holds_the_fifty_most_recent_tweets() {
    let (router, _repo, dir) = setup().await;

    for i in 1..=51 {
        let (status, _) = call(&router, "POST", "/api/tweets", Some(tweet_body(i))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let snapshot = read_snapshot(&dir, RECENT_TWEETS_FILE);
    let tweets = snapshot.as_array().unwrap();
    assert_eq!(tweets.len(), 50);

    // Newest first, and the oldest of the 51 is evicted.
    assert_eq!(tweets[0]["text"], "tweet number 51");
    assert_eq!(tweets[49]["text"], "tweet number 2");
    assert!(!tweets
        .iter()
        .any(|t| t["text"] == "tweet number 1"));

    let timestamps: Vec<&str> = tweets
        .iter()
        .map(|t| t["created_at"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(timestamps, sorted);
}

#[tokio::test]
async fn tweet_update_republishes_the_snapshot() {
    let (router, _repo, dir) = setup().await;

    let (_, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = call(
        &router,
        "PATCH",
        &format!("/api/tweets/{id}"),
        Some(serde_json::json!({"text": "edited text"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["text"], "edited text");

    let snapshot = read_snapshot(&dir, RECENT_TWEETS_FILE);
    assert_eq!(snapshot[0]["text"], "edited text");
}

#[tokio::test]
async fn tweet_delete_leaves_the_snapshot_stale() {
    // Deletes do not republish; the file keeps its last written content.
    let (router, _repo, dir) = setup().await;

    let (_, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    let id = created["id"].as_i64().unwrap();

    let (status, _) = call(&router, "DELETE", &format!("/api/tweets/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let snapshot = read_snapshot(&dir, RECENT_TWEETS_FILE);
    assert_eq!(snapshot.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn tweet_validation_rejects_without_side_effects() {
    let (router, repo, dir) = setup().await;

    // Missing required field
    let (status, _) = call(
        &router,
        "POST",
        "/api/tweets",
        Some(serde_json::json!({
            "source": "Twitter Web Client",
            "external_id": "1",
            "created_at": "2020-03-01T10:00:00Z",
            "retweet_count": 0,
            "favorite_count": 0,
        })),
    )
    .await;
    assert!(status.is_client_error());

    // Negative count
    let mut body = tweet_body(1);
    body["retweet_count"] = serde_json::json!(-1);
    let (status, err) = call(&router, "POST", "/api/tweets", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["error"]["message"].as_str().unwrap().contains("retweet_count"));

    // No store mutation, no snapshot write
    assert!(repo.list_tweets().await.unwrap().is_empty());
    assert!(!dir.path().join(RECENT_TWEETS_FILE).exists());
}

#[tokio::test]
async fn tweet_not_found_is_404() {
    let (router, _repo, _dir) = setup().await;

    let (status, _) = call(&router, "GET", "/api/tweets/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&router, "PUT", "/api/tweets/999", Some(tweet_body(1))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&router, "DELETE", "/api/tweets/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Annotations ──

#[tokio::test]
async fn annotation_lifecycle_and_snapshot_shape() {
    let (router, _repo, dir) = setup().await;

    let (_, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    let tweet_id = created["id"].as_i64().unwrap();

    let (status, annotation) = call(
        &router,
        "POST",
        "/api/annotations",
        Some(serde_json::json!({"tweet": tweet_id, "annotation": "worth a note"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(annotation["annotation"], "worth a note");
    assert_eq!(annotation["tweet"]["id"].as_i64().unwrap(), tweet_id);
    assert!(annotation["author"].is_null());
    assert!(annotation["publish_date"].is_string());
    // The API shape exposes no internal id
    assert!(annotation.get("id").is_none());

    let snapshot = read_snapshot(&dir, ANNOTATIONS_FILE);
    let entries = snapshot.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["annotation"], "worth a note");
    assert_eq!(entries[0]["tweet"]["text"], "tweet number 1");
    // Snapshot references the author by id (or null), never embedded
    assert!(entries[0]["author"].is_null());
    assert!(entries[0]["publish_date"].is_string());
}

#[tokio::test]
async fn annotation_embeds_the_current_tweet_at_read_time() {
    let (router, _repo, _dir) = setup().await;

    let (_, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    let tweet_id = created["id"].as_i64().unwrap();
    call(
        &router,
        "POST",
        "/api/annotations",
        Some(serde_json::json!({"tweet": tweet_id, "annotation": "note"})),
    )
    .await;

    call(
        &router,
        "PATCH",
        &format!("/api/tweets/{tweet_id}"),
        Some(serde_json::json!({"text": "rewritten later"})),
    )
    .await;

    let (_, listed) = call(&router, "GET", "/api/annotations", None).await;
    assert_eq!(listed[0]["tweet"]["text"], "rewritten later");
}

#[tokio::test]
async fn publish_date_is_server_assigned_and_immutable() {
    let (router, repo, _dir) = setup().await;

    let (_, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    let tweet_id = created["id"].as_i64().unwrap();

    // A client-supplied publish_date is ignored
    let (status, annotation) = call(
        &router,
        "POST",
        "/api/annotations",
        Some(serde_json::json!({
            "tweet": tweet_id,
            "annotation": "note",
            "publish_date": "1999-01-01T00:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let assigned = annotation["publish_date"].as_str().unwrap().to_string();
    assert!(!assigned.starts_with("1999"));

    let annotation_id = repo.annotations_with_refs().await.unwrap()[0].0.id;
    let (status, updated) = call(
        &router,
        "PUT",
        &format!("/api/annotations/{annotation_id}"),
        Some(serde_json::json!({"tweet": tweet_id, "annotation": "revised"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["annotation"], "revised");
    assert_eq!(updated["publish_date"].as_str().unwrap(), assigned);
}

#[tokio::test]
async fn annotation_write_against_missing_tweet_is_rejected() {
    let (router, repo, _dir) = setup().await;

    let (status, err) = call(
        &router,
        "POST",
        "/api/annotations",
        Some(serde_json::json!({"tweet": 42, "annotation": "orphan"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["error"]["field"], "tweet");
    assert!(repo.annotations_with_refs().await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_tweet_cascades_to_its_annotations() {
    let (router, repo, _dir) = setup().await;

    let (_, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    let tweet_id = created["id"].as_i64().unwrap();
    call(
        &router,
        "POST",
        "/api/annotations",
        Some(serde_json::json!({"tweet": tweet_id, "annotation": "doomed"})),
    )
    .await;
    assert_eq!(repo.annotations_with_refs().await.unwrap().len(), 1);

    let (status, _) = call(&router, "DELETE", &format!("/api/tweets/{tweet_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, listed) = call(&router, "GET", "/api/annotations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleting_an_author_clears_the_reference_but_keeps_the_annotation() {
    let (router, repo, _dir) = setup().await;

    let (_, created) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    let tweet_id = created["id"].as_i64().unwrap();
    call(
        &router,
        "POST",
        "/api/annotations",
        Some(serde_json::json!({"tweet": tweet_id, "annotation": "signed note"})),
    )
    .await;

    let user = repo
        .create_user("Ada".into(), "Lovelace".into(), "ada@example.com".into())
        .await
        .unwrap();
    let annotation_id = repo.annotations_with_refs().await.unwrap()[0].0.id;
    repo.set_annotation_author(annotation_id, Some(user.id))
        .await
        .unwrap()
        .unwrap();

    let (_, listed) = call(&router, "GET", "/api/annotations", None).await;
    assert_eq!(listed[0]["author"]["email"], "ada@example.com");

    assert!(repo.delete_user(user.id).await.unwrap());

    let (_, listed) = call(&router, "GET", "/api/annotations", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(listed[0]["author"].is_null());
    assert_eq!(listed[0]["annotation"], "signed note");
}

#[tokio::test]
async fn annotation_not_found_is_404() {
    let (router, _repo, _dir) = setup().await;

    let (status, _) = call(&router, "GET", "/api/annotations/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&router, "DELETE", "/api/annotations/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Bulk loader ──

fn export_record(id: i32, text: &str) -> serde_json::Value {
    serde_json::json!({
        "source": "Twitter for iPhone",
        "id_str": format!("{id}"),
        "text": text,
        "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        "retweet_count": 3,
        "in_reply_to_user_id_str": null,
        "favorite_count": 7,
        "is_retweet": false,
    })
}

#[tokio::test]
async fn loader_is_idempotent_over_repeated_runs() {
    let (_router, repo, _dir) = setup().await;

    let import_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        import_dir.path().join("export.json"),
        serde_json::to_string(&serde_json::json!([
            export_record(1, "first"),
            export_record(2, "second"),
        ]))
        .unwrap(),
    )
    .unwrap();

    let stats = loader::run(&repo, import_dir.path()).await.unwrap();
    assert_eq!(stats.inserted, 2);
    assert_eq!(stats.skipped, 0);

    let stats = loader::run(&repo, import_dir.path()).await.unwrap();
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.skipped, 2);

    assert_eq!(repo.list_tweets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn loader_inserts_changed_records_as_new_rows() {
    // Same external id with a different favorite_count is not the same
    // record: the match is on the full tuple.
    let (_router, repo, _dir) = setup().await;

    let import_dir = tempfile::tempdir().unwrap();
    let mut record = export_record(1, "first");
    std::fs::write(
        import_dir.path().join("export.json"),
        serde_json::to_string(&serde_json::json!([record])).unwrap(),
    )
    .unwrap();
    loader::run(&repo, import_dir.path()).await.unwrap();

    record["favorite_count"] = serde_json::json!(8);
    std::fs::write(
        import_dir.path().join("export.json"),
        serde_json::to_string(&serde_json::json!([record])).unwrap(),
    )
    .unwrap();
    let stats = loader::run(&repo, import_dir.path()).await.unwrap();
    assert_eq!(stats.inserted, 1);

    assert_eq!(repo.list_tweets().await.unwrap().len(), 2);
}

#[tokio::test]
async fn loader_aborts_on_a_malformed_file_but_keeps_earlier_inserts() {
    let (_router, repo, _dir) = setup().await;

    let import_dir = tempfile::tempdir().unwrap();
    std::fs::write(
        import_dir.path().join("a.json"),
        serde_json::to_string(&serde_json::json!([export_record(1, "kept")])).unwrap(),
    )
    .unwrap();
    std::fs::write(import_dir.path().join("b.json"), "not json at all").unwrap();

    let err = loader::run(&repo, import_dir.path()).await.unwrap_err();
    assert!(err.to_string().contains("b.json"));

    // Files run in name order; a.json's rows stay.
    assert_eq!(repo.list_tweets().await.unwrap().len(), 1);
}

#[tokio::test]
async fn loader_aborts_on_an_unparseable_date() {
    let (_router, repo, _dir) = setup().await;

    let import_dir = tempfile::tempdir().unwrap();
    let mut record = export_record(1, "bad date");
    record["created_at"] = serde_json::json!("2018-10-10");
    std::fs::write(
        import_dir.path().join("export.json"),
        serde_json::to_string(&serde_json::json!([record])).unwrap(),
    )
    .unwrap();

    let err = loader::run(&repo, import_dir.path()).await.unwrap_err();
    assert!(err.to_string().contains("created_at"));
    assert!(repo.list_tweets().await.unwrap().is_empty());
}

#[tokio::test]
async fn hook_is_injectable_and_writes_nothing_when_substituted() {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1);
    let conn = Database::connect(opts).await.unwrap();
    db::ensure_schema(&conn).await.unwrap();
    let repo = Repository::new(conn);

    let dir = tempfile::tempdir().unwrap();
    let hook: Arc<dyn SnapshotHook> = Arc::new(NoopHook);
    let state = AppState {
        config: Arc::new(AppConfig::default()),
        repo: repo.clone(),
        hook,
    };
    let router = create_router(state);

    let (status, _) = call(&router, "POST", "/api/tweets", Some(tweet_body(1))).await;
    assert_eq!(status, StatusCode::CREATED);

    // The write committed, but no snapshot file was produced.
    assert_eq!(repo.list_tweets().await.unwrap().len(), 1);
    assert!(!dir.path().join(RECENT_TWEETS_FILE).exists());
}

// ── Health ──

#[tokio::test]
async fn health_and_readiness_probes() {
    let (router, _repo, _dir) = setup().await;

    let (status, body) = call(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = call(&router, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["database"]["status"], "up");
}
