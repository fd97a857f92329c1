//! HTTP routing
//!
//! The REST resources live under `/api`; health probes sit at the root.

pub mod annotations;
pub mod health;
pub mod tweets;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::Repository;
use crate::snapshots::SnapshotHook;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Repository,
    pub hook: Arc<dyn SnapshotHook>,
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/tweets", get(tweets::list).post(tweets::create))
        .route(
            "/tweets/{id}",
            get(tweets::retrieve)
                .put(tweets::update)
                .patch(tweets::partial_update)
                .delete(tweets::destroy),
        )
        .route(
            "/annotations",
            get(annotations::list).post(annotations::create),
        )
        .route(
            "/annotations/{id}",
            get(annotations::retrieve)
                .put(annotations::update)
                .patch(annotations::partial_update)
                .delete(annotations::destroy),
        );

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .with_state(state)
}
