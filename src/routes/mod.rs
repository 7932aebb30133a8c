//! Router assembly.

mod common;
mod resource;

pub use common::{common_routes, common_routes_with_ready};
pub use resource::resource_routes;

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Full application: health routes at the root, resources under `/api/v1`.
/// `body_limit_bytes` replaces axum's default extractor limit as well as bounding the stream.
pub fn app(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/api/v1", resource_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(body_limit_bytes))
                .layer(DefaultBodyLimit::max(body_limit_bytes)),
        )
}
