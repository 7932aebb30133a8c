//! Collection resource routes: one path per resource, resolved from the registry by name.
//! Methods other than GET, POST, PUT and DELETE answer 405 with an empty body.

use crate::handlers::resource::{create, delete, list, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn resource_routes(state: AppState) -> Router {
    Router::new()
        .route("/:resource", get(list).post(create).put(update).delete(delete))
        .with_state(state)
}
