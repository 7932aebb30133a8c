//! Response helpers for pre-encoded JSON bodies.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// 200 with an already serialized JSON body.
pub fn json_ok(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}
