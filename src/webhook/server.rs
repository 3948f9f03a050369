//! Axum mount point for webhook dispatchers
//!
//! Providers deliver webhooks over plain HTTP; this router translates axum
//! requests into the framework-neutral [`WebhookRequest`] and back. Mount
//! one router per provider instance, e.g. under `/webhooks/{instance}`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use super::dispatcher::{WebhookDispatcher, WebhookRequest};

/// Build a router that feeds POSTs at `/` into the dispatcher
pub fn router(dispatcher: Arc<WebhookDispatcher>) -> Router {
    Router::new()
        .route("/", post(receive))
        .with_state(dispatcher)
}

async fn receive(
    State(dispatcher): State<Arc<WebhookDispatcher>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let mut header_map = HashMap::new();
    for (name, value) in headers.iter() {
        if let Ok(value) = value.to_str() {
            header_map.insert(name.as_str().to_string(), value.to_string());
        }
    }

    let request = WebhookRequest::new(body, header_map);
    let response = dispatcher.handle_request(&request).await;

    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut out_headers = HeaderMap::new();
    out_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            out_headers.insert(name, value);
        }
    }

    (status, out_headers, response.body).into_response()
}
