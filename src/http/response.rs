//! Response rendering.
//!
//! # Responsibilities
//! - Render the dispatch envelope as JSON with the request ID header
//! - Render validation failures as `400 {Error}`
//!
//! # Design Decisions
//! - Envelope responses are always `200`; the outcome lives in `Status`
//! - Rendering never fails; serialization errors degrade to a minimal envelope

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::dispatch::{Envelope, ValidationError};
use crate::http::request::{RequestId, X_REQUEST_ID};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    pub error: String,
}

pub fn bad_request(error: &ValidationError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
        .into_response()
}

pub fn envelope_response(envelope: &Envelope) -> Response {
    let request_id = RequestId::from(envelope.request_id);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, header::HeaderValue::from_static("application/json")),
            (header::HeaderName::from_static(X_REQUEST_ID), request_id.header_value()),
        ],
        envelope.to_json(),
    )
        .into_response()
}
