//! Controller for webhook submissions from producers.
//!
//! Each submission is relayed to whichever stream consumer takes it first.

use crate::params::webhook::WebhookParams;
use crate::{AppState, Error};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use log::*;
use relay::Submission;
use serde::Serialize;

/// Response for webhook acknowledgment
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
}

impl WebhookResponse {
    fn received() -> Self {
        Self {
            message: "Message received successfully",
        }
    }
}

/// POST /webhook
///
/// Queues the posted message for delivery to a stream consumer. Waits up to
/// the configured submission timeout for queue space before answering 503.
pub async fn receive(
    State(app_state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    let params = WebhookParams::from_body(&body)?;
    let message = params.into_message();

    trace!("Submitting webhook message: {message}");

    match app_state.submission_gate.submit(message).await {
        Submission::Success => Ok((StatusCode::OK, Json(WebhookResponse::received()))),
        Submission::Busy => Err(Error::busy()),
    }
}
