use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::*;

/// Body returned to a producer whose submission timed out waiting for queue space.
pub const BUSY_MESSAGE: &str = "Service busy, try again later";

pub type Result<T> = core::result::Result<T, Error>;

/// Errors surfaced by the web layer. Each kind maps to exactly one HTTP
/// status; nothing richer is ever returned to a caller.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: WebErrorKind,
}

#[derive(Debug, PartialEq)]
pub enum WebErrorKind {
    /// The request body could not be decoded.
    MalformedInput,
    /// The relay queue stayed full for the whole submission timeout.
    Busy,
}

impl Error {
    pub fn busy() -> Self {
        Self {
            source: None,
            error_kind: WebErrorKind::Busy,
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        match (&self.error_kind, &self.source) {
            (WebErrorKind::MalformedInput, Some(source)) => write!(fmt, "{source}"),
            (WebErrorKind::MalformedInput, None) => write!(fmt, "malformed request body"),
            (WebErrorKind::Busy, _) => write!(fmt, "{BUSY_MESSAGE}"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.error_kind {
            WebErrorKind::MalformedInput => {
                debug!("Rejecting malformed webhook body: {self}");
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            WebErrorKind::Busy => {
                (StatusCode::SERVICE_UNAVAILABLE, BUSY_MESSAGE).into_response()
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self {
            source: Some(Box::new(err)),
            error_kind: WebErrorKind::MalformedInput,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn malformed_input_maps_to_bad_request_with_parse_error_text() {
        let parse_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let expected = parse_error.to_string();

        let response = Error::from(parse_error).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, expected.as_bytes());
    }

    #[tokio::test]
    async fn busy_maps_to_service_unavailable() {
        let response = Error::busy().into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, BUSY_MESSAGE.as_bytes());
    }

    #[test]
    fn source_is_exposed_for_malformed_input() {
        let parse_error = serde_json::from_str::<serde_json::Value>("nope").unwrap_err();
        let error = Error::from(parse_error);

        assert_eq!(error.error_kind, WebErrorKind::MalformedInput);
        assert!(StdError::source(&error).is_some());
        assert!(StdError::source(&Error::busy()).is_none());
    }
}
