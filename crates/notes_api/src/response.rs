//! Response contract shared by every handler.
//!
//! # Responsibility
//! - Map a success value to `204`, its own status or `200`, plus a JSON body.
//! - Map a [`Failure`] to a client-safe structured error envelope.
//!
//! # Invariants
//! - Unknown failures are logged with the caller location and replaced by an
//!   opaque `internal_server_error` body.
//! - Serialization failures are logged; the status is still sent.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use notes_core::{Error, ErrorWrapper, Logger, Note, User};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::io;
use tokio::task::JoinError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Response body that may override the default `200 OK`.
pub trait Reply: Serialize {
    fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }
}

impl Reply for User {}

impl Reply for Note {}

impl Reply for Vec<Note> {}

impl Reply for ErrorWrapper {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Wraps a freshly created resource so it is sent with `201 Created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Created<T>(pub T);

impl<T: Serialize> Reply for Created<T> {
    fn status_code(&self) -> StatusCode {
        StatusCode::CREATED
    }
}

/// Why a request could not be served.
#[derive(Debug)]
pub enum Failure {
    /// Client-facing error, sent as-is.
    Structured(Error),
    /// Input ended before a complete request body was read.
    Eof,
    /// Anything else; never shown to the client.
    Unknown(BoxError),
}

impl Failure {
    pub fn unknown(err: impl Into<BoxError>) -> Self {
        Self::Unknown(err.into())
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured(err) => write!(f, "{err}"),
            Self::Eof => write!(f, "unexpected end of file"),
            Self::Unknown(err) => write!(f, "{err}"),
        }
    }
}

impl From<Error> for Failure {
    fn from(value: Error) -> Self {
        Self::Structured(value)
    }
}

impl From<io::Error> for Failure {
    fn from(value: io::Error) -> Self {
        match value.kind() {
            io::ErrorKind::UnexpectedEof => Self::Eof,
            _ => Self::Unknown(Box::new(value)),
        }
    }
}

impl From<serde_json::Error> for Failure {
    fn from(value: serde_json::Error) -> Self {
        if value.is_eof() {
            return Self::Eof;
        }
        if value.is_io() {
            return Self::Unknown(Box::new(value));
        }
        Self::Structured(Error::new("invalid_request", value.to_string(), 400))
    }
}

impl From<JoinError> for Failure {
    fn from(value: JoinError) -> Self {
        Self::Unknown(Box::new(value))
    }
}

/// Builds responses for one request, logging through the request's logger.
#[derive(Debug, Clone, Default)]
pub struct Api {
    log: Logger,
}

impl Api {
    pub fn new(log: Logger) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &Logger {
        &self.log
    }

    /// Sends `body` as JSON, or `204 No Content` when there is nothing to send.
    #[track_caller]
    pub fn ok<T: Reply>(&self, body: Option<&T>) -> Response {
        let Some(body) = body else {
            return StatusCode::NO_CONTENT.into_response();
        };

        let status = body.status_code();
        let bytes = match serde_json::to_vec(body) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.log.error(
                    "json_marshal",
                    &[("status", &"error"), ("error", &err)],
                );
                Vec::new()
            }
        };

        let mut response = (status, bytes).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
        );
        response
    }

    /// Sends `failure` as an error envelope with the error's own status.
    #[track_caller]
    pub fn fail(&self, failure: impl Into<Failure>) -> Response {
        let error = match failure.into() {
            Failure::Structured(err) => err,
            Failure::Eof => Error::new("eof", "unexpected end of file", 400),
            Failure::Unknown(err) => {
                self.log.error(
                    "request_failed",
                    &[("status", &"error"), ("error", &err)],
                );
                Error::new("internal_server_error", "an unknown error occurred", 500)
            }
        };

        self.ok(Some(&ErrorWrapper::from(error)))
    }
}

#[cfg(test)]
mod tests {
    use super::{Api, Created, Failure, Reply};
    use axum::body::to_bytes;
    use axum::http::{header, StatusCode};
    use axum::response::Response;
    use notes_core::{Error, Logger, MemorySink};
    use serde::{Serialize, Serializer};
    use serde_json::{json, Value};
    use std::io;
    use std::sync::Arc;

    fn api() -> (Api, Arc<MemorySink>) {
        let sink = MemorySink::new();
        (Api::new(Logger::new(sink.clone())), sink)
    }

    async fn body(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    async fn json_body(response: Response) -> Value {
        serde_json::from_slice(&body(response).await).unwrap()
    }

    #[derive(Serialize)]
    struct Plain {
        name: &'static str,
    }

    impl Reply for Plain {}

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("cannot encode"))
        }
    }

    impl Reply for Broken {
        fn status_code(&self) -> StatusCode {
            StatusCode::ACCEPTED
        }
    }

    #[tokio::test]
    async fn absent_value_is_no_content_without_body() {
        let (api, _) = api();
        let response = api.ok::<Plain>(None);

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body(response).await.is_empty());
    }

    #[tokio::test]
    async fn plain_value_is_ok_json() {
        let (api, _) = api();
        let response = api.ok(Some(&Plain { name: "alice" }));

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );
        assert_eq!(json_body(response).await, json!({"name": "alice"}));
    }

    #[tokio::test]
    async fn created_value_uses_status_override() {
        let (api, _) = api();
        let response = api.ok(Some(&Created(Plain { name: "alice" })));

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await, json!({"name": "alice"}));
    }

    #[tokio::test]
    async fn serialization_failure_is_logged_and_status_still_sent() {
        let (api, sink) = api();
        let response = api.ok(Some(&Broken));

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(body(response).await.is_empty());
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, "json_marshal");
    }

    #[tokio::test]
    async fn eof_maps_to_bad_request() {
        let (api, sink) = api();
        let response = api.fail(io::Error::from(io::ErrorKind::UnexpectedEof));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = json_body(response).await;
        assert_eq!(value["error"]["code"], "eof");
        assert_eq!(value["error"]["message"], "unexpected end of file");
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn structured_error_is_sent_verbatim() {
        let (api, sink) = api();
        let error = Error::new("not_found", "note not found", 404).with_field("id");
        let response = api.fail(error);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({"error": {
                "code": "not_found",
                "field": "id",
                "message": "note not found",
                "status": 404,
            }})
        );
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn structured_error_without_status_defaults_to_500() {
        let (api, _) = api();
        let response = api.fail(Error::new("broken", "", 0));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({"error": {"code": "broken"}}));
    }

    #[tokio::test]
    async fn unknown_error_is_hidden_and_logged_at_call_site() {
        let (api, sink) = api();
        let line = line!() + 1;
        let response = api.fail(Failure::unknown("disk on fire"));

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let value = json_body(response).await;
        assert_eq!(value["error"]["code"], "internal_server_error");
        assert_eq!(value["error"]["message"], "an unknown error occurred");
        assert!(!value.to_string().contains("disk on fire"));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, log::Level::Error);
        assert_eq!(records[0].event, "request_failed");
        assert_eq!(records[0].field("error"), Some("disk on fire"));
        assert_eq!(
            records[0].caller,
            format!("response.rs:{line}")
        );
    }

    #[test]
    fn other_io_errors_are_unknown() {
        let failure = Failure::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(failure, Failure::Unknown(_)));
    }

    #[test]
    fn truncated_json_is_eof_and_malformed_json_is_invalid_request() {
        let truncated = serde_json::from_slice::<Value>(br#"{"title": "#).unwrap_err();
        assert!(matches!(Failure::from(truncated), Failure::Eof));

        let malformed = serde_json::from_slice::<Value>(br#"{"title" 1}"#).unwrap_err();
        match Failure::from(malformed) {
            Failure::Structured(err) => {
                assert_eq!(err.code, "invalid_request");
                assert_eq!(err.status, 400);
            }
            other => panic!("unexpected failure: {other}"),
        }
    }
}
