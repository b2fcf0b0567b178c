use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpMessage, HttpRequest, ResponseError};
use uuid::Uuid;

use crate::trace::REQUEST_ID_HEADER;

/// The correlation identifier of an incoming request.
///
/// When the inbound request carries a non-empty `x-request-id` header the
/// value is echoed unchanged, so clients can correlate their own retries;
/// otherwise a fresh identifier is generated. It is independent of the trace
/// identity and exists purely for human-facing log correlation.
///
/// Extracting a `RequestId` when the `RequestLogger` middleware is not
/// registered will result in an internal server error.
///
/// # Usage
/// ```rust
/// use actix_web::get;
/// use actix_request_log::RequestId;
///
/// #[get("/")]
/// async fn index(request_id: RequestId) -> String {
///     format!("{}", request_id)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct RequestId(String);

impl RequestId {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| Self(value.to_owned()))
            .unwrap_or_else(Self::generate)
    }

    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::ops::Deref for RequestId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromRequest for RequestId {
    type Error = RequestIdExtractionError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RequestId>()
                .cloned()
                .ok_or(RequestIdExtractionError { _priv: () }),
        )
    }
}

#[derive(Debug)]
/// Error returned by the [`RequestId`] extractor when it fails to retrieve
/// the current request id from request-local storage.
///
/// It only happens if you try to extract the current request id without
/// having registered [`RequestLogger`] as a middleware for your application.
///
/// [`RequestLogger`]: crate::RequestLogger
pub struct RequestIdExtractionError {
    // A unit struct has a public constructor, so adding fields to it later
    // would be an API breaking change. The dummy private field keeps users
    // from constructing this error in their own code.
    _priv: (),
}

impl ResponseError for RequestIdExtractionError {}

impl std::fmt::Display for RequestIdExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to retrieve request id from request-local storage."
        )
    }
}

impl std::error::Error for RequestIdExtractionError {}
