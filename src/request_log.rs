use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest, ResponseError};

use crate::context::LogContext;

#[derive(Clone, Debug)]
/// The request-scoped log context of the in-flight request.
///
/// It carries the base context's fields plus the request fields (method,
/// path, remote address, user agent, content length) and the correlation
/// identifiers, so every line a handler emits through it is correlated with
/// the middleware's own records.
///
/// Extracting a `RequestLog` when the `RequestLogger` middleware is not
/// registered will result in an internal server error.
///
/// # Usage
/// ```rust
/// use actix_web::get;
/// use actix_request_log::RequestLog;
///
/// #[get("/")]
/// async fn index(log: RequestLog) -> &'static str {
///     log.with_field("step", "lookup").debug("loading user");
///     "Hello"
/// }
/// ```
pub struct RequestLog(LogContext);

impl RequestLog {
    pub(crate) fn new(context: LogContext) -> Self {
        Self(context)
    }
}

impl std::ops::Deref for RequestLog {
    type Target = LogContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<RequestLog> for LogContext {
    fn from(log: RequestLog) -> Self {
        log.0
    }
}

impl FromRequest for RequestLog {
    type Error = RequestLogExtractionError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<RequestLog>()
                .cloned()
                .ok_or(RequestLogExtractionError { _priv: () }),
        )
    }
}

#[derive(Debug)]
/// Error returned by the [`RequestLog`] extractor when it fails to retrieve
/// the request-scoped log context from request-local storage.
///
/// It only happens if you try to extract the context without having
/// registered [`RequestLogger`] as a middleware for your application.
///
/// [`RequestLogger`]: crate::RequestLogger
pub struct RequestLogExtractionError {
    _priv: (),
}

impl ResponseError for RequestLogExtractionError {}

impl std::fmt::Display for RequestLogExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to retrieve the request log context from request-local storage."
        )
    }
}

impl std::error::Error for RequestLogExtractionError {}
