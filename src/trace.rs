use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpMessage, HttpRequest, ResponseError};
use uuid::Uuid;

/// W3C trace context propagation header.
pub const TRACEPARENT_HEADER: &str = "traceparent";
/// Opaque vendor trace state header, passed through untouched.
pub const TRACESTATE_HEADER: &str = "tracestate";
/// Request correlation id header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The trace identity of an in-flight request.
///
/// Either continued from an inbound `traceparent` header or freshly started.
/// Once established for a request it never changes. The identity only
/// correlates log lines; there is no span export or sampling machinery
/// behind it.
///
/// Extracting a `TraceContext` when the `RequestLogger` middleware is not
/// registered will result in an internal server error.
///
/// # Usage
/// ```rust
/// use actix_web::get;
/// use actix_request_log::TraceContext;
///
/// #[get("/")]
/// async fn index(trace: TraceContext) -> String {
///     format!("{}", trace.trace_id())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct TraceContext {
    trace_id: String,
    span_id: String,
    sampled: bool,
}

impl TraceContext {
    /// Starts a fresh, sampled trace with random identifiers.
    pub fn start() -> Self {
        let trace_id = Uuid::new_v4().simple().to_string();
        let mut span_id = Uuid::new_v4().simple().to_string();
        span_id.truncate(16);
        Self {
            trace_id,
            span_id,
            sampled: true,
        }
    }

    /// Continues a trace from a `traceparent` header value.
    ///
    /// The header is `version-traceid-spanid-flags`. Anything with fewer
    /// than four hyphen-delimited fields falls back to [`start`], silently;
    /// a malformed header never fails the request. Well-formed ids are
    /// taken verbatim, the incoming span becoming the parent context for
    /// this service's processing.
    ///
    /// [`start`]: TraceContext::start
    pub fn continue_from(header: &str) -> Self {
        let parts: Vec<&str> = header.split('-').collect();
        if parts.len() < 4 {
            return Self::start();
        }
        let sampled = u8::from_str_radix(parts[3], 16)
            .map(|flags| flags & 1 == 1)
            .unwrap_or(true);
        Self {
            trace_id: parts[1].to_owned(),
            span_id: parts[2].to_owned(),
            sampled,
        }
    }

    /// Resolves the trace identity for a request: continue when the header
    /// is present, start otherwise.
    pub(crate) fn from_headers(headers: &HeaderMap) -> Self {
        match headers
            .get(TRACEPARENT_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            Some(value) => Self::continue_from(value),
            None => Self::start(),
        }
    }

    /// The header value to propagate downstream, `00-<trace>-<span>-01`
    /// shaped (flags `00` when the trace is unsampled).
    pub fn traceparent(&self) -> String {
        format!(
            "00-{}-{}-{}",
            self.trace_id,
            self.span_id,
            if self.sampled { "01" } else { "00" }
        )
    }

    /// The 16-byte trace identifier, hex encoded.
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// The 8-byte span identifier, hex encoded.
    pub fn span_id(&self) -> &str {
        &self.span_id
    }

    /// Whether the trace is sampled.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }
}

impl FromRequest for TraceContext {
    type Error = TraceContextExtractionError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<TraceContext>()
                .cloned()
                .ok_or(TraceContextExtractionError { _priv: () }),
        )
    }
}

#[derive(Debug)]
/// Error returned by the [`TraceContext`] extractor when it fails to
/// retrieve the trace identity from request-local storage.
///
/// It only happens if you try to extract the trace identity without having
/// registered [`RequestLogger`] as a middleware for your application.
///
/// [`RequestLogger`]: crate::RequestLogger
pub struct TraceContextExtractionError {
    _priv: (),
}

impl ResponseError for TraceContextExtractionError {}

impl std::fmt::Display for TraceContextExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Failed to retrieve the trace identity from request-local storage."
        )
    }
}

impl std::error::Error for TraceContextExtractionError {}
