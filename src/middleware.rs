use std::future::{ready, Ready};
use std::time::Instant;

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage};
use futures_util::future::{FutureExt as _, LocalBoxFuture};

use crate::context::LogContext;
use crate::request_id::RequestId;
use crate::request_log::RequestLog;
use crate::response::StatusRecorder;
use crate::trace::{TraceContext, TRACEPARENT_HEADER, TRACESTATE_HEADER};
use crate::value::FieldValue;

/// `RequestLogger` is a middleware that correlates every log line emitted
/// during a request and brackets the request with structured records.
///
/// For each incoming request it resolves a [`RequestId`] and a
/// [`TraceContext`] from the propagation headers (generating fresh ones when
/// absent or malformed), derives a request-scoped [`RequestLog`] context
/// from the base context, and emits a debug record when the request arrives
/// and an info record with the final status and latency when it completes.
/// The identifiers are echoed on the response so clients and downstream
/// services can correlate.
///
/// # Usage
///
/// Register `RequestLogger` as a middleware for your application using
/// `.wrap` on `App`.
///
/// ```rust
/// use actix_request_log::{Logger, RequestLogger};
/// use actix_web::App;
///
/// let log = Logger::new("user-service", "1.0.0", false);
/// let app = App::new().wrap(RequestLogger::new(log.clone()));
/// ```
#[derive(Clone)]
pub struct RequestLogger {
    base: LogContext,
}

impl RequestLogger {
    /// Creates the middleware around the service-wide base context.
    pub fn new(base: LogContext) -> Self {
        Self { base }
    }
}

impl std::fmt::Debug for RequestLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestLogger")
            .field("base", &self.base)
            .finish()
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware {
            service,
            base: self.base.clone(),
        }))
    }
}

/// Service produced by [`RequestLogger`].
#[doc(hidden)]
#[derive(Debug)]
pub struct RequestLoggerMiddleware<S> {
    service: S,
    base: LogContext,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();

        let request_id = RequestId::from_headers(req.headers());
        let trace = TraceContext::from_headers(req.headers());
        let tracestate = req.headers().get(TRACESTATE_HEADER).cloned();

        let method = req.method().to_string();
        let path = req.path().to_owned();
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let content_length = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(0);
        let (remote_addr, client_ip) = {
            let info = req.connection_info();
            (
                info.peer_addr().unwrap_or_default().to_owned(),
                info.realip_remote_addr().unwrap_or_default().to_owned(),
            )
        };

        let context = self.base.with_fields([
            ("request_id", FieldValue::from(request_id.as_str())),
            ("trace_id", FieldValue::from(trace.trace_id())),
            ("span_id", FieldValue::from(trace.span_id())),
            ("method", FieldValue::from(method)),
            ("path", FieldValue::from(path)),
            ("remote_addr", FieldValue::from(remote_addr)),
            ("user_agent", FieldValue::from(user_agent)),
            ("content_length", FieldValue::from(content_length)),
        ]);

        req.extensions_mut().insert(request_id.clone());
        req.extensions_mut().insert(trace.clone());
        req.extensions_mut().insert(RequestLog::new(context.clone()));

        context.debug("Request Received");

        let recorder = StatusRecorder::new();
        let guard = CompletionGuard {
            context: context.clone(),
            recorder: recorder.clone(),
            started,
            client_ip,
        };

        let fut = self.service.call(req);
        async move {
            // The guard lives across the await: when downstream handling is
            // cancelled and this future is dropped, the completion record
            // still fires with whatever status was observed.
            let _guard = guard;
            match fut.await {
                Ok(mut res) => {
                    recorder.record(res.status());

                    let headers = res.headers_mut();
                    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
                        headers.insert(HeaderName::from_static("x-request-id"), value);
                    }
                    if let Ok(value) = HeaderValue::from_str(&trace.traceparent()) {
                        headers.insert(HeaderName::from_static(TRACEPARENT_HEADER), value);
                    }
                    // Never fabricated, only echoed.
                    if let Some(state) = tracestate {
                        headers.insert(HeaderName::from_static(TRACESTATE_HEADER), state);
                    }

                    Ok(res)
                }
                Err(err) => {
                    recorder.record(err.as_response_error().status_code());
                    Err(err)
                }
            }
        }
        .boxed_local()
    }
}

/// Emits the completion record when dropped, so it fires on normal returns,
/// error responses, and cancelled downstream handling alike.
struct CompletionGuard {
    context: LogContext,
    recorder: StatusRecorder,
    started: Instant,
    client_ip: String,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let latency = self.started.elapsed();
        self.context
            .with_fields([
                (
                    "status",
                    FieldValue::from(self.recorder.final_status().as_u16()),
                ),
                ("client_ip", FieldValue::from(self.client_ip.as_str())),
                ("latency", FieldValue::from(format!("{:?}", latency))),
            ])
            .info("request completed");
    }
}
