//! Structured logging and request correlation middleware for Actix Web.
//!
//! This crate has two tightly-coupled halves. The logging half renders
//! arbitrary key/value records into one line of output, either a colorized
//! terminal form or a plain machine-parsable form, through an immutable
//! [`LogContext`] tree: the base context is created once at startup and
//! every request-scoped context is derived from it by copy-on-extend, so
//! concurrent requests can never observe each other's fields. The
//! correlation half is the [`RequestLogger`] middleware: it establishes or
//! continues a W3C-style trace identity, assigns a request id, and brackets
//! every request with structured `Request Received` / `request completed`
//! records carrying the final status and latency.
//!
//! # Usage
//!
//! Build the base context once, then register [`RequestLogger`] using
//! `.wrap` on `App`:
//!
//! ```no_run
//! use actix_request_log::{Logger, RequestLogger};
//! use actix_web::{get, App, HttpServer};
//!
//! #[get("/")]
//! async fn index() -> &'static str {
//!     "Hello"
//! }
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let log = Logger::new("user-service", "1.0.0", false);
//!     log.info("service started");
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .wrap(RequestLogger::new(log.clone()))
//!             .service(index)
//!     })
//!     .bind(("127.0.0.1", 8080))?
//!     .run()
//!     .await
//! }
//! ```
//!
//! Handlers retrieve the request-scoped pieces with extractors:
//! [`RequestLog`] for the derived log context, [`RequestId`] for the
//! correlation id, and [`TraceContext`] for the trace identity.
//!
//! # Propagation
//!
//! The middleware reads `traceparent`, `tracestate` and `x-request-id` from
//! the inbound request. Missing or malformed values degrade to freshly
//! generated ones; a bad header never fails a request. The response always
//! carries `x-request-id` and `traceparent`, and echoes `tracestate` only
//! when one was supplied inbound.

#![forbid(unsafe_code)]
#![warn(future_incompatible, missing_docs, missing_debug_implementations)]

mod color;
mod context;
mod formatter;
mod level;
mod logger;
mod middleware;
mod record;
mod request_id;
mod request_log;
mod response;
mod sink;
mod trace;
mod value;

pub use crate::color::ColorScheme;
pub use crate::context::LogContext;
pub use crate::formatter::{Formatter, DEFAULT_TIMESTAMP_FORMAT};
pub use crate::level::Level;
pub use crate::logger::Logger;
pub use crate::middleware::{RequestLogger, RequestLoggerMiddleware};
pub use crate::record::{FieldMap, Record};
pub use crate::request_id::{RequestId, RequestIdExtractionError};
pub use crate::request_log::{RequestLog, RequestLogExtractionError};
pub use crate::response::StatusRecorder;
pub use crate::sink::LogSink;
pub use crate::trace::{
    TraceContext, TraceContextExtractionError, REQUEST_ID_HEADER, TRACEPARENT_HEADER,
    TRACESTATE_HEADER,
};
pub use crate::value::FieldValue;
