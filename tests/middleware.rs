use std::io;
use std::sync::{Arc, Mutex};

use actix_request_log::{
    Logger, LogSink, RequestId, RequestLog, RequestLogger, TraceContext,
};
use actix_web::dev::{fn_service, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::{error, web, App, Error, HttpResponse};
use regex::Regex;

/// Collects rendered log lines so assertions can read them back.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogSink for SharedBuf {}

fn test_logger(buf: &SharedBuf) -> RequestLogger {
    let base = Logger::builder()
        .service("svc")
        .version("1.0.0")
        .sink(buf.clone())
        .build();
    RequestLogger::new(base)
}

fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.split(' ')
        .find_map(|pair| pair.strip_prefix(&format!("{key}:")))
}

#[actix_web::test]
async fn generates_correlation_headers_and_brackets_the_request() {
    let buf = SharedBuf::default();
    let svc = test_logger(&buf)
        .new_transform(test::ok_service())
        .await
        .unwrap();

    let res = test::call_service(&svc, TestRequest::get().to_srv_request()).await;

    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("x-request-id header missing");
    let uuid_re =
        Regex::new("^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap();
    assert!(uuid_re.is_match(request_id), "{request_id}");

    let traceparent = res
        .headers()
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .expect("traceparent header missing");
    let traceparent_re = Regex::new("^00-[0-9a-f]{32}-[0-9a-f]{16}-01$").unwrap();
    assert!(traceparent_re.is_match(traceparent), "{traceparent}");

    // Only echoed, never fabricated.
    assert!(res.headers().get("tracestate").is_none());

    let lines = buf.lines();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert_eq!(field(&lines[0], "level"), Some("debug"), "{}", lines[0]);
    assert!(lines[0].contains("msg:\"Request Received\""), "{}", lines[0]);
    assert_eq!(field(&lines[0], "method"), Some("GET"), "{}", lines[0]);
    assert_eq!(field(&lines[0], "path"), Some("\"/\""), "{}", lines[0]);

    assert_eq!(field(&lines[1], "level"), Some("info"), "{}", lines[1]);
    assert!(lines[1].contains("msg:\"request completed\""), "{}", lines[1]);
    assert_eq!(field(&lines[1], "status"), Some("\"200\""), "{}", lines[1]);
    assert!(field(&lines[1], "latency").is_some(), "{}", lines[1]);

    // Both records share the generated identity.
    let trace_id = traceparent.split('-').nth(1).unwrap();
    for line in &lines {
        assert_eq!(field(line, "request_id"), Some(request_id), "{line}");
        assert_eq!(field(line, "trace_id"), Some(trace_id), "{line}");
    }
}

#[actix_web::test]
async fn echoes_inbound_identity() {
    let buf = SharedBuf::default();
    let svc = test_logger(&buf)
        .new_transform(test::ok_service())
        .await
        .unwrap();

    let req = TestRequest::get()
        .insert_header((
            "traceparent",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        ))
        .insert_header(("tracestate", "vendor=opaque"))
        .insert_header(("x-request-id", "client-supplied-id"))
        .to_srv_request();
    let res = test::call_service(&svc, req).await;

    assert_eq!(
        res.headers().get("x-request-id").unwrap(),
        "client-supplied-id"
    );
    assert_eq!(
        res.headers().get("traceparent").unwrap(),
        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
    );
    assert_eq!(res.headers().get("tracestate").unwrap(), "vendor=opaque");

    let lines = buf.lines();
    for line in &lines {
        assert_eq!(
            field(line, "trace_id"),
            Some("4bf92f3577b34da6a3ce929d0e0e4736"),
            "{line}"
        );
        assert_eq!(
            field(line, "span_id"),
            Some("00f067aa0ba902b7"),
            "{line}"
        );
        assert_eq!(field(line, "request_id"), Some("client-supplied-id"), "{line}");
    }
}

#[actix_web::test]
async fn malformed_traceparent_degrades_to_a_fresh_trace() {
    let buf = SharedBuf::default();
    let svc = test_logger(&buf)
        .new_transform(test::ok_service())
        .await
        .unwrap();

    let req = TestRequest::get()
        .insert_header(("traceparent", "bad"))
        .to_srv_request();
    let res = test::call_service(&svc, req).await;

    assert_eq!(res.status(), StatusCode::OK);
    let traceparent = res
        .headers()
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    let traceparent_re = Regex::new("^00-[0-9a-f]{32}-[0-9a-f]{16}-01$").unwrap();
    assert!(traceparent_re.is_match(traceparent), "{traceparent}");
}

#[actix_web::test]
async fn handler_status_reaches_the_completion_record() {
    let buf = SharedBuf::default();
    let svc = test_logger(&buf)
        .new_transform(fn_service(|req: ServiceRequest| async move {
            Ok(req.into_response(HttpResponse::Created().finish()))
        }))
        .await
        .unwrap();

    let res = test::call_service(&svc, TestRequest::post().to_srv_request()).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert!(res.headers().get("x-request-id").is_some());

    let lines = buf.lines();
    assert_eq!(field(&lines[1], "status"), Some("\"201\""), "{}", lines[1]);
    assert_eq!(field(&lines[1], "method"), Some("POST"), "{}", lines[1]);
}

#[actix_web::test]
async fn error_responses_record_their_status() {
    let buf = SharedBuf::default();
    let svc = test_logger(&buf)
        .new_transform(fn_service(|_req: ServiceRequest| async {
            Err::<ServiceResponse, _>(error::ErrorImATeapot("teapot"))
        }))
        .await
        .unwrap();

    let outcome = svc.call(TestRequest::get().to_srv_request()).await;
    assert!(outcome.is_err());

    let lines = buf.lines();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert_eq!(field(&lines[1], "status"), Some("\"418\""), "{}", lines[1]);
    assert!(lines[1].contains("msg:\"request completed\""), "{}", lines[1]);
}

#[actix_web::test]
async fn cancelled_downstream_still_emits_the_completion_record() {
    let buf = SharedBuf::default();
    let svc = test_logger(&buf)
        .new_transform(fn_service(|_req: ServiceRequest| {
            std::future::pending::<Result<ServiceResponse, Error>>()
        }))
        .await
        .unwrap();

    let fut = svc.call(TestRequest::get().to_srv_request());
    drop(fut);

    let lines = buf.lines();
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines[0].contains("msg:\"Request Received\""), "{}", lines[0]);
    assert!(lines[1].contains("msg:\"request completed\""), "{}", lines[1]);
    // Nothing was observed before the cancellation.
    assert_eq!(field(&lines[1], "status"), Some("\"200\""), "{}", lines[1]);
}

async fn identity(id: RequestId, trace: TraceContext, log: RequestLog) -> String {
    log.with_field("step", "handler").debug("inside handler");
    format!("{}|{}", id, trace.trace_id())
}

#[actix_web::test]
async fn extractors_resolve_inside_handlers() {
    let buf = SharedBuf::default();
    let app = test::init_service(
        App::new()
            .wrap(test_logger(&buf))
            .route("/", web::get().to(identity)),
    )
    .await;

    let res = test::call_service(&app, TestRequest::get().to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);

    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_owned();
    let traceparent = res
        .headers()
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_owned();
    let trace_id = traceparent.split('-').nth(1).unwrap().to_owned();

    let body = test::read_body(res).await;
    assert_eq!(&body[..], format!("{request_id}|{trace_id}").as_bytes());

    // The handler's own record lands between received and completed and
    // carries the request identity.
    let lines = buf.lines();
    assert_eq!(lines.len(), 3, "{lines:?}");
    assert!(lines[1].contains("msg:\"inside handler\""), "{}", lines[1]);
    assert_eq!(field(&lines[1], "step"), Some("handler"), "{}", lines[1]);
    assert_eq!(field(&lines[1], "request_id"), Some(request_id.as_str()), "{}", lines[1]);
}

#[actix_web::test]
async fn extractors_fail_without_the_middleware() {
    let app =
        test::init_service(App::new().route("/", web::get().to(identity))).await;

    let res = test::call_service(&app, TestRequest::get().to_request()).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
