use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use csp_config::Config;
use csp_filter::Blocklist;
use csp_server::{Metadata, ReportEntry, ReportSink, ServiceState, make_app};
use http::{HeaderMap, Method, Request, StatusCode, header};
use similar_asserts::assert_eq;
use tower::ServiceExt;

const LEGACY_REPORT: &str = r#"{
    "csp-report": {
        "document-uri": "https://example.com/signup?step=2",
        "referrer": "",
        "blocked-uri": "https://evil.example/tracker.js",
        "violated-directive": "script-src-elem",
        "effective-directive": "script-src-elem",
        "original-policy": "default-src 'self'; report-uri /csp",
        "disposition": "enforce",
        "status-code": 200
    }
}"#;

#[derive(Default)]
struct MemorySink(Mutex<Vec<ReportEntry>>);

impl ReportSink for MemorySink {
    fn write(&self, entry: &ReportEntry) {
        self.0.lock().unwrap().push(entry.clone());
    }
}

impl MemorySink {
    fn entries(&self) -> Vec<ReportEntry> {
        self.0.lock().unwrap().clone()
    }
}

fn setup(config: serde_json::Value) -> (Router, Arc<MemorySink>) {
    let config = Arc::new(Config::from_json_value(config).unwrap());
    let sink = Arc::new(MemorySink::default());
    let state = ServiceState::new(config, Blocklist::default(), sink.clone());
    (make_app(state), sink)
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/csp-report")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_legacy_report_with_metadata() {
    csp_log::init_test!();
    let (app, sink) = setup(serde_json::json!({}));

    let request = post("/csp?metadata=value0&metadata=value1", LEGACY_REPORT);
    let (status, headers, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "");
    assert_eq!(headers["cross-origin-resource-policy"], "cross-origin");
    assert!(
        headers[header::SERVER]
            .to_str()
            .unwrap()
            .starts_with("csp-collector/")
    );

    insta::assert_json_snapshot!(sink.entries(), @r###"
    [
      {
        "document_uri": "https://example.com/signup?step=2",
        "referrer": "",
        "blocked_uri": "https://evil.example/tracker.js",
        "violated_directive": "script-src-elem",
        "effective_directive": "script-src-elem",
        "original_policy": "default-src 'self'; report-uri /csp",
        "disposition": "enforce",
        "script_sample": "",
        "status_code": 200,
        "source_file": "",
        "line_number": 0,
        "column_number": 0,
        "report_only": false,
        "metadata": "value0",
        "path": "/csp"
      }
    ]
    "###);
}

#[tokio::test]
async fn test_blocked_uri_rejected() {
    let (app, sink) = setup(serde_json::json!({}));

    let payload = r#"{"csp-report": {
        "document-uri": "https://example.com/",
        "blocked-uri": "chrome-extension://abc/inject.js"
    }}"#;
    let (status, _, body) = send(app, post("/csp", payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("blocked URI ('chrome-extension://') is an invalid resource"));
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_invalid_document_uri_rejected() {
    let (app, sink) = setup(serde_json::json!({}));

    let payload = r#"{"csp-report": {"document-uri": "about:blank"}}"#;
    let (status, _, body) = send(app, post("/csp", payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, "document URI ('about:blank') is invalid\n");
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let (app, sink) = setup(serde_json::json!({}));

    let (status, _, body) = send(app, post("/csp", "{\"csp-report\": ")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, "");
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_legacy_array_rejected() {
    let body = r#"[{"document-uri":"https://example.com/","blocked-uri":"https://evil.example/x.js"}]"#;

    for payload in ["[]", body] {
        let (app, sink) = setup(serde_json::json!({}));
        let (status, _, _) = send(app, post("/csp", payload)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{payload}");
        assert!(sink.entries().is_empty());
    }
}

#[tokio::test]
async fn test_any_path_accepts_legacy_reports() {
    let (app, sink) = setup(serde_json::json!({}));

    let (status, _, _) = send(app.clone(), post("/deep/link", LEGACY_REPORT)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(app, post("/", LEGACY_REPORT)).await;
    assert_eq!(status, StatusCode::OK);

    let paths: Vec<_> = sink.entries().into_iter().map(|entry| entry.path).collect();
    assert_eq!(paths, ["/deep/link", "/"]);
}

#[tokio::test]
async fn test_report_only_route() {
    let (app, sink) = setup(serde_json::json!({}));

    let (status, _, _) = send(app, post("/csp/report-only", LEGACY_REPORT)).await;
    assert_eq!(status, StatusCode::OK);

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].record.report_only);
    assert_eq!(entries[0].path, "/csp/report-only");
}

#[tokio::test]
async fn test_reporting_api_batch() {
    let (app, sink) = setup(serde_json::json!({}));

    let payload = r#"[
        {
            "type": "intervention",
            "age": 1,
            "url": "https://example.com/",
            "user_agent": "Mozilla/5.0",
            "body": {"id": "HeavyAdIntervention", "message": "ad removed"}
        },
        {
            "type": "csp-violation",
            "age": 12,
            "url": "https://example.com/",
            "user_agent": "Mozilla/5.0",
            "body": {
                "documentURL": "https://example.com/",
                "blockedURL": "inline",
                "effectiveDirective": "style-src-attr",
                "originalPolicy": "style-src 'self'; report-to csp",
                "disposition": "report",
                "sample": "color: red",
                "statusCode": 200
            }
        }
    ]"#;
    let (status, _, _) = send(app, post("/reporting-api/csp", payload)).await;
    assert_eq!(status, StatusCode::OK);

    let entries = sink.entries();
    assert_eq!(entries.len(), 1);

    let record = &entries[0].record;
    assert_eq!(record.blocked_uri, "inline");
    assert_eq!(record.violated_directive, "style-src-attr");
    assert_eq!(record.script_sample, "color: red");
    assert!(record.report_only);
}

#[tokio::test]
async fn test_reporting_api_batch_all_or_nothing() {
    let (app, sink) = setup(serde_json::json!({}));

    let payload = r#"[
        {"type": "csp-violation", "body": {"documentURL": "https://example.com/", "blockedURL": "https://cdn.example/a.js"}},
        {"type": "csp-violation", "body": {"documentURL": "https://example.com/", "blockedURL": "moz-extension://abc"}}
    ]"#;
    let (status, _, body) = send(app, post("/reporting-api/csp", payload)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("moz-extension://"));
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_reporting_api_empty_batch() {
    let (app, sink) = setup(serde_json::json!({}));

    let (status, _, _) = send(app, post("/reporting-api/csp", "[]")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_reporting_api_preflight() {
    let (app, _) = setup(serde_json::json!({}));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/reporting-api/csp")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://example.com"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "60");
    assert_eq!(
        headers[header::VARY],
        "Origin, Access-Control-Request-Method, Access-Control-Request-Headers"
    );
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain;charset=UTF-8");
    assert_eq!(headers["cross-origin-resource-policy"], "cross-origin");
}

#[tokio::test]
async fn test_wrong_method() {
    let (app, _) = setup(serde_json::json!({}));

    for uri in ["/csp", "/csp/report-only", "/reporting-api/csp", "/somewhere"] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{uri}");
    }
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup(serde_json::json!({}));

    let request = Request::builder()
        .uri("/_healthcheck")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (app, _) = setup(serde_json::json!({"http": {"health_check_path": "/healthz"}}));
    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_payload_too_large() {
    let (app, sink) = setup(serde_json::json!({"http": {"max_payload_size": 64}}));

    let (status, _, _) = send(app, post("/csp", LEGACY_REPORT)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(sink.entries().is_empty());
}

#[tokio::test]
async fn test_client_ip_from_forwarded_for() {
    let (app, sink) = setup(serde_json::json!({"reports": {"client_ip": "truncated"}}));

    let mut request = post("/csp", LEGACY_REPORT);
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.23".parse().unwrap());
    let (status, _, _) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        sink.entries()[0].client_ip.as_deref(),
        Some("198.51.100.0/24")
    );
}

#[tokio::test]
async fn test_client_ip_from_connection() {
    let (app, sink) = setup(serde_json::json!({"reports": {"client_ip": "full"}}));

    let mut request = post("/csp", LEGACY_REPORT);
    let addr: SocketAddr = "[2001:db8::7]:50123".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    let (status, _, _) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(sink.entries()[0].client_ip.as_deref(), Some("2001:db8::7"));
}

#[tokio::test]
async fn test_unparseable_client_ip_still_logged() {
    let (app, sink) = setup(serde_json::json!({"reports": {"client_ip": "full"}}));

    let mut request = post("/csp", LEGACY_REPORT);
    request
        .headers_mut()
        .insert("x-forwarded-for", "198.51.100.23, 10.0.0.1".parse().unwrap());
    let (status, _, _) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].client_ip, None);
}

#[tokio::test]
async fn test_metadata_object_and_truncation() {
    let (app, sink) = setup(serde_json::json!({
        "reports": {"metadata_object": true, "truncate_query_fragment": true}
    }));

    let (status, _, _) = send(app, post("/csp?app=shop&env=prod&env=dev", LEGACY_REPORT)).await;
    assert_eq!(status, StatusCode::OK);

    let entries = sink.entries();
    assert_eq!(entries[0].record.document_uri, "https://example.com/signup");
    assert_eq!(
        entries[0].metadata,
        Some(Metadata::Object(
            [("app", "shop"), ("env", "prod")]
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect()
        ))
    );
}
