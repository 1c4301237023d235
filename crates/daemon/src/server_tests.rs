use super::*;
use sift_core::BusConfig;
use sift_storage::{Ring, Store};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    bus: Bus,
    cancel: CancellationToken,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(session_limit: usize) -> Self {
        let config = BusConfig::default()
            .with_workers(4)
            .with_consumer_timeout(Duration::from_secs(1));
        let store: Arc<dyn Store> = Arc::new(Ring::new(16));
        let (bus, coordinator) = Bus::new(config, Some(store));
        let cancel = CancellationToken::new();
        tokio::spawn(coordinator.run(cancel.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(AppState::new(bus.clone(), cancel.clone(), session_limit));
        tokio::spawn(async move { axum::serve(listener, app).await });

        Self {
            addr,
            bus,
            cancel,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn publish(&self, events: Value) -> reqwest::Response {
        self.client
            .post(self.url("/events"))
            .body(events.to_string())
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn params(limit: Option<&str>, replay: Option<&str>) -> StreamParams {
    StreamParams {
        limit: limit.map(str::to_string),
        replay: replay.map(str::to_string),
    }
}

// =============================================================================
// Request parsing
// =============================================================================

#[test]
fn empty_request_uses_default_query() {
    let query = parse_stream_request(&params(None, None), b"").unwrap();
    assert_eq!(query, Query::default());
    let query = parse_stream_request(&params(Some(""), Some("")), b"  \n").unwrap();
    assert_eq!(query, Query::default());
}

#[test]
fn params_and_body_shape_the_query() {
    let query =
        parse_stream_request(&params(Some("3"), Some("FALSE")), br#"{"want":"tacos"}"#).unwrap();
    assert_eq!(query.limit, 3);
    assert!(!query.replay);
    assert_eq!(
        query.filter,
        parse_pattern(&json!({"want": "tacos"})).unwrap()
    );
}

#[yare::parameterized(
    bad_limit = { Some("many"), None, "", "bad limit many" },
    negative_limit = { Some("-1"), None, "", "bad limit -1" },
    bad_replay = { None, Some("maybe"), "", "bad replay maybe" },
    bad_json = { None, None, "{", "bad filter" },
    bad_pattern = { None, None, r#"{"a":{"exists":1}}"#, "bad filter" },
)]
fn malformed_requests_are_rejected(
    limit: Option<&str>,
    replay: Option<&str>,
    body: &str,
    message: &str,
) {
    let err = parse_stream_request(&params(limit, replay), body.as_bytes()).unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert!(err.to_string().contains(message), "{}", err);
}

#[test]
fn batches_accept_one_or_many() {
    assert_eq!(parse_batch(br#"{"payload":1}"#).unwrap().len(), 1);
    assert_eq!(
        parse_batch(br#"[{"payload":1},{"type":"t","payload":2}]"#)
            .unwrap()
            .len(),
        2
    );
    assert!(parse_batch(b"42").is_err());
}

#[test]
fn record_skips_fields_that_would_break_framing() {
    assert!(is_field_safe("tweets"));
    assert!(!is_field_safe("a\nb"));
    assert!(!is_field_safe("a\rb"));
}

#[test]
fn bus_errors_map_to_status_codes() {
    assert_eq!(
        ApiError::from(BusError::Closed).status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert_eq!(
        ApiError::from(BusError::Timeout).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn api_errors_render_status_and_json_body() {
    let response = ApiError::from(BusError::Closed).into_response();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body, json!({"error": BusError::Closed.to_string()}));
}

// =============================================================================
// Over HTTP
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::start(10).await;
    let resp = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn publish_accepts_single_and_batch() {
    let server = TestServer::start(10).await;

    let resp = server.publish(json!({"payload": {"want": "tacos"}})).await;
    assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"accepted": 1}));

    let resp = server
        .publish(json!([{"payload": 1}, {"payload": 2}]))
        .await;
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"accepted": 2}));
}

#[tokio::test]
async fn publish_rejects_garbage_with_json_error() {
    let server = TestServer::start(10).await;
    let resp = server
        .client
        .post(server.url("/events"))
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("bad events"));
}

#[tokio::test]
async fn stream_replays_matching_history() {
    let server = TestServer::start(1).await;
    server
        .publish(json!([
            {"type": "t", "id": "1", "payload": {"want": "tacos"}},
            {"type": "t", "id": "2", "payload": {"want": "queso"}}
        ]))
        .await;

    let resp = server
        .client
        .get(server.url("/?limit=5"))
        .body(r#"{"want":"tacos"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert_eq!(resp.headers()["cache-control"], "no-cache");
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    // Session limit of one closes the stream after the first record
    let text = tokio::time::timeout(WAIT, resp.text())
        .await
        .unwrap()
        .unwrap();
    assert!(text.contains("event: t\n"), "{}", text);
    assert!(text.contains("id: 1\n"), "{}", text);
    assert!(
        text.contains(r#"data: {"type":"t","payload":{"want":"tacos"},"id":"1"}"#),
        "{}",
        text
    );
    assert!(!text.contains("queso"), "{}", text);
}

#[tokio::test]
async fn stream_delivers_live_events_without_replay() {
    let server = TestServer::start(2).await;
    server.publish(json!({"payload": {"n": 0}})).await;

    let resp = server
        .client
        .post(server.url("/events/stream?replay=false"))
        .body(r#"{"n":{"numeric":[">",0]}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    server
        .publish(json!([
            {"payload": {"n": 1}},
            {"payload": {"n": 2}},
            {"payload": {"n": 3}}
        ]))
        .await;

    let text = tokio::time::timeout(WAIT, resp.text())
        .await
        .unwrap()
        .unwrap();
    assert!(!text.contains(r#"{"n":0}"#), "{}", text);
    assert!(text.contains(r#"{"n":1}"#), "{}", text);
    assert!(text.contains(r#"{"n":2}"#), "{}", text);
    assert!(!text.contains(r#"{"n":3}"#), "{}", text);
}

#[tokio::test]
async fn stream_rejects_bad_pattern() {
    let server = TestServer::start(1).await;
    let resp = server
        .client
        .get(server.url("/"))
        .body(r#"{"n":{"numeric":["<"]}}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("bad filter"));
}

#[tokio::test]
async fn stream_ends_when_bus_shuts_down() {
    let server = TestServer::start(100).await;
    let resp = server
        .client
        .get(server.url("/?replay=false"))
        .send()
        .await
        .unwrap();

    server.cancel.cancel();
    let text = tokio::time::timeout(WAIT, resp.text())
        .await
        .unwrap()
        .unwrap();
    assert!(!text.contains("data:"));
    assert!(server.bus.publish(&server.cancel, Vec::new()).await.is_err());
}
