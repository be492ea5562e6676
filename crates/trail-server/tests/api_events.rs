use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use trail_server::config::Config;
use trail_server::{app, build_engine, AppState};
use trail_types::StorageMode;

fn state_for(config: &Config, namespace: &str) -> AppState {
    let (engine, page) = build_engine(config);
    AppState::new(engine, page, namespace)
}

fn test_state(namespace: &str) -> AppState {
    state_for(&Config::default(), namespace)
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = app(test_state("api-test-health"));
    let (status, json) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn track_returns_created_event() {
    let app = app(test_state("api-test-track"));
    let (status, json) = send(
        app.clone(),
        post_json(
            "/api/events",
            json!({ "name": "checkout_started", "note": "cart page", "metadata": { "items": 3 } }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "checkout_started");
    assert_eq!(json["note"], "cart page");
    assert_eq!(json["metadata"]["items"], 3);
    assert!(json["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(json["tsMs"].is_i64());
    assert!(json["sessionId"].is_string());
    assert!(json["pageId"].is_string());

    let (_, listed) = send(app, get("/api/events")).await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["events"][0]["id"], json["id"]);
}

#[tokio::test]
async fn blank_name_is_rejected() {
    let app = app(test_state("api-test-blank"));
    let (status, json) = send(app.clone(), post_json("/api/events", json!({ "name": "  " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (_, listed) = send(app, get("/api/events")).await;
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn list_is_bounded_and_oldest_first() {
    let mut config = Config::default();
    config.recorder.max_events = Some(3);
    let app = app(state_for(&config, "api-test-bounded"));

    for name in ["a", "b", "c", "d", "e"] {
        send(app.clone(), post_json("/api/events", json!({ "name": name }))).await;
    }

    let (status, listed) = send(app.clone(), get("/api/events")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 3);
    let names: Vec<_> = listed["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["c", "d", "e"]);

    let (_, limited) = send(app, get("/api/events?limit=2")).await;
    assert_eq!(limited["count"], 2);
    assert_eq!(limited["events"][0]["name"], "d");
    assert_eq!(limited["events"][1]["name"], "e");
}

#[tokio::test]
async fn delete_clears_trail() {
    let app = app(test_state("api-test-clear"));
    send(app.clone(), post_json("/api/events", json!({ "name": "a" }))).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/events")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, listed) = send(app, get("/api/events")).await;
    assert_eq!(listed["count"], 0);
}

#[tokio::test]
async fn page_updates_are_stamped_on_new_events() {
    let app = app(test_state("api-test-page"));

    let request = Request::builder()
        .method("PUT")
        .uri("/api/page")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "path": "/pricing?plan=pro",
                "title": "Pricing",
                "referrer": "",
                "viewport": { "width": 1280, "height": 720 }
            })
            .to_string(),
        ))
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, event) = send(app, post_json("/api/events", json!({ "name": "viewed" }))).await;
    assert_eq!(event["path"], "/pricing?plan=pro");
    assert_eq!(event["title"], "Pricing");
    assert!(event.get("referrer").is_none());
    assert_eq!(event["viewport"]["width"], 1280);
    assert_eq!(event["viewport"]["height"], 720);
}

#[tokio::test]
async fn bridge_endpoint_serves_published_trail() {
    let state = test_state("api-test-bridge");
    state.engine.record("opened_help", None, None).unwrap();
    let app = app(state);

    let (status, json) = send(app, get("/bridge/events")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["events"][0]["name"], "opened_help");
}

#[tokio::test]
async fn cors_is_open() {
    let app = app(test_state("api-test-cors"));
    let request = Request::builder()
        .uri("/bridge/events")
        .header("origin", "https://support.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
}

#[tokio::test]
async fn local_trail_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.recorder.storage = StorageMode::Local;
    config.storage.db_path = dir.path().join("trail.db").to_string_lossy().into_owned();

    {
        let app = app(state_for(&config, "api-test-restart-1"));
        let (status, _) = send(app, post_json("/api/events", json!({ "name": "before" }))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let app = app(state_for(&config, "api-test-restart-2"));
    let (_, listed) = send(app, get("/api/events")).await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["events"][0]["name"], "before");
}
