use super::*;
use crate::Config;
use crate::auth::StaticTokenProvider;
use crate::gmail::test_helpers::ScriptedMailApi;
use crate::retry::RecordingSleeper;
use crate::store::MemoryStore;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Duration;
use tower::ServiceExt;


/// Test analyzer backed by a scripted mailbox of `mailbox` messages
struct TestApp {
    api: Arc<ScriptedMailApi>,
    analyzer: Arc<CarbonAnalyzer>,
    config: Arc<Config>,
}

impl TestApp {
    fn router(&self) -> Router {
        create_router(self.analyzer.clone(), self.config.clone())
    }
}

fn test_app(mailbox: usize) -> TestApp {
    test_app_with(mailbox, StaticTokenProvider::new("tok"), Config::default())
}

fn test_app_with(mailbox: usize, tokens: StaticTokenProvider, config: Config) -> TestApp {
    let api = Arc::new(ScriptedMailApi::with_mailbox(mailbox));
    let analyzer = CarbonAnalyzer::with_components(
        config.clone(),
        api.clone(),
        Arc::new(tokens),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingSleeper::new()),
    )
    .unwrap();

    TestApp {
        api,
        analyzer: Arc::new(analyzer),
        config: Arc::new(config),
    }
}

async fn send(router: Router, method: &str, uri: &str) -> axum::response::Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    router.oneshot(request).await.unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let app = test_app(0);

    let mut config = (*app.config).clone();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let analyzer = app.analyzer.clone();
        async move { start_api_server(analyzer, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!api_handle.is_finished(), "server should still be running");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = test_app(0);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "chrome-extension://abcdefghijklmnop")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let mut config = Config::default();
    config.server.cors_origins = vec!["chrome-extension://allowed".to_string()];
    let app = test_app_with(0, StaticTokenProvider::new("tok"), config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "chrome-extension://allowed")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "chrome-extension://allowed"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut config = Config::default();
    config.server.cors_enabled = false;
    let app = test_app_with(0, StaticTokenProvider::new("tok"), config);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be absent when CORS is disabled"
    );
}
