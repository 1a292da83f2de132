//! Session persistence through the pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use pavilion::session::{Session, StoreError};
use pavilion::{AppConfig, Application, Reply, ServiceRoutes, SessionStore};

mod common;

fn session_routes() -> ServiceRoutes {
    let mut routes = ServiceRoutes::new();

    routes.get("visit", None, "Count visits in the session.", |ctx| {
        Box::pin(async move {
            let visits = ctx
                .session
                .get("visits")
                .and_then(|v| v.as_i64())
                .unwrap_or(0)
                + 1;
            ctx.session.set("visits", visits);
            Ok(Reply::json(json!({ "visits": visits })))
        })
    });

    routes.get("peek", None, "Read without touching the session.", |ctx| {
        Box::pin(async move {
            let visits = ctx
                .session
                .get("visits")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            Ok(Reply::json(json!({ "visits": visits })))
        })
    });

    routes
}

#[tokio::test]
async fn test_dirty_session_persists_across_requests() {
    let server = common::start_service(AppConfig::default(), session_routes()).await;
    let client = common::client();

    let response = client.get(server.url("/api/visit")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("set-cookie"));
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["visits"], 1);

    for expected in 2..=3 {
        let response = client.get(server.url("/api/visit")).send().await.unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["visits"], expected);
    }
    assert_eq!(server.sessions.count(), 1);
}

#[tokio::test]
async fn test_read_only_requests_never_touch_the_store() {
    let server = common::start_service(AppConfig::default(), session_routes()).await;
    let client = common::client();

    // Establish a session first.
    client.get(server.url("/api/visit")).send().await.unwrap();
    assert_eq!(server.sessions.count(), 1);

    // Reads with the same cookie mutate nothing and set no cookie.
    for _ in 0..3 {
        let response = client.get(server.url("/api/peek")).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(!response.headers().contains_key("set-cookie"));
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["visits"], 1);
    }
    assert_eq!(server.sessions.count(), 1);
}

#[tokio::test]
async fn test_cookieless_requests_get_fresh_sessions() {
    let server = common::start_service(AppConfig::default(), session_routes()).await;
    let client = common::plain_client();

    // Without a cookie jar every request starts over.
    for _ in 0..2 {
        let response = client.get(server.url("/api/visit")).send().await.unwrap();
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["visits"], 1);
    }
    assert_eq!(server.sessions.count(), 2);
}

#[tokio::test]
async fn test_expired_session_reads_as_fresh() {
    let mut config = AppConfig::default();
    config.session.ttl_secs = 1;
    let server = common::start_service(config, session_routes()).await;
    let client = common::client();

    let response = client.get(server.url("/api/visit")).send().await.unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["visits"], 1);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    // The cookie is still presented, but the record is gone.
    let response = client.get(server.url("/api/visit")).send().await.unwrap();
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["visits"], 1);
}

/// Store whose writes always fail, as if the backend were unreachable.
struct UnreachableStore;

#[async_trait]
impl SessionStore for UnreachableStore {
    async fn get(&self, _session_id: Option<&str>) -> Session {
        Session::unsaved()
    }

    async fn set(&self, _session: &mut Session) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    async fn remove(&self, _session: &Session) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection refused".into()))
    }

    fn count(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn test_unreachable_store_fails_request_without_cookie() {
    let app = Application::with_store(
        AppConfig::default(),
        session_routes(),
        Arc::new(UnreachableStore),
    )
    .expect("application builds");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown, rx) = broadcast::channel(1);
    tokio::spawn(app.run(listener, rx));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = common::plain_client();
    let response = client
        .get(format!("http://{addr}/api/visit"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
    assert!(!response.headers().contains_key("set-cookie"));
    assert_eq!(
        common::error_reason(response).await,
        "Session store unavailable"
    );

    let _ = shutdown.send(());
}
