//! Shared test harness: an in-process server on an ephemeral port.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use pavilion::{AppConfig, Application, InMemorySessionStore, ServiceRoutes};

pub struct TestServer {
    pub addr: SocketAddr,
    pub sessions: Arc<InMemorySessionStore>,
    shutdown: broadcast::Sender<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// Bind an ephemeral port, spawn the application, return the handle.
pub async fn start_service(config: AppConfig, routes: ServiceRoutes) -> TestServer {
    let sessions = Arc::new(InMemorySessionStore::new(Duration::from_secs(
        config.session.ttl_secs,
    )));
    let app =
        Application::with_store(config, routes, sessions.clone()).expect("application builds");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let (shutdown, rx) = broadcast::channel(1);
    tokio::spawn(app.run(listener, rx));
    // Give the acceptor a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        sessions,
        shutdown,
    }
}

/// Client that keeps cookies between requests, like a browser.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .no_proxy()
        .build()
        .expect("client builds")
}

/// Client without a cookie jar, for anonymous requests.
pub fn plain_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client builds")
}

/// The `error` reason string from a JSON error body.
pub async fn error_reason(response: reqwest::Response) -> String {
    let body: serde_json::Value = response.json().await.expect("JSON error body");
    body["error"].as_str().unwrap_or_default().to_string()
}
