//! Basic routing and parsing behavior through a real listener.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use pavilion::{AppConfig, Reply, ServiceRoutes};

mod common;

fn demo_routes() -> ServiceRoutes {
    let incoming: Arc<Mutex<serde_json::Map<String, Value>>> = Arc::default();
    let mut routes = ServiceRoutes::new();

    routes.get("test_path", None, "Return a test payload.", |ctx| {
        Box::pin(async move {
            let mut payload = vec![json!("test sting"), json!(1)];
            if !ctx.data.is_empty() {
                payload.push(ctx.data.to_value());
            }
            Ok(Reply::json(Value::Array(payload)))
        })
    });

    let sink = incoming.clone();
    routes.post("incoming", None, "Accept a payload.", move |ctx| {
        let sink = sink.clone();
        Box::pin(async move {
            let mut stored = sink.lock().expect("incoming store");
            for (key, value) in ctx.data.iter() {
                stored.insert(key.clone(), value.clone());
            }
            Ok(Reply::json(json!(true)))
        })
    });

    let source = incoming.clone();
    routes.get("incoming", None, "Return accepted payloads.", move |_ctx| {
        let source = source.clone();
        Box::pin(async move {
            let stored = source.lock().expect("incoming store");
            Ok(Reply::json(Value::Object(stored.clone())))
        })
    });

    routes
}

#[tokio::test]
async fn test_post_then_get_roundtrip() {
    let server = common::start_service(AppConfig::default(), demo_routes()).await;
    let client = common::plain_client();

    let payload = json!({"key1": "value1", "key2": "value2"});
    let response = client
        .post(server.url("/api/incoming"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!(true));

    let response = client
        .get(server.url("/api/incoming"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, payload);
}

#[tokio::test]
async fn test_get_with_query_parameters() {
    let server = common::start_service(AppConfig::default(), demo_routes()).await;
    let client = common::plain_client();

    let response = client
        .get(server.url("/api/test_path"))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!(["test sting", 1]));

    let response = client
        .get(server.url("/api/test_path?a=7"))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!(["test sting", 1, {"a": "7"}]));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let server = common::start_service(AppConfig::default(), demo_routes()).await;
    let client = common::plain_client();

    let response = client
        .get(server.url("/api/no_such_thing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    let response = client.post(server.url("/")).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let server = common::start_service(AppConfig::default(), demo_routes()).await;
    let client = common::plain_client();

    let response = client
        .post(server.url("/api/incoming"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(common::error_reason(response).await, "Malformed JSON body");
}

#[tokio::test]
async fn test_empty_body_is_empty_bag_not_error() {
    let server = common::start_service(AppConfig::default(), demo_routes()).await;
    let client = common::plain_client();

    let response = client.post(server.url("/api/incoming")).send().await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_introspection_lists_declared_routes() {
    let server = common::start_service(AppConfig::default(), demo_routes()).await;
    let client = common::plain_client();

    let response = client
        .get(server.url("/api/__introspect__"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let html = response.text().await.unwrap();
    assert!(html.contains("/api/test_path"));
    assert!(html.contains("-- Return a test payload."));
    assert!(!html.contains("__introspect__"));
}
