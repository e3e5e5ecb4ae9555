mod common;

use common::{closed_address, config_for};
use service_core::cache::CacheAside;
use service_core::clock;
use service_core::lifecycle::startup::assemble;
use service_core::{HttpServer, Shutdown};
use tokio::net::TcpListener;

#[tokio::test]
async fn serves_health_and_admin_then_drains_on_shutdown() {
    let mut config = config_for(&format!("http://{}", closed_address().await));
    config.admin.enabled = true;
    config.admin.api_key = "s3cret".into();
    let cache = CacheAside::disabled(&config.cache);
    let components = assemble(config, clock::system(), cache).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = tokio::spawn(HttpServer::new(&components).run(listener, shutdown.subscribe()));

    let client = reqwest::Client::new();
    let res = client.get(format!("http://{}/health", addr)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["data"]["service"], "order-service");

    let res = client.get(format!("http://{}/admin/limiter", addr)).send().await.unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .get(format!("http://{}/admin/breakers", addr))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body[0]["name"], "user-service");

    // Orders are admitted through the gatekeeper keyed on the real peer.
    let res = client.get(format!("http://{}/api/v1/orders", addr)).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(components.limiter.len(), 1);
    assert!(components.limiter.tokens("127.0.0.1").is_some());

    drop(client);
    shutdown.trigger();
    server.await.unwrap().unwrap();
}
