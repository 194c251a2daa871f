// A node serving on a real socket answers its liveness and discovery routes.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use egp::{EngineApiBuilder, EngineServiceConfig, InMemoryStore, LifecycleEngine, PROTOCOL_VERSION};
use serde_json::Value;
use tokio::sync::oneshot;

async fn spawn_memory_node() -> (SocketAddr, oneshot::Sender<()>) {
    let store = Arc::new(InMemoryStore::new());
    let engine = LifecycleEngine::builder(store.clone()).index(store).build();

    // Ask the OS for a free port, then hand it to the server.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = probe.local_addr().unwrap();
    drop(probe);

    let stop = EngineApiBuilder::new(Arc::new(engine))
        .serve(EngineServiceConfig {
            bind_address: addr.to_string(),
            ..EngineServiceConfig::default()
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    (addr, stop)
}

async fn get_json(addr: SocketAddr, route: &str) -> (reqwest::StatusCode, Value) {
    let response = reqwest::get(format!("http://{addr}{route}")).await.unwrap();
    let status = response.status();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn live_node_reports_health_and_routes() {
    let (addr, stop) = spawn_memory_node().await;

    let (status, health) = get_json(addr, "/health").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], PROTOCOL_VERSION);

    let (status, description) = get_json(addr, "/").await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(description["endpoints"]["adopt"], "POST /adopt");

    stop.send(()).ok();
}
