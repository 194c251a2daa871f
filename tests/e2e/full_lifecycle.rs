// End-to-end test covering the sense → propose → adopt lifecycle over HTTP.
use std::collections::HashMap;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use egp::{build_engine, open_store, EngineApiBuilder, NodeConfig};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(pairs: &[(&str, &str)]) -> NodeConfig {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    NodeConfig::from_lookup(|key| env.get(key).cloned()).expect("config loads")
}

async fn router(config: NodeConfig) -> Router {
    let store = open_store(&config).await.expect("store opens");
    let engine = build_engine(&config, store).expect("engine builds");
    EngineApiBuilder::new(Arc::new(engine)).router()
}

async fn memory_node() -> Router {
    router(config(&[("EGP_STORE", "memory"), ("EGP_NODE_ID", "valley-node")])).await
}

async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Option<String>, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request builds");

    let response: Response = router.clone().oneshot(request).await.expect("router answers");
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body readable")
        .to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, location, body)
}

#[tokio::test]
async fn community_takes_a_problem_to_trial() {
    let node = memory_node().await;

    let (status, sense_uri, sense) = call(
        &node,
        "POST",
        "/sense",
        Some(json!({
            "issue": "Irrigation canal silting up",
            "scope": "upper_valley",
            "urgency": "3/5",
            "tags": ["water", "farming"],
            "reporter": { "did": "did:example:rosa", "type": "human" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let sense_uri = sense_uri.expect("location header");
    assert_eq!(sense_uri, format!("/sense/{}", sense["id"].as_str().unwrap()));

    let (status, proposal_uri, proposal) = call(
        &node,
        "POST",
        "/propose",
        Some(json!({
            "title": "Monthly canal cleaning days",
            "in_response_to": sense_uri,
            "solution": { "description": "Each household sends one person on the first Saturday" },
            "test": "More water reaches the lower fields, up 25% this season",
            "sunset": "P6M",
            "resources": { "needed": ["shovels", "volunteer time"] },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{proposal}");
    let proposal_uri = proposal_uri.expect("location header");
    assert!(proposal["relationship_id"].is_string());
    assert!(proposal["sunset_date"].is_string());
    assert!(proposal["rituals"].is_object());

    let (status, adoption_uri, adoption) = call(
        &node,
        "POST",
        "/adopt",
        Some(json!({
            "proposal_uri": proposal_uri,
            "decision_process": { "type": "consensus", "unanimous_consent": true },
            "modifications": {
                "sunset": "P3M",
                "cultural_additions": "Open each cleaning day with a shared meal",
            },
            "monitoring": { "who": ["water_committee", "farmer_rosa"], "frequency": "P1W" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{adoption}");
    let adoption_uri = adoption_uri.expect("location header");

    let reviews = adoption["trial_period"]["review_at"].as_array().unwrap();
    assert!(reviews.len() >= 11 && reviews.len() <= 13, "{reviews:?}");
    let conditions = adoption["revocation_conditions"].as_array().unwrap();
    assert_eq!(conditions.first().unwrap()["if"], "water_efficiency < 15%");
    assert_eq!(conditions.last().unwrap()["then"], "immediate_halt");
    assert!(adoption["relationship_ids"]["modifies"].is_string());
    assert!(adoption["learning_archive"]
        .as_str()
        .unwrap()
        .starts_with("/ipfs/"));

    let (status, _, resolved) = call(&node, "GET", &adoption_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["expired"], false);
    assert_eq!(resolved["object"]["type"], "egp_adopt");
    assert_eq!(resolved["object"]["status"], "active");
    assert_eq!(resolved["object"]["node_id"], "valley-node");
    assert_eq!(resolved["object"]["proposal_uri"], proposal_uri);
    assert_eq!(
        resolved["object"]["trial_period"]["original_sunset"],
        proposal["sunset_date"]
    );

    let (status, _, resolved) = call(&node, "GET", &proposal_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["object"]["sense_context"]["scope"], "upper_valley");
}

#[tokio::test]
async fn rejected_requests_explain_themselves() {
    let node = memory_node().await;

    let (status, _, body) = call(
        &node,
        "POST",
        "/sense",
        Some(json!({ "issue": "ok issue", "scope": "valley", "mood": "grim" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "\"mood\" is not allowed");

    let missing = "/sense/0000000000000000000000000000000000000000000000000000000000000000";
    let (status, _, body) = call(
        &node,
        "POST",
        "/propose",
        Some(json!({
            "title": "Fix the footbridge",
            "in_response_to": missing,
            "solution": { "description": "Replace the rotten planks" },
            "test": "Nobody falls through this winter",
            "sunset": "P1M",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "reference_not_found");
    assert_eq!(body["details"]["uri"], missing);

    let (_, sense_uri, _) = call(
        &node,
        "POST",
        "/sense",
        Some(json!({ "issue": "Footbridge rotting", "scope": "river_crossing" })),
    )
    .await;
    let (status, _, body) = call(
        &node,
        "POST",
        "/propose",
        Some(json!({
            "title": "Fix the footbridge",
            "in_response_to": sense_uri.unwrap(),
            "solution": { "description": "Replace the rotten planks" },
            "test": "Nobody falls through this winter",
            "sunset": "P25M",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_duration");
    assert_eq!(body["details"]["field"], "sunset");
}

#[tokio::test]
async fn adopting_a_sense_is_a_validation_error() {
    let node = memory_node().await;
    let (_, sense_uri, _) = call(
        &node,
        "POST",
        "/sense",
        Some(json!({ "issue": "Footbridge rotting", "scope": "river_crossing" })),
    )
    .await;

    let (status, _, body) = call(
        &node,
        "POST",
        "/adopt",
        Some(json!({
            "proposal_uri": sense_uri.unwrap(),
            "decision_process": { "type": "consent" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "proposal_uri");
}

#[tokio::test]
async fn ipfs_backed_node_stores_through_the_rpc_api() {
    let ipfs = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Version": "0.26.0" })))
        .mount(&ipfs)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Name": "object.json",
            "Hash": "QmSenseHash",
            "Size": "120",
        })))
        .expect(1)
        .mount(&ipfs)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Pins": ["QmSenseHash"] })))
        .expect(1)
        .mount(&ipfs)
        .await;

    let node = router(config(&[("IPFS_API_URL", ipfs.uri().as_str())])).await;
    let (status, location, body) = call(
        &node,
        "POST",
        "/sense",
        Some(json!({ "issue": "Footbridge rotting", "scope": "river_crossing" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(location.as_deref(), Some("/sense/QmSenseHash"));
    assert_eq!(body["echoes"], 0);
}

#[tokio::test]
async fn failing_ipfs_node_asks_clients_to_retry() {
    let ipfs = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/add"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&ipfs)
        .await;

    let node = router(config(&[("IPFS_API_URL", ipfs.uri().as_str())])).await;
    let request = Request::builder()
        .method("POST")
        .uri("/sense")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "issue": "Footbridge rotting", "scope": "river_crossing" }).to_string(),
        ))
        .unwrap();
    let response = node.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()[header::RETRY_AFTER], "30");
}

#[tokio::test]
async fn unresolvable_ipfs_sense_is_not_found() {
    let ipfs = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/cat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "Message": "invalid path \"S1\": invalid cid: selected encoding not supported",
            "Code": 0,
            "Type": "error",
        })))
        .mount(&ipfs)
        .await;

    let node = router(config(&[("IPFS_API_URL", ipfs.uri().as_str())])).await;
    let (status, _, body) = call(
        &node,
        "POST",
        "/propose",
        Some(json!({
            "title": "Fix the footbridge",
            "in_response_to": "/sense/S1",
            "solution": { "description": "Replace the rotten planks" },
            "test": "Nobody falls through this winter",
            "sunset": "P1M",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    assert_eq!(body["error"], "reference_not_found");
}
