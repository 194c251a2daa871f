// Tests for wiring a node from configuration.
use std::collections::HashMap;
use std::fs;

use egp::{build_engine, open_store, verify_protocol_compatibility, Cancellation, NodeConfig};
use egp_protocol::validate::{AdoptInput, ProposeInput, SenseInput};
use serde_json::json;
use tempfile::tempdir;
use test_case::test_case;

fn config(pairs: &[(&str, &str)]) -> NodeConfig {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    NodeConfig::from_lookup(|key| env.get(key).cloned()).expect("config loads")
}

const RAINFALL_RULES: &str = r#"
rules:
  - id: rainfall
    priority: 5
    matcher:
      type: contains
      text: rainwater
    condition: "rainfall_capture < {threshold}%"
    threshold_offset: -5
    action: trigger_review
    recorded_by:
      type: fixed
      value: "sensor:rain_gauge"
"#;

#[tokio::test]
async fn configured_rules_replace_the_builtin_set() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("rules.yaml");
    fs::write(&path, RAINFALL_RULES).expect("write rules");

    let path = path.display().to_string();
    let config = config(&[("EGP_STORE", "memory"), ("EGP_REVOCATION_RULES", path.as_str())]);
    let store = open_store(&config).await.expect("store opens");
    let engine = build_engine(&config, store).expect("engine builds");
    let cancel = Cancellation::none();

    let sense = engine
        .sense(
            SenseInput::from_value(&json!({ "issue": "Dry season wells", "scope": "hill_farms" }))
                .unwrap(),
            &cancel,
        )
        .await
        .unwrap();
    let proposal = engine
        .propose(
            ProposeInput::from_value(&json!({
                "title": "Roof catchment tanks",
                "in_response_to": format!("/sense/{}", sense.id),
                "solution": { "description": "Fit every roof with a catchment tank" },
                "test": "rainwater covers 40% of household demand",
                "sunset": "P4M",
            }))
            .unwrap(),
            &cancel,
        )
        .await
        .unwrap();
    let adoption = engine
        .adopt(
            AdoptInput::from_value(&json!({
                "proposal_uri": format!("/propose/{}", proposal.id),
                "decision_process": { "type": "elder_council" },
            }))
            .unwrap(),
            &cancel,
        )
        .await
        .unwrap();

    let conditions: Vec<&str> = adoption
        .revocation_conditions
        .iter()
        .map(|condition| condition.condition.as_str())
        .collect();
    assert_eq!(
        conditions,
        vec!["rainfall_capture < 35%", "critical_failure_reported"]
    );
    assert_eq!(
        adoption.revocation_conditions[0].recorded_by.as_deref(),
        Some("sensor:rain_gauge")
    );
}

#[tokio::test]
async fn broken_rules_file_stops_startup() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("rules.yaml");
    fs::write(&path, "rules: [ { id: 3 ").expect("write rules");

    let path = path.display().to_string();
    let config = config(&[("EGP_STORE", "memory"), ("EGP_REVOCATION_RULES", path.as_str())]);
    let store = open_store(&config).await.expect("store opens");
    let err = build_engine(&config, store).err().expect("rules rejected");
    assert!(err.to_string().contains("failed to load revocation rules"));
}

#[tokio::test]
async fn unreachable_ipfs_without_infura_still_starts() {
    let config = config(&[("IPFS_API_URL", "http://127.0.0.1:9")]);
    let store = open_store(&config).await.expect("store opens");
    assert_eq!(store.backend, "ipfs");
}

#[test_case("0.1.0-alpha", true ; "same release")]
#[test_case("0.1.7", true ; "patch release")]
#[test_case("0.2.0", false ; "newer minor before one point oh")]
#[test_case("1.0.0", false ; "different major")]
fn protocol_compatibility(version: &str, compatible: bool) {
    assert_eq!(verify_protocol_compatibility(version), compatible);
}
