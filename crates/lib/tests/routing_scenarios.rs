//! Integration test: route driver messages end to end through the router with the in-memory
//! store and the LLM disabled. No network access needed.

use haul::config::Config;
use haul::driver::DriverStatus;
use haul::envelope::{EnvelopeKind, Outcome};
use haul::intent::Intent;
use haul::routing::IntentRouter;
use haul::store::{DriverStore, MemoryStore};
use std::sync::Arc;

fn router(store: &MemoryStore) -> IntentRouter {
    let mut config = Config::default();
    config.load_search.seed = Some(7);
    config.load_search.discovery_probability = 0.0;
    IntentRouter::from_config(&config, Arc::new(store.clone()))
}

#[tokio::test]
async fn fuel_expense_is_recorded() {
    let store = MemoryStore::new();
    let env = router(&store).route("Fuel expense 2500 at Delhi", "d1").await;
    assert_eq!(env.kind, EnvelopeKind::ExpenseTracking);
    assert_eq!(env.routed_to, Intent::ExpenseTracking);
    assert_eq!(env.status, Outcome::Success);

    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["amount"], 2500.0);
    assert_eq!(json["expense_type"], "fuel");
    assert_eq!(json["location"], "Delhi");
    assert_eq!(json["validation_status"], "passed");
    assert_eq!(store.expenses_for("d1").await.len(), 1);
}

#[tokio::test]
async fn busy_driver_is_marked_busy() {
    let store = MemoryStore::new();
    let env = router(&store).route("I am busy with a trip", "d2").await;
    assert_eq!(env.kind, EnvelopeKind::Availability);
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["driver_status"], "busy");
    assert_eq!(json["confidence"], 0.5);

    let stored = store.driver_status("d2").await.unwrap().map(|r| r.status);
    assert_eq!(stored, Some(DriverStatus::Busy));
    assert_eq!(store.interactions_for("d2").await.len(), 1);
}

#[tokio::test]
async fn load_query_lists_matching_loads() {
    let store = MemoryStore::new();
    let env = router(&store)
        .route("Looking for loads from Mumbai to Bangalore", "d3")
        .await;
    assert_eq!(env.kind, EnvelopeKind::LoadSearch);
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["source"], "Mumbai");
    assert_eq!(json["destination"], "Bangalore");
    assert_eq!(json["vehicle_type"], "any");
    assert_eq!(json["loads_found"], 1);
    assert_eq!(json["loads"][0], "LD002");
    assert!(env.response.contains("AVAILABLE LOADS FOUND"));
}

#[tokio::test]
async fn context_word_routes_to_load_search() {
    let store = MemoryStore::new();
    let env = router(&store).route("Need urgent work", "d4").await;
    assert_eq!(env.routed_to, Intent::LoadSearch);
}

#[tokio::test]
async fn zero_amount_expense_fails_without_saving() {
    let store = MemoryStore::new();
    let env = router(&store).route("Paid the toll bill", "d5").await;
    assert_eq!(env.kind, EnvelopeKind::ExpenseTracking);
    assert_eq!(env.status, Outcome::Failed);
    let json = serde_json::to_value(&env).unwrap();
    assert_eq!(json["validation_status"], "failed");
    assert!(store.expenses_for("d5").await.is_empty());
}

#[tokio::test]
async fn every_input_gets_a_complete_envelope() {
    let store = MemoryStore::new();
    let router = router(&store);
    let long = "load fuel free ".repeat(5_000);
    let inputs = [
        "",
        "   ",
        "नमस्ते, मैं खाली हूँ",
        "₹₹₹ 🚛🚛",
        "from to from to",
        long.as_str(),
    ];
    for input in inputs {
        let env = router.route(input, "d6").await;
        let json = serde_json::to_value(&env).unwrap();
        for key in ["type", "status", "response", "routed_to", "driver_id", "timestamp"] {
            assert!(json.get(key).is_some(), "missing {key} for {input:?}");
        }
        assert_eq!(json["driver_id"], "d6");
        assert!(!env.response.is_empty());
    }
}

#[tokio::test]
async fn empty_message_is_general() {
    let store = MemoryStore::new();
    let env = router(&store).route("", "d7").await;
    assert_eq!(env.kind, EnvelopeKind::General);
    assert_eq!(env.routed_to, Intent::General);
}
