use super::*;
use sift_core::{BusConfig, FakeClock};
use sift_storage::{FakeStore, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

#[test]
fn normalize_parses_json_lines() {
    let clock = FakeClock::new();
    let event = normalize(r#"{"want":"tacos"}"#, "stdin", &clock);
    assert_eq!(event.payload, json!({"want": "tacos"}));
    assert_eq!(event.kind.as_deref(), Some("stdin"));
    assert_eq!(event.id.as_deref(), Some("2023-11-14T22:13:20.000000000Z"));
}

#[test]
fn normalize_wraps_malformed_lines() {
    let event = normalize("tacos, please", "orders", &FakeClock::new());
    assert_eq!(event.payload, json!({"raw": "tacos, please"}));
    assert_eq!(event.kind.as_deref(), Some("orders"));
}

#[test]
fn normalize_ids_follow_the_clock() {
    let clock = FakeClock::new();
    let first = normalize("1", "t", &clock);
    clock.advance(Duration::from_nanos(1));
    let second = normalize("2", "t", &clock);
    assert!(second.id > first.id);
}

#[tokio::test]
async fn ingest_publishes_until_eof() {
    let store = FakeStore::new();
    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let (bus, coordinator) = Bus::new(BusConfig::default().with_workers(1), Some(shared));
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(coordinator.run(cancel.clone()));

    let input: &[u8] = b"{\"want\":\"tacos\"}\n\n   \nnot json\n";
    let published = ingest(
        bus.clone(),
        cancel.clone(),
        BufReader::new(input),
        "stdin".to_string(),
        FakeClock::new(),
    )
    .await
    .unwrap();
    assert_eq!(published, 2);

    // Dropping the last handle lets the coordinator drain and stop
    drop(bus);
    assert_eq!(handle.await.unwrap(), Ok(()));

    let payloads: Vec<Value> = store.events().into_iter().map(|e| e.payload).collect();
    assert_eq!(payloads, vec![json!({"want": "tacos"}), json!({"raw": "not json"})]);
}

#[tokio::test]
async fn ingest_stops_on_cancel() {
    let (bus, _coordinator) = Bus::new(BusConfig::default(), None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (_writer, reader) = tokio::io::duplex(64);
    let result = ingest(
        bus,
        cancel,
        BufReader::new(reader),
        "stdin".to_string(),
        FakeClock::new(),
    )
    .await;
    assert_eq!(result, Err(BusError::Canceled));
}
