//! Integration tests through the public API
//!
//! Tests the full end-to-end flow: worker config file → source → protocol messages

use pretty_assertions::assert_eq;
use serde_json::json;
use solidafy_replication::cdc::{
    ChangeEvent, ChangeEventIterator, DebeziumEnvelopeConverter, OffsetFieldTracker,
    ReplicationPosition, CDC_DELETED_AT, CDC_LSN,
};
use solidafy_replication::config::{CdcConfig, WorkerSourceConfig};
use solidafy_replication::protocol::{MessageCategory, StateType};
use solidafy_replication::source::{read_to_end, Lifecycle};
use solidafy_replication::{
    CdcSource, CheckpointVariant, Error, Message, ResetStateEmitter, Source, StreamDescriptor,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn write_config(dir: &Path, name: &str, content: &str) -> WorkerSourceConfig {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    WorkerSourceConfig::from_file(&path).unwrap()
}

async fn run_reset(config: &WorkerSourceConfig) -> Vec<Message> {
    let mut source = ResetStateEmitter::new();
    source.start(config, Path::new("/tmp/job")).await.unwrap();
    let messages = read_to_end(&mut source).await.unwrap();
    source.close().await.unwrap();
    messages
}

fn checkpoints(messages: &[Message]) -> Vec<CheckpointVariant> {
    messages
        .iter()
        .map(|m| CheckpointVariant::try_from(m.as_state().unwrap().clone()).unwrap())
        .collect()
}

// ============================================================================
// Reset Integration Tests
// ============================================================================

#[tokio::test]
async fn test_reset_without_configuration_emits_empty_legacy() {
    let messages = run_reset(&WorkerSourceConfig::default()).await;

    assert_eq!(messages.len(), 1);
    let line = messages[0].to_json_line().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["type"], "STATE");
    assert_eq!(parsed["state"]["stateType"], "LEGACY");
    assert_eq!(parsed["state"]["data"], json!({}));
}

#[tokio::test]
async fn test_reset_per_stream_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "source.yaml",
        r#"
sourceId: src-1
sourceConnectionConfiguration:
  streamsToReset:
    - name: users
      namespace: public
    - name: orders
    - name: users
      namespace: public
state:
  state:
    - type: STREAM
      stream:
        streamDescriptor: {name: users, namespace: public}
        streamState: {cursor: 10}
catalog:
  streams:
    - stream: {name: users, namespace: public}
    - stream: {name: orders}
"#,
    );

    let messages = run_reset(&config).await;

    assert_eq!(
        checkpoints(&messages),
        vec![
            CheckpointVariant::reset_stream(
                StreamDescriptor::new("users").with_namespace("public")
            ),
            CheckpointVariant::reset_stream(StreamDescriptor::new("orders")),
        ]
    );
    assert!(messages
        .iter()
        .all(|m| m.message_type().category() == MessageCategory::State));
}

#[tokio::test]
async fn test_reset_partial_global_keeps_shared_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "source.json",
        &json!({
            "sourceConnectionConfiguration": {"streamsToReset": [{"name": "a"}, {"name": "c"}]},
            "state": {"state": [{
                "type": "GLOBAL",
                "global": {
                    "sharedState": {"lsn": 42},
                    "streamStates": [
                        {"streamDescriptor": {"name": "a"}, "streamState": {"x": 1}},
                        {"streamDescriptor": {"name": "b"}, "streamState": {"x": 2}}
                    ]
                }
            }]}
        })
        .to_string(),
    );

    let messages = run_reset(&config).await;

    assert_eq!(messages.len(), 1);
    let state = messages[0].as_state().unwrap();
    assert_eq!(state.state_type, Some(StateType::Global));
    assert_eq!(
        serde_json::to_value(state.global.as_ref().unwrap()).unwrap(),
        json!({
            "sharedState": {"lsn": 42},
            "streamStates": [
                {"streamDescriptor": {"name": "a"}, "streamState": null},
                {"streamDescriptor": {"name": "b"}, "streamState": {"x": 2}},
                {"streamDescriptor": {"name": "c"}, "streamState": null}
            ]
        })
    );
}

#[tokio::test]
async fn test_reset_partial_legacy_is_rejected() {
    let config = WorkerSourceConfig::from_json_str(
        &json!({
            "sourceConnectionConfiguration": {"streamsToReset": [{"name": "a"}]},
            "state": {"state": {"cursor": 5}},
            "catalog": {"streams": [{"stream": {"name": "a"}}, {"stream": {"name": "b"}}]}
        })
        .to_string(),
    )
    .unwrap();

    let mut source = ResetStateEmitter::new();
    let err = source
        .start(&config, Path::new("/tmp/job"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidState { .. }));
}

#[tokio::test]
async fn test_reset_cancel_before_read() {
    let mut source = ResetStateEmitter::new();
    source
        .start(&WorkerSourceConfig::default(), Path::new("/tmp/job"))
        .await
        .unwrap();

    source.cancel().unwrap();

    assert!(source.attempt_read().await.unwrap().is_none());
    assert!(source.is_finished().unwrap());
    assert_eq!(source.lifecycle(), Lifecycle::Cancelled);
}

// ============================================================================
// CDC Integration Tests
// ============================================================================

fn envelope(table: &str, op: &str, id: u64, lsn: i64) -> ChangeEvent {
    let image = json!({"id": id});
    let (before, after) = if op == "d" {
        (image, serde_json::Value::Null)
    } else {
        (serde_json::Value::Null, image)
    };
    ChangeEvent::data(
        Some(json!({"id": id}).to_string()),
        json!({
            "before": before,
            "after": after,
            "op": op,
            "source": {"schema": "public", "table": table, "lsn": lsn, "ts_ms": 1_700_000_000_000_i64}
        })
        .to_string(),
    )
}

fn heartbeat(lsn: i64) -> ChangeEvent {
    let mut fields = serde_json::Map::new();
    fields.insert("lsn".to_string(), json!(lsn));
    ChangeEvent::heartbeat(fields)
}

#[tokio::test]
async fn test_cdc_read_until_target_from_producer_thread() {
    let config = WorkerSourceConfig::from_json_str(
        &json!({
            "sourceConnectionConfiguration": {"initial_waiting_seconds": 2},
            "catalog": {"streams": [
                {"stream": {"name": "users", "namespace": "public"}, "sync_mode": "incremental"}
            ]}
        })
        .to_string(),
    )
    .unwrap();
    let cdc = CdcConfig::from_connection_config(
        config.source_connection_configuration.as_ref().unwrap(),
    )
    .unwrap()
    .with_queue_capacity(2);
    assert_eq!(cdc.idle_wait, Duration::from_secs(2));

    let (tx, rx) = mpsc::channel(cdc.queue_capacity);
    let running = Arc::new(AtomicBool::new(true));
    let producer_running = Arc::clone(&running);
    let producer = std::thread::spawn(move || {
        let events = vec![
            envelope("users", "c", 1, 10),
            envelope("users", "u", 1, 20),
            heartbeat(25),
            envelope("users", "d", 1, 30),
            heartbeat(30),
            envelope("users", "c", 2, 40),
        ];
        for event in events {
            if tx.blocking_send(event).is_err() {
                break;
            }
        }
        producer_running.store(false, Ordering::Release);
    });

    let probe = Arc::clone(&running);
    let iterator = ChangeEventIterator::new(
        rx,
        OffsetFieldTracker::lsn(),
        ReplicationPosition::new(30),
        move || probe.load(Ordering::Acquire),
        || {},
        cdc.idle_wait,
    );
    let mut source = CdcSource::new(iterator, DebeziumEnvelopeConverter);
    source.start(&config, Path::new("/tmp/job")).await.unwrap();

    let messages = read_to_end(&mut source).await.unwrap();
    source.close().await.unwrap();
    producer.join().unwrap();

    let records: Vec<_> = messages
        .iter()
        .map(|m| match m {
            Message::Record { record } => record,
            other => panic!("unexpected message {other:?}"),
        })
        .collect();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].data["id"], 1);
    assert!(records[2].data[CDC_DELETED_AT].is_string());
    assert_eq!(records[2].data[CDC_LSN], 30);
    assert!(records[0].data[CDC_DELETED_AT].is_null());
    assert_eq!(source.lifecycle(), Lifecycle::Closed);
}

#[tokio::test]
async fn test_cdc_read_stops_when_engine_stops() {
    let (tx, rx) = mpsc::channel(4);
    tx.send(envelope("users", "c", 1, 10)).await.unwrap();

    let iterator = ChangeEventIterator::new(
        rx,
        OffsetFieldTracker::lsn(),
        ReplicationPosition::new(1_000),
        || false,
        || {},
        Duration::from_millis(10),
    );
    let config = WorkerSourceConfig::from_json_str(
        &json!({"catalog": {"streams": [
            {"stream": {"name": "users", "namespace": "public"}, "sync_mode": "incremental"}
        ]}})
        .to_string(),
    )
    .unwrap();
    let mut source = CdcSource::new(iterator, DebeziumEnvelopeConverter);
    source.start(&config, Path::new("/tmp/job")).await.unwrap();

    let messages = read_to_end(&mut source).await.unwrap();

    assert_eq!(messages.len(), 1);
    assert!(source.is_finished().unwrap());
    drop(tx);
}
