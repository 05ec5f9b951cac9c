//! Tests for CdcSource

use super::*;
use crate::cdc::{
    ChangeEvent, ChangeEventIterator, DebeziumEnvelopeConverter, OffsetFieldTracker,
    ReplicationPosition,
};
use crate::config::{ConfiguredCatalog, ConfiguredStream};
use crate::error::Error;
use crate::state::StreamDescriptor;
use crate::types::{JsonObject, SyncMode};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

fn change(table: &str, id: u32) -> ChangeEvent {
    ChangeEvent::data(
        None,
        json!({
            "after": {"id": id},
            "op": "c",
            "source": {"schema": "public", "table": table, "ts_ms": 1_700_000_000_000_i64}
        })
        .to_string(),
    )
}

fn heartbeat(lsn: i64) -> ChangeEvent {
    let mut fields = JsonObject::new();
    fields.insert("lsn".to_string(), json!(lsn));
    ChangeEvent::heartbeat(fields)
}

fn source(rx: mpsc::Receiver<ChangeEvent>, closes: Arc<AtomicUsize>) -> CdcSource {
    let events = ChangeEventIterator::new(
        rx,
        OffsetFieldTracker::lsn(),
        ReplicationPosition::new(100),
        || true,
        move || {
            closes.fetch_add(1, Ordering::SeqCst);
        },
        Duration::from_millis(20),
    );
    CdcSource::new(events, DebeziumEnvelopeConverter)
}

fn config() -> WorkerSourceConfig {
    let users = StreamDescriptor::new("users").with_namespace("public");
    let mut audit = ConfiguredStream::incremental(&StreamDescriptor::new("audit").with_namespace("public"));
    audit.sync_mode = SyncMode::FullRefresh;
    WorkerSourceConfig {
        catalog: ConfiguredCatalog {
            streams: vec![ConfiguredStream::incremental(&users), audit],
        },
        ..WorkerSourceConfig::default()
    }
}

#[tokio::test]
async fn test_cdc_source_requires_start() {
    let (_tx, rx) = mpsc::channel(4);
    let mut source = source(rx, Arc::new(AtomicUsize::new(0)));

    assert!(matches!(
        source.attempt_read().await.unwrap_err(),
        Error::IllegalUsage { .. }
    ));
    assert!(matches!(
        source.is_finished().unwrap_err(),
        Error::IllegalUsage { .. }
    ));
}

#[tokio::test]
async fn test_cdc_source_emits_records_for_incremental_streams() {
    let (tx, rx) = mpsc::channel(16);
    let closes = Arc::new(AtomicUsize::new(0));
    let mut source = source(rx, closes.clone());
    source.start(&config(), &PathBuf::from("/tmp/job")).await.unwrap();

    tx.send(change("users", 1)).await.unwrap();
    tx.send(change("orders", 2)).await.unwrap();
    tx.send(heartbeat(50)).await.unwrap();
    tx.send(change("audit", 3)).await.unwrap();
    tx.send(change("users", 4)).await.unwrap();
    tx.send(heartbeat(100)).await.unwrap();

    let messages = read_to_end(&mut source).await.unwrap();

    let ids: Vec<_> = messages
        .iter()
        .map(|m| match m {
            Message::Record { record } => {
                assert_eq!(record.stream, "users");
                assert_eq!(record.namespace.as_deref(), Some("public"));
                record.data["id"].as_u64().unwrap()
            }
            other => panic!("unexpected message {other:?}"),
        })
        .collect();
    assert_eq!(ids, vec![1, 4]);
    assert_eq!(source.records_emitted(), 2);
    assert_eq!(source.lifecycle(), Lifecycle::Finished);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cdc_source_propagates_conversion_errors() {
    let (tx, rx) = mpsc::channel(4);
    let mut source = source(rx, Arc::new(AtomicUsize::new(0)));
    source.start(&config(), &PathBuf::from("/tmp/job")).await.unwrap();

    tx.send(ChangeEvent::data(None, "garbage")).await.unwrap();

    let err = source.attempt_read().await.unwrap_err();
    assert!(matches!(err, Error::Conversion { .. }));
}

#[tokio::test]
async fn test_cdc_source_close_fires_on_close_once() {
    let (tx, rx) = mpsc::channel(4);
    let closes = Arc::new(AtomicUsize::new(0));
    let mut source = source(rx, closes.clone());
    source.start(&config(), &PathBuf::from("/tmp/job")).await.unwrap();

    source.close().await.unwrap();
    source.close().await.unwrap();

    assert!(source.is_finished().unwrap());
    assert_eq!(source.lifecycle(), Lifecycle::Closed);
    assert!(source.attempt_read().await.unwrap().is_none());
    assert!(tx.send(change("users", 1)).await.is_err());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cdc_source_cancel() {
    let (_tx, rx) = mpsc::channel(4);
    let closes = Arc::new(AtomicUsize::new(0));
    let mut source = source(rx, closes.clone());
    source.start(&config(), &PathBuf::from("/tmp/job")).await.unwrap();

    source.cancel().unwrap();
    assert_eq!(source.lifecycle(), Lifecycle::Cancelled);

    assert!(source.attempt_read().await.unwrap().is_none());
    assert!(source.is_finished().unwrap());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}
