//! Batch processing under both failure policies

mod common;

use common::*;
use orders_cdc::constants::attributes;
use orders_cdc::error::SyncError;
use orders_cdc::models::{EventName, StreamEvent};
use orders_cdc::sync::{BatchFailurePolicy, BatchProcessor};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn malformed_event(order_id: &str) -> orders_cdc::models::ChangeRecord {
    OrderEventBuilder::new(EventName::Insert, order_id)
        .without(attributes::STATUS)
        .build()
}

#[tokio::test]
async fn test_clean_batch_counts_each_outcome() {
    let table = Arc::new(ScriptedOrderTable::new().on_update(Ok(0)));
    let sleeper = Arc::new(RecordingSleeper::new());
    let processor = BatchProcessor::new(controller(&table, &sleeper), BatchFailurePolicy::AbortBatch);

    let records = vec![
        modify_event("ord-1"),
        insert_event("ord-2"),
        remove_event("ord-3"),
        modify_event("ord-4"),
    ];
    let report = processor
        .process_batch(&records, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.total, 4);
    // ord-1 fell back to insert; ord-4 updated one row
    assert_eq!(report.inserted, 2);
    assert_eq!(report.updated, 1);
    assert_eq!(report.removals_ignored, 1);
    assert_eq!(report.applied(), 3);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_abort_policy_stops_at_first_failure() {
    let table = Arc::new(ScriptedOrderTable::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let processor = BatchProcessor::new(controller(&table, &sleeper), BatchFailurePolicy::AbortBatch);

    let records = vec![
        insert_event("ord-1"),
        malformed_event("ord-2"),
        insert_event("ord-3"),
    ];
    let err = processor
        .process_batch(&records, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        SyncError::BatchAborted {
            position,
            event_id,
            source,
        } => {
            assert_eq!(position, 1);
            assert_eq!(event_id, "evt-ord-2");
            assert!(matches!(*source, SyncError::MissingField { ref field } if field == "status"));
        }
        other => panic!("expected BatchAborted, got {other:?}"),
    }
    // ord-3 never reached the table
    assert_eq!(table.statement_count(), 1);
}

#[tokio::test]
async fn test_skip_policy_records_failures_and_continues() {
    let table = Arc::new(ScriptedOrderTable::new().on_insert(Ok(())).on_insert(Err(fatal_error())));
    let sleeper = Arc::new(RecordingSleeper::new());
    let processor = BatchProcessor::new(controller(&table, &sleeper), BatchFailurePolicy::SkipRecord);

    let records = vec![
        insert_event("ord-1"),
        insert_event("ord-2"),
        malformed_event("ord-3"),
        insert_event("ord-4"),
    ];
    let report = processor
        .process_batch(&records, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.failures.len(), 2);

    let database_failure = &report.failures[0];
    assert_eq!(database_failure.position, 1);
    assert_eq!(database_failure.order_id, "ord-2");
    assert!(!database_failure.data_error);

    let data_failure = &report.failures[1];
    assert_eq!(data_failure.position, 2);
    assert_eq!(data_failure.order_id, "ord-3");
    assert!(data_failure.data_error);
}

#[tokio::test]
async fn test_cancellation_aborts_even_when_skipping() {
    let table = Arc::new(ScriptedOrderTable::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let processor = BatchProcessor::new(controller(&table, &sleeper), BatchFailurePolicy::SkipRecord);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = processor
        .process_batch(&[insert_event("ord-1")], &cancel)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SyncError::BatchAborted { ref source, .. } if source.is_cancelled()
    ));
    assert_eq!(table.statement_count(), 0);
}

#[tokio::test]
async fn test_stream_event_envelope_feeds_the_batch() {
    let payload = r#"{
        "Records": [
            {
                "eventID": "1",
                "eventName": "INSERT",
                "eventVersion": "1.1",
                "eventSource": "aws:dynamodb",
                "dynamodb": {
                    "Keys": {"p_key": {"S": "ord-1"}},
                    "NewImage": {
                        "p_key": {"S": "ord-1"},
                        "merchant_id": {"S": "m-1"},
                        "amount": {"N": "42.5"},
                        "currency": {"S": "USD"},
                        "status": {"S": "NEW"},
                        "created_at": {"N": "1700000000"},
                        "updated_at": {"N": "1700000000"}
                    },
                    "SequenceNumber": "111"
                }
            },
            {
                "eventID": "2",
                "eventName": "REMOVE",
                "dynamodb": {"Keys": {"p_key": {"S": "ord-0"}}}
            }
        ]
    }"#;
    let event: StreamEvent = serde_json::from_str(payload).unwrap();

    let table = Arc::new(ScriptedOrderTable::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let processor = BatchProcessor::new(controller(&table, &sleeper), BatchFailurePolicy::default());

    let report = processor
        .process_batch(&event.into_change_records(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.removals_ignored, 1);
    assert_eq!(table.statement_count(), 1);
}
