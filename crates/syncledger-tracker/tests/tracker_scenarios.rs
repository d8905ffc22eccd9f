use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use syncledger_tracker::{MessageTracker, TrackerConfig, TrackerError, TrackerHealth};
use syncledger_types::checkpoint::CheckpointMessage;
use syncledger_types::estimate::EstimateMessage;
use syncledger_types::failure::FailureOrigin;
use syncledger_types::message::{ProtocolMessage, RecordMessage};
use syncledger_types::stream::StreamKey;
use syncledger_types::trace::{TraceError, TraceMessage};

fn record(stream: &str) -> ProtocolMessage {
    RecordMessage::new(StreamKey::new(stream), json!({"name": stream})).into()
}

fn global(n: u64) -> ProtocolMessage {
    CheckpointMessage::Global {
        data: json!({"cursor": n}),
    }
    .into()
}

fn counts(pairs: &[(&str, u64)]) -> HashMap<StreamKey, u64> {
    pairs
        .iter()
        .map(|(name, n)| (StreamKey::new(*name), *n))
        .collect()
}

#[test]
fn emitted_records_and_checkpoints_are_counted() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    for _ in 0..3 {
        tracker.from_source(&record("iron-man")).unwrap();
    }
    tracker.from_source(&global(1)).unwrap();
    tracker.from_source(&global(2)).unwrap();

    let summary = tracker.summary();
    assert_eq!(summary.records_emitted, 3);
    assert_eq!(summary.source_checkpoints_emitted, 2);
    assert_eq!(summary.destination_checkpoints_received, 0);
}

#[test]
fn interleaved_streams_without_checkpoints() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    for stream in ["C", "B", "A", "C", "B", "C"] {
        tracker.from_source(&record(stream)).unwrap();
    }
    let emitted = tracker.with_stats(|stats| stats.stream_to_emitted_records());
    assert_eq!(emitted, counts(&[("A", 1), ("B", 2), ("C", 3)]));
    assert_eq!(
        tracker.with_stats(|stats| stats.stream_to_committed_records()),
        Some(counts(&[("A", 0), ("B", 0), ("C", 0)]))
    );
}

#[test]
fn committed_counts_follow_acknowledgements() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    tracker.from_source(&record("A")).unwrap();
    tracker.from_source(&record("B")).unwrap();
    tracker.from_source(&record("B")).unwrap();
    tracker.from_source(&global(1)).unwrap();
    tracker.from_source(&record("A")).unwrap();
    tracker.from_source(&record("B")).unwrap();
    tracker.from_destination(&global(1));
    tracker.from_source(&record("C")).unwrap();
    tracker.from_source(&record("A")).unwrap();
    tracker.from_source(&global(2)).unwrap();

    assert_eq!(
        tracker.with_stats(|stats| stats.stream_to_committed_records()),
        Some(counts(&[("A", 1), ("B", 2), ("C", 0)]))
    );
    assert_eq!(tracker.total_records_committed(), Some(3));
    assert!(tracker.summary().pending_state_bytes > 0);

    tracker.from_destination(&global(2));

    assert_eq!(
        tracker.with_stats(|stats| stats.stream_to_committed_records()),
        Some(counts(&[("A", 3), ("B", 3), ("C", 1)]))
    );
    let summary = tracker.summary();
    assert_eq!(summary.records_committed, Some(7));
    assert_eq!(summary.records_emitted, 7);
    assert_eq!(summary.bytes_committed, Some(summary.bytes_emitted));
    assert_eq!(summary.pending_state_bytes, 0);
    assert_eq!(summary.destination_checkpoints_received, 2);
}

#[test]
fn memory_ceiling_breach_makes_committed_unavailable_for_good() {
    let tracker = MessageTracker::new(TrackerConfig {
        max_pending_state_bytes: 1,
        ..TrackerConfig::default()
    });
    tracker.from_source(&record("A")).unwrap();
    tracker.from_source(&global(1)).unwrap();
    assert_eq!(tracker.health(), TrackerHealth::Failed);

    tracker.from_destination(&global(1));
    tracker.from_source(&record("A")).unwrap();
    tracker.from_source(&record("B")).unwrap();

    let summary = tracker.summary();
    assert_eq!(summary.records_committed, None);
    assert_eq!(summary.bytes_committed, None);
    assert_eq!(summary.records_emitted, 3);
    assert!(summary.streams.iter().all(|s| s.records_committed.is_none()));
    assert_eq!(
        tracker.with_stats(|stats| stats.stream_to_emitted_records()),
        counts(&[("A", 2), ("B", 1)])
    );
    assert!(summary.to_string().contains("unknown"));
}

#[test]
fn unknown_acknowledgement_fails_even_if_later_ones_would_succeed() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    tracker.from_source(&record("A")).unwrap();
    tracker.from_destination(&global(1));
    assert_eq!(tracker.total_records_committed(), None);

    tracker.from_source(&global(1)).unwrap();
    tracker.from_source(&global(2)).unwrap();
    tracker.from_destination(&global(2));
    assert_eq!(tracker.total_records_committed(), None);
    assert_eq!(tracker.total_records_emitted(), 1);
}

#[test]
fn conflicting_estimate_shapes_are_rejected() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    tracker
        .from_source(
            &EstimateMessage::Stream {
                stream: StreamKey::new("A"),
                byte_estimate: 100,
                row_estimate: 10,
            }
            .into(),
        )
        .unwrap();
    let err = tracker
        .from_source(
            &EstimateMessage::Sync {
                byte_estimate: 5,
                row_estimate: 5,
            }
            .into(),
        )
        .unwrap_err();
    assert!(matches!(err, TrackerError::InputContractViolation(_)));

    let summary = tracker.summary();
    assert_eq!(summary.records_estimated, 10);
    assert_eq!(summary.bytes_estimated, 100);
    assert_eq!(
        tracker.with_stats(|stats| stats.stream_to_estimated_records()),
        counts(&[("A", 10)])
    );
}

#[test]
fn sync_estimate_then_stream_estimate_is_rejected() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    tracker
        .from_source(
            &EstimateMessage::Sync {
                byte_estimate: 500,
                row_estimate: 50,
            }
            .into(),
        )
        .unwrap();
    assert!(tracker
        .from_source(
            &EstimateMessage::Stream {
                stream: StreamKey::new("A"),
                byte_estimate: 1,
                row_estimate: 1,
            }
            .into(),
        )
        .is_err());
    assert_eq!(tracker.summary().records_estimated, 50);
    assert!(tracker
        .with_stats(|stats| stats.stream_to_estimated_records())
        .is_empty());
}

#[test]
fn only_first_error_per_side_shapes_failure_reason() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    let dest_error = |msg: &str, at: f64| -> ProtocolMessage {
        TraceMessage::error(TraceError::new(msg), at).into()
    };

    tracker.from_destination(&dest_error("disk full", 10.0));
    tracker.from_destination(&dest_error("connection reset", 11.0));
    let reason = tracker.derive_failure_reason(1_000, 2).unwrap();
    assert_eq!(reason.origin, FailureOrigin::Destination);
    assert_eq!(reason.external_message, "disk full");
    assert_eq!(reason.attempt_number, 2);

    tracker
        .from_source(&TraceMessage::error(TraceError::new("auth failed"), 12.0).into())
        .unwrap();
    tracker
        .from_source(&TraceMessage::error(TraceError::new("timeout"), 13.0).into())
        .unwrap();
    let reason = tracker.derive_failure_reason(1_000, 2).unwrap();
    assert_eq!(reason.origin, FailureOrigin::Source);
    assert_eq!(reason.external_message, "auth failed");
    assert_eq!(reason.emitted_at, 12.0);
}

#[test]
fn stream_indices_follow_first_observation_across_checkpoints() {
    let tracker = MessageTracker::new(TrackerConfig::default());
    tracker
        .from_source(
            &CheckpointMessage::Stream {
                stream: StreamKey::new("orders"),
                data: json!({"id": 1}),
            }
            .into(),
        )
        .unwrap();
    tracker.from_source(&record("users")).unwrap();
    tracker.from_source(&record("orders")).unwrap();

    let order: Vec<String> = tracker
        .summary()
        .streams
        .into_iter()
        .map(|s| s.stream.name)
        .collect();
    assert_eq!(order, vec!["orders", "users"]);
}

#[test]
fn concurrent_source_and_destination_paths() {
    const CHECKPOINTS: u64 = 200;
    const RECORDS_PER_CHECKPOINT: u64 = 5;

    let tracker = Arc::new(MessageTracker::new(TrackerConfig::default()));
    let (tx, rx) = std::sync::mpsc::channel();

    let source = {
        let tracker = Arc::clone(&tracker);
        std::thread::spawn(move || {
            for n in 0..CHECKPOINTS {
                for _ in 0..RECORDS_PER_CHECKPOINT {
                    tracker.from_source(&record("A")).unwrap();
                }
                tracker.from_source(&global(n)).unwrap();
                tx.send(n).unwrap();
            }
        })
    };
    let destination = {
        let tracker = Arc::clone(&tracker);
        std::thread::spawn(move || {
            let mut last_committed = 0;
            for n in rx {
                tracker.from_destination(&global(n));
                let committed = tracker.total_records_committed().unwrap();
                assert!(committed >= last_committed);
                assert_eq!(committed % RECORDS_PER_CHECKPOINT, 0);
                last_committed = committed;
            }
        })
    };

    source.join().unwrap();
    destination.join().unwrap();

    assert_eq!(tracker.health(), TrackerHealth::Healthy);
    assert_eq!(
        tracker.total_records_committed(),
        Some(CHECKPOINTS * RECORDS_PER_CHECKPOINT)
    );
    assert_eq!(tracker.summary().pending_state_bytes, 0);
}
