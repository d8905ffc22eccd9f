use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use syncledger_tracker::collaborators::{
    CheckpointStore, CommittedRecordsProgress, ProgressPredicate,
};
use syncledger_tracker::config::{parser, validator};
use syncledger_tracker::{MergedCheckpoint, MessageTracker, TrackerConfig};
use syncledger_types::failure::FailureReason;
use syncledger_types::message::ProtocolMessage;
use syncledger_types::summary::SyncSummary;

/// Which connector emitted a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Origin {
    Source,
    Destination,
}

#[derive(Debug, Deserialize)]
struct TranscriptLine {
    origin: Origin,
    message: ProtocolMessage,
}

/// Result of replaying one transcript.
#[derive(Debug, Serialize)]
struct ReplayReport {
    summary: SyncSummary,
    failure_reason: Option<FailureReason>,
    made_progress: bool,
    rejected_messages: u64,
}

/// Writes the merged checkpoint as pretty JSON to a file.
struct FileCheckpointStore {
    path: PathBuf,
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, state: &MergedCheckpoint) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))
    }
}

/// Execute the `replay` command: feed a transcript through a tracker and
/// report what it accounted for.
pub fn execute(
    transcript: &Path,
    config_path: Option<&Path>,
    attempt: u32,
    state_out: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => parser::parse_config(path)
            .with_context(|| format!("Failed to parse tracker config: {}", path.display()))?,
        None => TrackerConfig::default(),
    };
    validator::validate_config(&config)?;

    let file = std::fs::File::open(transcript)
        .with_context(|| format!("Failed to open transcript: {}", transcript.display()))?;
    let tracker = MessageTracker::new(config);
    let rejected = replay(BufReader::new(file), &tracker)?;

    let summary = tracker.summary();
    let failed_at = chrono::Utc::now().timestamp_millis();
    let report = ReplayReport {
        made_progress: CommittedRecordsProgress.made_progress(&summary),
        failure_reason: tracker.derive_failure_reason(failed_at, attempt),
        summary,
        rejected_messages: rejected,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(path) = state_out {
        let store = FileCheckpointStore {
            path: path.to_path_buf(),
        };
        match tracker.committed_state() {
            Some(state) => store.save(&state)?,
            None => tracing::warn!("No checkpoint was acknowledged; state file not written"),
        }
    }
    Ok(())
}

/// Route every transcript line into `tracker`. Returns how many source
/// messages the tracker rejected.
fn replay(reader: impl BufRead, tracker: &MessageTracker) -> Result<u64> {
    let mut rejected = 0;
    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.with_context(|| format!("Failed to read transcript line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: TranscriptLine = serde_json::from_str(&line)
            .with_context(|| format!("Invalid transcript line {line_no}"))?;
        match entry.origin {
            Origin::Source => {
                if let Err(err) = tracker.from_source(&entry.message) {
                    tracing::warn!(line = line_no, error = %err, "Source message rejected");
                    rejected += 1;
                }
            }
            Origin::Destination => tracker.from_destination(&entry.message),
        }
    }
    Ok(rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TRANSCRIPT: &str = r#"
{"origin":"source","message":{"type":"record","body":{"stream":{"name":"users"},"data":{"id":1},"byte_size":8}}}
{"origin":"source","message":{"type":"record","body":{"stream":{"name":"users"},"data":{"id":2},"byte_size":8}}}
{"origin":"source","message":{"type":"checkpoint","body":{"kind":"global","data":{"cursor":2}}}}
{"origin":"source","message":{"type":"estimate","body":{"kind":"sync","byte_estimate":80,"row_estimate":10}}}
{"origin":"source","message":{"type":"estimate","body":{"kind":"stream","stream":{"name":"users"},"byte_estimate":1,"row_estimate":1}}}
{"origin":"destination","message":{"type":"checkpoint","body":{"kind":"global","data":{"cursor":2}}}}
{"origin":"source","message":{"type":"record","body":{"stream":{"name":"users"},"data":{"id":3},"byte_size":8}}}
"#;

    #[test]
    fn replays_transcript_and_skips_rejected_messages() {
        let tracker = MessageTracker::new(TrackerConfig::default());
        let rejected = replay(TRANSCRIPT.as_bytes(), &tracker).unwrap();
        assert_eq!(rejected, 1);

        let summary = tracker.summary();
        assert_eq!(summary.records_emitted, 3);
        assert_eq!(summary.bytes_emitted, 24);
        assert_eq!(summary.records_committed, Some(2));
        assert_eq!(summary.records_estimated, 10);
        assert!(CommittedRecordsProgress.made_progress(&summary));
    }

    #[test]
    fn malformed_line_is_an_error() {
        let tracker = MessageTracker::new(TrackerConfig::default());
        let err = replay("{\"origin\":\"sideways\"}\n".as_bytes(), &tracker).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn writes_committed_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = dir.path().join("attempt.jsonl");
        let state_out = dir.path().join("state.json");
        let mut file = std::fs::File::create(&transcript).unwrap();
        file.write_all(TRANSCRIPT.as_bytes()).unwrap();

        execute(&transcript, None, 1, Some(&state_out)).unwrap();

        let state: MergedCheckpoint =
            serde_json::from_str(&std::fs::read_to_string(&state_out).unwrap()).unwrap();
        assert!(matches!(state, MergedCheckpoint::Single { .. }));
    }

    #[test]
    fn no_state_file_without_acknowledgement() {
        let dir = tempfile::tempdir().unwrap();
        let transcript = dir.path().join("attempt.jsonl");
        let state_out = dir.path().join("state.json");
        std::fs::write(
            &transcript,
            r#"{"origin":"source","message":{"type":"checkpoint","body":{"kind":"legacy","data":"blob"}}}"#,
        )
        .unwrap();

        execute(&transcript, None, 1, Some(&state_out)).unwrap();
        assert!(!state_out.exists());
    }
}
