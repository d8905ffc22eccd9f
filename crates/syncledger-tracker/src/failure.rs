//! First-error capture per side.

use syncledger_types::failure::{FailureOrigin, FailureReason};
use syncledger_types::trace::TraceError;

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedError {
    pub error: TraceError,
    pub emitted_at: f64,
}

/// Holds the first trace error reported by each side.
#[derive(Debug, Default)]
pub struct ErrorCapture {
    source: Option<CapturedError>,
    destination: Option<CapturedError>,
}

impl ErrorCapture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `error` if the source has not reported one yet. Returns whether
    /// it was kept.
    pub fn accept_source(&mut self, error: &TraceError, emitted_at: f64) -> bool {
        Self::accept(&mut self.source, error, emitted_at)
    }

    /// Keep `error` if the destination has not reported one yet. Returns
    /// whether it was kept.
    pub fn accept_destination(&mut self, error: &TraceError, emitted_at: f64) -> bool {
        Self::accept(&mut self.destination, error, emitted_at)
    }

    fn accept(slot: &mut Option<CapturedError>, error: &TraceError, emitted_at: f64) -> bool {
        if slot.is_some() {
            return false;
        }
        *slot = Some(CapturedError {
            error: error.clone(),
            emitted_at,
        });
        true
    }

    #[must_use]
    pub fn first_source_error(&self) -> Option<&CapturedError> {
        self.source.as_ref()
    }

    #[must_use]
    pub fn first_destination_error(&self) -> Option<&CapturedError> {
        self.destination.as_ref()
    }

    /// Terminal failure for the attempt. The source error wins when both
    /// sides reported one.
    #[must_use]
    pub fn derive_failure_reason(
        &self,
        timestamp: i64,
        attempt_number: u32,
    ) -> Option<FailureReason> {
        let (origin, captured) = match (&self.source, &self.destination) {
            (Some(src), _) => (FailureOrigin::Source, src),
            (None, Some(dst)) => (FailureOrigin::Destination, dst),
            (None, None) => return None,
        };
        Some(FailureReason::from_trace(
            origin,
            &captured.error,
            captured.emitted_at,
            timestamp,
            attempt_number,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_first_error_per_side() {
        let mut capture = ErrorCapture::new();
        assert!(capture.accept_source(&TraceError::new("source trace 1"), 123.0));
        assert!(!capture.accept_source(&TraceError::new("source trace 2"), 124.0));
        assert!(capture.accept_destination(&TraceError::new("dest trace 1"), 125.0));
        assert!(!capture.accept_destination(&TraceError::new("dest trace 2"), 126.0));

        assert_eq!(capture.first_source_error().unwrap().error.message, "source trace 1");
        assert_eq!(capture.first_destination_error().unwrap().emitted_at, 125.0);
    }

    #[test]
    fn source_error_takes_priority() {
        let mut capture = ErrorCapture::new();
        capture.accept_destination(&TraceError::new("dest"), 1.0);
        capture.accept_source(&TraceError::new("src"), 2.0);

        let reason = capture.derive_failure_reason(123, 1).unwrap();
        assert_eq!(reason.origin, FailureOrigin::Source);
        assert_eq!(reason.external_message, "src");
        assert_eq!(reason.timestamp, 123);
        assert_eq!(reason.attempt_number, 1);
    }

    #[test]
    fn destination_error_used_when_source_silent() {
        let mut capture = ErrorCapture::new();
        capture.accept_destination(&TraceError::new("dest trace 1"), 125.0);
        let reason = capture.derive_failure_reason(123, 1).unwrap();
        assert_eq!(reason.origin, FailureOrigin::Destination);
        assert_eq!(reason.emitted_at, 125.0);
    }

    #[test]
    fn no_errors_no_reason() {
        assert!(ErrorCapture::new().derive_failure_reason(123, 1).is_none());
    }
}
