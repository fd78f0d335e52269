//! Outcome log for a provisioning session.
//!
//! The log is created empty when a session starts, appended to by the
//! executor only, and read by reporting code once the run is over.

mod types;

use serde::Serialize;

pub use types::{
  AbortCause, AbortInfo, AttemptOutcome, AttemptRecord, FinalStatus, OperationOutcome, SkipReason, Summary,
};

/// Ordered attempt history plus the final status of every operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutcomeLog {
  attempts: Vec<AttemptRecord>,
  outcomes: Vec<OperationOutcome>,
  #[serde(skip_serializing_if = "Option::is_none")]
  aborted: Option<AbortInfo>,
}

impl OutcomeLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// All attempts, in the order they were made.
  pub fn attempts(&self) -> &[AttemptRecord] {
    &self.attempts
  }

  /// Attempts made for one operation.
  pub fn attempts_for<'a>(&'a self, operation: &'a str) -> impl Iterator<Item = &'a AttemptRecord> + 'a {
    self.attempts.iter().filter(move |r| r.operation == operation)
  }

  /// Final status of every operation that was reached, in registry order.
  pub fn outcomes(&self) -> &[OperationOutcome] {
    &self.outcomes
  }

  pub fn outcome_of(&self, operation: &str) -> Option<&OperationOutcome> {
    self.outcomes.iter().find(|o| o.operation == operation)
  }

  pub fn status_of(&self, operation: &str) -> Option<FinalStatus> {
    self.outcome_of(operation).map(|o| o.status)
  }

  /// Set when an operation stopped the session.
  pub fn aborted(&self) -> Option<&AbortInfo> {
    self.aborted.as_ref()
  }

  /// True when no operation aborted the session.
  pub fn is_success(&self) -> bool {
    self.aborted.is_none()
  }

  pub fn summary(&self) -> Summary {
    self.outcomes.iter().fold(Summary::default(), |mut acc, o| {
      match o.status {
        FinalStatus::Succeeded => acc.succeeded += 1,
        FinalStatus::Skipped => acc.skipped += 1,
        FinalStatus::FailedAborted => acc.failed += 1,
      }
      acc
    })
  }

  pub(crate) fn record_attempt(&mut self, record: AttemptRecord) {
    self.attempts.push(record);
  }

  pub(crate) fn finish(
    &mut self,
    operation: &str,
    description: &str,
    status: FinalStatus,
    skip_reason: Option<SkipReason>,
  ) {
    let attempts = self.attempts_for(operation).count() as u32;
    self.outcomes.push(OperationOutcome {
      operation: operation.to_string(),
      description: description.to_string(),
      status,
      skip_reason,
      attempts,
    });
  }

  pub(crate) fn mark_aborted(&mut self, operation: &str, description: &str, cause: AbortCause) {
    self.finish(operation, description, FinalStatus::FailedAborted, None);
    self.aborted = Some(AbortInfo {
      operation: operation.to_string(),
      description: description.to_string(),
      cause,
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn failure(op: &str, attempt: u32) -> AttemptRecord {
    AttemptRecord::new(op, attempt, AttemptOutcome::Failure, Some("exit 1".to_string()))
  }

  #[test]
  fn empty_log_is_success() {
    let log = OutcomeLog::new();
    assert!(log.is_success());
    assert_eq!(log.summary(), Summary::default());
  }

  #[test]
  fn finish_counts_attempts_per_operation() {
    let mut log = OutcomeLog::new();
    log.record_attempt(failure("packages", 1));
    log.record_attempt(failure("packages", 2));
    log.record_attempt(AttemptRecord::new("fonts", 1, AttemptOutcome::Success, None));
    log.finish("packages", "Install packages", FinalStatus::Skipped, Some(SkipReason::OperatorSkipped));
    log.finish("fonts", "Install fonts", FinalStatus::Succeeded, None);

    assert_eq!(log.outcome_of("packages").unwrap().attempts, 2);
    assert_eq!(log.outcome_of("fonts").unwrap().attempts, 1);
    assert_eq!(
      log.summary(),
      Summary {
        succeeded: 1,
        skipped: 1,
        failed: 0
      }
    );
  }

  #[test]
  fn mark_aborted_records_failed_status() {
    let mut log = OutcomeLog::new();
    log.record_attempt(failure("kernel", 1));
    log.mark_aborted("kernel", "Install kernel", AbortCause::Policy);

    assert!(!log.is_success());
    assert_eq!(log.status_of("kernel"), Some(FinalStatus::FailedAborted));
    assert_eq!(log.aborted().unwrap().operation, "kernel");
    assert_eq!(log.summary().failed, 1);
  }

  #[test]
  fn serializes_without_abort_when_successful() {
    let mut log = OutcomeLog::new();
    log.finish("flatpak", "Flatpak apps", FinalStatus::Skipped, Some(SkipReason::NotApplicable));
    let json = serde_json::to_value(&log).unwrap();
    assert!(json.get("aborted").is_none());
    assert_eq!(json["outcomes"][0]["skip_reason"], "not-applicable");
  }
}
