//! Records produced while executing a registry.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Result of a single invocation of an operation's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
  Success,
  Failure,
}

/// One invocation of an operation's action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
  pub operation: String,
  /// 1-based attempt counter, per operation.
  pub attempt: u32,
  pub outcome: AttemptOutcome,
  /// Failure message, or the optional message a successful action returned.
  pub detail: Option<String>,
  /// Seconds since the Unix epoch.
  pub timestamp: u64,
}

impl AttemptRecord {
  pub fn new(operation: &str, attempt: u32, outcome: AttemptOutcome, detail: Option<String>) -> Self {
    Self {
      operation: operation.to_string(),
      attempt,
      outcome,
      detail,
      timestamp: now_secs(),
    }
  }

  pub fn is_failure(&self) -> bool {
    self.outcome == AttemptOutcome::Failure
  }
}

/// Final status of an operation at the end of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalStatus {
  Succeeded,
  Skipped,
  FailedAborted,
}

impl FinalStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Succeeded => "succeeded",
      Self::Skipped => "skipped",
      Self::FailedAborted => "failed-aborted",
    }
  }
}

impl std::fmt::Display for FinalStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Why an operation ended up `skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
  /// The predicate evaluated false; the action never ran.
  NotApplicable,
  /// The action failed under `warn-and-continue`.
  FailureTolerated,
  /// The operator chose skip at the interactive prompt.
  OperatorSkipped,
}

/// Final status of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
  pub operation: String,
  pub description: String,
  pub status: FinalStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub skip_reason: Option<SkipReason>,
  pub attempts: u32,
}

/// What stopped an aborted session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AbortCause {
  /// The operation's failure policy is `abort`.
  Policy,
  /// The operator chose quit at the interactive prompt.
  Operator,
  /// An interactive prompt was needed but no input was available.
  Configuration { message: String },
}

impl std::fmt::Display for AbortCause {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Policy => write!(f, "failure policy is abort"),
      Self::Operator => write!(f, "operator chose to quit"),
      Self::Configuration { message } => write!(f, "{}", message),
    }
  }
}

/// The operation that stopped the session, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortInfo {
  pub operation: String,
  pub description: String,
  pub cause: AbortCause,
}

/// Counts per final status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
  pub succeeded: usize,
  pub skipped: usize,
  pub failed: usize,
}

pub(crate) fn now_secs() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}
