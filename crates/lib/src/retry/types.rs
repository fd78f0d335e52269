use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Per-operation rule for what happens when its action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
  /// Stop the whole session on the first failure.
  Abort,
  /// Log a warning, mark the operation skipped, keep going.
  #[default]
  WarnAndContinue,
  /// Ask the operator to retry, skip, or quit.
  Interactive,
}

impl FailurePolicy {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Abort => "abort",
      Self::WarnAndContinue => "warn-and-continue",
      Self::Interactive => "interactive",
    }
  }
}

impl fmt::Display for FailurePolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for FailurePolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "abort" => Ok(Self::Abort),
      "warn-and-continue" | "warn" => Ok(Self::WarnAndContinue),
      "interactive" | "prompt" => Ok(Self::Interactive),
      other => Err(format!(
        "unknown failure policy '{}' (expected abort, warn-and-continue or interactive)",
        other
      )),
    }
  }
}

/// What the executor does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
  Retry,
  Skip,
  Abort,
}
