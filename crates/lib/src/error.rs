//! Session-level error taxonomy.
//!
//! `OperationFailure` is produced per failed attempt and resolved by the
//! executor through the retry policy; it never escapes a session. The other
//! variants terminate the process.

use thiserror::Error;

use crate::profile::ProfileError;
use crate::registry::RegistryError;

/// Exit code for a session stopped by an `abort` policy or an operator `quit`.
pub const EXIT_ABORTED: i32 = 1;

/// Exit code when root privileges are missing (sysexits `EX_NOPERM`).
pub const EXIT_PERMISSION: i32 = 77;

/// Exit code for configuration problems (sysexits `EX_CONFIG`).
pub const EXIT_CONFIGURATION: i32 = 78;

#[derive(Debug, Error)]
pub enum ProvisionError {
  /// Not running with the privileges provisioning requires.
  #[error("permission denied: {0}")]
  Permission(String),

  /// Malformed profile, or an interactive prompt with no input available.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// An operation's action reported failure.
  #[error("{operation} failed on attempt {attempt}: {message}")]
  OperationFailure {
    operation: String,
    attempt: u32,
    message: String,
  },

  /// An `abort` policy or the operator stopped the session.
  #[error("aborted at {operation}: {reason}")]
  AbortRequested { operation: String, reason: String },
}

impl ProvisionError {
  pub fn permission(msg: impl Into<String>) -> Self {
    Self::Permission(msg.into())
  }

  pub fn configuration(msg: impl Into<String>) -> Self {
    Self::Configuration(msg.into())
  }

  /// Process exit code for this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      Self::Permission(_) => EXIT_PERMISSION,
      Self::Configuration(_) => EXIT_CONFIGURATION,
      Self::OperationFailure { .. } | Self::AbortRequested { .. } => EXIT_ABORTED,
    }
  }
}

impl From<ProfileError> for ProvisionError {
  fn from(err: ProfileError) -> Self {
    Self::Configuration(err.to_string())
  }
}

impl From<RegistryError> for ProvisionError {
  fn from(err: RegistryError) -> Self {
    Self::Configuration(err.to_string())
  }
}
