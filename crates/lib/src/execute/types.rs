//! Types for action execution.

use std::path::Path;

use thiserror::Error;

use crate::facts::HostFacts;

use super::actions::cmd::CommandRunner;

/// Errors an action can report. Each one is an operation failure that the
/// retry policy resolves.
#[derive(Debug, Error)]
pub enum ActionError {
  /// Command ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}")]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  /// Command could not be started.
  #[error("failed to run {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// Some items of a per-item sequence failed.
  #[error("{failed} of {total} command(s) failed: {commands}")]
  PartialFailure {
    failed: usize,
    total: usize,
    commands: String,
  },

  /// Filesystem error.
  #[error("io error on {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  /// Ownership change failed.
  #[error("failed to change ownership of {path}: {message}")]
  Chown { path: String, message: String },

  /// Directory traversal failed.
  #[error("failed to traverse {path}: {source}")]
  Walk {
    path: String,
    #[source]
    source: walkdir::Error,
  },

  /// Source of a copy does not exist.
  #[error("source not found: {0}")]
  SourceMissing(String),
}

impl ActionError {
  pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
    Self::Io {
      path: path.display().to_string(),
      source,
    }
  }

  /// Captured stderr for failed commands, if any.
  pub fn stderr(&self) -> Option<&str> {
    match self {
      Self::CmdFailed { stderr, .. } if !stderr.is_empty() => Some(stderr),
      _ => None,
    }
  }
}

/// Configuration for execution.
#[derive(Debug, Clone, Default)]
pub struct ExecuteConfig {
  /// Log what would happen instead of touching the host.
  pub dry_run: bool,
}

/// Everything an action needs at run time.
#[derive(Clone, Copy)]
pub struct ActionCtx<'a> {
  pub facts: &'a HostFacts,
  pub runner: &'a dyn CommandRunner,
  pub config: &'a ExecuteConfig,
}

impl ActionCtx<'_> {
  /// Owner for files placed in the effective user's home.
  pub fn user_owner(&self, owned_by_user: bool) -> Option<(u32, u32)> {
    owned_by_user.then_some((self.facts.uid, self.facts.gid))
  }
}
