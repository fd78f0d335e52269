//! Action execution module.
//!
//! This module provides the dispatch logic for running a declarative
//! [`Action`] against the host.

pub mod cmd;
pub mod fs;

use tracing::{info, warn};

use crate::action::Action;
use crate::execute::types::{ActionCtx, ActionError};

pub use cmd::{CmdOutput, CommandRunner, SystemRunner, execute_cmd};
pub use fs::{BackupOutcome, append_line_if_absent, backup_once, copy_tree, ensure_dir, write_file};

/// Run a single action.
///
/// # Arguments
///
/// * `action` - The action to run
/// * `ctx` - Host facts, command runner and execution config
///
/// # Returns
///
/// An optional message to attach to the attempt record (a warning text or
/// the stdout of a single command).
pub fn run_action(action: &Action, ctx: &ActionCtx<'_>) -> Result<Option<String>, ActionError> {
  match action {
    Action::Exec(opts) => {
      let stdout = execute_cmd(opts, ctx)?;
      Ok((!stdout.is_empty()).then_some(stdout))
    }

    Action::Sequence { steps, then } => {
      // Every item runs even after a failure; the sequence fails afterwards.
      let mut failed = Vec::new();
      for step in steps {
        if let Err(e) = execute_cmd(step, ctx) {
          warn!(cmd = %step, error = %e, "sequence item failed");
          failed.push(step.command_line());
        }
      }

      let mut total = steps.len();
      if let Some(then) = then {
        total += 1;
        match execute_cmd(then, ctx) {
          Ok(_) => {}
          Err(e) if failed.is_empty() => return Err(e),
          Err(e) => {
            warn!(cmd = %then, error = %e, "sequence follow-up failed");
            failed.push(then.command_line());
          }
        }
      }

      if failed.is_empty() {
        Ok(None)
      } else {
        Err(ActionError::PartialFailure {
          failed: failed.len(),
          total,
          commands: failed.join(", "),
        })
      }
    }

    Action::AppendLine { path, line } => {
      if ctx.config.dry_run {
        info!(path = %path.display(), line = %line, "dry run: would append line");
        return Ok(None);
      }
      append_line_if_absent(path, line)?;
      Ok(None)
    }

    Action::Backup { path } => {
      if ctx.config.dry_run {
        info!(path = %path.display(), "dry run: would back up");
        return Ok(None);
      }
      match backup_once(path)? {
        BackupOutcome::SourceMissing => Ok(Some(format!("{} does not exist, nothing to back up", path.display()))),
        BackupOutcome::Created | BackupOutcome::AlreadyPresent => Ok(None),
      }
    }

    Action::EnsureDir {
      path,
      mode,
      owned_by_user,
    } => {
      if ctx.config.dry_run {
        info!(path = %path.display(), mode = format!("{mode:o}"), "dry run: would create directory");
        return Ok(None);
      }
      ensure_dir(path, *mode, ctx.user_owner(*owned_by_user))?;
      Ok(None)
    }

    Action::CopyTree { from, to, owned_by_user } => {
      if ctx.config.dry_run {
        info!(from = %from.display(), to = %to.display(), "dry run: would copy tree");
        return Ok(None);
      }
      let copied = copy_tree(from, to, ctx.user_owner(*owned_by_user))?;
      Ok(Some(format!("{copied} file(s) copied")))
    }

    Action::WriteFile {
      path,
      contents,
      mode,
      overwrite,
    } => {
      if ctx.config.dry_run {
        info!(path = %path.display(), "dry run: would write file");
        return Ok(None);
      }
      write_file(path, contents, *mode, *overwrite)?;
      Ok(None)
    }

    Action::Warn { message } => {
      warn!("{message}");
      Ok(Some(message.clone()))
    }

    Action::Steps { steps } => {
      let mut last = None;
      for step in steps {
        if let Some(message) = run_action(step, ctx)? {
          last = Some(message);
        }
      }
      Ok(last)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::action::ExecOpts;
  use crate::execute::ExecuteConfig;
  use crate::util::testutil::{ScriptedRunner, test_facts};
  use tempfile::TempDir;

  fn copr(repo: &str) -> ExecOpts {
    ExecOpts::new("dnf", ["copr", "enable", "-y", repo])
  }

  #[test]
  fn sequence_runs_every_item_then_fails() {
    let facts = test_facts();
    let runner = ScriptedRunner::new().respond_to("dnf copr enable -y bad/repo", CmdOutput::failure(1, "not found"));
    let config = ExecuteConfig::default();
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };

    let action = Action::Sequence {
      steps: vec![copr("good/one"), copr("bad/repo"), copr("good/two")],
      then: Some(ExecOpts::new("dnf", ["makecache"])),
    };
    let err = run_action(&action, &ctx).unwrap_err();

    assert_eq!(
      runner.calls(),
      vec![
        "dnf copr enable -y good/one",
        "dnf copr enable -y bad/repo",
        "dnf copr enable -y good/two",
        "dnf makecache",
      ]
    );
    match err {
      ActionError::PartialFailure { failed, total, commands } => {
        assert_eq!(failed, 1);
        assert_eq!(total, 4);
        assert_eq!(commands, "dnf copr enable -y bad/repo");
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn sequence_reports_item_and_refresh_failures_together() {
    let facts = test_facts();
    let runner = ScriptedRunner::new()
      .respond_to("dnf copr enable -y bad/repo", CmdOutput::failure(1, "not found"))
      .respond_to("dnf makecache", CmdOutput::failure(1, "mirror unreachable"));
    let config = ExecuteConfig::default();
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };

    let action = Action::Sequence {
      steps: vec![copr("good/one"), copr("bad/repo")],
      then: Some(ExecOpts::new("dnf", ["makecache"])),
    };
    let err = run_action(&action, &ctx).unwrap_err();

    assert_eq!(
      err.to_string(),
      "2 of 3 command(s) failed: dnf copr enable -y bad/repo, dnf makecache"
    );
  }

  #[test]
  fn sequence_refresh_failure_alone_keeps_its_error() {
    let facts = test_facts();
    let runner = ScriptedRunner::new().respond_to("dnf makecache", CmdOutput::failure(1, "mirror unreachable"));
    let config = ExecuteConfig::default();
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };

    let action = Action::Sequence {
      steps: vec![copr("good/one")],
      then: Some(ExecOpts::new("dnf", ["makecache"])),
    };
    let err = run_action(&action, &ctx).unwrap_err();

    assert!(matches!(err, ActionError::CmdFailed { ref cmd, .. } if cmd == "dnf makecache"));
    assert_eq!(err.stderr(), Some("mirror unreachable"));
  }

  #[test]
  fn sequence_succeeds_when_all_items_succeed() {
    let facts = test_facts();
    let runner = ScriptedRunner::new();
    let config = ExecuteConfig::default();
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };
    let action = Action::Sequence {
      steps: vec![copr("a/b"), copr("c/d")],
      then: None,
    };
    assert_eq!(run_action(&action, &ctx).unwrap(), None);
    assert_eq!(runner.calls().len(), 2);
  }

  #[test]
  fn steps_stop_at_first_failure() {
    let facts = test_facts();
    let runner = ScriptedRunner::new().respond("false", CmdOutput::failure(1, ""));
    let config = ExecuteConfig::default();
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };
    let action = Action::Steps {
      steps: vec![
        Action::Exec(ExecOpts::new("false", Vec::<String>::new())),
        Action::Exec(ExecOpts::new("true", Vec::<String>::new())),
      ],
    };
    assert!(run_action(&action, &ctx).is_err());
    assert_eq!(runner.calls(), vec!["false"]);
  }

  #[test]
  fn warn_returns_message() {
    let facts = test_facts();
    let runner = ScriptedRunner::new();
    let config = ExecuteConfig::default();
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };
    let action = Action::Warn {
      message: "CPU lacks x86-64-v2".to_string(),
    };
    assert_eq!(run_action(&action, &ctx).unwrap().as_deref(), Some("CPU lacks x86-64-v2"));
  }

  #[test]
  fn dry_run_leaves_filesystem_untouched() {
    let temp = TempDir::new().unwrap();
    let facts = test_facts();
    let runner = ScriptedRunner::new();
    let config = ExecuteConfig { dry_run: true };
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };
    let path = temp.path().join("dnf.conf");
    let action = Action::Steps {
      steps: vec![
        Action::Backup { path: path.clone() },
        Action::AppendLine {
          path: path.clone(),
          line: "fastestmirror=True".to_string(),
        },
        Action::EnsureDir {
          path: temp.path().join("fonts"),
          mode: 0o755,
          owned_by_user: true,
        },
      ],
    };
    run_action(&action, &ctx).unwrap();
    assert!(!path.exists());
    assert!(!temp.path().join("fonts").exists());
  }

  #[test]
  fn backup_then_append_patches_file() {
    let temp = TempDir::new().unwrap();
    let facts = test_facts();
    let runner = ScriptedRunner::new();
    let config = ExecuteConfig::default();
    let ctx = ActionCtx {
      facts: &facts,
      runner: &runner,
      config: &config,
    };
    let path = temp.path().join("dnf.conf");
    std::fs::write(&path, "[main]\n").unwrap();
    let action = Action::Steps {
      steps: vec![
        Action::Backup { path: path.clone() },
        Action::AppendLine {
          path: path.clone(),
          line: "max_parallel_downloads=10".to_string(),
        },
      ],
    };
    run_action(&action, &ctx).unwrap();
    run_action(&action, &ctx).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), "[main]\nmax_parallel_downloads=10\n");
    assert_eq!(std::fs::read_to_string(fs::backup_path(&path)).unwrap(), "[main]\n");
  }
}
