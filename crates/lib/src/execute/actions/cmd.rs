//! Exec action implementation.

use std::process::Command;

use tracing::{debug, info};

use crate::action::ExecOpts;
use crate::consts::ROOT_USER;
use crate::execute::types::{ActionCtx, ActionError};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdOutput {
  /// Exit code; `None` if the process was killed by a signal.
  pub code: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CmdOutput {
  pub fn success() -> Self {
    Self {
      code: Some(0),
      ..Self::default()
    }
  }

  pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
    Self {
      code: Some(code),
      stdout: String::new(),
      stderr: stderr.into(),
    }
  }

  pub fn is_success(&self) -> bool {
    self.code == Some(0)
  }
}

/// Runs external commands. The seam every package-manager, repository and
/// Flatpak call goes through.
pub trait CommandRunner {
  fn run(&self, opts: &ExecOpts) -> std::io::Result<CmdOutput>;
}

/// Runs commands as child processes and waits for them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
  fn run(&self, opts: &ExecOpts) -> std::io::Result<CmdOutput> {
    debug!(cmd = %opts, "spawning process");
    let output = Command::new(&opts.bin).args(&opts.args).envs(&opts.env).output()?;
    Ok(CmdOutput {
      code: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}

/// Execute an Exec action and return its trimmed stdout.
pub fn execute_cmd(opts: &ExecOpts, ctx: &ActionCtx<'_>) -> Result<String, ActionError> {
  let opts = effective_opts(opts, ctx);
  let cmd = opts.command_line();

  if ctx.config.dry_run {
    info!(cmd = %cmd, "dry run: would execute");
    return Ok(String::new());
  }

  info!(cmd = %cmd, "executing command");

  let output = ctx.runner.run(&opts).map_err(|source| ActionError::Spawn {
    cmd: cmd.clone(),
    source,
  })?;

  if !output.is_success() {
    if !output.stderr.is_empty() {
      debug!(stderr = %output.stderr, "command stderr");
    }
    if !output.stdout.is_empty() {
      debug!(stdout = %output.stdout, "command stdout");
    }
    return Err(ActionError::CmdFailed {
      cmd,
      code: output.code,
      stderr: output.stderr.trim().to_string(),
    });
  }

  let stdout = output.stdout.trim().to_string();
  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }
  Ok(stdout)
}

/// Wrap user-scoped commands in `runuser` so they run as the effective user.
fn effective_opts(opts: &ExecOpts, ctx: &ActionCtx<'_>) -> ExecOpts {
  if !opts.as_user || ctx.facts.user == ROOT_USER {
    return opts.clone();
  }

  let mut args = vec!["-u".to_string(), ctx.facts.user.clone(), "--".to_string(), opts.bin.clone()];
  args.extend(opts.args.iter().cloned());

  let mut env = opts.env.clone();
  env.insert("HOME".to_string(), ctx.facts.home.display().to_string());

  ExecOpts {
    bin: "runuser".to_string(),
    args,
    env,
    as_user: false,
  }
}
