//! Implementation of the `sysprov apply` command.
//!
//! Loads a profile, probes the host, and runs every applicable operation in
//! order, printing a line per operation and a summary at the end.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use tracing::info;

use sysprov_lib::ProvisionError;
use sysprov_lib::execute::{ExecutionObserver, SystemRunner};
use sysprov_lib::facts::SystemProbe;
use sysprov_lib::outcome::{FinalStatus, SkipReason};
use sysprov_lib::platform;
use sysprov_lib::registry::Operation;
use sysprov_lib::retry::{FailurePolicy, RetryPolicy};
use sysprov_lib::session::{ProvisioningSession, SessionOptions, SessionReport};

use crate::cmd::load_profile;
use crate::exit_byte;
use crate::output::{
  format_elapsed, print_error, print_info, print_json, print_stat, print_step, print_success, print_warning,
  status_label,
};

pub struct ApplyArgs {
  pub profile: Option<PathBuf>,
  pub dry_run: bool,
  pub non_interactive: bool,
  pub policy: Option<FailurePolicy>,
  pub json: bool,
}

/// Prints one progress line per executor event.
struct ConsoleObserver {
  quiet: bool,
}

impl ExecutionObserver for ConsoleObserver {
  fn on_start(&mut self, operation: &Operation) {
    if !self.quiet {
      print_step(&operation.description);
    }
  }

  fn on_failure(&mut self, operation: &Operation, error: &ProvisionError) {
    // Interactive failures are announced by the prompt itself.
    if operation.policy != FailurePolicy::Interactive {
      print_error(&format!("{}: {}", operation.description, error));
    }
  }

  fn on_finish(&mut self, operation: &Operation, status: FinalStatus, reason: Option<SkipReason>) {
    if self.quiet {
      return;
    }
    let line = format!("{} ({})", operation.description, status_label(status, reason));
    match (status, reason) {
      (FinalStatus::Succeeded, _) => print_success(&line),
      (FinalStatus::Skipped, Some(SkipReason::NotApplicable)) => print_info(&line),
      (FinalStatus::Skipped, _) => print_warning(&line),
      (FinalStatus::FailedAborted, _) => print_error(&line),
    }
  }
}

/// Execute the apply command.
///
/// Returns the process exit code: 0 when nothing aborted, otherwise the code
/// for the abort cause. Errors before execution starts (missing root, a bad
/// profile) are returned as `Err`.
pub fn cmd_apply(args: ApplyArgs) -> Result<u8> {
  let (profile, source) = load_profile(args.profile.as_deref())?;

  let options = SessionOptions {
    dry_run: args.dry_run,
    skip_root_check: platform::skip_root_check(),
    default_policy: args.policy,
  };

  let host = SystemProbe::new();
  let runner = SystemRunner;
  let session = ProvisioningSession::new(profile, &host, &runner, options);

  let mut policy = if args.non_interactive {
    RetryPolicy::non_interactive()
  } else {
    RetryPolicy::default()
  };

  if !args.json {
    print_info(&format!("Applying {}", source));
    if args.dry_run {
      print_warning("Dry run: the host will not be changed");
    }
  }

  let started = Instant::now();
  let mut observer = ConsoleObserver { quiet: args.json };
  let report = session.execute(&mut policy, &mut observer)?;
  info!(elapsed = ?started.elapsed(), exit_code = report.exit_code, "apply finished");

  if args.json {
    print_json(&report)?;
  } else {
    print_summary(&report, &format_elapsed(started.elapsed()));
  }

  Ok(exit_byte(report.exit_code))
}

fn print_summary(report: &SessionReport, elapsed: &str) {
  let summary = report.log.summary();

  println!();
  match report.abort_error() {
    Some(err) => print_error(&err.to_string()),
    None => print_success("Provisioning complete"),
  }
  print_stat("Succeeded", &summary.succeeded.to_string());
  print_stat("Skipped", &summary.skipped.to_string());
  print_stat("Failed", &summary.failed.to_string());
  print_stat("Elapsed", elapsed);

  let tolerated: Vec<_> = report
    .log
    .outcomes()
    .iter()
    .filter(|o| o.status == FinalStatus::Skipped && o.skip_reason != Some(SkipReason::NotApplicable))
    .collect();
  if !tolerated.is_empty() {
    println!();
    println!("Skipped after failure:");
    for outcome in tolerated {
      println!("  - {} ({} attempt(s))", outcome.description, outcome.attempts);
    }
  }
}
