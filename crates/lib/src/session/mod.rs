//! Provisioning session: the top-level orchestrator.
//!
//! A session checks privileges, takes the host facts snapshot, builds the
//! registry from the profile, runs the executor, and turns the outcome log
//! into an exit code. Nothing persists between sessions.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::ProvisionError;
use crate::execute::{CommandRunner, ExecuteConfig, ExecutionObserver, Executor};
use crate::facts::{self, HostFacts, HostProbe};
use crate::outcome::{AbortCause, OutcomeLog};
use crate::profile::Profile;
use crate::registry::OperationRegistry;
use crate::retry::{FailurePolicy, RetryPolicy};

/// Session-wide switches.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
  /// Log actions instead of performing them.
  pub dry_run: bool,
  /// Run without root. Only meaningful for tests and dry runs.
  pub skip_root_check: bool,
  /// Replaces the profile's `default_policy`.
  pub default_policy: Option<FailurePolicy>,
}

/// Everything a finished session produced.
#[derive(Debug, Serialize)]
pub struct SessionReport {
  pub facts: HostFacts,
  pub log: OutcomeLog,
  pub exit_code: i32,
}

impl SessionReport {
  /// The error that stopped the session, if any.
  pub fn abort_error(&self) -> Option<ProvisionError> {
    abort_error(&self.log)
  }
}

pub struct ProvisioningSession<'a> {
  profile: Profile,
  host: &'a dyn HostProbe,
  runner: &'a dyn CommandRunner,
  options: SessionOptions,
}

impl<'a> ProvisioningSession<'a> {
  pub fn new(
    mut profile: Profile,
    host: &'a dyn HostProbe,
    runner: &'a dyn CommandRunner,
    options: SessionOptions,
  ) -> Self {
    if let Some(policy) = options.default_policy {
      profile.default_policy = policy;
    }
    Self {
      profile,
      host,
      runner,
      options,
    }
  }

  pub fn profile(&self) -> &Profile {
    &self.profile
  }

  /// Take the facts snapshot, enforcing root unless the check is skipped.
  pub fn probe(&self) -> Result<HostFacts, ProvisionError> {
    let watched: Vec<String> = self.profile.watched_binaries().into_iter().collect();
    if self.options.skip_root_check {
      warn!("root check skipped");
      facts::gather(self.host, watched.as_slice())
    } else {
      facts::probe(self.host, watched.as_slice())
    }
  }

  /// Facts and registry for this host, without running anything or
  /// requiring root.
  pub fn plan(&self) -> Result<(HostFacts, OperationRegistry), ProvisionError> {
    let watched: Vec<String> = self.profile.watched_binaries().into_iter().collect();
    let facts = facts::gather(self.host, watched.as_slice())?;
    let registry = OperationRegistry::build(&self.profile, &facts)?;
    Ok((facts, registry))
  }

  /// Run the session to completion.
  ///
  /// Returns `Err` only for failures that happen before the executor starts.
  /// Aborts during execution are reported through the report's exit code.
  pub fn execute(
    &self,
    policy: &mut RetryPolicy,
    observer: &mut dyn ExecutionObserver,
  ) -> Result<SessionReport, ProvisionError> {
    let facts = self.probe()?;
    let registry = OperationRegistry::build(&self.profile, &facts)?;

    info!(
      operations = registry.len(),
      user = %facts.user,
      dry_run = self.options.dry_run,
      "provisioning session starting"
    );
    if registry.is_empty() {
      warn!("profile defines no operations for this host");
    }

    let config = ExecuteConfig {
      dry_run: self.options.dry_run,
    };
    let log = Executor::new(&facts, self.runner, config).run_observed(registry.operations(), policy, observer);

    let exit_code = abort_error(&log).map_or(0, |e| e.exit_code());
    let summary = log.summary();
    match log.aborted() {
      Some(aborted) => warn!(
        operation = %aborted.operation,
        cause = %aborted.cause,
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        "session aborted"
      ),
      None => info!(
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        "session complete"
      ),
    }

    Ok(SessionReport { facts, log, exit_code })
  }
}

/// Map an aborted log to the fatal error it represents.
pub fn abort_error(log: &OutcomeLog) -> Option<ProvisionError> {
  let aborted = log.aborted()?;
  Some(match &aborted.cause {
    AbortCause::Configuration { message } => ProvisionError::Configuration(message.clone()),
    cause => ProvisionError::AbortRequested {
      operation: aborted.description.clone(),
      reason: cause.to_string(),
    },
  })
}
