//! Operation execution module.
//!
//! This module provides the main entry point for running a registry. It
//! handles:
//! - Strict registry ordering, one operation at a time
//! - Applicability predicates evaluated against the session's facts
//! - Retry, skip and abort decisions through the [`RetryPolicy`]
//! - Recording every attempt in the [`OutcomeLog`]

pub mod actions;
pub mod types;

use tracing::{debug, error, info, warn};

use crate::error::ProvisionError;
use crate::facts::HostFacts;
use crate::outcome::{AbortCause, AttemptOutcome, AttemptRecord, FinalStatus, OutcomeLog, SkipReason};
use crate::registry::Operation;
use crate::retry::{FailurePolicy, PromptRequest, RetryDecision, RetryPolicy};

pub use actions::{CmdOutput, CommandRunner, SystemRunner, run_action};
pub use types::{ActionCtx, ActionError, ExecuteConfig};

/// Callbacks for progress reporting while a registry runs.
///
/// All methods default to doing nothing.
pub trait ExecutionObserver {
  /// An applicable operation is about to run its first attempt.
  fn on_start(&mut self, _operation: &Operation) {}

  /// An attempt failed. Called before the retry policy is consulted.
  fn on_failure(&mut self, _operation: &Operation, _error: &ProvisionError) {}

  /// The operation reached its final status.
  fn on_finish(&mut self, _operation: &Operation, _status: FinalStatus, _reason: Option<SkipReason>) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Runs operations in order against one host.
pub struct Executor<'a> {
  facts: &'a HostFacts,
  runner: &'a dyn CommandRunner,
  config: ExecuteConfig,
}

enum Flow {
  Continue,
  Stop,
}

impl<'a> Executor<'a> {
  pub fn new(facts: &'a HostFacts, runner: &'a dyn CommandRunner, config: ExecuteConfig) -> Self {
    Self { facts, runner, config }
  }

  /// Run every operation in order and return the outcome log.
  ///
  /// An abort never surfaces as an error here; it is recorded in the log and
  /// execution stops. Callers inspect [`OutcomeLog::aborted`].
  pub fn run(&self, operations: &[Operation], policy: &mut RetryPolicy) -> OutcomeLog {
    self.run_observed(operations, policy, &mut NoopObserver)
  }

  /// Like [`Executor::run`], reporting progress to `observer`.
  pub fn run_observed(
    &self,
    operations: &[Operation],
    policy: &mut RetryPolicy,
    observer: &mut dyn ExecutionObserver,
  ) -> OutcomeLog {
    info!(
      operations = operations.len(),
      dry_run = self.config.dry_run,
      "starting execution"
    );

    let mut log = OutcomeLog::new();

    for operation in operations {
      if !operation.is_applicable(self.facts) {
        info!(operation = %operation.id, "not applicable, skipping");
        log.finish(
          &operation.id,
          &operation.description,
          FinalStatus::Skipped,
          Some(SkipReason::NotApplicable),
        );
        observer.on_finish(operation, FinalStatus::Skipped, Some(SkipReason::NotApplicable));
        continue;
      }

      observer.on_start(operation);
      if let Flow::Stop = self.run_operation(operation, policy, &mut log, observer) {
        break;
      }
    }

    let summary = log.summary();
    info!(
      succeeded = summary.succeeded,
      skipped = summary.skipped,
      failed = summary.failed,
      aborted = log.aborted().is_some(),
      "execution complete"
    );

    log
  }

  fn run_operation(
    &self,
    operation: &Operation,
    policy: &mut RetryPolicy,
    log: &mut OutcomeLog,
    observer: &mut dyn ExecutionObserver,
  ) -> Flow {
    let ctx = ActionCtx {
      facts: self.facts,
      runner: self.runner,
      config: &self.config,
    };
    let mut attempt = 1;

    loop {
      debug!(operation = %operation.id, attempt, "running operation");

      let message = match operation.invoke(&ctx) {
        Ok(detail) => {
          log.record_attempt(AttemptRecord::new(&operation.id, attempt, AttemptOutcome::Success, detail));
          log.finish(&operation.id, &operation.description, FinalStatus::Succeeded, None);
          info!(operation = %operation.id, attempt, "operation succeeded");
          observer.on_finish(operation, FinalStatus::Succeeded, None);
          return Flow::Continue;
        }
        Err(e) => match e.stderr() {
          Some(stderr) => format!("{}: {}", e, stderr),
          None => e.to_string(),
        },
      };

      log.record_attempt(AttemptRecord::new(
        &operation.id,
        attempt,
        AttemptOutcome::Failure,
        Some(message.clone()),
      ));
      error!(operation = %operation.id, attempt, error = %message, "{} failed", operation.description);
      observer.on_failure(
        operation,
        &ProvisionError::OperationFailure {
          operation: operation.id.clone(),
          attempt,
          message: message.clone(),
        },
      );

      let request = PromptRequest {
        operation: &operation.id,
        description: &operation.description,
        attempt,
        error: &message,
      };

      match policy.decide(operation.policy, &request) {
        Ok(RetryDecision::Retry) => {
          attempt += 1;
        }
        Ok(RetryDecision::Skip) => {
          let reason = if operation.policy == FailurePolicy::Interactive {
            SkipReason::OperatorSkipped
          } else {
            SkipReason::FailureTolerated
          };
          log.finish(&operation.id, &operation.description, FinalStatus::Skipped, Some(reason));
          observer.on_finish(operation, FinalStatus::Skipped, Some(reason));
          return Flow::Continue;
        }
        Ok(RetryDecision::Abort) => {
          let cause = if operation.policy == FailurePolicy::Abort {
            AbortCause::Policy
          } else {
            AbortCause::Operator
          };
          warn!(operation = %operation.id, cause = %cause, "aborting session");
          log.mark_aborted(&operation.id, &operation.description, cause);
          observer.on_finish(operation, FinalStatus::FailedAborted, None);
          return Flow::Stop;
        }
        Err(e) => {
          error!(operation = %operation.id, error = %e, "no decision available, aborting session");
          log.mark_aborted(
            &operation.id,
            &operation.description,
            AbortCause::Configuration { message: e.to_string() },
          );
          observer.on_finish(operation, FinalStatus::FailedAborted, None);
          return Flow::Stop;
        }
      }
    }
  }
}
