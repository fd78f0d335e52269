//! Retry policy: turns a failed attempt into a retry, skip, or abort.
//!
//! One policy object serves every failure policy, so warn-and-continue and
//! interactive operations share a single code path in the executor.

mod prompt;
mod types;

use tracing::{info, warn};

pub use prompt::{
  LinePrompter, NonInteractive, PromptChoice, PromptError, PromptRequest, Prompter, ScriptedPrompter, terminal,
};
pub use types::{FailurePolicy, RetryDecision};

pub struct RetryPolicy {
  prompter: Box<dyn Prompter>,
}

impl RetryPolicy {
  pub fn new(prompter: Box<dyn Prompter>) -> Self {
    Self { prompter }
  }

  /// Policy whose interactive operations cannot be answered.
  pub fn non_interactive() -> Self {
    Self::new(Box::new(NonInteractive))
  }

  /// Policy that replays the given operator answers.
  pub fn scripted(answers: impl IntoIterator<Item = PromptChoice>) -> Self {
    Self::new(Box::new(ScriptedPrompter::new(answers)))
  }

  /// Decide what happens after a failed attempt.
  ///
  /// Only the interactive policy can fail, and only when no operator input is
  /// available.
  pub fn decide(&mut self, policy: FailurePolicy, request: &PromptRequest<'_>) -> Result<RetryDecision, PromptError> {
    match policy {
      FailurePolicy::Abort => Ok(RetryDecision::Abort),
      FailurePolicy::WarnAndContinue => {
        warn!(
          operation = request.operation,
          attempt = request.attempt,
          error = request.error,
          "{} failed, continuing",
          request.description
        );
        Ok(RetryDecision::Skip)
      }
      FailurePolicy::Interactive => {
        let choice = self.prompter.choose(request)?;
        info!(operation = request.operation, attempt = request.attempt, choice = ?choice, "operator decision");
        Ok(match choice {
          PromptChoice::Retry => RetryDecision::Retry,
          PromptChoice::Skip => RetryDecision::Skip,
          PromptChoice::Quit => RetryDecision::Abort,
        })
      }
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(terminal())
  }
}
