//! Operator prompts for the interactive failure policy.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

use thiserror::Error;

/// The operator's answer to a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptChoice {
  Retry,
  Skip,
  Quit,
}

impl PromptChoice {
  /// Parse an operator answer. Accepts full words or their first letter.
  pub fn parse(input: &str) -> Option<Self> {
    match input.trim().to_ascii_lowercase().as_str() {
      "r" | "retry" => Some(Self::Retry),
      "s" | "skip" => Some(Self::Skip),
      "q" | "quit" => Some(Self::Quit),
      _ => None,
    }
  }
}

#[derive(Debug, Error)]
pub enum PromptError {
  #[error("cannot prompt about '{operation}': no interactive input is available")]
  Unavailable { operation: String },

  #[error("prompt i/o failed: {0}")]
  Io(#[from] io::Error),
}

/// Context shown to the operator for one failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct PromptRequest<'a> {
  pub operation: &'a str,
  pub description: &'a str,
  pub attempt: u32,
  pub error: &'a str,
}

/// Source of operator decisions.
pub trait Prompter {
  fn choose(&mut self, request: &PromptRequest<'_>) -> Result<PromptChoice, PromptError>;
}

/// Line-oriented prompt over any reader/writer pair.
///
/// Invalid answers are rejected and asked again. End of input means no
/// operator is present and yields [`PromptError::Unavailable`].
pub struct LinePrompter<R, W> {
  input: R,
  output: W,
}

impl<R: BufRead, W: Write> LinePrompter<R, W> {
  pub fn new(input: R, output: W) -> Self {
    Self { input, output }
  }

  #[cfg(test)]
  pub fn into_inner(self) -> (R, W) {
    (self.input, self.output)
  }
}

impl<R: BufRead, W: Write> Prompter for LinePrompter<R, W> {
  fn choose(&mut self, request: &PromptRequest<'_>) -> Result<PromptChoice, PromptError> {
    writeln!(
      self.output,
      "{} failed (attempt {}): {}",
      request.description, request.attempt, request.error
    )?;

    loop {
      write!(self.output, "[r]etry, [s]kip, [q]uit? ")?;
      self.output.flush()?;

      let mut raw = Vec::new();
      if self.input.read_until(b'\n', &mut raw)? == 0 {
        return Err(PromptError::Unavailable {
          operation: request.operation.to_string(),
        });
      }

      // Undecodable bytes become U+FFFD and fall through to "invalid choice".
      let line = String::from_utf8_lossy(&raw);
      match PromptChoice::parse(&line) {
        Some(choice) => return Ok(choice),
        None => writeln!(self.output, "invalid choice '{}'", line.trim())?,
      }
    }
  }
}

/// Prompter for contexts without an operator. Always unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
  fn choose(&mut self, request: &PromptRequest<'_>) -> Result<PromptChoice, PromptError> {
    Err(PromptError::Unavailable {
      operation: request.operation.to_string(),
    })
  }
}

/// Replays a fixed sequence of answers, then reports no input.
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
  answers: VecDeque<PromptChoice>,
}

impl ScriptedPrompter {
  pub fn new(answers: impl IntoIterator<Item = PromptChoice>) -> Self {
    Self {
      answers: answers.into_iter().collect(),
    }
  }

  #[cfg(test)]
  pub fn remaining(&self) -> usize {
    self.answers.len()
  }
}

impl Prompter for ScriptedPrompter {
  fn choose(&mut self, request: &PromptRequest<'_>) -> Result<PromptChoice, PromptError> {
    self.answers.pop_front().ok_or_else(|| PromptError::Unavailable {
      operation: request.operation.to_string(),
    })
  }
}

/// Prompter bound to the process's stdin/stderr.
///
/// Falls back to [`NonInteractive`] when stdin is not a terminal so an
/// unattended run fails instead of blocking on a closed or piped stream.
pub fn terminal() -> Box<dyn Prompter> {
  if io::stdin().is_terminal() {
    Box::new(LinePrompter::new(io::stdin().lock(), io::stderr()))
  } else {
    Box::new(NonInteractive)
  }
}
