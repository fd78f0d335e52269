//! CLI output formatting utilities.
//!
//! Colored status lines go to stdout, errors and warnings to stderr. Colors are
//! only emitted when the stream supports them.

use std::time::Duration;

use anyhow::Context;
use owo_colors::{OwoColorize, Stream};

use sysprov_lib::outcome::{FinalStatus, SkipReason};

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const PLUS: &str = "+";
  pub const MINUS: &str = "-";
}

/// Whole-second rendering of a duration, e.g. `4m 12s`.
pub fn format_elapsed(duration: Duration) -> String {
  humantime::format_duration(Duration::from_secs(duration.as_secs())).to_string()
}

/// Human label for an operation's final status.
pub fn status_label(status: FinalStatus, reason: Option<SkipReason>) -> &'static str {
  match (status, reason) {
    (FinalStatus::Succeeded, _) => "done",
    (FinalStatus::Skipped, Some(SkipReason::NotApplicable)) => "not applicable",
    (FinalStatus::Skipped, Some(SkipReason::OperatorSkipped)) => "skipped by operator",
    (FinalStatus::Skipped, _) => "skipped after failure",
    (FinalStatus::FailedAborted, _) => "failed, aborting",
  }
}

pub fn print_step(message: &str) {
  println!(
    "{} {}",
    symbols::ARROW.if_supports_color(Stream::Stdout, |s| s.cyan()),
    message.if_supports_color(Stream::Stdout, |s| s.bold())
  );
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
