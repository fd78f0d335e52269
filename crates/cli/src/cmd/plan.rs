//! Implementation of the `sysprov plan` command.
//!
//! Builds the registry for this host without running anything. Root is not
//! required.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use sysprov_lib::action::Action;
use sysprov_lib::execute::SystemRunner;
use sysprov_lib::facts::SystemProbe;
use sysprov_lib::retry::FailurePolicy;
use sysprov_lib::session::{ProvisioningSession, SessionOptions};

use crate::cmd::load_profile;
use crate::output::{print_info, print_json, print_stat, symbols};

#[derive(Debug, Serialize)]
struct PlannedOperation<'a> {
  id: &'a str,
  description: &'a str,
  policy: FailurePolicy,
  applicable: bool,
  tags: &'a [String],
  requires: &'a [String],
  action: &'a Action,
}

pub fn cmd_plan(profile: Option<&Path>, json: bool) -> Result<()> {
  let (profile, source) = load_profile(profile)?;

  let host = SystemProbe::new();
  let runner = SystemRunner;
  let session = ProvisioningSession::new(profile, &host, &runner, SessionOptions::default());
  let (facts, registry) = session.plan()?;

  let planned: Vec<_> = registry
    .operations()
    .iter()
    .map(|op| PlannedOperation {
      id: &op.id,
      description: &op.description,
      policy: op.policy,
      applicable: op.is_applicable(&facts),
      tags: &op.tags,
      requires: &op.requires,
      action: &op.action,
    })
    .collect();

  if json {
    return print_json(&serde_json::json!({
      "profile": source.to_string(),
      "facts": facts,
      "operations": planned,
    }));
  }

  print_info(&format!("Plan for {}", source));
  print_stat("User", &format!("{} ({})", facts.user, facts.home.display()));
  print_stat("CPU baseline", facts.isa_baseline.as_str());
  println!();

  for op in &planned {
    let symbol = if op.applicable {
      symbols::PLUS.if_supports_color(Stream::Stdout, |s| s.green()).to_string()
    } else {
      symbols::MINUS.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string()
    };
    println!(
      "  {} {} {}",
      symbol,
      op.description,
      format!("[{}, {}]", op.id, op.policy).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    for command in op.action.commands() {
      println!("      {}", command.command_line().if_supports_color(Stream::Stdout, |s| s.dimmed()));
    }
  }

  let applicable = planned.iter().filter(|op| op.applicable).count();
  println!();
  println!("{} of {} operation(s) apply to this host", applicable, planned.len());

  Ok(())
}
