//! Test utilities for sysprov-lib.
//!
//! Fakes for the two seams the engine talks to the host through: the
//! [`HostProbe`] used to gather facts and the [`CommandRunner`] every external
//! command goes through.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::PathBuf;

use crate::action::ExecOpts;
use crate::execute::{CmdOutput, CommandRunner};
use crate::facts::{Account, HostFacts, HostProbe, IsaBaseline};

/// In-memory host.
#[derive(Debug, Default, Clone)]
pub struct FakeHost {
  root: bool,
  env: HashMap<String, String>,
  login: Option<String>,
  sessions: Vec<String>,
  accounts: HashMap<String, Account>,
  linker_report: Option<String>,
  binaries: BTreeSet<String>,
}

impl FakeHost {
  /// Root host with only the root account.
  pub fn root() -> Self {
    Self {
      root: true,
      ..Self::default()
    }
    .with_account("root", "/root", 0)
  }

  /// Host running as `user` without privileges.
  pub fn unprivileged(user: &str) -> Self {
    Self::default()
      .with_login(user)
      .with_account(user, &format!("/home/{}", user), 1000)
  }

  pub fn with_env(mut self, key: &str, value: &str) -> Self {
    self.env.insert(key.to_string(), value.to_string());
    self
  }

  pub fn with_login(mut self, user: &str) -> Self {
    self.login = Some(user.to_string());
    self
  }

  pub fn with_sessions(mut self, users: &[&str]) -> Self {
    self.sessions = users.iter().map(|u| u.to_string()).collect();
    self
  }

  /// Add an account whose primary group id equals its uid.
  pub fn with_account(mut self, name: &str, home: &str, uid: u32) -> Self {
    self.accounts.insert(
      name.to_string(),
      Account {
        name: name.to_string(),
        home: PathBuf::from(home),
        uid,
        gid: uid,
      },
    );
    self
  }

  pub fn with_binaries(mut self, binaries: &[&str]) -> Self {
    self.binaries.extend(binaries.iter().map(|b| b.to_string()));
    self
  }

  pub fn with_linker_report(mut self, report: &str) -> Self {
    self.linker_report = Some(report.to_string());
    self
  }
}

impl HostProbe for FakeHost {
  fn is_root(&self) -> bool {
    self.root
  }

  fn env_var(&self, key: &str) -> Option<String> {
    self.env.get(key).cloned()
  }

  fn login_name(&self) -> Option<String> {
    self.login.clone()
  }

  fn session_users(&self) -> Vec<String> {
    self.sessions.clone()
  }

  fn lookup_account(&self, user: &str) -> Option<Account> {
    self.accounts.get(user).cloned()
  }

  fn linker_report(&self) -> Option<String> {
    self.linker_report.clone()
  }

  fn has_binary(&self, name: &str) -> bool {
    self.binaries.contains(name)
  }
}

/// Command runner that records calls and replays canned outputs.
///
/// Responses are looked up by full command line first, then by binary.
/// Queued responses are consumed in order and the last one repeats.
/// Commands without a response succeed.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
  responses: RefCell<HashMap<String, VecDeque<CmdOutput>>>,
  calls: RefCell<Vec<String>>,
}

impl ScriptedRunner {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queue a response for every invocation of `bin`.
  pub fn respond(self, bin: &str, output: CmdOutput) -> Self {
    self.responses.borrow_mut().entry(bin.to_string()).or_default().push_back(output);
    self
  }

  /// Queue a response for one exact command line.
  pub fn respond_to(self, command_line: &str, output: CmdOutput) -> Self {
    self.respond(command_line, output)
  }

  /// Command lines run so far, in order.
  pub fn calls(&self) -> Vec<String> {
    self.calls.borrow().clone()
  }
}

impl CommandRunner for ScriptedRunner {
  fn run(&self, opts: &ExecOpts) -> std::io::Result<CmdOutput> {
    let line = opts.command_line();
    self.calls.borrow_mut().push(line.clone());

    let mut responses = self.responses.borrow_mut();
    let key = if responses.contains_key(&line) { &line } else { &opts.bin };
    let output = match responses.get_mut(key) {
      Some(queue) if queue.len() > 1 => queue.pop_front(),
      Some(queue) => queue.front().cloned(),
      None => None,
    };
    Ok(output.unwrap_or_else(CmdOutput::success))
  }
}

/// Facts for a root session provisioning `alice` on an x86-64-v3 host.
pub fn test_facts() -> HostFacts {
  HostFacts {
    user: "alice".to_string(),
    home: PathBuf::from("/home/alice"),
    uid: 1000,
    gid: 1000,
    is_root: true,
    isa_baseline: IsaBaseline::V3,
    present_binaries: ["dnf", "flatpak", "fc-cache"].into_iter().map(str::to_string).collect(),
  }
}
