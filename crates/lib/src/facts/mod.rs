//! Host capability probe.
//!
//! Facts are gathered once when a session starts and are never re-probed:
//! operations added later in a run (a new repository, a new kernel) do not
//! change what the registry was built from.

pub mod cpu;
pub mod identity;
mod system;

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ProvisionError;

pub use cpu::IsaBaseline;
pub use identity::{parse_session_users, resolve_effective_user};
pub use system::SystemProbe;

/// A user account record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
  pub name: String,
  pub home: PathBuf,
  pub uid: u32,
  pub gid: u32,
}

/// Host surface the probe reads from.
///
/// [`SystemProbe`] talks to the real system; tests substitute their own.
pub trait HostProbe {
  /// Whether the process runs with root privileges.
  fn is_root(&self) -> bool;

  fn env_var(&self, key: &str) -> Option<String>;

  /// Login name of the controlling session.
  fn login_name(&self) -> Option<String>;

  /// Users with an active session, in the order the system lists them.
  fn session_users(&self) -> Vec<String>;

  fn lookup_account(&self, user: &str) -> Option<Account>;

  /// The dynamic linker's capability report, if a linker could be run.
  fn linker_report(&self) -> Option<String>;

  /// Whether `name` resolves to an executable on `PATH`.
  fn has_binary(&self, name: &str) -> bool;
}

/// Immutable snapshot of the host taken at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostFacts {
  /// Effective (non-elevated) user that owns user-facing files.
  pub user: String,
  pub home: PathBuf,
  pub uid: u32,
  pub gid: u32,
  pub is_root: bool,
  pub isa_baseline: IsaBaseline,
  /// Subset of the probed binaries found on `PATH`.
  pub present_binaries: BTreeSet<String>,
}

impl HostFacts {
  pub fn has_binary(&self, name: &str) -> bool {
    self.present_binaries.contains(name)
  }
}

/// Gather facts, failing unless the process runs as root.
pub fn probe<S: AsRef<str>>(host: &dyn HostProbe, binaries: &[S]) -> Result<HostFacts, ProvisionError> {
  if !host.is_root() {
    return Err(ProvisionError::permission(
      "provisioning must run as root (try: sudo sysprov apply)",
    ));
  }
  gather(host, binaries)
}

/// Gather facts without the privilege check. Used by read-only commands.
pub fn gather<S: AsRef<str>>(host: &dyn HostProbe, binaries: &[S]) -> Result<HostFacts, ProvisionError> {
  let user = resolve_effective_user(host);
  let account = host
    .lookup_account(&user)
    .ok_or_else(|| ProvisionError::configuration(format!("no account record for user '{}'", user)))?;

  let isa_baseline = host
    .linker_report()
    .map(|report| IsaBaseline::from_linker_report(&report))
    .unwrap_or_default();

  let present_binaries: BTreeSet<String> = binaries
    .iter()
    .map(AsRef::as_ref)
    .filter(|name| host.has_binary(name))
    .map(str::to_string)
    .collect();

  debug!(present = ?present_binaries, "binary presence probed");

  let facts = HostFacts {
    user: account.name,
    home: account.home,
    uid: account.uid,
    gid: account.gid,
    is_root: host.is_root(),
    isa_baseline,
    present_binaries,
  };

  info!(
    user = %facts.user,
    home = %facts.home.display(),
    root = facts.is_root,
    isa = %facts.isa_baseline,
    "host facts gathered"
  );

  Ok(facts)
}
