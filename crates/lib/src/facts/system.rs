//! Probe backed by the running system.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::cpu::LINKER_PATHS;
use super::{Account, HostProbe, parse_session_users};

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProbe;

impl SystemProbe {
  pub fn new() -> Self {
    Self
  }
}

impl HostProbe for SystemProbe {
  fn is_root(&self) -> bool {
    crate::platform::is_elevated()
  }

  fn env_var(&self, key: &str) -> Option<String> {
    std::env::var(key).ok()
  }

  fn login_name(&self) -> Option<String> {
    command_stdout("logname", &[]).map(|s| s.trim().to_string())
  }

  fn session_users(&self) -> Vec<String> {
    command_stdout("who", &[])
      .map(|out| parse_session_users(&out))
      .unwrap_or_default()
  }

  #[cfg(unix)]
  fn lookup_account(&self, user: &str) -> Option<Account> {
    match nix::unistd::User::from_name(user) {
      Ok(Some(record)) => Some(Account {
        name: record.name,
        home: record.dir,
        uid: record.uid.as_raw(),
        gid: record.gid.as_raw(),
      }),
      Ok(None) => None,
      Err(e) => {
        debug!(user, error = %e, "account lookup failed");
        None
      }
    }
  }

  #[cfg(not(unix))]
  fn lookup_account(&self, _user: &str) -> Option<Account> {
    None
  }

  fn linker_report(&self) -> Option<String> {
    let linker = LINKER_PATHS.iter().map(Path::new).find(|p| p.exists())?;
    command_stdout(&linker.to_string_lossy(), &["--help"])
  }

  fn has_binary(&self, name: &str) -> bool {
    let Some(path) = std::env::var_os("PATH") else {
      return false;
    };
    std::env::split_paths(&path).any(|dir| is_executable(&dir.join(name)))
  }
}

fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
  match Command::new(program).args(args).output() {
    Ok(output) if output.status.success() => Some(String::from_utf8_lossy(&output.stdout).into_owned()),
    Ok(output) => {
      debug!(program, code = ?output.status.code(), "probe command failed");
      None
    }
    Err(e) => {
      debug!(program, error = %e, "probe command could not run");
      None
    }
  }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;
  path
    .metadata()
    .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
    .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path.is_file()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  #[cfg(unix)]
  fn finds_sh_on_path() {
    assert!(SystemProbe.has_binary("sh"));
    assert!(!SystemProbe.has_binary("this_binary_definitely_does_not_exist_12345"));
  }

  #[test]
  #[cfg(unix)]
  fn looks_up_root_account() {
    let account = SystemProbe.lookup_account("root").expect("root account exists");
    assert_eq!(account.uid, 0);
  }
}
