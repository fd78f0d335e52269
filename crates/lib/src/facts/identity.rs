//! Effective-user resolution.
//!
//! Provisioning runs as root but user-facing files belong to whoever asked
//! for the elevation. Resolution order:
//! 1. `SUDO_USER`, unless it names the superuser
//! 2. the session login name
//! 3. the first user in the active-sessions list
//! 4. the superuser

use crate::consts::ROOT_USER;

use super::HostProbe;

pub const SUDO_USER_ENV: &str = "SUDO_USER";

pub fn resolve_effective_user(host: &dyn HostProbe) -> String {
  if let Some(user) = host.env_var(SUDO_USER_ENV).filter(|u| !u.is_empty() && u != ROOT_USER) {
    return user;
  }

  if let Some(user) = host.login_name().filter(|u| !u.is_empty()) {
    return user;
  }

  if let Some(user) = host.session_users().into_iter().find(|u| !u.is_empty()) {
    return user;
  }

  ROOT_USER.to_string()
}

/// Parse `who` output into the user column, in order.
pub fn parse_session_users(output: &str) -> Vec<String> {
  output
    .lines()
    .filter_map(|line| line.split_whitespace().next())
    .map(str::to_string)
    .collect()
}
