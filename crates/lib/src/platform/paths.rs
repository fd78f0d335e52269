use std::path::PathBuf;

use crate::consts::{APP_NAME, PROFILE_ENV};

/// File name of the provisioning profile inside the config directory.
pub const PROFILE_FILE: &str = "profile.toml";

/// Returns the user's home directory, or `/root` when `HOME` is unset.
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("/root"))
}

/// Returns the directory for configuration files for the application
pub fn config_dir() -> PathBuf {
  let config_home = std::env::var("XDG_CONFIG_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".config"));
  config_home.join(APP_NAME)
}

/// Returns the profile path: `SYSPROV_PROFILE` if set, else the config directory.
pub fn default_profile_path() -> PathBuf {
  match std::env::var_os(PROFILE_ENV) {
    Some(path) if !path.is_empty() => PathBuf::from(path),
    _ => config_dir().join(PROFILE_FILE),
  }
}
