//! Implementation of the `sysprov init` command.
//!
//! Writes the built-in profile to disk so it can be edited.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use sysprov_lib::platform::paths;
use sysprov_lib::profile::DEFAULT_PROFILE;

use crate::output::{print_info, print_success};
use crate::prompts::confirm_overwrite;

pub fn cmd_init(path: Option<PathBuf>, force: bool) -> Result<()> {
  let path = path.unwrap_or_else(paths::default_profile_path);

  if path.exists() && !confirm_overwrite(&path, force)? {
    print_info("Left the existing profile untouched");
    return Ok(());
  }

  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
  }
  fs::write(&path, DEFAULT_PROFILE).with_context(|| format!("Failed to write profile: {}", path.display()))?;

  print_success(&format!("Wrote profile to {}", path.display()));
  print_info("Edit it, then run: sudo sysprov apply --profile <path>");
  Ok(())
}
