//! Implementation of the `sysprov facts` command.

use std::path::Path;

use anyhow::Result;

use sysprov_lib::facts::{self, SystemProbe};

use crate::cmd::load_profile;
use crate::output::{print_json, print_stat, print_success};

pub fn cmd_facts(profile: Option<&Path>, json: bool) -> Result<()> {
  let (profile, _) = load_profile(profile)?;
  let watched: Vec<String> = profile.watched_binaries().into_iter().collect();
  let facts = facts::gather(&SystemProbe::new(), watched.as_slice())?;

  if json {
    return print_json(&facts);
  }

  print_success("Host facts");
  print_stat("User", &facts.user);
  print_stat("Home", &facts.home.display().to_string());
  print_stat("UID/GID", &format!("{}/{}", facts.uid, facts.gid));
  print_stat("Root", if facts.is_root { "yes" } else { "no" });
  print_stat("CPU baseline", facts.isa_baseline.as_str());
  for binary in &watched {
    let state = if facts.has_binary(binary) { "present" } else { "missing" };
    print_stat(binary, state);
  }

  Ok(())
}
