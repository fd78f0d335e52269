mod apply;
mod facts;
mod init;
mod plan;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use sysprov_lib::platform::paths;
use sysprov_lib::profile::Profile;

pub use apply::{ApplyArgs, cmd_apply};
pub use facts::cmd_facts;
pub use init::cmd_init;
pub use plan::cmd_plan;

/// Where a loaded profile came from.
pub enum ProfileSource {
  File(PathBuf),
  BuiltIn,
}

impl std::fmt::Display for ProfileSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ProfileSource::File(path) => write!(f, "{}", path.display()),
      ProfileSource::BuiltIn => write!(f, "built-in profile"),
    }
  }
}

/// Load the profile named on the command line, else the default location,
/// else the built-in profile.
pub fn load_profile(explicit: Option<&Path>) -> Result<(Profile, ProfileSource)> {
  let path = match explicit {
    Some(path) => path.to_path_buf(),
    None => {
      let path = paths::default_profile_path();
      if !path.exists() {
        debug!(path = %path.display(), "no profile on disk, using built-in profile");
        let profile = Profile::embedded().context("Built-in profile is invalid")?;
        return Ok((profile, ProfileSource::BuiltIn));
      }
      path
    }
  };

  let profile = Profile::load(&path).map_err(sysprov_lib::ProvisionError::from)?;
  let shown = dunce::canonicalize(&path).unwrap_or(path);
  Ok((profile, ProfileSource::File(shown)))
}
