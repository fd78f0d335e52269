//! Provisioning profiles.
//!
//! A profile is a TOML document describing what a session installs and
//! configures. A Fedora profile ships embedded in the binary; `sysprov init`
//! writes it out for editing.

mod types;

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::registry::catalog::BUILTIN_IDS;
use crate::retry::FailurePolicy;

pub use types::{
  AssetCopy, CustomCommand, Flatpak, FlatpakScope, Fonts, KernelSelection, Patch, Profile, RepoFile, Repositories,
  Swap,
};

/// The embedded default profile.
pub const DEFAULT_PROFILE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../../profiles/default.toml"));

#[derive(Debug, Error)]
pub enum ProfileError {
  #[error("failed to read profile {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse profile {origin}: {source}")]
  Parse {
    origin: String,
    #[source]
    source: toml::de::Error,
  },

  #[error("invalid profile: {0}")]
  Invalid(String),
}

impl Profile {
  /// Load and validate a profile from disk.
  ///
  /// Relative asset sources in the profile resolve against the profile's
  /// directory.
  pub fn load(path: &Path) -> Result<Self, ProfileError> {
    debug!(path = %path.display(), "loading profile");
    let content = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    let mut profile = Self::parse(&content, &path.display().to_string())?;
    profile.base_dir = path.parent().map(Path::to_path_buf);
    profile.validate()?;
    Ok(profile)
  }

  /// Parse and validate a profile from a TOML string.
  pub fn from_toml_str(content: &str) -> Result<Self, ProfileError> {
    let profile = Self::parse(content, "<string>")?;
    profile.validate()?;
    Ok(profile)
  }

  /// The embedded default profile.
  pub fn embedded() -> Result<Self, ProfileError> {
    let profile = Self::parse(DEFAULT_PROFILE, "<embedded>")?;
    profile.validate()?;
    Ok(profile)
  }

  fn parse(content: &str, origin: &str) -> Result<Self, ProfileError> {
    toml::from_str(content).map_err(|source| ProfileError::Parse {
      origin: origin.to_string(),
      source,
    })
  }

  /// Check the rules serde cannot express.
  pub fn validate(&self) -> Result<(), ProfileError> {
    if self.package_manager.trim().is_empty() {
      return Err(invalid("package_manager must not be empty"));
    }

    check_names("packages", &self.packages)?;
    check_names("groups", &self.groups)?;
    check_names("repositories.copr", &self.repositories.copr)?;
    check_names("repositories.release_packages", &self.repositories.release_packages)?;
    for swap in &self.swaps {
      check_names("swaps", [&swap.from, &swap.to])?;
    }

    if let Some(kernel) = &self.kernel {
      check_names("kernel", [&kernel.default, &kernel.fallback])?;
    }

    if let Some(flatpak) = &self.flatpak {
      check_names("flatpak", [&flatpak.remote, &flatpak.url])?;
      check_names("flatpak.apps", &flatpak.apps)?;
    }

    for file in &self.repositories.files {
      check_absolute("repositories.files", &file.path)?;
    }

    if let Some(fonts) = &self.fonts {
      check_target("fonts.target", &fonts.target)?;
    }
    for theme in &self.themes {
      check_target("themes.target", &theme.target)?;
    }

    let mut ids: HashSet<&str> = HashSet::new();
    for id in self.patches.iter().map(|p| &p.id).chain(self.commands.iter().map(|c| &c.id)) {
      if id.trim().is_empty() {
        return Err(invalid("operation ids must not be empty"));
      }
      if BUILTIN_IDS.contains(&id.as_str()) {
        return Err(invalid(format!("id '{}' is reserved for a built-in operation", id)));
      }
      if !ids.insert(id) {
        return Err(invalid(format!("duplicate operation id '{}'", id)));
      }
    }

    for patch in &self.patches {
      check_absolute("patches", &patch.path)?;
      if patch.lines.is_empty() {
        return Err(invalid(format!("patch '{}' has no lines", patch.id)));
      }
    }

    for command in &self.commands {
      if command.run.first().is_none_or(|bin| bin.trim().is_empty()) {
        return Err(invalid(format!("command '{}' has nothing to run", command.id)));
      }
    }

    for key in self.policies.keys() {
      if !BUILTIN_IDS.contains(&key.as_str()) {
        return Err(invalid(format!(
          "policy override for unknown section '{}' (expected one of: {})",
          key,
          BUILTIN_IDS.join(", ")
        )));
      }
    }

    Ok(())
  }

  /// Failure policy for a built-in section.
  pub fn policy_for(&self, section: &str) -> FailurePolicy {
    self.policies.get(section).copied().unwrap_or(self.default_policy)
  }

  /// Binaries whose presence gates operations in this profile.
  pub fn watched_binaries(&self) -> BTreeSet<String> {
    let mut binaries: BTreeSet<String> = [self.package_manager.as_str(), "flatpak", "fc-cache"]
      .into_iter()
      .map(str::to_string)
      .collect();
    for command in &self.commands {
      binaries.extend(command.requires.iter().cloned());
    }
    binaries
  }

  /// Resolve an asset source against the profile's directory.
  pub fn resolve_source(&self, source: &Path) -> PathBuf {
    match &self.base_dir {
      Some(base) if source.is_relative() => base.join(source),
      _ => source.to_path_buf(),
    }
  }
}

/// Expand a leading `~` against the effective user's home.
pub fn expand_home(target: &str, home: &Path) -> PathBuf {
  if target == "~" {
    home.to_path_buf()
  } else if let Some(rest) = target.strip_prefix("~/") {
    home.join(rest)
  } else {
    PathBuf::from(target)
  }
}

fn invalid(msg: impl Into<String>) -> ProfileError {
  ProfileError::Invalid(msg.into())
}

fn check_names<I, S>(section: &str, names: I) -> Result<(), ProfileError>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  if names.into_iter().any(|n| n.as_ref().trim().is_empty()) {
    return Err(invalid(format!("{} contains an empty name", section)));
  }
  Ok(())
}

fn check_absolute(section: &str, path: &Path) -> Result<(), ProfileError> {
  if !path.is_absolute() {
    return Err(invalid(format!("{}: path {} must be absolute", section, path.display())));
  }
  Ok(())
}

fn check_target(section: &str, target: &str) -> Result<(), ProfileError> {
  if target == "~" || target.starts_with("~/") || Path::new(target).is_absolute() {
    Ok(())
  } else {
    Err(invalid(format!(
      "{}: '{}' must be absolute or start with ~/",
      section, target
    )))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn embedded_profile_is_valid() {
    let profile = Profile::embedded().unwrap();
    assert_eq!(profile.package_manager, "dnf");
    assert_eq!(profile.default_policy, FailurePolicy::Interactive);
    assert!(profile.kernel.is_some());
    assert!(!profile.packages.is_empty());
    // Asset copies ship commented out; the repo carries no asset tree.
    assert!(profile.fonts.is_none());
    assert!(profile.themes.is_empty());
  }

  #[test]
  fn empty_document_uses_defaults() {
    let profile = Profile::from_toml_str("").unwrap();
    assert_eq!(profile, Profile::default());
    assert!(profile.repositories.refresh);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    let err = Profile::from_toml_str("pacakges = [\"git\"]").unwrap_err();
    assert!(matches!(err, ProfileError::Parse { .. }));
  }

  #[test]
  fn policies_parse_kebab_case() {
    let profile = Profile::from_toml_str(
      r#"
default_policy = "abort"

[policies]
packages = "warn-and-continue"
"#,
    )
    .unwrap();
    assert_eq!(profile.policy_for("packages"), FailurePolicy::WarnAndContinue);
    assert_eq!(profile.policy_for("groups"), FailurePolicy::Abort);
  }

  #[test]
  fn policy_override_for_unknown_section_is_invalid() {
    let err = Profile::from_toml_str("[policies]\npackgaes = \"abort\"").unwrap_err();
    assert!(err.to_string().contains("packgaes"));
  }

  #[test]
  fn duplicate_ids_are_invalid() {
    let err = Profile::from_toml_str(
      r#"
[[commands]]
id = "hostname"
description = "Set hostname"
run = ["hostnamectl", "set-hostname", "box"]

[[patches]]
id = "hostname"
path = "/etc/hosts"
lines = ["127.0.0.1 box"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("duplicate operation id 'hostname'"));
  }

  #[test]
  fn builtin_ids_are_reserved() {
    let err = Profile::from_toml_str(
      r#"
[[commands]]
id = "kernel"
description = "Custom kernel"
run = ["true"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("reserved"));
  }

  #[test]
  fn relative_targets_are_invalid() {
    let err = Profile::from_toml_str(
      r#"
[[themes]]
source = "themes/Nordic"
target = ".themes/Nordic"
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("themes.target"));
  }

  #[test]
  fn empty_package_names_are_invalid() {
    let err = Profile::from_toml_str("packages = [\"git\", \" \"]").unwrap_err();
    assert!(err.to_string().contains("packages contains an empty name"));
  }

  #[test]
  fn empty_command_is_invalid() {
    let err = Profile::from_toml_str(
      r#"
[[commands]]
id = "noop"
description = "Nothing"
run = []
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("nothing to run"));
  }

  #[test]
  fn expand_home_handles_tilde_forms() {
    let home = Path::new("/home/alice");
    assert_eq!(expand_home("~", home), PathBuf::from("/home/alice"));
    assert_eq!(expand_home("~/.themes", home), PathBuf::from("/home/alice/.themes"));
    assert_eq!(expand_home("/usr/share/themes", home), PathBuf::from("/usr/share/themes"));
  }

  #[test]
  fn load_resolves_sources_against_profile_dir() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("profile.toml");
    std::fs::write(
      &path,
      r#"
[fonts]
source = "assets/fonts"
"#,
    )
    .unwrap();

    let profile = Profile::load(&path).unwrap();
    let fonts = profile.fonts.as_ref().unwrap();
    assert_eq!(fonts.target, "~/.local/share/fonts");
    assert_eq!(profile.resolve_source(&fonts.source), temp.path().join("assets/fonts"));
    assert_eq!(
      profile.resolve_source(Path::new("/opt/fonts")),
      PathBuf::from("/opt/fonts")
    );
  }

  #[test]
  fn load_missing_file_is_io_error() {
    let temp = TempDir::new().unwrap();
    let err = Profile::load(&temp.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ProfileError::Io { .. }));
  }

  #[test]
  fn watched_binaries_include_command_requirements() {
    let profile = Profile::from_toml_str(
      r#"
[[commands]]
id = "rustup"
description = "Install Rust toolchain"
run = ["rustup", "default", "stable"]
requires = ["rustup"]
"#,
    )
    .unwrap();
    let watched = profile.watched_binaries();
    assert!(watched.contains("dnf"));
    assert!(watched.contains("flatpak"));
    assert!(watched.contains("rustup"));
  }
}
