//! Profile data types.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::retry::FailurePolicy;

/// A provisioning profile: everything a session installs and configures.
///
/// Every section is optional; an empty section contributes no operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
  /// Failure policy for sections without an override.
  pub default_policy: FailurePolicy,
  /// Per-section failure policy overrides, keyed by operation id.
  pub policies: BTreeMap<String, FailurePolicy>,
  /// Package manager binary.
  pub package_manager: String,
  pub repositories: Repositories,
  pub swaps: Vec<Swap>,
  pub groups: Vec<String>,
  pub packages: Vec<String>,
  pub kernel: Option<KernelSelection>,
  pub flatpak: Option<Flatpak>,
  pub fonts: Option<Fonts>,
  pub themes: Vec<AssetCopy>,
  pub patches: Vec<Patch>,
  pub commands: Vec<CustomCommand>,
  /// Directory relative asset sources resolve against.
  #[serde(skip)]
  pub base_dir: Option<PathBuf>,
}

impl Default for Profile {
  fn default() -> Self {
    Self {
      default_policy: FailurePolicy::default(),
      policies: BTreeMap::new(),
      package_manager: "dnf".to_string(),
      repositories: Repositories::default(),
      swaps: Vec::new(),
      groups: Vec::new(),
      packages: Vec::new(),
      kernel: None,
      flatpak: None,
      fonts: None,
      themes: Vec::new(),
      patches: Vec::new(),
      commands: Vec::new(),
      base_dir: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Repositories {
  /// Release packages (local paths or URLs) that add repositories.
  pub release_packages: Vec<String>,
  /// COPR projects, enabled one by one.
  pub copr: Vec<String>,
  /// Repository definition files written verbatim.
  pub files: Vec<RepoFile>,
  /// Refresh metadata after enabling repositories.
  pub refresh: bool,
}

impl Default for Repositories {
  fn default() -> Self {
    Self {
      release_packages: Vec::new(),
      copr: Vec::new(),
      files: Vec::new(),
      refresh: true,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoFile {
  pub path: PathBuf,
  pub contents: String,
}

/// Replace one package with another (`dnf swap`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Swap {
  pub from: String,
  pub to: String,
  #[serde(default = "default_true")]
  pub allow_erasing: bool,
}

/// Kernel packages chosen by CPU baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelSelection {
  /// Installed on x86-64-v3 hosts.
  pub default: String,
  /// Installed on x86-64-v2 hosts.
  pub fallback: String,
  /// COPR project providing the kernels.
  #[serde(default)]
  pub copr: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlatpakScope {
  #[default]
  System,
  User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Flatpak {
  pub remote: String,
  pub url: String,
  #[serde(default)]
  pub scope: FlatpakScope,
  #[serde(default)]
  pub apps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fonts {
  pub source: PathBuf,
  /// Absolute or `~`-relative install directory.
  #[serde(default = "default_font_dir")]
  pub target: String,
  #[serde(default = "default_true")]
  pub refresh_cache: bool,
}

/// A directory tree copied into place, e.g. a GTK theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetCopy {
  pub source: PathBuf,
  /// Absolute or `~`-relative destination directory.
  pub target: String,
}

/// Lines appended to a config file, after an optional one-time backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Patch {
  pub id: String,
  pub path: PathBuf,
  pub lines: Vec<String>,
  #[serde(default = "default_true")]
  pub backup: bool,
  #[serde(default)]
  pub policy: Option<FailurePolicy>,
}

/// An arbitrary command run as its own operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomCommand {
  pub id: String,
  pub description: String,
  /// Program followed by its arguments.
  pub run: Vec<String>,
  #[serde(default)]
  pub policy: Option<FailurePolicy>,
  /// Binaries that must be on PATH for the command to apply.
  #[serde(default)]
  pub requires: Vec<String>,
  #[serde(default)]
  pub as_user: bool,
  #[serde(default)]
  pub tags: Vec<String>,
}

fn default_true() -> bool {
  true
}

fn default_font_dir() -> String {
  "~/.local/share/fonts".to_string()
}
