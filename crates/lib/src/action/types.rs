use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Options for running one external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOpts {
  pub bin: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
  /// Run as the effective (non-root) user instead of root.
  #[serde(default)]
  pub as_user: bool,
}

impl ExecOpts {
  pub fn new<I, S>(bin: impl Into<String>, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      bin: bin.into(),
      args: args.into_iter().map(Into::into).collect(),
      env: BTreeMap::new(),
      as_user: false,
    }
  }

  pub fn as_user(mut self) -> Self {
    self.as_user = true;
    self
  }

  /// The command as a single display line.
  pub fn command_line(&self) -> String {
    std::iter::once(self.bin.as_str())
      .chain(self.args.iter().map(String::as_str))
      .collect::<Vec<_>>()
      .join(" ")
  }
}

impl fmt::Display for ExecOpts {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.command_line())
  }
}

/// A declarative provisioning step.
///
/// Paths are absolute by the time an action is built; `~` has already been
/// expanded against the effective user's home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
  /// One external call. For bulk installs this is the batch transaction:
  /// the whole set succeeds or fails together.
  Exec(ExecOpts),

  /// One call per item, then an optional combined follow-up (e.g. a
  /// metadata refresh). Items can partially succeed; the action fails if
  /// any item or the follow-up failed.
  Sequence {
    steps: Vec<ExecOpts>,
    then: Option<ExecOpts>,
  },

  /// Append `line` to `path` unless an identical line is already present.
  AppendLine { path: PathBuf, line: String },

  /// Copy `path` to `path.bak` unless that backup already exists.
  Backup { path: PathBuf },

  /// Create a directory (and parents) with the given mode.
  EnsureDir {
    path: PathBuf,
    mode: u32,
    owned_by_user: bool,
  },

  /// Recursively copy a directory tree.
  CopyTree {
    from: PathBuf,
    to: PathBuf,
    owned_by_user: bool,
  },

  /// Write a file. Existing files are left alone unless `overwrite` is set.
  WriteFile {
    path: PathBuf,
    contents: String,
    mode: u32,
    overwrite: bool,
  },

  /// Succeeds without side effects after logging a warning.
  Warn { message: String },

  /// Run actions in order, stopping at the first failure.
  Steps { steps: Vec<Action> },
}

impl Action {
  /// Short human-readable summary, used by plan output.
  pub fn describe(&self) -> String {
    match self {
      Action::Exec(opts) => opts.command_line(),
      Action::Sequence { steps, then } => {
        let mut desc = format!("{} command(s), one per item", steps.len());
        if let Some(then) = then {
          desc.push_str(&format!(", then {}", then.command_line()));
        }
        desc
      }
      Action::AppendLine { path, line } => format!("append '{}' to {}", line, path.display()),
      Action::Backup { path } => format!("back up {}", path.display()),
      Action::EnsureDir { path, mode, .. } => format!("create {} (mode {:o})", path.display(), mode),
      Action::CopyTree { from, to, .. } => format!("copy {} -> {}", from.display(), to.display()),
      Action::WriteFile { path, .. } => format!("write {}", path.display()),
      Action::Warn { message } => format!("warn: {}", message),
      Action::Steps { steps } => steps.iter().map(Action::describe).collect::<Vec<_>>().join("; "),
    }
  }

  /// Every external command this action may run, in order.
  pub fn commands(&self) -> Vec<&ExecOpts> {
    match self {
      Action::Exec(opts) => vec![opts],
      Action::Sequence { steps, then } => steps.iter().chain(then.iter()).collect(),
      Action::Steps { steps } => steps.iter().flat_map(Action::commands).collect(),
      _ => Vec::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn command_line_joins_args() {
    let opts = ExecOpts::new("dnf", ["install", "-y", "git"]);
    assert_eq!(opts.command_line(), "dnf install -y git");
    assert_eq!(ExecOpts::new("true", Vec::<String>::new()).to_string(), "true");
  }

  #[test]
  fn sequence_description_mentions_follow_up() {
    let action = Action::Sequence {
      steps: vec![
        ExecOpts::new("dnf", ["copr", "enable", "-y", "a/b"]),
        ExecOpts::new("dnf", ["copr", "enable", "-y", "c/d"]),
      ],
      then: Some(ExecOpts::new("dnf", ["makecache"])),
    };
    assert_eq!(action.describe(), "2 command(s), one per item, then dnf makecache");
    assert_eq!(action.commands().len(), 3);
  }

  #[test]
  fn nested_steps_collect_commands() {
    let action = Action::Steps {
      steps: vec![
        Action::EnsureDir {
          path: PathBuf::from("/home/alice/.local/share/fonts"),
          mode: 0o755,
          owned_by_user: true,
        },
        Action::Exec(ExecOpts::new("fc-cache", ["-f"])),
      ],
    };
    let commands = action.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].bin, "fc-cache");
    assert!(action.describe().starts_with("create /home/alice/.local/share/fonts (mode 755)"));
  }

  #[test]
  fn actions_serialize_with_type_tag() {
    let action = Action::Warn {
      message: "no kernel".to_string(),
    };
    let json = serde_json::to_value(&action).unwrap();
    assert_eq!(json["type"], "warn");
  }
}
