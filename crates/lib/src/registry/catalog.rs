//! Builds the ordered operation list for a profile.
//!
//! Order follows what a fresh install needs: package manager tuning first,
//! then repositories, packages, the kernel, Flatpak apps, and finally user
//! assets and custom commands.

use crate::action::{Action, ExecOpts};
use crate::facts::{HostFacts, IsaBaseline};
use crate::profile::{FlatpakScope, KernelSelection, Profile, expand_home};
use crate::retry::FailurePolicy;

use super::Operation;

pub const REPO_FILES: &str = "repo-files";
pub const RELEASE_PACKAGES: &str = "release-packages";
pub const COPR: &str = "copr";
pub const METADATA_REFRESH: &str = "metadata-refresh";
pub const SWAPS: &str = "swaps";
pub const GROUPS: &str = "groups";
pub const PACKAGES: &str = "packages";
pub const KERNEL: &str = "kernel";
pub const FLATPAK_REMOTE: &str = "flatpak-remote";
pub const FLATPAK_APPS: &str = "flatpak-apps";
pub const FONTS: &str = "fonts";
pub const FONT_CACHE: &str = "font-cache";
pub const THEMES: &str = "themes";

/// Ids of operations derived from profile sections.
pub const BUILTIN_IDS: &[&str] = &[
  REPO_FILES,
  RELEASE_PACKAGES,
  COPR,
  METADATA_REFRESH,
  SWAPS,
  GROUPS,
  PACKAGES,
  KERNEL,
  FLATPAK_REMOTE,
  FLATPAK_APPS,
  FONTS,
  FONT_CACHE,
  THEMES,
];

const DIR_MODE: u32 = 0o755;
const REPO_FILE_MODE: u32 = 0o644;

/// All operations for `profile` on a host described by `facts`, in run order.
pub fn operations(profile: &Profile, facts: &HostFacts) -> Vec<Operation> {
  let pm = profile.package_manager.as_str();
  let mut ops = Vec::new();

  for patch in &profile.patches {
    let mut steps = Vec::new();
    if patch.backup {
      steps.push(Action::Backup {
        path: patch.path.clone(),
      });
    }
    steps.extend(patch.lines.iter().map(|line| Action::AppendLine {
      path: patch.path.clone(),
      line: line.clone(),
    }));
    ops.push(
      Operation::new(
        &patch.id,
        format!("Patch {}", patch.path.display()),
        Action::Steps { steps },
      )
      .with_policy(patch.policy.unwrap_or(profile.default_policy))
      .tagged("config"),
    );
  }

  let repos = &profile.repositories;
  if !repos.files.is_empty() {
    let steps = repos
      .files
      .iter()
      .map(|file| Action::WriteFile {
        path: file.path.clone(),
        contents: file.contents.clone(),
        mode: REPO_FILE_MODE,
        overwrite: true,
      })
      .collect();
    ops.push(
      Operation::new(REPO_FILES, "Write repository definitions", Action::Steps { steps })
        .with_policy(profile.policy_for(REPO_FILES))
        .tagged("repositories"),
    );
  }

  if !repos.release_packages.is_empty() {
    let script = format!("{} install -y {}", pm, repos.release_packages.join(" "));
    ops.push(
      Operation::new(
        RELEASE_PACKAGES,
        "Install repository release packages",
        Action::Exec(ExecOpts::new("sh", ["-c".to_string(), script])),
      )
      .with_policy(profile.policy_for(RELEASE_PACKAGES))
      .tagged("repositories"),
    );
  }

  let refresh = repos.refresh.then(|| ExecOpts::new(pm, ["makecache"]));
  if !repos.copr.is_empty() {
    let steps = repos
      .copr
      .iter()
      .map(|project| ExecOpts::new(pm, ["copr", "enable", "-y", project.as_str()]))
      .collect();
    ops.push(
      Operation::new(COPR, "Enable COPR repositories", Action::Sequence { steps, then: refresh })
        .with_policy(profile.policy_for(COPR))
        .tagged("repositories"),
    );
  } else if let Some(refresh) = refresh.filter(|_| !repos.files.is_empty() || !repos.release_packages.is_empty()) {
    ops.push(
      Operation::new(METADATA_REFRESH, "Refresh repository metadata", Action::Exec(refresh))
        .with_policy(profile.policy_for(METADATA_REFRESH))
        .tagged("repositories"),
    );
  }

  if !profile.swaps.is_empty() {
    let steps = profile
      .swaps
      .iter()
      .map(|swap| {
        let mut args = vec!["swap".to_string(), "-y".to_string()];
        if swap.allow_erasing {
          args.push("--allowerasing".to_string());
        }
        args.push(swap.from.clone());
        args.push(swap.to.clone());
        ExecOpts::new(pm, args)
      })
      .collect();
    ops.push(
      Operation::new(SWAPS, "Swap packages", Action::Sequence { steps, then: None })
        .with_policy(profile.policy_for(SWAPS))
        .tagged("packages"),
    );
  }

  if !profile.groups.is_empty() {
    ops.push(
      Operation::new(
        GROUPS,
        "Install package groups",
        Action::Exec(ExecOpts::new(pm, batch(["group", "install", "-y"], &profile.groups))),
      )
      .with_policy(profile.policy_for(GROUPS))
      .tagged("packages"),
    );
  }

  if !profile.packages.is_empty() {
    ops.push(
      Operation::new(
        PACKAGES,
        format!("Install {} package(s)", profile.packages.len()),
        Action::Exec(ExecOpts::new(pm, batch(["install", "-y"], &profile.packages))),
      )
      .with_policy(profile.policy_for(PACKAGES))
      .tagged("packages"),
    );
  }

  if let Some(kernel) = &profile.kernel {
    ops.push(
      kernel_operation(pm, kernel, facts.isa_baseline)
        .with_policy(profile.policy_for(KERNEL))
        .tagged("kernel"),
    );
  }

  if let Some(flatpak) = &profile.flatpak {
    let user_scope = flatpak.scope == FlatpakScope::User;
    let scope_flag = if user_scope { "--user" } else { "--system" };

    let mut remote = ExecOpts::new(
      "flatpak",
      [
        "remote-add",
        "--if-not-exists",
        scope_flag,
        flatpak.remote.as_str(),
        flatpak.url.as_str(),
      ],
    );
    if user_scope {
      remote = remote.as_user();
    }
    ops.push(
      Operation::new(
        FLATPAK_REMOTE,
        format!("Add Flatpak remote {}", flatpak.remote),
        Action::Exec(remote),
      )
      .with_policy(profile.policy_for(FLATPAK_REMOTE))
      .requires_binary("flatpak")
      .tagged("flatpak"),
    );

    if !flatpak.apps.is_empty() {
      let mut install = ExecOpts::new(
        "flatpak",
        batch(
          ["install", "-y", "--noninteractive", scope_flag, flatpak.remote.as_str()],
          &flatpak.apps,
        ),
      );
      if user_scope {
        install = install.as_user();
      }
      ops.push(
        Operation::new(
          FLATPAK_APPS,
          format!("Install {} Flatpak app(s)", flatpak.apps.len()),
          Action::Exec(install),
        )
        .with_policy(profile.policy_for(FLATPAK_APPS))
        .requires_binary("flatpak")
        .tagged("flatpak"),
      );
    }
  }

  if let Some(fonts) = &profile.fonts {
    let target = expand_home(&fonts.target, &facts.home);
    ops.push(
      Operation::new(
        FONTS,
        format!("Install fonts into {}", target.display()),
        Action::Steps {
          steps: vec![
            Action::EnsureDir {
              path: target.clone(),
              mode: DIR_MODE,
              owned_by_user: true,
            },
            Action::CopyTree {
              from: profile.resolve_source(&fonts.source),
              to: target,
              owned_by_user: true,
            },
          ],
        },
      )
      .with_policy(profile.policy_for(FONTS))
      .tagged("assets"),
    );

    if fonts.refresh_cache {
      // A stale font cache is cosmetic, so it never stops a session by default.
      let policy = profile
        .policies
        .get(FONT_CACHE)
        .copied()
        .unwrap_or(FailurePolicy::WarnAndContinue);
      ops.push(
        Operation::new(
          FONT_CACHE,
          "Refresh font cache",
          Action::Exec(ExecOpts::new("fc-cache", ["-f"]).as_user()),
        )
        .with_policy(policy)
        .requires_binary("fc-cache")
        .tagged("assets"),
      );
    }
  }

  if !profile.themes.is_empty() {
    let steps = profile
      .themes
      .iter()
      .flat_map(|theme| {
        let target = expand_home(&theme.target, &facts.home);
        [
          Action::EnsureDir {
            path: target.clone(),
            mode: DIR_MODE,
            owned_by_user: true,
          },
          Action::CopyTree {
            from: profile.resolve_source(&theme.source),
            to: target,
            owned_by_user: true,
          },
        ]
      })
      .collect();
    ops.push(
      Operation::new(THEMES, "Copy theme assets", Action::Steps { steps })
        .with_policy(profile.policy_for(THEMES))
        .tagged("assets"),
    );
  }

  for command in &profile.commands {
    let (bin, args) = match command.run.split_first() {
      Some((bin, args)) => (bin, args),
      None => continue,
    };
    let mut opts = ExecOpts::new(bin.as_str(), args.iter().cloned());
    if command.as_user {
      opts = opts.as_user();
    }
    let mut op = Operation::new(&command.id, &command.description, Action::Exec(opts))
      .with_policy(command.policy.unwrap_or(profile.default_policy))
      .tagged("custom");
    for tag in &command.tags {
      op = op.tagged(tag.as_str());
    }
    for bin in &command.requires {
      op = op.requires_binary(bin.as_str());
    }
    ops.push(op);
  }

  ops
}

/// Kernel install for the host's CPU baseline.
fn kernel_operation(pm: &str, kernel: &KernelSelection, baseline: IsaBaseline) -> Operation {
  let package = match baseline {
    IsaBaseline::V3 => &kernel.default,
    IsaBaseline::V2 => &kernel.fallback,
    IsaBaseline::None => {
      return Operation::new(
        KERNEL,
        "Select kernel",
        Action::Warn {
          message: format!(
            "CPU supports neither x86-64-v2 nor x86-64-v3, keeping the distribution kernel instead of {}",
            kernel.default
          ),
        },
      );
    }
  };

  let mut steps = Vec::new();
  if let Some(project) = &kernel.copr {
    steps.push(Action::Exec(ExecOpts::new(pm, ["copr", "enable", "-y", project.as_str()])));
  }
  steps.push(Action::Exec(ExecOpts::new(pm, ["install", "-y", package.as_str()])));

  Operation::new(
    KERNEL,
    format!("Install {} (x86-64-{})", package, baseline),
    Action::Steps { steps },
  )
}

fn batch<const N: usize>(prefix: [&str; N], items: &[String]) -> Vec<String> {
  prefix
    .iter()
    .map(|s| s.to_string())
    .chain(items.iter().cloned())
    .collect()
}
