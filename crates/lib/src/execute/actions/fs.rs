//! Filesystem actions.
//!
//! Every action here is idempotent: running it twice leaves the host in the
//! same state as running it once.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::consts::BACKUP_SUFFIX;
use crate::execute::types::ActionError;

/// What [`backup_once`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOutcome {
  Created,
  AlreadyPresent,
  SourceMissing,
}

/// `<path>.bak`, keeping the original extension.
pub fn backup_path(path: &Path) -> PathBuf {
  let mut name = OsString::from(path.as_os_str());
  name.push(BACKUP_SUFFIX);
  PathBuf::from(name)
}

/// Append `line` to `path` unless an identical line already exists.
///
/// Creates the file if needed. Returns whether the file changed.
pub fn append_line_if_absent(path: &Path, line: &str) -> Result<bool, ActionError> {
  let existing = match fs::read_to_string(path) {
    Ok(content) => content,
    Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
    Err(e) => return Err(ActionError::io(path, e)),
  };

  let wanted = line.trim_end();
  if existing.lines().any(|l| l.trim_end() == wanted) {
    debug!(path = %path.display(), line = wanted, "line already present");
    return Ok(false);
  }

  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).map_err(|e| ActionError::io(parent, e))?;
  }

  let mut file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .map_err(|e| ActionError::io(path, e))?;

  let mut chunk = String::new();
  if !existing.is_empty() && !existing.ends_with('\n') {
    chunk.push('\n');
  }
  chunk.push_str(wanted);
  chunk.push('\n');
  file.write_all(chunk.as_bytes()).map_err(|e| ActionError::io(path, e))?;

  info!(path = %path.display(), line = wanted, "line appended");
  Ok(true)
}

/// Copy `path` to `<path>.bak` unless a backup already exists.
///
/// An existing backup is never overwritten, so the first backup taken on a
/// host is the one that survives.
pub fn backup_once(path: &Path) -> Result<BackupOutcome, ActionError> {
  let backup = backup_path(path);

  if backup.exists() {
    debug!(backup = %backup.display(), "backup already present");
    return Ok(BackupOutcome::AlreadyPresent);
  }

  if !path.exists() {
    debug!(path = %path.display(), "nothing to back up");
    return Ok(BackupOutcome::SourceMissing);
  }

  fs::copy(path, &backup).map_err(|e| ActionError::io(&backup, e))?;
  info!(path = %path.display(), backup = %backup.display(), "backup created");
  Ok(BackupOutcome::Created)
}

/// Create `path` and its parents, then apply `mode` and ownership.
///
/// Every directory created here, not just the leaf, gets `mode` and `owner`.
pub fn ensure_dir(path: &Path, mode: u32, owner: Option<(u32, u32)>) -> Result<(), ActionError> {
  create_dirs(path, Some(mode), owner)?;
  set_mode(path, mode)?;
  if let Some(owner) = owner {
    chown(path, owner)?;
  }
  Ok(())
}

/// Write `contents` to `path`. Returns false if the file existed and
/// `overwrite` is unset.
pub fn write_file(path: &Path, contents: &str, mode: u32, overwrite: bool) -> Result<bool, ActionError> {
  if path.exists() && !overwrite {
    debug!(path = %path.display(), "file exists, leaving untouched");
    return Ok(false);
  }

  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent).map_err(|e| ActionError::io(parent, e))?;
  }
  fs::write(path, contents).map_err(|e| ActionError::io(path, e))?;
  set_mode(path, mode)?;
  info!(path = %path.display(), "file written");
  Ok(true)
}

/// Recursively copy `from` into `to`, overwriting files with the same name.
///
/// Returns the number of files copied.
pub fn copy_tree(from: &Path, to: &Path, owner: Option<(u32, u32)>) -> Result<usize, ActionError> {
  if !from.exists() {
    return Err(ActionError::SourceMissing(from.display().to_string()));
  }

  let mut copied = 0;
  for entry in WalkDir::new(from) {
    let entry = entry.map_err(|e| ActionError::Walk {
      path: from.display().to_string(),
      source: e,
    })?;

    let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
    let target = to.join(relative);
    let file_type = entry.file_type();

    if file_type.is_dir() {
      create_dirs(&target, None, owner)?;
    } else if file_type.is_symlink() {
      copy_symlink(entry.path(), &target)?;
    } else {
      if let Some(parent) = target.parent() {
        create_dirs(parent, None, owner)?;
      }
      fs::copy(entry.path(), &target).map_err(|e| ActionError::io(&target, e))?;
      copied += 1;
    }

    // Symlinks are left alone so chown never follows them out of the tree.
    if let Some(owner) = owner.filter(|_| !file_type.is_symlink()) {
      chown(&target, owner)?;
    }
  }

  info!(from = %from.display(), to = %to.display(), files = copied, "tree copied");
  Ok(copied)
}

/// Create `path` and any missing ancestors one level at a time, applying
/// `mode` and `owner` to each directory created here.
fn create_dirs(path: &Path, mode: Option<u32>, owner: Option<(u32, u32)>) -> Result<(), ActionError> {
  let missing: Vec<&Path> = path.ancestors().take_while(|dir| !dir.exists()).collect();

  for dir in missing.into_iter().rev() {
    match fs::create_dir(dir) {
      Ok(()) => {}
      Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => continue,
      Err(e) => return Err(ActionError::io(dir, e)),
    }
    if let Some(mode) = mode {
      set_mode(dir, mode)?;
    }
    if let Some(owner) = owner {
      chown(dir, owner)?;
    }
    debug!(path = %dir.display(), "directory created");
  }
  Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> Result<(), ActionError> {
  let dest = fs::read_link(link).map_err(|e| ActionError::io(link, e))?;
  match fs::symlink_metadata(target) {
    Ok(_) => fs::remove_file(target).map_err(|e| ActionError::io(target, e))?,
    Err(e) if e.kind() == ErrorKind::NotFound => {}
    Err(e) => return Err(ActionError::io(target, e)),
  }
  std::os::unix::fs::symlink(&dest, target).map_err(|e| ActionError::io(target, e))
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> Result<(), ActionError> {
  fs::copy(link, target).map(|_| ()).map_err(|e| ActionError::io(target, e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<(), ActionError> {
  use std::os::unix::fs::PermissionsExt;
  fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| ActionError::io(path, e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<(), ActionError> {
  Ok(())
}

#[cfg(unix)]
fn chown(path: &Path, (uid, gid): (u32, u32)) -> Result<(), ActionError> {
  use nix::unistd::{Gid, Uid};
  nix::unistd::chown(path, Some(Uid::from_raw(uid)), Some(Gid::from_raw(gid))).map_err(|e| ActionError::Chown {
    path: path.display().to_string(),
    message: e.to_string(),
  })
}

#[cfg(not(unix))]
fn chown(_path: &Path, _owner: (u32, u32)) -> Result<(), ActionError> {
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn append_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dnf.conf");
    fs::write(&path, "[main]\ngpgcheck=True").unwrap();

    assert!(append_line_if_absent(&path, "max_parallel_downloads=10").unwrap());
    let once = fs::read_to_string(&path).unwrap();
    assert!(!append_line_if_absent(&path, "max_parallel_downloads=10").unwrap());
    let twice = fs::read_to_string(&path).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once, "[main]\ngpgcheck=True\nmax_parallel_downloads=10\n");
  }

  #[test]
  fn append_creates_missing_file_and_parents() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("etc/profile.d/sysprov.sh");
    assert!(append_line_if_absent(&path, "export EDITOR=nvim").unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "export EDITOR=nvim\n");
  }

  #[test]
  fn backup_is_created_once_and_never_overwritten() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("dnf.conf");
    fs::write(&path, "original").unwrap();

    assert_eq!(backup_once(&path).unwrap(), BackupOutcome::Created);
    fs::write(&path, "modified").unwrap();
    assert_eq!(backup_once(&path).unwrap(), BackupOutcome::AlreadyPresent);

    let backups: Vec<_> = fs::read_dir(temp.path())
      .unwrap()
      .filter_map(|e| e.ok())
      .filter(|e| e.file_name().to_string_lossy().ends_with(".bak"))
      .collect();
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "original");
  }

  #[test]
  fn backup_of_missing_file_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.conf");
    assert_eq!(backup_once(&path).unwrap(), BackupOutcome::SourceMissing);
    assert!(!backup_path(&path).exists());
  }

  #[test]
  fn backup_path_keeps_extension() {
    assert_eq!(
      backup_path(Path::new("/etc/dnf/dnf.conf")),
      PathBuf::from("/etc/dnf/dnf.conf.bak")
    );
  }

  #[test]
  #[cfg(unix)]
  fn ensure_dir_applies_mode() {
    use std::os::unix::fs::PermissionsExt;
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("a/b/fonts");
    ensure_dir(&dir, 0o750, None).unwrap();
    ensure_dir(&dir, 0o750, None).unwrap();
    let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o750);
  }

  #[test]
  #[cfg(unix)]
  fn ensure_dir_owns_every_created_parent() {
    use std::os::unix::fs::{MetadataExt, PermissionsExt};
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home/alice");
    fs::create_dir_all(&home).unwrap();

    // Handing files to another uid needs root; otherwise use our own.
    let owner = if nix::unistd::geteuid().is_root() {
      (4242, 4242)
    } else {
      (nix::unistd::getuid().as_raw(), nix::unistd::getgid().as_raw())
    };
    let fonts = home.join(".local/share/fonts");
    ensure_dir(&fonts, 0o750, Some(owner)).unwrap();

    for dir in [home.join(".local"), home.join(".local/share"), fonts] {
      let meta = fs::metadata(&dir).unwrap();
      assert_eq!((meta.uid(), meta.gid()), owner, "{}", dir.display());
      assert_eq!(meta.permissions().mode() & 0o777, 0o750, "{}", dir.display());
    }
  }

  #[test]
  #[cfg(unix)]
  fn copy_tree_owns_created_destination_parents() {
    use std::os::unix::fs::MetadataExt;
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("themes/Nordic");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("index.theme"), "[Desktop Entry]").unwrap();

    let owner = if nix::unistd::geteuid().is_root() {
      (4242, 4242)
    } else {
      (nix::unistd::getuid().as_raw(), nix::unistd::getgid().as_raw())
    };
    let home = temp.path().join("home");
    fs::create_dir(&home).unwrap();
    copy_tree(&src, &home.join(".themes/Nordic"), Some(owner)).unwrap();

    assert_eq!(fs::metadata(home.join(".themes")).unwrap().uid(), owner.0);
    assert_eq!(fs::metadata(home.join(".themes/Nordic")).unwrap().uid(), owner.0);
  }

  #[test]
  fn write_file_respects_overwrite_flag() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("yum.repos.d/vscode.repo");
    assert!(write_file(&path, "[code]\n", 0o644, false).unwrap());
    assert!(!write_file(&path, "[other]\n", 0o644, false).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "[code]\n");
    assert!(write_file(&path, "[other]\n", 0o644, true).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "[other]\n");
  }

  #[test]
  fn copy_tree_copies_nested_files() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("themes/Nordic");
    fs::create_dir_all(src.join("gtk-3.0")).unwrap();
    fs::write(src.join("index.theme"), "[Desktop Entry]").unwrap();
    fs::write(src.join("gtk-3.0/gtk.css"), "* {}").unwrap();

    let dest = temp.path().join("home/.themes/Nordic");
    assert_eq!(copy_tree(&src, &dest, None).unwrap(), 2);
    assert_eq!(fs::read_to_string(dest.join("gtk-3.0/gtk.css")).unwrap(), "* {}");

    // Second copy overwrites in place.
    assert_eq!(copy_tree(&src, &dest, None).unwrap(), 2);
  }

  #[test]
  fn copy_tree_missing_source_fails() {
    let temp = TempDir::new().unwrap();
    let err = copy_tree(&temp.path().join("nope"), &temp.path().join("out"), None).unwrap_err();
    assert!(matches!(err, ActionError::SourceMissing(_)));
  }

  #[test]
  #[cfg(unix)]
  fn copy_tree_chowns_to_current_user() {
    use std::os::unix::fs::MetadataExt;
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("fonts");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("Inter.ttf"), "font").unwrap();

    let uid = nix::unistd::getuid().as_raw();
    let gid = nix::unistd::getgid().as_raw();
    let dest = temp.path().join("share/fonts");
    copy_tree(&src, &dest, Some((uid, gid))).unwrap();
    assert_eq!(fs::metadata(dest.join("Inter.ttf")).unwrap().uid(), uid);
  }
}
