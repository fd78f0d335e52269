use std::io::{self, IsTerminal, Write};
use std::path::Path;

use anyhow::{Result, bail};

/// Ask before replacing an existing file. `force` answers yes.
pub fn confirm_overwrite(path: &Path, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!(
      "{} already exists and no terminal is available to confirm. Use --force to overwrite.",
      path.display()
    );
  }

  write!(io::stderr(), "{} already exists. Overwrite? [y/N] ", path.display())?;
  io::stderr().flush()?;

  let mut input = String::new();
  io::stdin().read_line(&mut input)?;

  Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
