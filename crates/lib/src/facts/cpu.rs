//! x86-64 instruction-set baseline detection.
//!
//! glibc's dynamic linker reports which `glibc-hwcaps` subdirectories the
//! running CPU supports when invoked with `--help`:
//!
//! ```text
//! Subdirectories of glibc-hwcaps directories, in priority order:
//!   x86-64-v4
//!   x86-64-v3 (supported, searched)
//!   x86-64-v2 (supported, searched)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dynamic linker locations probed, in order.
pub const LINKER_PATHS: &[&str] = &["/lib64/ld-linux-x86-64.so.2", "/usr/lib64/ld-linux-x86-64.so.2"];

/// Highest x86-64 micro-architecture level the CPU supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsaBaseline {
  #[default]
  None,
  V2,
  V3,
}

impl IsaBaseline {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::None => "none",
      Self::V2 => "v2",
      Self::V3 => "v3",
    }
  }

  /// Parse a linker capability report. The highest supported level wins.
  pub fn from_linker_report(report: &str) -> Self {
    if level_supported(report, "x86-64-v3") {
      Self::V3
    } else if level_supported(report, "x86-64-v2") {
      Self::V2
    } else {
      Self::None
    }
  }
}

impl fmt::Display for IsaBaseline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

fn level_supported(report: &str, level: &str) -> bool {
  report.lines().map(str::trim).any(|line| {
    line
      .strip_prefix(level)
      .is_some_and(|rest| rest.trim_start().starts_with("(supported"))
  })
}
