pub mod paths;

/// Returns true if the process runs with an effective uid of 0.
#[cfg(unix)]
pub fn is_elevated() -> bool {
  nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_elevated() -> bool {
  false
}

/// Returns true if `SYSPROV_SKIP_ROOT_CHECK` is set to `1` or `true`.
pub fn skip_root_check() -> bool {
  std::env::var(crate::consts::SKIP_ROOT_CHECK_ENV)
    .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
    .unwrap_or(false)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn skip_root_check_reads_env() {
    temp_env::with_var(crate::consts::SKIP_ROOT_CHECK_ENV, Some("TRUE"), || {
      assert!(skip_root_check());
    });
    temp_env::with_var(crate::consts::SKIP_ROOT_CHECK_ENV, Some("0"), || {
      assert!(!skip_root_check());
    });
    temp_env::with_var(crate::consts::SKIP_ROOT_CHECK_ENV, None::<&str>, || {
      assert!(!skip_root_check());
    });
  }
}
