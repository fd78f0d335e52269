/// Application name, used for config directories and log targets.
pub const APP_NAME: &str = "sysprov";

/// Overrides the default profile location.
pub const PROFILE_ENV: &str = "SYSPROV_PROFILE";

/// Log filter directive, read in preference to `RUST_LOG`.
pub const LOG_ENV: &str = "SYSPROV_LOG";

/// Skips the root privilege check. Intended for tests and dry runs.
pub const SKIP_ROOT_CHECK_ENV: &str = "SYSPROV_SKIP_ROOT_CHECK";

/// Name of the superuser account.
pub const ROOT_USER: &str = "root";

/// Suffix appended to a path when backing it up.
pub const BACKUP_SUFFIX: &str = ".bak";
