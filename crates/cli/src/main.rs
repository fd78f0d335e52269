mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sysprov_lib::ProvisionError;
use sysprov_lib::consts::LOG_ENV;
use sysprov_lib::retry::FailurePolicy;

use crate::output::print_error;

/// sysprov - declarative provisioning for freshly installed systems
#[derive(Parser)]
#[command(name = "sysprov")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Provision this host from a profile (requires root)
  Apply {
    /// Profile to apply (default: $SYSPROV_PROFILE, then the config directory, then the built-in profile)
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Log what would be done without changing the host
    #[arg(long)]
    dry_run: bool,

    /// Never prompt; interactive failures abort with a configuration error
    #[arg(long)]
    non_interactive: bool,

    /// Override the profile's default failure policy
    #[arg(long, value_parser = parse_policy)]
    policy: Option<FailurePolicy>,

    /// Print the outcome log as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the operations a profile would run on this host
  Plan {
    /// Profile to plan
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Print the plan as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show the facts probed from this host
  Facts {
    /// Profile whose watched binaries are probed
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Print the facts as JSON
    #[arg(long)]
    json: bool,
  },

  /// Write the built-in profile to disk for editing
  Init {
    /// Destination (default: $XDG_CONFIG_HOME/sysprov/profile.toml)
    path: Option<PathBuf>,

    /// Overwrite an existing profile without asking
    #[arg(short, long)]
    force: bool,
  },
}

fn parse_policy(s: &str) -> Result<FailurePolicy, String> {
  s.parse()
}

fn init_tracing(verbose: bool) {
  let filter = std::env::var(LOG_ENV)
    .ok()
    .and_then(|directives| EnvFilter::try_new(directives).ok())
    .or_else(|| EnvFilter::try_from_default_env().ok())
    .unwrap_or_else(|| EnvFilter::new(if verbose { "debug" } else { "warn" }));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let result = match cli.command {
    Commands::Apply {
      profile,
      dry_run,
      non_interactive,
      policy,
      json,
    } => cmd::cmd_apply(cmd::ApplyArgs {
      profile,
      dry_run,
      non_interactive,
      policy,
      json,
    }),
    Commands::Plan { profile, json } => cmd::cmd_plan(profile.as_deref(), json).map(|_| 0),
    Commands::Facts { profile, json } => cmd::cmd_facts(profile.as_deref(), json).map(|_| 0),
    Commands::Init { path, force } => cmd::cmd_init(path, force).map(|_| 0),
  };

  match result {
    Ok(code) => ExitCode::from(code),
    Err(err) => {
      print_error(&format!("{:#}", err));
      match err.downcast_ref::<ProvisionError>() {
        Some(provision) => ExitCode::from(exit_byte(provision.exit_code())),
        None => ExitCode::FAILURE,
      }
    }
  }
}

/// Clamp a library exit code into the range a process can return.
pub(crate) fn exit_byte(code: i32) -> u8 {
  u8::try_from(code).unwrap_or(1)
}
