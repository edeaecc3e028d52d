mod cmd;
mod output;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tensorseal_lib::config::ConfigOverrides;
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// Build a user-specific TensorSeal library with an embedded key
#[derive(Parser)]
#[command(name = "tensorseal-factory")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  #[command(flatten)]
  factory: FactoryArgs,

  #[command(subcommand)]
  command: Commands,
}

/// Overrides for the `FACTORY_*` environment variables.
#[derive(Args)]
struct FactoryArgs {
  /// Project root (default: $FACTORY_ROOT or the current directory)
  #[arg(long, global = true)]
  root: Option<PathBuf>,

  /// Kill any toolchain command running longer than this, e.g. `20m`
  #[arg(long, global = true, value_parser = humantime::parse_duration)]
  timeout: Option<Duration>,

  /// Interpreter for the sealing tool (default: $FACTORY_PYTHON or python3)
  #[arg(long, global = true)]
  python: Option<String>,

  /// Fail instead of falling back to the default user when USER_ID is unset
  #[arg(long, global = true)]
  require_user_id: bool,
}

impl From<FactoryArgs> for ConfigOverrides {
  fn from(args: FactoryArgs) -> Self {
    ConfigOverrides {
      root: args.root,
      python: args.python,
      stage_timeout: args.timeout,
      require_user_id: args.require_user_id,
    }
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Inject the key, build, package and optionally upload
  Run,

  /// Show the resolved configuration with the key redacted
  Info,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .with_ansi(std::io::stderr().is_terminal())
    .without_time()
    .init();

  let overrides = ConfigOverrides::from(cli.factory);

  match cli.command {
    Commands::Run => cmd::cmd_run(&overrides, cli.output, cli.verbose),
    Commands::Info => cmd::cmd_info(&overrides, cli.output),
  }
}
