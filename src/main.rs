mod logging;
mod repl;
mod shell;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};

use repl::{ReplConfig, print_outcome};
use shell::{Dispatch, Registry, default_registry};

#[derive(Parser)]
#[command(name = "privacy-scrub")]
#[command(about = "Greet people and validate image files, one-shot or interactively")]
#[command(version, arg_required_else_help = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a greeting
    Greet {
        /// Who to greet
        name: String,
    },
    /// Validate an image file and print its SHA-256 digest
    Load {
        /// Image file to read
        path: String,
    },
    /// Start the interactive shell
    Repl,
}

/// Run a single builtin and print its outcome.
///
/// Handled failures are printed but still exit 0.
fn run_once(registry: &Registry, name: &str, args: &str) -> Result<()> {
    let mut stdout = io::stdout();
    match registry.dispatch(name, args) {
        Dispatch::Completed(outcome) => print_outcome(&mut stdout, &outcome)?,
        Dispatch::Terminate => {}
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose)?;

    let registry = default_registry()?;

    match cli.command {
        Commands::Greet { name } => run_once(&registry, "greet", &name),
        Commands::Load { path } => run_once(&registry, "load", &path),
        Commands::Repl => repl::run(&registry, ReplConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_greet_with_spaces() {
        let cli = Cli::try_parse_from(["privacy-scrub", "greet", "Ada Lovelace"]).unwrap();
        assert!(matches!(cli.command, Commands::Greet { ref name } if name == "Ada Lovelace"));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_load_verbose() {
        let cli = Cli::try_parse_from(["privacy-scrub", "-vv", "load", "/tmp/a b.png"]).unwrap();
        assert!(matches!(cli.command, Commands::Load { ref path } if path == "/tmp/a b.png"));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["privacy-scrub"]).is_err());
    }

    #[test]
    fn test_one_shot_failure_is_not_an_error() {
        let registry = default_registry().unwrap();
        assert!(run_once(&registry, "load", "/no/such/image.png").is_ok());
        assert!(run_once(&registry, "greet", "").is_ok());
    }

    #[test]
    fn test_registry_commands_match_cli() {
        let registry = default_registry().unwrap();
        for name in ["greet", "load"] {
            assert!(registry.get_builtin(name).is_some());
            assert!(Cli::command().find_subcommand(name).is_some());
        }
    }
}
