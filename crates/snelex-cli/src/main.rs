//! # snelex CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snelex_cli::replay::{run_replay, ReplayArgs};
use snelex_cli::rules::{run_rules, RulesArgs};

/// Freight forms toolchain.
///
/// Checks and prints rule books, and replays scripted form sessions
/// against fixture data.
#[derive(Parser, Debug)]
#[command(name = "snelex", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate or print rule books.
    Rules(RulesArgs),

    /// Replay a scripted form session and print the result as JSON.
    Replay(ReplayArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let result = match cli.command {
        Commands::Rules(args) => run_rules(&args),
        Commands::Replay(args) => run_replay(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snelex_cli::rules::RulesCommand;
    use std::path::PathBuf;

    #[test]
    fn cli_parse_rules_check() {
        let cli = Cli::try_parse_from(["snelex", "rules", "check", "--rules", "book.yaml"]).unwrap();
        match cli.command {
            Commands::Rules(args) => match args.command {
                RulesCommand::Check { rules } => assert_eq!(rules, PathBuf::from("book.yaml")),
                other => panic!("unexpected command: {other:?}"),
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parse_rules_dump_defaults_to_builtin() {
        let cli = Cli::try_parse_from(["snelex", "rules", "dump"]).unwrap();
        if let Commands::Rules(args) = cli.command {
            if let RulesCommand::Dump { rules } = args.command {
                // SNELEX_RULES may be set in the environment running the tests.
                if std::env::var_os("SNELEX_RULES").is_none() {
                    assert!(rules.is_none());
                }
            }
        }
    }

    #[test]
    fn cli_parse_replay_with_flags() {
        let cli = Cli::try_parse_from([
            "snelex",
            "-vv",
            "--log-json",
            "replay",
            "session.yaml",
            "--compact",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.log_json);
        if let Commands::Replay(args) = cli.command {
            assert_eq!(args.fixture, PathBuf::from("session.yaml"));
            assert!(args.compact);
        } else {
            panic!("expected replay");
        }
    }

    #[test]
    fn cli_parse_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["snelex", "lock"]).is_err());
    }
}
