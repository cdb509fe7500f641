//! # Rules Subcommand
//!
//! Rule-book inspection.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use snelex_rules::{RuleBook, RulesError};

use crate::load_rules;

/// Arguments for the `snelex rules` subcommand.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

/// Rules subcommands.
#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Validate a YAML rule book and report every problem found.
    Check {
        /// Rule book to check.
        #[arg(long, env = "SNELEX_RULES")]
        rules: PathBuf,
    },

    /// Print a rule book as YAML.
    Dump {
        /// Rule book to print; the built-in freight rules when omitted.
        #[arg(long, env = "SNELEX_RULES")]
        rules: Option<PathBuf>,
    },
}

/// Execute the rules subcommand.
pub fn run_rules(args: &RulesArgs) -> Result<u8> {
    match &args.command {
        RulesCommand::Check { rules } => match RuleBook::from_yaml_path(rules) {
            Ok(book) => {
                let count: usize = book.forms.iter().map(|f| f.fields.len()).sum();
                println!(
                    "{}: OK ({} forms, {} field rules)",
                    rules.display(),
                    book.forms.len(),
                    count
                );
                Ok(0)
            }
            Err(RulesError::Invalid { problems }) => {
                println!("{}: {} problem(s)", rules.display(), problems.len());
                for problem in &problems {
                    println!("  - {problem}");
                }
                Ok(1)
            }
            Err(err) => {
                Err(err).with_context(|| format!("loading rule book: {}", rules.display()))
            }
        },
        RulesCommand::Dump { rules } => {
            let book = load_rules(rules.as_deref())?;
            let yaml = book.to_yaml().context("serializing rule book")?;
            print!("{yaml}");
            Ok(0)
        }
    }
}
