//! # snelex-cli — Freight Forms Command-Line Interface
//!
//! ## Subcommands
//!
//! - `rules check` — load and validate a YAML rule book
//! - `rules dump` — print a rule book (the built-in one by default) as YAML
//! - `replay` — run a scripted edit session against fixture data and print
//!   the resulting document and messages as JSON
//!
//! Argument parsing lives here and in `main.rs`; the work is done by the
//! domain crates.

pub mod replay;
pub mod rules;

use std::path::Path;

use anyhow::{Context, Result};
use snelex_rules::RuleBook;

/// Load the rule book at `path`, or the built-in freight book when no path
/// is given.
pub fn load_rules(path: Option<&Path>) -> Result<RuleBook> {
    match path {
        Some(path) => RuleBook::from_yaml_path(path)
            .with_context(|| format!("loading rule book: {}", path.display())),
        None => Ok(RuleBook::freight()),
    }
}
