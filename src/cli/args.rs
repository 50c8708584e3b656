//! Defines the command-line arguments and subcommands for the gloss CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "gloss",
    version,
    about = "Applies markup substitutions and resolves attributes in document trees."
)]
pub struct GlossArgs {
    /// Log every substitution step (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply all substitutions and print the draft document as JSON.
    Subs(DocumentArgs),
    /// Show every substitution step with diffs of the lines it changed.
    Trace(DocumentArgs),
    /// Parse a text fragment under one grammar entry rule and print the elements.
    Inline {
        /// The text to parse.
        text: String,
        /// The entry rule to start from.
        #[arg(short, long, default_value = "InlineMacroSubs")]
        rule: String,
    },
    /// Print the substitution steps selected for a block kind.
    Selector {
        /// `paragraph` or a delimited block kind (`listing`, `example`, `markdown_quote`...).
        kind: String,
        /// A `subs` directive, e.g. `+macros,-callouts`.
        #[arg(short, long, default_value = "")]
        subs: String,
    },
}

/// Input of the document-processing subcommands.
#[derive(Debug, Args)]
pub struct DocumentArgs {
    /// The raw document, as JSON.
    #[arg(required = true)]
    pub file: PathBuf,

    /// A YAML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Attribute override `name=value`; may be repeated.
    #[arg(short = 'a', long = "attribute", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,
}

/// Parses `name=value`; a bare `name` sets the attribute to an empty value.
pub fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw.split_once('=').unwrap_or((raw, ""));
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing attribute name in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}
