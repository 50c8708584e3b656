//! The gloss Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands and orchestrates
//! the core library functions.

use std::path::Path;
use std::{fs, process};

use clap::Parser;
use miette::Report;
use tracing_subscriber::EnvFilter;

use crate::ast::{BlockKind, RawDocument};
use crate::cli::args::{Command, DocumentArgs, GlossArgs};
use crate::config::Configuration;
use crate::subs::selector::{paragraph_defaults, substitutions_for, substitutions_for_block};
use crate::syntax::{EntryRule, Grammar, InlineGrammar, ParseOptions};
use crate::{apply_substitutions, err_msg, trace_substitutions, GlossError};

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = GlossArgs::parse();
    init_tracing(args.verbose);

    // Dispatch to the appropriate subcommand handler.
    let result = match args.command {
        Command::Subs(doc) => handle_subs(&doc),
        Command::Trace(doc) => handle_trace(&doc),
        Command::Inline { text, rule } => handle_inline(&text, &rule),
        Command::Selector { kind, subs } => handle_selector(&kind, &subs),
    };

    if let Err(e) = result {
        eprintln!("{:?}", Report::new(e));
        process::exit(1);
    }
}

/// Logs go to stderr so that stdout only carries command output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

/// Handles the `subs` subcommand.
fn handle_subs(doc: &DocumentArgs) -> Result<(), GlossError> {
    let (raw, config) = load(doc)?;
    let draft = apply_substitutions(raw, &config, &InlineGrammar)?;
    output::print_warnings(&draft.warnings);
    output::print_json(&draft)
}

/// Handles the `trace` subcommand.
fn handle_trace(doc: &DocumentArgs) -> Result<(), GlossError> {
    let (raw, config) = load(doc)?;
    let (draft, trace) = trace_substitutions(raw, &config, &InlineGrammar)?;
    output::print_trace(&trace);
    output::print_warnings(&draft.warnings);
    Ok(())
}

/// Handles the `inline` subcommand.
fn handle_inline(text: &str, rule: &str) -> Result<(), GlossError> {
    let rule: EntryRule = rule.parse()?;
    let elements = InlineGrammar.parse(text, rule, &ParseOptions::default())?;
    output::print_json(&elements)
}

/// Handles the `selector` subcommand.
fn handle_selector(kind: &str, directive: &str) -> Result<(), GlossError> {
    let subs = if kind == "paragraph" {
        substitutions_for(paragraph_defaults(&Default::default()), directive)?
    } else {
        let kind = BlockKind::from_name(kind).ok_or_else(|| {
            err_msg!(Validation, "unknown block kind '{}'", kind).with_help(format!(
                "expected paragraph or one of: {}",
                BlockKind::ALL.map(|k| k.as_str()).join(", ")
            ))
        })?;
        let attributes = crate::ast::Attributes::new()
            .with(crate::ast::attributes::ATTR_SUBSTITUTIONS, directive);
        substitutions_for_block(kind, &attributes)?
    };
    output::print_substitutions(&subs);
    Ok(())
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

/// Reads the raw document and builds the configuration from the file and the `-a` overrides.
fn load(doc: &DocumentArgs) -> Result<(RawDocument, Configuration), GlossError> {
    let mut config = match &doc.config {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::new(),
    };
    for (name, value) in &doc.attributes {
        config = config.with_attribute_override(name.as_str(), value.as_str());
    }
    if config.filename.is_none() {
        config = config.with_filename(&doc.file);
    }
    let raw = read_document(&doc.file)?;
    Ok((raw, config))
}

fn read_document(path: &Path) -> Result<RawDocument, GlossError> {
    let content = fs::read_to_string(path).map_err(|e| {
        GlossError::config(format!("cannot read document '{}'", path.display()), e)
    })?;
    serde_json::from_str(&content).map_err(|e| {
        GlossError::config(format!("invalid document '{}'", path.display()), e)
    })
}
