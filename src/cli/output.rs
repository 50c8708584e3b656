//! Handles all user-facing output for the CLI.
//!
//! Documents and elements are printed as JSON on stdout. Traces and warnings are colorized with
//! `termcolor`; traces show line diffs between consecutive steps.

use difference::{Changeset, Difference};
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::ast::{Element, Line};
use crate::subs::{Substitution, SubstitutionStep};
use crate::{GlossError, Warning};

// ============================================================================
// CORE OUTPUT FUNCTIONS: User-facing CLI output utilities
// ============================================================================

/// Pretty-prints any serializable value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), GlossError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GlossError::config("cannot serialize output", e))?;
    println!("{json}");
    Ok(())
}

/// Prints a substitution trace with colored diffs between consecutive steps of a block.
pub fn print_trace(trace: &[SubstitutionStep]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let mut last_lines = String::new();

    for (i, step) in trace.iter().enumerate() {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
        println!("--- Step {}: {} ({}) ---", i, step.step, step.block);
        let _ = stdout.reset();

        let current_lines = render_lines(&step.lines);
        if step.index == 0 {
            println!("{}", current_lines);
        } else {
            let changeset = Changeset::new(&last_lines, &current_lines, "\n");
            print_diff(&mut stdout, &changeset.diffs);
        }
        last_lines = current_lines;
        println!();
    }
}

/// Prints the selected steps, one per line.
pub fn print_substitutions(subs: &[Substitution]) {
    for sub in subs {
        println!("{sub}");
    }
}

/// Prints warnings on stderr.
pub fn print_warnings(warnings: &[Warning]) {
    let mut stderr = StandardStream::stderr(ColorChoice::Auto);
    for warning in warnings {
        let _ = stderr.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)));
        eprint!("warning");
        let _ = stderr.reset();
        eprintln!(": {warning}");
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn render_lines(lines: &[Line]) -> String {
    lines
        .iter()
        .map(|line| line.iter().map(render_element).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_element(element: &Element) -> String {
    match element {
        Element::Text(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{other:?}")),
    }
}

fn print_diff(stdout: &mut StandardStream, diffs: &[Difference]) {
    for diff in diffs {
        match diff {
            Difference::Same(ref x) => {
                let _ = stdout.reset();
                println!(" {}", x);
            }
            Difference::Add(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                println!("+{}", x);
            }
            Difference::Rem(ref x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                println!("-{}", x);
            }
        }
    }
    let _ = stdout.reset();
}
