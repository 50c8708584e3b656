//! Mutable state of one substitution pass.

use serde::Serialize;

use crate::ast::attributes::ATTR_IMAGESDIR;
use crate::ast::Line;
use crate::diagnostics::Warnings;
use crate::store::AttributeStore;
use crate::subs::footnotes::Footnotes;
use crate::subs::selector::Substitution;
use crate::syntax::{Grammar, ParseOptions};

/// One executed step, as recorded when tracing is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubstitutionStep {
    /// Kind of the block the step ran on (`paragraph`, `listing`, `section title`...).
    pub block: String,
    /// Position of the step in the block's list; 0 starts a new block.
    pub index: usize,
    pub step: Substitution,
    /// The lines after the step.
    pub lines: Vec<Line>,
}

/// Everything a pass mutates, threaded through the walk by `&mut`.
pub struct SubstitutionContext<'g> {
    pub attributes: AttributeStore,
    pub footnotes: Footnotes,
    pub warnings: Warnings,
    grammar: &'g dyn Grammar,
    record_trace: bool,
    trace: Vec<SubstitutionStep>,
}

impl<'g> SubstitutionContext<'g> {
    pub fn new(grammar: &'g dyn Grammar, attributes: AttributeStore) -> Self {
        SubstitutionContext {
            attributes,
            footnotes: Footnotes::new(),
            warnings: Warnings::new(),
            grammar,
            record_trace: false,
            trace: Vec::new(),
        }
    }

    /// Enables or disables step recording.
    pub fn record_trace(mut self, enabled: bool) -> Self {
        self.record_trace = enabled;
        self
    }

    pub fn grammar(&self) -> &'g dyn Grammar {
        self.grammar
    }

    /// Grammar options derived from the current attributes.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            imagesdir: self
                .attributes
                .get_as_string(ATTR_IMAGESDIR)
                .filter(|dir| !dir.is_empty()),
        }
    }

    pub(crate) fn record(&mut self, block: &str, index: usize, step: Substitution, lines: &[Line]) {
        if self.record_trace {
            self.trace.push(SubstitutionStep {
                block: block.to_string(),
                index,
                step,
                lines: lines.to_vec(),
            });
        }
    }

    pub fn trace(&self) -> &[SubstitutionStep] {
        &self.trace
    }

    pub fn take_trace(&mut self) -> Vec<SubstitutionStep> {
        std::mem::take(&mut self.trace)
    }
}
