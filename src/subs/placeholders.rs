//! Placeholder codec: sets non-text elements aside while a line is re-parsed as text.
//!
//! A line is serialized by writing its text as-is and replacing every other element with a token
//! (`U+FFFD`, sequence number, `U+FFFD`). The grammar hands tokens back as
//! [`Element::Placeholder`], and [`Placeholders::restore`] swaps the originals back in.

use std::collections::BTreeMap;

use crate::ast::{AttrValue, Element, Line, PlaceholderRef};
use crate::diagnostics::{to_error_source, RelatedLabel};
use crate::subs::merge::merge;
use crate::syntax::{EntryRule, Grammar, ParseOptions};
use crate::{err_ctx, err_msg, GlossError};

/// The reserved code point delimiting placeholder tokens.
pub const DELIMITER: char = '\u{FFFD}';

/// Elements set aside during one substitution step.
#[derive(Debug, Default)]
pub struct Placeholders {
    sequence: u32,
    pending: BTreeMap<PlaceholderRef, Element>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `lines` into a single text, lines joined with `\n`.
    pub fn serialize(&mut self, lines: Vec<Line>) -> String {
        let mut out = String::new();
        for (i, line) in lines.into_iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for element in line {
                match element {
                    Element::Text(s) => out.push_str(&s),
                    other => {
                        let reference = self.register(other);
                        out.push_str(&token(reference));
                    }
                }
            }
        }
        tracing::trace!(placeholders = self.pending.len(), "serialized lines");
        out
    }

    fn register(&mut self, element: Element) -> PlaceholderRef {
        self.sequence += 1;
        let reference = PlaceholderRef::new(self.sequence);
        self.pending.insert(reference, element);
        reference
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Re-parses the text inside set-aside quoted text and quoted strings under `rule`, so that a
    /// step also reaches content that an earlier step already structured.
    pub fn parse_payloads(
        &mut self,
        rule: EntryRule,
        grammar: &dyn Grammar,
        options: &ParseOptions,
    ) -> Result<(), GlossError> {
        for element in self.pending.values_mut() {
            let taken = std::mem::replace(element, Element::BlankLine);
            *element = parse_payload(taken, rule, grammar, options)?;
        }
        Ok(())
    }

    /// Puts the set-aside elements back wherever the grammar returned their tokens.
    pub fn restore(&mut self, elements: Vec<Element>) -> Result<Vec<Element>, GlossError> {
        let mut result = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Element::Placeholder(reference) => {
                    let original = self.pending.remove(&reference).ok_or_else(|| {
                        err_msg!(Placeholder, "unknown placeholder reference '{}'", reference)
                    })?;
                    result.push(original);
                }
                other => result.push(other.try_map_children(&mut |children| self.restore(children))?),
            }
        }
        Ok(result)
    }

    /// Fails when an element was set aside but never restored.
    pub fn finish(self) -> Result<(), GlossError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let refs: Vec<String> = self.pending.keys().map(|r| r.to_string()).collect();
        Err(err_msg!(
            Placeholder,
            "placeholders never restored: {}",
            refs.join(", ")
        ))
    }
}

/// The token standing for `reference` in serialized text.
pub fn token(reference: PlaceholderRef) -> String {
    format!("{DELIMITER}{reference}{DELIMITER}")
}

fn parse_payload(
    element: Element,
    rule: EntryRule,
    grammar: &dyn Grammar,
    options: &ParseOptions,
) -> Result<Element, GlossError> {
    match element {
        Element::QuotedText(mut quoted) => {
            quoted.elements = parse_fragments(quoted.elements, rule, grammar, options)?;
            Ok(Element::QuotedText(quoted))
        }
        Element::QuotedString(mut quoted) => {
            quoted.elements = parse_fragments(quoted.elements, rule, grammar, options)?;
            Ok(Element::QuotedString(quoted))
        }
        other => Ok(other),
    }
}

fn parse_fragments(
    elements: Vec<Element>,
    rule: EntryRule,
    grammar: &dyn Grammar,
    options: &ParseOptions,
) -> Result<Vec<Element>, GlossError> {
    let mut result = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Element::Text(s) => result.extend(grammar.parse(&s, rule, options)?),
            nested @ (Element::QuotedText(_) | Element::QuotedString(_)) => {
                result.push(parse_payload(nested, rule, grammar, options)?)
            }
            other => result.push(other),
        }
    }
    Ok(merge(result))
}

// ============================================================================
// RESERVED CODE POINT
// ============================================================================

/// Rejects text (and declared attribute values) containing the placeholder delimiter.
///
/// Consumes and returns the elements so the check can run as part of the pass.
pub fn check_reserved(elements: Vec<Element>) -> Result<Vec<Element>, GlossError> {
    elements
        .into_iter()
        .map(|element| match element {
            Element::Text(s) if s.contains(DELIMITER) => Err(reserved_error(&s)),
            Element::AttributeDeclaration {
                value: AttrValue::String(s),
                ..
            } if s.contains(DELIMITER) => Err(reserved_error(&s)),
            other => other.try_map_children(&mut check_reserved),
        })
        .collect()
}

/// Same check for a single attribute value coming from outside the tree.
pub fn check_reserved_value(name: &str, value: &AttrValue) -> Result<(), GlossError> {
    match value {
        AttrValue::String(s) if s.contains(DELIMITER) => {
            Err(reserved_error(s).with_help(format!("in the value of attribute '{name}'")))
        }
        _ => Ok(()),
    }
}

fn reserved_error(text: &str) -> GlossError {
    let src = to_error_source("input", text);
    let width = DELIMITER.len_utf8();
    let mut positions = text.match_indices(DELIMITER).map(|(start, _)| start);
    let start = positions.next().unwrap_or_default();
    let mut err = err_ctx!(
        Validation,
        "reserved character U+FFFD found in input",
        &src,
        crate::Span {
            start,
            end: start + width,
        },
        "U+FFFD delimits internal placeholders and cannot appear in documents"
    );
    if let GlossError::Validation { ctx, .. } = &mut err {
        ctx.related = positions
            .map(|start| RelatedLabel {
                source: src.clone(),
                span: crate::Span {
                    start,
                    end: start + width,
                },
                label: "also reserved".to_string(),
            })
            .collect();
    }
    err
}
