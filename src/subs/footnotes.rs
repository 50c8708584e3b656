//! Footnote collection.
//!
//! Footnotes with content are numbered in document order starting at 1 and moved out of the
//! tree; every occurrence is replaced by a [`FootnoteReference`].

use std::convert::Infallible;

use crate::ast::{Element, Footnote, FootnoteReference, INVALID_FOOTNOTE_REFERENCE};
use crate::diagnostics::{Warning, Warnings};

/// Footnotes collected during one pass. The ID of a note is its position plus one.
#[derive(Debug, Default, Clone)]
pub struct Footnotes {
    notes: Vec<Footnote>,
}

impl Footnotes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `note` if it has content, or resolves it as a reference to an earlier note.
    pub fn reference(&mut self, note: Footnote, warnings: &mut Warnings) -> FootnoteReference {
        if !note.elements.is_empty() {
            let reference = note.reference.clone();
            self.notes.push(note);
            let id = self.notes.len() as i32;
            tracing::debug!(id, "collected footnote");
            return FootnoteReference {
                id,
                reference,
                duplicate: false,
            };
        }
        if let Some(name) = note.reference.as_deref() {
            let known = self
                .notes
                .iter()
                .position(|n| n.reference.as_deref() == Some(name));
            if let Some(index) = known {
                return FootnoteReference {
                    id: index as i32 + 1,
                    reference: note.reference,
                    duplicate: true,
                };
            }
        }
        warnings.push(Warning::MissingFootnote {
            reference: note.reference.clone().unwrap_or_default(),
        });
        FootnoteReference {
            id: INVALID_FOOTNOTE_REFERENCE,
            reference: note.reference,
            duplicate: false,
        }
    }

    pub fn notes(&self) -> &[Footnote] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn into_notes(self) -> Vec<Footnote> {
        self.notes
    }
}

/// Replaces every footnote in `elements` (at any depth) with its reference.
pub fn replace_footnotes(
    elements: Vec<Element>,
    notes: &mut Footnotes,
    warnings: &mut Warnings,
) -> Vec<Element> {
    elements
        .into_iter()
        .map(|element| match element {
            Element::Footnote(note) => Element::FootnoteReference(notes.reference(note, warnings)),
            other => other
                .try_map_children(&mut |children| -> Result<_, Infallible> {
                    Ok(replace_footnotes(children, notes, warnings))
                })
                .unwrap_or_else(|never| match never {}),
        })
        .collect()
}
