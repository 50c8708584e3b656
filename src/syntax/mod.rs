//! The grammar gateway: parse a fragment of text under a named entry rule.
//!
//! The substitution engine only ever talks to a [`Grammar`]. [`InlineGrammar`] is the pest-backed
//! implementation shipped with the crate.

use std::fmt;
use std::str::FromStr;

use crate::ast::Element;
use crate::{err_msg, GlossError};

pub mod parser;

pub use parser::InlineGrammar;

/// Named starting points of the inline grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryRule {
    InlinePassthroughSubs,
    CalloutSubs,
    SpecialCharacterSubs,
    QuotedTextSubs,
    AttributeSubs,
    ReplacementSubs,
    InlineMacroSubs,
    PostReplacementSubs,
    NoneSubs,
    MarkdownQuoteAttribution,
}

impl EntryRule {
    pub const ALL: [EntryRule; 10] = [
        EntryRule::InlinePassthroughSubs,
        EntryRule::CalloutSubs,
        EntryRule::SpecialCharacterSubs,
        EntryRule::QuotedTextSubs,
        EntryRule::AttributeSubs,
        EntryRule::ReplacementSubs,
        EntryRule::InlineMacroSubs,
        EntryRule::PostReplacementSubs,
        EntryRule::NoneSubs,
        EntryRule::MarkdownQuoteAttribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryRule::InlinePassthroughSubs => "InlinePassthroughSubs",
            EntryRule::CalloutSubs => "CalloutSubs",
            EntryRule::SpecialCharacterSubs => "SpecialCharacterSubs",
            EntryRule::QuotedTextSubs => "QuotedTextSubs",
            EntryRule::AttributeSubs => "AttributeSubs",
            EntryRule::ReplacementSubs => "ReplacementSubs",
            EntryRule::InlineMacroSubs => "InlineMacroSubs",
            EntryRule::PostReplacementSubs => "PostReplacementSubs",
            EntryRule::NoneSubs => "NoneSubs",
            EntryRule::MarkdownQuoteAttribution => "MarkdownQuoteAttribution",
        }
    }
}

impl fmt::Display for EntryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryRule {
    type Err = GlossError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryRule::ALL
            .into_iter()
            .find(|rule| rule.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| err_msg!(Validation, "unknown entry rule '{}'", s))
    }
}

/// Document settings the grammar needs while building elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Prefix for relative inline image paths.
    pub imagesdir: Option<String>,
}

/// Parses `text` starting at `rule`.
pub trait Grammar {
    fn parse(
        &self,
        text: &str,
        rule: EntryRule,
        options: &ParseOptions,
    ) -> Result<Vec<Element>, GlossError>;
}
