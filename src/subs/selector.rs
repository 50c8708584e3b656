//! Chooses the ordered substitution steps of a block.

use std::fmt;

use serde::Serialize;

use crate::ast::attributes::{ATTR_BLOCK_KIND, ATTR_SUBSTITUTIONS};
use crate::ast::{Attributes, BlockKind};
use crate::syntax::EntryRule;
use crate::{ErrorContext, GlossError};

/// One substitution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Substitution {
    InlinePassthrough,
    Callouts,
    SpecialCharacters,
    Quotes,
    Attributes,
    Replacements,
    Macros,
    PostReplacements,
    None,
    /// Implicit last step of every list; cannot be requested by name.
    SplitLines,
}

pub const NORMAL_SUBSTITUTIONS: [Substitution; 7] = [
    Substitution::InlinePassthrough,
    Substitution::SpecialCharacters,
    Substitution::Quotes,
    Substitution::Attributes,
    Substitution::Replacements,
    Substitution::Macros,
    Substitution::PostReplacements,
];

pub const VERBATIM_SUBSTITUTIONS: [Substitution; 2] =
    [Substitution::Callouts, Substitution::SpecialCharacters];

pub const NONE_SUBSTITUTIONS: [Substitution; 1] = [Substitution::None];

const SUPPORTED_NAMES: &str = "inline_passthrough, callouts, specialcharacters, specialchars, \
                               quotes, attributes, replacements, macros, post_replacements, none, normal";

impl Substitution {
    pub fn name(&self) -> &'static str {
        match self {
            Substitution::InlinePassthrough => "inline_passthrough",
            Substitution::Callouts => "callouts",
            Substitution::SpecialCharacters => "specialcharacters",
            Substitution::Quotes => "quotes",
            Substitution::Attributes => "attributes",
            Substitution::Replacements => "replacements",
            Substitution::Macros => "macros",
            Substitution::PostReplacements => "post_replacements",
            Substitution::None => "none",
            Substitution::SplitLines => "split_lines",
        }
    }

    /// Resolves a step name as written in a `subs` directive.
    pub fn from_name(name: &str) -> Option<Substitution> {
        let sub = match name {
            "inline_passthrough" => Substitution::InlinePassthrough,
            "callouts" => Substitution::Callouts,
            "specialcharacters" | "specialchars" => Substitution::SpecialCharacters,
            "quotes" => Substitution::Quotes,
            "attributes" => Substitution::Attributes,
            "replacements" => Substitution::Replacements,
            "macros" => Substitution::Macros,
            "post_replacements" => Substitution::PostReplacements,
            "none" => Substitution::None,
            _ => return None,
        };
        Some(sub)
    }

    /// The grammar rule a step re-parses its lines with, if it re-parses at all.
    pub fn entry_rule(&self) -> Option<EntryRule> {
        match self {
            Substitution::InlinePassthrough => Some(EntryRule::InlinePassthroughSubs),
            Substitution::Callouts => Some(EntryRule::CalloutSubs),
            Substitution::SpecialCharacters => Some(EntryRule::SpecialCharacterSubs),
            Substitution::Quotes => Some(EntryRule::QuotedTextSubs),
            Substitution::Attributes => Some(EntryRule::AttributeSubs),
            Substitution::Replacements => Some(EntryRule::ReplacementSubs),
            Substitution::Macros => Some(EntryRule::InlineMacroSubs),
            Substitution::PostReplacements => Some(EntryRule::PostReplacementSubs),
            Substitution::None => Some(EntryRule::NoneSubs),
            Substitution::SplitLines => None,
        }
    }
}

impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// DEFAULTS
// ============================================================================

/// Default steps of a delimited block kind.
pub fn default_substitutions(kind: BlockKind) -> &'static [Substitution] {
    match kind {
        BlockKind::Example
        | BlockKind::Quote
        | BlockKind::Sidebar
        | BlockKind::Verse
        | BlockKind::MarkdownQuote => &NORMAL_SUBSTITUTIONS,
        BlockKind::Fenced | BlockKind::Listing | BlockKind::Literal => &VERBATIM_SUBSTITUTIONS,
        BlockKind::Comment => &NONE_SUBSTITUTIONS,
        BlockKind::Passthrough => &[],
    }
}

/// Default steps of a paragraph. A paragraph styled as a listing behaves like one.
pub fn paragraph_defaults(attributes: &Attributes) -> &'static [Substitution] {
    match attributes.get_as_string(ATTR_BLOCK_KIND).as_deref() {
        Some("listing") => default_substitutions(BlockKind::Listing),
        _ => &NORMAL_SUBSTITUTIONS,
    }
}

pub fn substitutions_for_paragraph(attributes: &Attributes) -> Result<Vec<Substitution>, GlossError> {
    let directive = attributes.get_as_string(ATTR_SUBSTITUTIONS).unwrap_or_default();
    substitutions_for(paragraph_defaults(attributes), &directive)
}

pub fn substitutions_for_block(
    kind: BlockKind,
    attributes: &Attributes,
) -> Result<Vec<Substitution>, GlossError> {
    let directive = attributes.get_as_string(ATTR_SUBSTITUTIONS).unwrap_or_default();
    substitutions_for(default_substitutions(kind), &directive).map_err(|e| {
        e.with_help(format!("in a {kind} block"))
    })
}

// ============================================================================
// DIRECTIVE PARSING
// ============================================================================

/// Computes the steps for `defaults` and a raw `subs` directive.
///
/// An empty directive keeps the defaults. The first bare name (or `normal`) replaces the
/// accumulated steps, later bare names append. `+name` appends, `name+` prepends and `-name`
/// removes; each of them starts from the defaults while nothing has been accumulated. The result
/// always ends with [`Substitution::SplitLines`].
pub fn substitutions_for(
    defaults: &[Substitution],
    directive: &str,
) -> Result<Vec<Substitution>, GlossError> {
    let mut subs: Vec<Substitution> = Vec::new();
    if directive.trim().is_empty() {
        subs.extend_from_slice(defaults);
    } else {
        let mut replaced = false;
        for token in directive.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if token == "normal" {
                if !replaced {
                    subs.clear();
                    replaced = true;
                }
                subs.extend_from_slice(&NORMAL_SUBSTITUTIONS);
            } else if let Some(name) = token.strip_prefix('+') {
                let sub = lookup(name, token)?;
                seed(&mut subs, defaults);
                subs.push(sub);
            } else if let Some(name) = token.strip_suffix('+') {
                let sub = lookup(name, token)?;
                seed(&mut subs, defaults);
                subs.insert(0, sub);
            } else if let Some(name) = token.strip_prefix('-') {
                let sub = lookup(name, token)?;
                seed(&mut subs, defaults);
                subs.retain(|s| *s != sub);
            } else {
                let sub = lookup(token, token)?;
                if !replaced {
                    subs.clear();
                    replaced = true;
                }
                subs.push(sub);
            }
        }
    }
    subs.push(Substitution::SplitLines);
    tracing::trace!(directive, ?subs, "selected substitutions");
    Ok(subs)
}

fn seed(subs: &mut Vec<Substitution>, defaults: &[Substitution]) {
    if subs.is_empty() {
        subs.extend_from_slice(defaults);
    }
}

fn lookup(name: &str, token: &str) -> Result<Substitution, GlossError> {
    Substitution::from_name(name).ok_or_else(|| GlossError::UnsupportedSubstitution {
        message: format!("unsupported substitution: '{token}'"),
        ctx: ErrorContext::none().help(format!("supported substitutions are: {SUPPORTED_NAMES}")),
        source: None,
    })
}
