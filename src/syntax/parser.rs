//! Pest-backed inline grammar.
//!
//! Parses a fragment under one of the entry rules of `grammar.pest` and turns the resulting
//! pairs into [`Element`]s. The grammar never fails on the `*_subs` entry rules (unrecognised
//! input comes back as text); only the markdown attribution rule is selective.

use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::ast::attributes::{ATTR_IMAGE_ALT, ATTR_INLINE_LINK_TEXT, ATTR_ROLE};
use crate::ast::{
    AttrValue, Attributes, CounterSubstitution, CounterValue, Element, ExternalCrossReference,
    Footnote, Icon, InlineImage, InlineLink, InlinePassthrough, InternalCrossReference, Location,
    PassthroughKind, PlaceholderRef, QuotedString, QuotedStringKind, QuotedText, QuotedTextKind,
    Span,
};
use crate::diagnostics::{to_error_source, ErrorContext};
use crate::subs::merge::merge;
use crate::syntax::{EntryRule, Grammar, ParseOptions};
use crate::GlossError;

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct InlineParser;

/// The inline grammar shipped with gloss.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineGrammar;

// ============================================================================
// PUBLIC API
// ============================================================================

impl Grammar for InlineGrammar {
    fn parse(
        &self,
        text: &str,
        rule: EntryRule,
        options: &ParseOptions,
    ) -> Result<Vec<Element>, GlossError> {
        let mut pairs = InlineParser::parse(pest_rule(rule), text)
            .map_err(|e| convert_parse_error(e, text, rule))?;
        let root = pairs.next().ok_or_else(|| {
            GlossError::Grammar {
                message: format!("no match for {rule}"),
                ctx: ErrorContext::with_source(to_error_source(rule.as_str(), text)),
                source: None,
            }
        })?;
        let builder = ElementBuilder { options };
        let mut elements = Vec::new();
        for pair in root.into_inner() {
            builder.build(pair, &mut elements)?;
        }
        let elements = merge(elements);
        tracing::trace!(rule = %rule, count = elements.len(), "parsed fragment");
        Ok(elements)
    }
}

fn pest_rule(rule: EntryRule) -> Rule {
    match rule {
        EntryRule::InlinePassthroughSubs => Rule::inline_passthrough_subs,
        EntryRule::CalloutSubs => Rule::callout_subs,
        EntryRule::SpecialCharacterSubs => Rule::special_character_subs,
        EntryRule::QuotedTextSubs => Rule::quoted_text_subs,
        EntryRule::AttributeSubs => Rule::attribute_subs,
        EntryRule::ReplacementSubs => Rule::replacement_subs,
        EntryRule::InlineMacroSubs => Rule::inline_macro_subs,
        EntryRule::PostReplacementSubs => Rule::post_replacement_subs,
        EntryRule::NoneSubs => Rule::none_subs,
        EntryRule::MarkdownQuoteAttribution => Rule::markdown_quote_attribution,
    }
}

// ============================================================================
// ELEMENT BUILDERS
// ============================================================================

struct ElementBuilder<'o> {
    options: &'o ParseOptions,
}

impl ElementBuilder<'_> {
    fn build(&self, pair: Pair<Rule>, out: &mut Vec<Element>) -> Result<(), GlossError> {
        match pair.as_rule() {
            Rule::EOI => {}
            Rule::placeholder => out.push(Element::Placeholder(placeholder_ref(pair)?)),
            Rule::word
            | Rule::plain_word
            | Rule::any_char
            | Rule::hyphen_run
            | Rule::link_path_text
            | Rule::macro_path_text
            | Rule::link_text_chars
            | Rule::link_text_all_chars
            | Rule::footnote_text
            | Rule::index_term_text
            | Rule::attribution_text => out.push(Element::text(pair.as_str())),
            Rule::escaped_quote | Rule::escaped_attribute_substitution => {
                // drop the leading backslash
                out.push(Element::text(&pair.as_str()[1..]))
            }

            Rule::triple_plus_passthrough => {
                out.push(passthrough(PassthroughKind::TriplePlus, pair))
            }
            Rule::single_plus_passthrough => {
                out.push(passthrough(PassthroughKind::SinglePlus, pair))
            }
            Rule::passthrough_macro => out.push(passthrough(PassthroughKind::Macro, pair)),

            Rule::callout => {
                let reference = first_inner(&pair)?.as_str();
                let reference = reference.parse::<u32>().map_err(|e| {
                    grammar_error(&pair, format!("invalid callout reference '{reference}'"), e)
                })?;
                out.push(Element::Callout { reference });
            }

            Rule::special_character => out.push(Element::SpecialCharacter {
                name: pair.as_str().to_string(),
            }),
            Rule::cross_reference => out.push(cross_reference(pair)),

            Rule::quoted_text => out.push(self.quoted_text(pair)?),
            Rule::double_quoted_string => out.push(Element::QuotedString(QuotedString {
                kind: QuotedStringKind::Double,
                elements: self.children(pair)?,
            })),
            Rule::single_quoted_string => out.push(Element::QuotedString(QuotedString {
                kind: QuotedStringKind::Single,
                elements: self.children(pair)?,
            })),

            Rule::attribute_substitution => {
                out.push(Element::attribute_substitution(first_inner(&pair)?.as_str()))
            }
            Rule::counter_substitution => out.push(counter_substitution(pair)),

            Rule::copyright
            | Rule::trademark
            | Rule::registered
            | Rule::ellipsis
            | Rule::em_dash
            | Rule::typographic_apostrophe => out.push(Element::Symbol {
                name: pair.as_str().to_string(),
            }),
            Rule::replacement_word => {
                for inner in pair.into_inner() {
                    self.build(inner, out)?;
                }
            }

            Rule::external_link | Rule::link_macro => out.push(self.inline_link(pair)?),
            Rule::inline_image => out.push(self.inline_image(pair)?),
            Rule::icon => out.push(self.icon(pair)?),
            Rule::external_cross_reference => out.push(self.external_cross_reference(pair)?),
            Rule::footnote => out.push(self.footnote(pair)?),
            Rule::index_term => out.push(Element::IndexTerm {
                term: self.children(first_inner(&pair)?)?,
            }),
            Rule::concealed_index_term => out.push(concealed_index_term(pair)),

            Rule::line_break => out.push(Element::LineBreak),

            _ => return Err(unexpected_rule(&pair)),
        }
        Ok(())
    }

    /// Builds and merges every inner pair.
    fn children(&self, pair: Pair<Rule>) -> Result<Vec<Element>, GlossError> {
        let mut elements = Vec::new();
        for inner in pair.into_inner() {
            self.build(inner, &mut elements)?;
        }
        Ok(merge(elements))
    }

    fn quoted_text(&self, pair: Pair<Rule>) -> Result<Element, GlossError> {
        let mut attributes = Attributes::new();
        let mut body = None;
        for inner in pair.clone().into_inner() {
            match inner.as_rule() {
                Rule::quoted_text_attributes => {
                    let roles: Vec<String> =
                        inner.into_inner().map(|r| r.as_str().to_string()).collect();
                    attributes.set(ATTR_ROLE, AttrValue::Roles(roles));
                }
                _ => body = Some(inner),
            }
        }
        let body = body.ok_or_else(|| unexpected_rule(&pair))?;
        let kind = match body.as_rule() {
            Rule::constrained_bold | Rule::unconstrained_bold => QuotedTextKind::Bold,
            Rule::constrained_italic | Rule::unconstrained_italic => QuotedTextKind::Italic,
            Rule::constrained_monospace | Rule::unconstrained_monospace => {
                QuotedTextKind::Monospace
            }
            Rule::constrained_marked | Rule::unconstrained_marked => QuotedTextKind::Marked,
            Rule::subscript => QuotedTextKind::Subscript,
            Rule::superscript => QuotedTextKind::Superscript,
            _ => return Err(unexpected_rule(&body)),
        };
        let elements = match kind {
            QuotedTextKind::Subscript | QuotedTextKind::Superscript => {
                vec![Element::text(first_inner(&body)?.as_str())]
            }
            _ => self.children(body)?,
        };
        Ok(Element::QuotedText(QuotedText {
            kind,
            attributes,
            elements,
        }))
    }

    fn inline_link(&self, pair: Pair<Rule>) -> Result<Element, GlossError> {
        let mut location = Location::default();
        let mut attributes = Attributes::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::link_scheme => location.scheme = inner.as_str().to_string(),
                Rule::link_path | Rule::macro_path => location.path = self.children(inner)?,
                Rule::link_attributes => attributes = self.link_attributes(inner)?,
                _ => return Err(unexpected_rule(&inner)),
            }
        }
        Ok(Element::InlineLink(InlineLink {
            location,
            attributes,
        }))
    }

    fn link_attributes(&self, pair: Pair<Rule>) -> Result<Attributes, GlossError> {
        let mut attributes = Attributes::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::link_text | Rule::link_text_all => {
                    let text = self.children(inner)?;
                    attributes.set(ATTR_INLINE_LINK_TEXT, AttrValue::Elements(text));
                }
                Rule::named_attribute => {
                    let (key, value) = named_attribute(inner)?;
                    attributes.set(key, value);
                }
                _ => return Err(unexpected_rule(&inner)),
            }
        }
        Ok(attributes)
    }

    fn inline_image(&self, pair: Pair<Rule>) -> Result<Element, GlossError> {
        let mut location = Location::default();
        let mut attributes = Attributes::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::macro_path => location.path = self.children(inner)?,
                Rule::macro_attributes => {
                    attributes = macro_attributes(inner, &[ATTR_IMAGE_ALT, "width", "height"])?
                }
                _ => return Err(unexpected_rule(&inner)),
            }
        }
        if let Some(imagesdir) = &self.options.imagesdir {
            location = location.with_path_prefix(imagesdir);
        }
        if !attributes.has(ATTR_IMAGE_ALT) {
            attributes.set(ATTR_IMAGE_ALT, location.file_stem());
        }
        Ok(Element::InlineImage(InlineImage {
            location,
            attributes,
        }))
    }

    fn icon(&self, pair: Pair<Rule>) -> Result<Element, GlossError> {
        let mut class = String::new();
        let mut attributes = Attributes::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::icon_class => class = inner.as_str().to_string(),
                Rule::macro_attributes => attributes = macro_attributes(inner, &["size"])?,
                _ => return Err(unexpected_rule(&inner)),
            }
        }
        Ok(Element::Icon(Icon { class, attributes }))
    }

    fn external_cross_reference(&self, pair: Pair<Rule>) -> Result<Element, GlossError> {
        let mut location = Location::default();
        let mut label = Vec::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::macro_path => location.path = self.children(inner)?,
                Rule::link_text_all => label = self.children(inner)?,
                _ => return Err(unexpected_rule(&inner)),
            }
        }
        Ok(Element::ExternalCrossReference(ExternalCrossReference {
            location,
            label,
        }))
    }

    fn footnote(&self, pair: Pair<Rule>) -> Result<Element, GlossError> {
        let mut note = Footnote {
            reference: None,
            elements: vec![],
        };
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::footnote_ref => note.reference = Some(inner.as_str().to_string()),
                Rule::footnote_content => note.elements = self.children(inner)?,
                _ => return Err(unexpected_rule(&inner)),
            }
        }
        Ok(Element::Footnote(note))
    }
}

fn passthrough(kind: PassthroughKind, pair: Pair<Rule>) -> Element {
    let content = pair
        .into_inner()
        .next()
        .map(|p| p.as_str())
        .unwrap_or_default();
    let elements = if content.is_empty() {
        vec![]
    } else {
        vec![Element::text(content)]
    };
    Element::InlinePassthrough(InlinePassthrough { kind, elements })
}

fn cross_reference(pair: Pair<Rule>) -> Element {
    let mut xref = InternalCrossReference {
        id: String::new(),
        label: None,
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::cross_reference_id => xref.id = inner.as_str().to_string(),
            _ => xref.label = Some(inner.as_str().trim().to_string()),
        }
    }
    Element::InternalCrossReference(xref)
}

fn counter_substitution(pair: Pair<Rule>) -> Element {
    let mut counter = CounterSubstitution {
        name: String::new(),
        hidden: false,
        value: None,
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::counter_kind => counter.hidden = inner.as_str() == "counter2",
            Rule::attribute_name => counter.name = inner.as_str().to_string(),
            _ => counter.value = Some(CounterValue::parse(inner.as_str())),
        }
    }
    Element::CounterSubstitution(counter)
}

fn concealed_index_term(pair: Pair<Rule>) -> Element {
    let mut terms = pair.into_inner().map(|t| t.as_str().trim().to_string());
    Element::ConcealedIndexTerm {
        term1: terms.next().unwrap_or_default(),
        term2: terms.next(),
        term3: terms.next(),
    }
}

fn named_attribute(pair: Pair<Rule>) -> Result<(String, String), GlossError> {
    let mut key = None;
    let mut value = String::new();
    for inner in pair.clone().into_inner() {
        match inner.as_rule() {
            Rule::attribute_key => key = Some(inner.as_str().to_string()),
            _ => value = unquote(inner.as_str().trim()).to_string(),
        }
    }
    let key = key.ok_or_else(|| unexpected_rule(&pair))?;
    Ok((key, value))
}

/// Named attributes are kept as is; positional ones are named after `positional_names`, or
/// `positional-N` beyond them.
fn macro_attributes(pair: Pair<Rule>, positional_names: &[&str]) -> Result<Attributes, GlossError> {
    let mut attributes = Attributes::new();
    let mut position = 0;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::named_attribute => {
                let (key, value) = named_attribute(inner)?;
                attributes.set(key, value);
            }
            Rule::positional_attribute => {
                let value = unquote(inner.as_str().trim());
                let key = positional_names
                    .get(position)
                    .map(|name| name.to_string())
                    .unwrap_or_else(|| format!("positional-{}", position + 1));
                position += 1;
                if !value.is_empty() {
                    attributes.set(key, value);
                }
            }
            _ => return Err(unexpected_rule(&inner)),
        }
    }
    Ok(attributes)
}

// ============================================================================
// UTILITIES
// ============================================================================

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn placeholder_ref(pair: Pair<Rule>) -> Result<PlaceholderRef, GlossError> {
    let digits = first_inner(&pair)?.as_str();
    digits
        .parse::<u32>()
        .map(PlaceholderRef::new)
        .map_err(|e| grammar_error(&pair, format!("invalid placeholder '{digits}'"), e))
}

fn first_inner<'i>(pair: &Pair<'i, Rule>) -> Result<Pair<'i, Rule>, GlossError> {
    pair.clone()
        .into_inner()
        .next()
        .ok_or_else(|| unexpected_rule(pair))
}

fn get_span(pair: &Pair<Rule>) -> Span {
    Span {
        start: pair.as_span().start(),
        end: pair.as_span().end(),
    }
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

fn unexpected_rule(pair: &Pair<Rule>) -> GlossError {
    let src = to_error_source("fragment", pair.get_input());
    GlossError::Grammar {
        message: format!("unexpected {:?}", pair.as_rule()),
        ctx: ErrorContext::with_source_and_span(src, get_span(pair)),
        source: None,
    }
}

fn grammar_error<E>(pair: &Pair<Rule>, message: String, cause: E) -> GlossError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let src = to_error_source("fragment", pair.get_input());
    GlossError::Grammar {
        message,
        ctx: ErrorContext::with_source_and_span(src, get_span(pair)),
        source: Some(Box::new(cause)),
    }
}

fn convert_parse_error(error: Error<Rule>, text: &str, rule: EntryRule) -> GlossError {
    let last = text.len().saturating_sub(1);
    let span = match error.location {
        pest::error::InputLocation::Pos(pos) => Span {
            start: pos.min(last),
            end: pos.min(last),
        },
        pest::error::InputLocation::Span((start, end)) => Span { start, end },
    };
    let src = to_error_source(rule.as_str(), text);
    GlossError::Grammar {
        message: format!("unable to parse fragment as {rule}"),
        ctx: ErrorContext::with_source_and_span(src, span)
            .help(format!("the fragment does not match the {rule} rule")),
        source: Some(Box::new(error)),
    }
}
