//! Applies substitution steps to every block of a raw document.
//!
//! Line-based blocks thread their lines through each step of their list. A re-parsing step
//! serializes the lines with placeholders, parses the text under the step's entry rule, restores
//! the placeholders and yields a single logical line; the final split step cuts it back into
//! lines. Element-based blocks apply their list to each child block.

use crate::ast::attributes::{ATTR_IMAGESDIR, ATTR_IMAGE_ALT, ATTR_QUOTE_AUTHOR};
use crate::ast::{
    plain_text, BlockBody, BlockKind, DelimitedBlock, DraftDocument, Element, ImageBlock, Line,
    ListItem, ListItemKind, Paragraph, RawDocument, Section,
};
use crate::config::Configuration;
use crate::store::AttributeStore;
use crate::subs::context::{SubstitutionContext, SubstitutionStep};
use crate::subs::footnotes::replace_footnotes;
use crate::subs::merge::{merge, split_lines};
use crate::subs::placeholders::{check_reserved, check_reserved_value, Placeholders};
use crate::subs::resolver::{resolve_element, resolve_elements};
use crate::subs::section_id::resolve_id;
use crate::subs::selector::{
    substitutions_for_block, substitutions_for_paragraph, Substitution, NORMAL_SUBSTITUTIONS,
};
use crate::syntax::{EntryRule, Grammar};
use crate::GlossError;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Runs every substitution on `raw` and returns the draft document.
pub fn apply_substitutions(
    raw: RawDocument,
    config: &Configuration,
    grammar: &dyn Grammar,
) -> Result<DraftDocument, GlossError> {
    process(raw, config, grammar, false).map(|(draft, _)| draft)
}

/// Same as [`apply_substitutions`], also returning every executed step.
pub fn trace_substitutions(
    raw: RawDocument,
    config: &Configuration,
    grammar: &dyn Grammar,
) -> Result<(DraftDocument, Vec<SubstitutionStep>), GlossError> {
    process(raw, config, grammar, true)
}

fn process(
    mut raw: RawDocument,
    config: &Configuration,
    grammar: &dyn Grammar,
    record_trace: bool,
) -> Result<(DraftDocument, Vec<SubstitutionStep>), GlossError> {
    let _span = tracing::debug_span!("apply_substitutions", file = ?config.filename).entered();

    raw.elements = check_reserved(std::mem::take(&mut raw.elements))?;
    let mut attributes = AttributeStore::new(&config.attribute_overrides);
    for (name, value) in attributes.overrides().iter() {
        check_reserved_value(name, value)?;
    }
    if let Some(front_matter) = &raw.front_matter {
        for (name, value) in front_matter.content.iter() {
            check_reserved_value(name, value)?;
        }
        attributes.add_all(front_matter.content.clone());
    }
    let header = raw.header_attributes();
    for (name, value) in header.iter() {
        check_reserved_value(name, value)?;
    }
    attributes.add_all(header);

    let mut ctx = SubstitutionContext::new(grammar, attributes).record_trace(record_trace);
    let elements = apply_on_elements(raw.elements, &mut ctx)?;
    let elements = replace_footnotes(elements, &mut ctx.footnotes, &mut ctx.warnings);

    let draft = DraftDocument {
        attributes: ctx.attributes.snapshot(),
        front_matter: raw.front_matter,
        elements,
        footnotes: std::mem::take(&mut ctx.footnotes).into_notes(),
        warnings: std::mem::take(&mut ctx.warnings).into_vec(),
    };
    tracing::debug!(
        elements = draft.elements.len(),
        footnotes = draft.footnotes.len(),
        warnings = draft.warnings.len(),
        "substitutions applied"
    );
    Ok((draft, ctx.take_trace()))
}

// ============================================================================
// BLOCK DISPATCH
// ============================================================================

fn apply_on_elements(
    elements: Vec<Element>,
    ctx: &mut SubstitutionContext,
) -> Result<Vec<Element>, GlossError> {
    elements
        .into_iter()
        .map(|element| apply_on_element(element, ctx))
        .collect()
}

fn apply_on_element(element: Element, ctx: &mut SubstitutionContext) -> Result<Element, GlossError> {
    match element {
        Element::Paragraph(paragraph) => apply_on_paragraph(paragraph, ctx).map(Element::Paragraph),
        Element::DelimitedBlock(block) => {
            apply_on_delimited_block(block, ctx).map(Element::DelimitedBlock)
        }
        Element::Section(section) => apply_on_section(section, ctx).map(Element::Section),
        Element::ImageBlock(image) => apply_on_image_block(image, ctx).map(Element::ImageBlock),
        Element::ListItem(item) => apply_on_list_item(item, ctx).map(Element::ListItem),
        Element::ContinuedListItemElement { offset, element } => {
            Ok(Element::ContinuedListItemElement {
                offset,
                element: Box::new(apply_on_element(*element, ctx)?),
            })
        }
        other => resolve_element(other, &mut ctx.attributes, &mut ctx.warnings),
    }
}

fn apply_on_paragraph(
    mut paragraph: Paragraph,
    ctx: &mut SubstitutionContext,
) -> Result<Paragraph, GlossError> {
    let subs = substitutions_for_paragraph(&paragraph.attributes)?;
    paragraph.lines = apply_on_lines(paragraph.lines, &subs, "paragraph", ctx)?;
    Ok(paragraph)
}

fn apply_on_delimited_block(
    mut block: DelimitedBlock,
    ctx: &mut SubstitutionContext,
) -> Result<DelimitedBlock, GlossError> {
    let subs = substitutions_for_block(block.kind, &block.attributes)?;
    block.body = match block.body {
        BlockBody::Lines(mut lines) => {
            if block.kind == BlockKind::MarkdownQuote {
                if let Some(author) = extract_attribution(&mut lines, ctx) {
                    block.attributes.set(ATTR_QUOTE_AUTHOR, author);
                }
            }
            BlockBody::Lines(apply_on_lines(lines, &subs, block.kind.as_str(), ctx)?)
        }
        BlockBody::Elements(children) => {
            BlockBody::Elements(apply_on_children(children, &subs, ctx)?)
        }
    };
    Ok(block)
}

/// Applies the list of an element-based block to its children, at any depth.
fn apply_on_children(
    children: Vec<Element>,
    subs: &[Substitution],
    ctx: &mut SubstitutionContext,
) -> Result<Vec<Element>, GlossError> {
    children
        .into_iter()
        .map(|child| apply_on_child(child, subs, ctx))
        .collect()
}

fn apply_on_child(
    child: Element,
    subs: &[Substitution],
    ctx: &mut SubstitutionContext,
) -> Result<Element, GlossError> {
    match child {
        Element::Paragraph(mut paragraph) => {
            paragraph.lines = apply_on_lines(paragraph.lines, subs, "paragraph", ctx)?;
            Ok(Element::Paragraph(paragraph))
        }
        Element::DelimitedBlock(mut block) => {
            block.body = match block.body {
                BlockBody::Lines(lines) => {
                    BlockBody::Lines(apply_on_lines(lines, subs, block.kind.as_str(), ctx)?)
                }
                BlockBody::Elements(nested) => {
                    BlockBody::Elements(apply_on_children(nested, subs, ctx)?)
                }
            };
            Ok(Element::DelimitedBlock(block))
        }
        Element::Section(mut section) => {
            section.title = apply_on_inline(section.title, subs, "section title", ctx)?;
            resolve_id(&mut section, &ctx.attributes);
            section.elements = apply_on_children(section.elements, subs, ctx)?;
            Ok(Element::Section(section))
        }
        Element::ListItem(mut item) => {
            if let ListItemKind::Labeled { term, level } = item.kind {
                item.kind = ListItemKind::Labeled {
                    term: apply_on_inline(term, subs, "labeled list term", ctx)?,
                    level,
                };
            }
            item.elements = apply_on_children(item.elements, subs, ctx)?;
            Ok(Element::ListItem(item))
        }
        Element::ContinuedListItemElement { offset, element } => {
            Ok(Element::ContinuedListItemElement {
                offset,
                element: Box::new(apply_on_child(*element, subs, ctx)?),
            })
        }
        // image blocks keep their own steps; declarations and resets go to the resolver
        other => apply_on_element(other, ctx),
    }
}

/// Removes a trailing `-- Author` line and returns the author.
fn extract_attribution(lines: &mut Vec<Line>, ctx: &SubstitutionContext) -> Option<String> {
    let candidate = match lines.last().map(Vec::as_slice) {
        Some([Element::Text(text)]) => text.clone(),
        _ => return None,
    };
    match ctx
        .grammar()
        .parse(&candidate, EntryRule::MarkdownQuoteAttribution, &ctx.parse_options())
    {
        Ok(elements) => {
            let author = plain_text(&elements);
            if author.is_empty() {
                return None;
            }
            lines.pop();
            tracing::debug!(author = %author, "found markdown quote attribution");
            Some(author)
        }
        Err(_) => None,
    }
}

fn apply_on_section(
    mut section: Section,
    ctx: &mut SubstitutionContext,
) -> Result<Section, GlossError> {
    section.title = apply_on_inline(section.title, &NORMAL_SUBSTITUTIONS, "section title", ctx)?;
    resolve_id(&mut section, &ctx.attributes);
    section.elements = apply_on_elements(section.elements, ctx)?;
    Ok(section)
}

fn apply_on_image_block(
    mut image: ImageBlock,
    ctx: &mut SubstitutionContext,
) -> Result<ImageBlock, GlossError> {
    image.location.path = apply_on_inline(
        image.location.path,
        &[Substitution::Attributes],
        "image block",
        ctx,
    )?;
    let imagesdir = ctx.attributes.get_as_string_or(ATTR_IMAGESDIR, "");
    image.location = image.location.with_path_prefix(&imagesdir);
    if !image.attributes.has(ATTR_IMAGE_ALT) {
        image.attributes.set(ATTR_IMAGE_ALT, image.location.file_stem());
    }
    Ok(image)
}

fn apply_on_list_item(
    mut item: ListItem,
    ctx: &mut SubstitutionContext,
) -> Result<ListItem, GlossError> {
    if let ListItemKind::Labeled { term, level } = item.kind {
        item.kind = ListItemKind::Labeled {
            term: apply_on_inline(term, &NORMAL_SUBSTITUTIONS, "labeled list term", ctx)?,
            level,
        };
    }
    item.elements = apply_on_elements(item.elements, ctx)?;
    Ok(item)
}

// ============================================================================
// STEP EXECUTION
// ============================================================================

/// Runs `subs` over a single inline sequence (a title, a term or a path).
fn apply_on_inline(
    elements: Vec<Element>,
    subs: &[Substitution],
    block: &str,
    ctx: &mut SubstitutionContext,
) -> Result<Vec<Element>, GlossError> {
    let lines = apply_on_lines(vec![elements], subs, block, ctx)?;
    Ok(lines.into_iter().next().unwrap_or_default())
}

/// Threads `lines` through every step of `subs`. An empty set of lines is left untouched.
fn apply_on_lines(
    mut lines: Vec<Line>,
    subs: &[Substitution],
    block: &str,
    ctx: &mut SubstitutionContext,
) -> Result<Vec<Line>, GlossError> {
    if lines.is_empty() {
        return Ok(lines);
    }
    for (index, &step) in subs.iter().enumerate() {
        lines = match step.entry_rule() {
            None => split_lines(lines),
            Some(rule) => {
                let line = reparse(lines, rule, ctx).map_err(|e| {
                    e.with_help(format!("while applying the '{step}' substitution to a {block}"))
                })?;
                let line = if step == Substitution::Attributes {
                    resolve_elements(line, &mut ctx.attributes, &mut ctx.warnings)?
                } else {
                    line
                };
                vec![line]
            }
        };
        tracing::debug!(block, step = %step, lines = lines.len(), "applied substitution");
        ctx.record(block, index, step, &lines);
    }
    Ok(lines)
}

fn reparse(
    lines: Vec<Line>,
    rule: EntryRule,
    ctx: &SubstitutionContext,
) -> Result<Line, GlossError> {
    let grammar = ctx.grammar();
    let options = ctx.parse_options();
    let mut placeholders = Placeholders::new();
    let text = placeholders.serialize(lines);
    placeholders.parse_payloads(rule, grammar, &options)?;
    let parsed = grammar.parse(&text, rule, &options)?;
    let line = merge(placeholders.restore(parsed)?);
    placeholders.finish()?;
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::attributes::{ATTR_ID, ATTR_SUBSTITUTIONS};
    use crate::ast::{AttrValue, Attributes, Location, QuotedText, QuotedTextKind};
    use crate::syntax::InlineGrammar;
    use crate::ErrorType;

    fn context() -> SubstitutionContext<'static> {
        SubstitutionContext::new(&InlineGrammar, AttributeStore::default())
    }

    fn text_lines(lines: &[&str]) -> Vec<Line> {
        lines.iter().map(|l| vec![Element::text(*l)]).collect()
    }

    fn substitute(elements: Vec<Element>, config: &Configuration) -> DraftDocument {
        apply_substitutions(RawDocument::new(elements), config, &InlineGrammar).unwrap()
    }

    #[test]
    fn none_then_split_is_identity() {
        let mut ctx = context();
        let lines = vec![
            vec![Element::text("a *b* {c}")],
            vec![Element::text("d "), Element::LineBreak],
            vec![],
            vec![Element::text("e")],
        ];
        let result = apply_on_lines(
            lines.clone(),
            &[Substitution::None, Substitution::SplitLines],
            "paragraph",
            &mut ctx,
        )
        .unwrap();
        assert_eq!(result, lines);
    }

    #[test]
    fn empty_lines_are_left_untouched() {
        let mut ctx = context();
        let result =
            apply_on_lines(vec![], &NORMAL_SUBSTITUTIONS, "paragraph", &mut ctx).unwrap();
        assert!(result.is_empty());
        assert!(ctx.trace().is_empty());
    }

    #[test]
    fn paragraph_goes_through_the_normal_list() {
        let draft = substitute(
            vec![Element::paragraph(text_lines(&[
                "{foo} and *more*",
                "content...",
            ]))],
            &Configuration::new().with_attribute_override("foo", "bar"),
        );
        assert_eq!(
            draft.elements,
            vec![Element::paragraph(vec![
                vec![
                    Element::text("bar and "),
                    Element::QuotedText(QuotedText {
                        kind: QuotedTextKind::Bold,
                        attributes: Attributes::new(),
                        elements: vec![Element::text("more")],
                    }),
                ],
                vec![
                    Element::text("content"),
                    Element::Symbol {
                        name: "...".to_string()
                    },
                ],
            ])]
        );
    }

    #[test]
    fn listing_block_only_escapes() {
        let block = Element::DelimitedBlock(DelimitedBlock {
            kind: BlockKind::Listing,
            attributes: Attributes::new(),
            body: BlockBody::Lines(text_lines(&["*a* <b>"])),
        });
        let draft = substitute(vec![block], &Configuration::new());
        match &draft.elements[0] {
            Element::DelimitedBlock(block) => assert_eq!(
                block.body,
                BlockBody::Lines(vec![vec![
                    Element::text("*a* "),
                    Element::SpecialCharacter {
                        name: "<".to_string()
                    },
                    Element::text("b"),
                    Element::SpecialCharacter {
                        name: ">".to_string()
                    },
                ]])
            ),
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn unsupported_directive_aborts_the_pass() {
        let paragraph = Element::Paragraph(Paragraph {
            attributes: Attributes::new().with(ATTR_SUBSTITUTIONS, "quotes,bogus"),
            lines: text_lines(&["a"]),
        });
        let err = apply_substitutions(
            RawDocument::new(vec![paragraph]),
            &Configuration::new(),
            &InlineGrammar,
        )
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::UnsupportedSubstitution);
    }

    #[test]
    fn markdown_quote_attribution_is_extracted() {
        let block = DelimitedBlock {
            kind: BlockKind::MarkdownQuote,
            attributes: Attributes::new(),
            body: BlockBody::Lines(text_lines(&["some *quote*", "-- John Doe"])),
        };
        let mut ctx = context();
        let block = apply_on_delimited_block(block, &mut ctx).unwrap();
        assert_eq!(
            block.attributes.get_as_string(ATTR_QUOTE_AUTHOR).as_deref(),
            Some("John Doe")
        );
        match block.body {
            BlockBody::Lines(lines) => assert_eq!(lines.len(), 1),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[test]
    fn markdown_quote_with_only_an_attribution() {
        let block = DelimitedBlock {
            kind: BlockKind::MarkdownQuote,
            attributes: Attributes::new(),
            body: BlockBody::Lines(text_lines(&["-- Anonymous"])),
        };
        let block = apply_on_delimited_block(block, &mut context()).unwrap();
        assert_eq!(block.body, BlockBody::Lines(vec![]));
        assert_eq!(
            block.attributes.get_as_string(ATTR_QUOTE_AUTHOR).as_deref(),
            Some("Anonymous")
        );
    }

    #[test]
    fn section_title_is_substituted_and_identified() {
        let section = Element::Section(Section {
            level: 1,
            attributes: Attributes::new(),
            title: vec![Element::text("a *bold* {product} title")],
            elements: vec![Element::paragraph(text_lines(&["{product}"]))],
        });
        let draft = substitute(
            vec![section],
            &Configuration::new().with_attribute_override("product", "Gloss"),
        );
        match &draft.elements[0] {
            Element::Section(section) => {
                assert_eq!(
                    section.attributes.get_as_string(ATTR_ID).as_deref(),
                    Some("_a_bold_gloss_title")
                );
                assert_eq!(
                    section.elements,
                    vec![Element::paragraph(text_lines(&["Gloss"]))]
                );
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn image_block_gets_imagesdir_and_alt() {
        let image = Element::ImageBlock(ImageBlock {
            location: Location {
                scheme: String::new(),
                path: vec![
                    Element::attribute_substitution("name"),
                    Element::text(".png"),
                ],
            },
            attributes: Attributes::new(),
        });
        let draft = substitute(
            vec![
                Element::AttributeDeclaration {
                    name: "imagesdir".to_string(),
                    value: AttrValue::from("assets"),
                },
                Element::AttributeDeclaration {
                    name: "name".to_string(),
                    value: AttrValue::from("cookie"),
                },
                image,
            ],
            &Configuration::new(),
        );
        match &draft.elements[2] {
            Element::ImageBlock(image) => {
                assert_eq!(image.location.to_url(), "assets/cookie.png");
                assert_eq!(
                    image.attributes.get_as_string(ATTR_IMAGE_ALT).as_deref(),
                    Some("cookie")
                );
            }
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn example_block_children_use_the_block_list() {
        let block = Element::DelimitedBlock(DelimitedBlock {
            kind: BlockKind::Example,
            attributes: Attributes::new().with(ATTR_SUBSTITUTIONS, "specialchars"),
            body: BlockBody::Elements(vec![Element::paragraph(text_lines(&["*a* & b"]))]),
        });
        let draft = substitute(vec![block], &Configuration::new());
        match &draft.elements[0] {
            Element::DelimitedBlock(block) => assert_eq!(
                block.body,
                BlockBody::Elements(vec![Element::paragraph(vec![vec![
                    Element::text("*a* "),
                    Element::SpecialCharacter {
                        name: "&".to_string()
                    },
                    Element::text(" b"),
                ]])])
            ),
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn reserved_code_point_is_rejected_up_front() {
        let err = apply_substitutions(
            RawDocument::new(vec![Element::paragraph(text_lines(&["\u{FFFD}1\u{FFFD}"]))]),
            &Configuration::new(),
            &InlineGrammar,
        )
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }

    #[test]
    fn reserved_code_point_in_header_authors_is_rejected() {
        let header = Element::Section(Section {
            level: 0,
            attributes: Attributes::new().with(
                "authors",
                AttrValue::Authors(vec![crate::ast::DocumentAuthor {
                    full_name: "Jane \u{FFFD}1\u{FFFD}".to_string(),
                    email: None,
                }]),
            ),
            title: vec![Element::text("Title")],
            elements: vec![],
        });
        let err = apply_substitutions(
            RawDocument::new(vec![header, Element::paragraph(text_lines(&["{author}"]))]),
            &Configuration::new(),
            &InlineGrammar,
        )
        .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Validation);
    }

    #[test]
    fn nested_list_items_use_the_block_list() {
        let item = Element::ListItem(ListItem {
            kind: ListItemKind::Unordered { level: 1 },
            attributes: Attributes::new(),
            elements: vec![
                Element::paragraph(text_lines(&["*a* & b"])),
                Element::ContinuedListItemElement {
                    offset: 0,
                    element: Box::new(Element::paragraph(text_lines(&["_c_"]))),
                },
            ],
        });
        let block = Element::DelimitedBlock(DelimitedBlock {
            kind: BlockKind::Example,
            attributes: Attributes::new().with(ATTR_SUBSTITUTIONS, "specialchars"),
            body: BlockBody::Elements(vec![
                Element::AttributeDeclaration {
                    name: "seen".to_string(),
                    value: AttrValue::from("yes"),
                },
                item,
            ]),
        });
        let draft = substitute(vec![block], &Configuration::new());
        let expected_item = Element::ListItem(ListItem {
            kind: ListItemKind::Unordered { level: 1 },
            attributes: Attributes::new(),
            elements: vec![
                Element::paragraph(vec![vec![
                    Element::text("*a* "),
                    Element::SpecialCharacter {
                        name: "&".to_string(),
                    },
                    Element::text(" b"),
                ]]),
                Element::ContinuedListItemElement {
                    offset: 0,
                    element: Box::new(Element::paragraph(text_lines(&["_c_"]))),
                },
            ],
        });
        match &draft.elements[0] {
            Element::DelimitedBlock(block) => match &block.body {
                BlockBody::Elements(children) => assert_eq!(children[1], expected_item),
                other => panic!("unexpected body {other:?}"),
            },
            other => panic!("unexpected element {other:?}"),
        }
        assert_eq!(draft.attributes.get_as_string("seen").as_deref(), Some("yes"));
    }

    struct RejectingGrammar;

    impl Grammar for RejectingGrammar {
        fn parse(
            &self,
            _text: &str,
            rule: EntryRule,
            _options: &crate::syntax::ParseOptions,
        ) -> Result<Vec<Element>, GlossError> {
            Err(GlossError::Grammar {
                message: "no match".to_string(),
                ctx: crate::ErrorContext::none()
                    .help(format!("the fragment does not match the {rule} rule")),
                source: None,
            })
        }
    }

    #[test]
    fn grammar_failure_keeps_both_help_lines() {
        let mut ctx = SubstitutionContext::new(&RejectingGrammar, AttributeStore::default());
        let err = apply_on_lines(
            text_lines(&["a"]),
            &[Substitution::Quotes],
            "paragraph",
            &mut ctx,
        )
        .unwrap_err();
        let help = miette::Diagnostic::help(&err)
            .map(|h| h.to_string())
            .unwrap_or_default();
        assert!(help.contains("the fragment does not match the QuotedTextSubs rule"));
        assert!(help.contains("while applying the 'quotes' substitution to a paragraph"));
    }

    #[test]
    fn trace_records_every_step() {
        let (_, trace) = trace_substitutions(
            RawDocument::new(vec![Element::paragraph(text_lines(&["a"]))]),
            &Configuration::new(),
            &InlineGrammar,
        )
        .unwrap();
        let steps: Vec<Substitution> = trace.iter().map(|s| s.step).collect();
        let mut expected = NORMAL_SUBSTITUTIONS.to_vec();
        expected.push(Substitution::SplitLines);
        assert_eq!(steps, expected);
        assert!(trace.iter().all(|s| s.block == "paragraph"));
        assert_eq!(trace[0].index, 0);
        assert_eq!(trace[7].index, 7);
    }
}
