//! Element model for gloss documents.
//!
//! A document is a tree of [`Element`]s. Blocks are either line-based (a sequence of
//! [`Line`]s, each an ordered sequence of inline elements) or element-based (a sequence of child
//! blocks). Every container owns its children exclusively.

// ============================================================================
// IMPORTS
// ============================================================================

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub mod attributes;
pub mod document;

pub use attributes::{AttrValue, Attributes, DocumentAuthor, DocumentRevision};
pub use document::{DraftDocument, FrontMatter, RawDocument};

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A byte range in a source fragment, used by diagnostics.
///
/// ```rust
/// use gloss::ast::Span;
/// let span = Span { start: 2, end: 5 };
/// assert_eq!(span.len(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An ordered sequence of inline elements.
pub type Line = Vec<Element>;

/// Opaque reference to an element set aside while its line is being re-parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceholderRef(pub(crate) u32);

impl PlaceholderRef {
    pub fn new(sequence: u32) -> Self {
        PlaceholderRef(sequence)
    }

    pub fn sequence(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlaceholderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current or pinned value of a counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterValue {
    Number(i64),
    Character(char),
    /// A start value that is neither a number nor a single character.
    Text(String),
}

impl CounterValue {
    /// Interprets an explicit start value: digits are numbers, a single character is a
    /// character counter, anything else is kept as text.
    pub fn parse(raw: &str) -> CounterValue {
        if let Ok(n) = raw.parse::<i64>() {
            return CounterValue::Number(n);
        }
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => CounterValue::Character(c),
            _ => CounterValue::Text(raw.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotedTextKind {
    Bold,
    Italic,
    Monospace,
    Marked,
    Subscript,
    Superscript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotedStringKind {
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassthroughKind {
    SinglePlus,
    TriplePlus,
    Macro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterSubstitution {
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CounterValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedText {
    pub kind: QuotedTextKind,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotedString {
    pub kind: QuotedStringKind,
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlinePassthrough {
    pub kind: PassthroughKind,
    pub elements: Vec<Element>,
}

/// Target of a link, image or cross reference. The path may hold unresolved elements until
/// substitutions have run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheme: String,
    pub path: Vec<Element>,
}

static ABSOLUTE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid absolute-url regex"));

impl Location {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Location {
            scheme: scheme.into(),
            path: vec![Element::Text(path.into())],
        }
    }

    /// The location as a plain URL string.
    pub fn to_url(&self) -> String {
        format!("{}{}", self.scheme, plain_text(&self.path))
    }

    /// The file name of the location without its extension, used as default alt text.
    pub fn file_stem(&self) -> String {
        let url = self.to_url();
        let base = url.rsplit('/').next().unwrap_or_default();
        match base.rfind('.') {
            Some(dot) if dot > 0 => base[..dot].to_string(),
            _ => base.to_string(),
        }
    }

    /// Prefixes a relative location with `prefix` (the images directory). Locations with a
    /// scheme, rooted paths and absolute URLs are left alone.
    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        if prefix.is_empty() || !self.scheme.is_empty() {
            return self;
        }
        let url = self.to_url();
        if url.starts_with('/') || ABSOLUTE_URL.is_match(&url) {
            return self;
        }
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.push(Element::Text(format!("{}/", prefix.trim_end_matches('/'))));
        path.append(&mut self.path);
        self.path = crate::subs::merge::merge(path);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineLink {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineImage {
    pub location: Location,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub class: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalCrossReference {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalCrossReference {
    pub location: Location,
    #[serde(default)]
    pub label: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footnote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Sentinel ID of a reference to an unknown footnote.
pub const INVALID_FOOTNOTE_REFERENCE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootnoteReference {
    pub id: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub duplicate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub level: u8,
    #[serde(default)]
    pub attributes: Attributes,
    pub title: Vec<Element>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub attributes: Attributes,
    pub lines: Vec<Line>,
}

/// Delimited block kinds. The kind selects the default substitutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Example,
    Quote,
    Sidebar,
    Verse,
    Fenced,
    Listing,
    Literal,
    Passthrough,
    Comment,
    MarkdownQuote,
}

impl BlockKind {
    pub const ALL: [BlockKind; 10] = [
        BlockKind::Example,
        BlockKind::Quote,
        BlockKind::Sidebar,
        BlockKind::Verse,
        BlockKind::Fenced,
        BlockKind::Listing,
        BlockKind::Literal,
        BlockKind::Passthrough,
        BlockKind::Comment,
        BlockKind::MarkdownQuote,
    ];

    pub fn from_name(name: &str) -> Option<BlockKind> {
        BlockKind::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Example => "example",
            BlockKind::Quote => "quote",
            BlockKind::Sidebar => "sidebar",
            BlockKind::Verse => "verse",
            BlockKind::Fenced => "fenced",
            BlockKind::Listing => "listing",
            BlockKind::Literal => "literal",
            BlockKind::Passthrough => "passthrough",
            BlockKind::Comment => "comment",
            BlockKind::MarkdownQuote => "markdown_quote",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockBody {
    Lines(Vec<Line>),
    Elements(Vec<Element>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelimitedBlock {
    pub kind: BlockKind,
    #[serde(default)]
    pub attributes: Attributes,
    pub body: BlockBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub location: Location,
    #[serde(default)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListItemKind {
    Ordered { level: u8 },
    Unordered { level: u8 },
    Labeled { term: Vec<Element>, level: u8 },
    Callout { reference: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub kind: ListItemKind,
    #[serde(default)]
    pub attributes: Attributes,
    pub elements: Vec<Element>,
}

/// Everything a document can contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    // inline leaves
    Text(String),
    Placeholder(PlaceholderRef),
    SpecialCharacter {
        name: String,
    },
    Symbol {
        name: String,
    },
    LineBreak,
    Callout {
        reference: u32,
    },
    AttributeSubstitution {
        name: String,
    },
    CounterSubstitution(CounterSubstitution),

    // inline containers
    QuotedText(QuotedText),
    QuotedString(QuotedString),
    InlinePassthrough(InlinePassthrough),
    InlineLink(InlineLink),
    InlineImage(InlineImage),
    Icon(Icon),
    InternalCrossReference(InternalCrossReference),
    ExternalCrossReference(ExternalCrossReference),
    Footnote(Footnote),
    FootnoteReference(FootnoteReference),
    IndexTerm {
        term: Vec<Element>,
    },
    ConcealedIndexTerm {
        term1: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        term2: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        term3: Option<String>,
    },

    // blocks
    Section(Section),
    Paragraph(Paragraph),
    DelimitedBlock(DelimitedBlock),
    ImageBlock(ImageBlock),
    ListItem(ListItem),
    ContinuedListItemElement {
        offset: i32,
        element: Box<Element>,
    },
    AttributeDeclaration {
        name: String,
        value: AttrValue,
    },
    AttributeReset {
        name: String,
    },
    BlankLine,
    ThematicBreak,
    SingleLineComment(String),
}

// ============================================================================
// CONSTRUCTORS & TRAVERSAL
// ============================================================================

impl Element {
    pub fn text(value: impl Into<String>) -> Element {
        Element::Text(value.into())
    }

    pub fn attribute_substitution(name: impl Into<String>) -> Element {
        Element::AttributeSubstitution { name: name.into() }
    }

    pub fn counter(name: impl Into<String>, hidden: bool, value: Option<CounterValue>) -> Element {
        Element::CounterSubstitution(CounterSubstitution {
            name: name.into(),
            hidden,
            value,
        })
    }

    pub fn paragraph(lines: Vec<Line>) -> Element {
        Element::Paragraph(Paragraph {
            attributes: Attributes::new(),
            lines,
        })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Element::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Rebuilds the element, passing every owned child sequence (lines, elements, titles,
    /// location paths, labels and element-valued attributes) through `f`.
    ///
    /// The boxed element of a continued list item is traversed recursively rather than handed
    /// to `f`.
    pub fn try_map_children<F, E>(self, f: &mut F) -> Result<Element, E>
    where
        F: FnMut(Vec<Element>) -> Result<Vec<Element>, E>,
    {
        let mapped = match self {
            Element::QuotedText(mut q) => {
                q.elements = f(q.elements)?;
                q.attributes = q.attributes.try_map_elements(|e| f(e))?;
                Element::QuotedText(q)
            }
            Element::QuotedString(mut q) => {
                q.elements = f(q.elements)?;
                Element::QuotedString(q)
            }
            Element::InlinePassthrough(mut p) => {
                p.elements = f(p.elements)?;
                Element::InlinePassthrough(p)
            }
            Element::InlineLink(mut link) => {
                link.location.path = f(link.location.path)?;
                link.attributes = link.attributes.try_map_elements(|e| f(e))?;
                Element::InlineLink(link)
            }
            Element::InlineImage(mut image) => {
                image.location.path = f(image.location.path)?;
                image.attributes = image.attributes.try_map_elements(|e| f(e))?;
                Element::InlineImage(image)
            }
            Element::Icon(mut icon) => {
                icon.attributes = icon.attributes.try_map_elements(|e| f(e))?;
                Element::Icon(icon)
            }
            Element::ExternalCrossReference(mut xref) => {
                xref.location.path = f(xref.location.path)?;
                xref.label = f(xref.label)?;
                Element::ExternalCrossReference(xref)
            }
            Element::Footnote(mut note) => {
                note.elements = f(note.elements)?;
                Element::Footnote(note)
            }
            Element::IndexTerm { term } => Element::IndexTerm { term: f(term)? },
            Element::Section(mut section) => {
                section.title = f(section.title)?;
                section.elements = f(section.elements)?;
                Element::Section(section)
            }
            Element::Paragraph(mut paragraph) => {
                paragraph.lines = map_lines(paragraph.lines, f)?;
                Element::Paragraph(paragraph)
            }
            Element::DelimitedBlock(mut block) => {
                block.body = match block.body {
                    BlockBody::Lines(lines) => BlockBody::Lines(map_lines(lines, f)?),
                    BlockBody::Elements(elements) => BlockBody::Elements(f(elements)?),
                };
                Element::DelimitedBlock(block)
            }
            Element::ImageBlock(mut image) => {
                image.location.path = f(image.location.path)?;
                Element::ImageBlock(image)
            }
            Element::ListItem(mut item) => {
                if let ListItemKind::Labeled { term, level } = item.kind {
                    item.kind = ListItemKind::Labeled {
                        term: f(term)?,
                        level,
                    };
                }
                item.elements = f(item.elements)?;
                Element::ListItem(item)
            }
            Element::ContinuedListItemElement { offset, element } => {
                Element::ContinuedListItemElement {
                    offset,
                    element: Box::new((*element).try_map_children(f)?),
                }
            }
            leaf @ (Element::Text(_)
            | Element::Placeholder(_)
            | Element::SpecialCharacter { .. }
            | Element::Symbol { .. }
            | Element::LineBreak
            | Element::Callout { .. }
            | Element::AttributeSubstitution { .. }
            | Element::CounterSubstitution(_)
            | Element::InternalCrossReference(_)
            | Element::FootnoteReference(_)
            | Element::ConcealedIndexTerm { .. }
            | Element::AttributeDeclaration { .. }
            | Element::AttributeReset { .. }
            | Element::BlankLine
            | Element::ThematicBreak
            | Element::SingleLineComment(_)) => leaf,
        };
        Ok(mapped)
    }
}

fn map_lines<F, E>(lines: Vec<Line>, f: &mut F) -> Result<Vec<Line>, E>
where
    F: FnMut(Vec<Element>) -> Result<Vec<Element>, E>,
{
    lines.into_iter().map(|line| f(line)).collect()
}

/// Flattens inline elements into their visible text.
pub fn plain_text(elements: &[Element]) -> String {
    let mut out = String::new();
    for element in elements {
        match element {
            Element::Text(s) => out.push_str(s),
            Element::SpecialCharacter { name } | Element::Symbol { name } => out.push_str(name),
            Element::AttributeSubstitution { name } => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            Element::QuotedText(q) => out.push_str(&plain_text(&q.elements)),
            Element::QuotedString(q) => out.push_str(&plain_text(&q.elements)),
            Element::InlinePassthrough(p) => out.push_str(&plain_text(&p.elements)),
            Element::InlineLink(link) => out.push_str(&link.location.to_url()),
            Element::ExternalCrossReference(xref) => out.push_str(&plain_text(&xref.label)),
            Element::InternalCrossReference(xref) => {
                out.push_str(xref.label.as_deref().unwrap_or(&xref.id))
            }
            Element::IndexTerm { term } => out.push_str(&plain_text(term)),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_value_parsing() {
        assert_eq!(CounterValue::parse("33"), CounterValue::Number(33));
        assert_eq!(CounterValue::parse("a"), CounterValue::Character('a'));
        assert_eq!(
            CounterValue::parse("abc"),
            CounterValue::Text("abc".to_string())
        );
    }

    #[test]
    fn relative_location_gets_prefixed() {
        let location = Location::new("", "foo.png").with_path_prefix("images/");
        assert_eq!(location.path, vec![Element::text("images/foo.png")]);
    }

    #[test]
    fn absolute_locations_are_left_alone() {
        for url in ["/tmp/foo.png", "https://example.com/foo.png", "data:image/png"] {
            let location = Location::new("", url).with_path_prefix("images");
            assert_eq!(location.to_url(), url);
        }
        let location = Location::new("https://", "example.com/foo.png").with_path_prefix("images");
        assert_eq!(location.to_url(), "https://example.com/foo.png");
    }

    #[test]
    fn file_stem_drops_directories_and_extension() {
        assert_eq!(Location::new("", "images/cookie.png").file_stem(), "cookie");
        assert_eq!(Location::new("https://", "foo.com/a.b.jpg").file_stem(), "a.b");
        assert_eq!(Location::new("", "noext").file_stem(), "noext");
    }

    #[test]
    fn plain_text_flattens_nested_content() {
        let elements = vec![
            Element::text("a "),
            Element::QuotedText(QuotedText {
                kind: QuotedTextKind::Bold,
                attributes: Attributes::new(),
                elements: vec![Element::text("bold")],
            }),
            Element::text(" "),
            Element::InlineLink(InlineLink {
                location: Location::new("https://", "foo.bar"),
                attributes: Attributes::new(),
            }),
        ];
        assert_eq!(plain_text(&elements), "a bold https://foo.bar");
    }

    #[test]
    fn map_children_reaches_paragraph_lines() {
        let paragraph = Element::paragraph(vec![vec![Element::text("a")], vec![Element::text("b")]]);
        let mapped: Result<Element, ()> = paragraph.try_map_children(&mut |mut line| {
            line.push(Element::text("!"));
            Ok(line)
        });
        assert_eq!(
            mapped.unwrap(),
            Element::paragraph(vec![
                vec![Element::text("a"), Element::text("!")],
                vec![Element::text("b"), Element::text("!")],
            ])
        );
    }
}
