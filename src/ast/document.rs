//! Raw (pre-substitution) and draft (post-substitution) documents.

use serde::{Deserialize, Serialize};

use crate::ast::attributes::{ATTR_AUTHORS, ATTR_REVISION};
use crate::ast::{AttrValue, Attributes, DocumentAuthor, DocumentRevision, Element, Footnote};
use crate::diagnostics::{GlossError, Warning};

// ============================================================================
// FRONT MATTER
// ============================================================================

/// YAML front matter. Its top-level entries seed the document attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FrontMatter {
    #[serde(default)]
    pub content: Attributes,
}

impl FrontMatter {
    pub fn from_yaml(content: &str) -> Result<Self, GlossError> {
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(content)
            .map_err(|e| GlossError::config("failed to parse yaml content in front matter", e))?;
        let mut attributes = Attributes::new();
        for (key, value) in mapping {
            let Some(key) = yaml_scalar(&key) else {
                continue;
            };
            let value = match value {
                serde_yaml::Value::Null => AttrValue::Nil,
                serde_yaml::Value::Bool(b) => AttrValue::Bool(b),
                other => match yaml_scalar(&other) {
                    Some(s) => AttrValue::String(s),
                    None => AttrValue::String(
                        serde_yaml::to_string(&other)
                            .map_err(|e| GlossError::config("unsupported front matter value", e))?
                            .trim_end()
                            .to_string(),
                    ),
                },
            };
            attributes.set(key, value);
        }
        tracing::debug!(count = attributes.len(), "initialized front matter");
        Ok(FrontMatter {
            content: attributes,
        })
    }
}

fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ============================================================================
// RAW DOCUMENT
// ============================================================================

/// A document as produced by the block-level grammar, before substitutions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_matter: Option<FrontMatter>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl RawDocument {
    pub fn new(elements: Vec<Element>) -> Self {
        RawDocument {
            front_matter: None,
            elements,
        }
    }

    /// Collects the attributes declared in the document header.
    ///
    /// A level-0 section moves its authors and revision into the result. Declarations and
    /// resets are applied in order. Blank lines and comments are skipped; anything else ends the
    /// header.
    pub fn header_attributes(&mut self) -> Attributes {
        let mut result = Attributes::new();
        for element in self.elements.iter_mut() {
            match element {
                Element::Section(section) if section.level == 0 => {
                    if let Some(AttrValue::Authors(authors)) =
                        section.attributes.remove(ATTR_AUTHORS)
                    {
                        result.extend(expand_authors(&authors));
                    }
                    if let Some(AttrValue::Revision(revision)) =
                        section.attributes.remove(ATTR_REVISION)
                    {
                        result.extend(expand_revision(revision));
                    }
                }
                Element::AttributeDeclaration { name, value } => {
                    result.set(name.clone(), value.clone());
                }
                Element::AttributeReset { name } => result.set(name.clone(), AttrValue::Nil),
                Element::BlankLine | Element::SingleLineComment(_) => {}
                _ => break,
            }
        }
        tracing::debug!(count = result.len(), "collected header attributes");
        result
    }
}

fn author_key(key: &str, index: usize) -> String {
    if index == 0 {
        key.to_string()
    } else {
        format!("{}_{}", key, index + 1)
    }
}

fn initial(part: &str) -> String {
    part.chars().next().map(String::from).unwrap_or_default()
}

fn name_part(part: &str) -> String {
    part.trim().replace('_', " ")
}

/// Expands header authors into `firstname`, `middlename`, `lastname`, `author`,
/// `authorinitials` and `email` (suffixed `_2`, `_3`... for subsequent authors).
pub fn expand_authors(authors: &[DocumentAuthor]) -> Attributes {
    let mut result = Attributes::new();
    let mut normalized = Vec::with_capacity(authors.len());
    for (i, author) in authors.iter().enumerate() {
        let parts: Vec<&str> = author.full_name.split_whitespace().collect();
        let first = parts.first().map(|p| name_part(p)).unwrap_or_default();
        let middle = parts.get(1).map(|p| name_part(p)).unwrap_or_default();
        let last = if parts.len() > 2 {
            name_part(&parts[2..].join(" "))
        } else {
            String::new()
        };
        let (names, fields): (Vec<&String>, Vec<(&str, &String)>) =
            if !middle.is_empty() && !last.is_empty() {
                (
                    vec![&first, &middle, &last],
                    vec![("firstname", &first), ("middlename", &middle), ("lastname", &last)],
                )
            } else if !middle.is_empty() {
                (
                    vec![&first, &middle],
                    vec![("firstname", &first), ("lastname", &middle)],
                )
            } else {
                (vec![&first], vec![("firstname", &first)])
            };
        for (key, value) in fields {
            result.set(author_key(key, i), value.as_str());
        }
        let full_name = names
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let initials: String = names.iter().map(|s| initial(s)).collect();
        result.set(author_key("author", i), full_name.as_str());
        result.set(author_key("authorinitials", i), initials);
        let email = author
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty());
        if let Some(email) = email {
            result.set(author_key("email", i), email);
        }
        normalized.push(DocumentAuthor {
            full_name,
            email: email.map(String::from),
        });
    }
    result.set(ATTR_AUTHORS, AttrValue::Authors(normalized));
    result
}

/// Expands a header revision into `revnumber`, `revdate` and `revremark` (when not empty).
pub fn expand_revision(revision: DocumentRevision) -> Attributes {
    let mut result = Attributes::new();
    for (key, value) in [
        ("revnumber", &revision.revnumber),
        ("revdate", &revision.revdate),
        ("revremark", &revision.revremark),
    ] {
        if !value.is_empty() {
            result.set(key, value.as_str());
        }
    }
    result.set(ATTR_REVISION, AttrValue::Revision(revision));
    result
}

// ============================================================================
// DRAFT DOCUMENT
// ============================================================================

/// A document with every substitution applied, ready for rendering.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DraftDocument {
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_matter: Option<FrontMatter>,
    pub elements: Vec<Element>,
    pub footnotes: Vec<Footnote>,
    pub warnings: Vec<Warning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Section;

    fn header(authors: Vec<DocumentAuthor>, revision: Option<DocumentRevision>) -> Element {
        let mut attributes = Attributes::new().with(ATTR_AUTHORS, AttrValue::Authors(authors));
        if let Some(revision) = revision {
            attributes.set(ATTR_REVISION, AttrValue::Revision(revision));
        }
        Element::Section(Section {
            level: 0,
            attributes,
            title: vec![Element::text("Document Title")],
            elements: vec![],
        })
    }

    #[test]
    fn header_authors_are_expanded() {
        let mut doc = RawDocument::new(vec![header(
            vec![
                DocumentAuthor {
                    full_name: "Kismet Rainbow Chameleon".to_string(),
                    email: Some("kismet@asciidoctor.org".to_string()),
                },
                DocumentAuthor {
                    full_name: "Lazarus het_Draeke".to_string(),
                    email: None,
                },
            ],
            None,
        )]);
        let attrs = doc.header_attributes();
        assert_eq!(attrs.get_as_string("firstname").as_deref(), Some("Kismet"));
        assert_eq!(attrs.get_as_string("middlename").as_deref(), Some("Rainbow"));
        assert_eq!(attrs.get_as_string("lastname").as_deref(), Some("Chameleon"));
        assert_eq!(attrs.get_as_string("authorinitials").as_deref(), Some("KRC"));
        assert_eq!(
            attrs.get_as_string("email").as_deref(),
            Some("kismet@asciidoctor.org")
        );
        assert_eq!(attrs.get_as_string("lastname_2").as_deref(), Some("het Draeke"));
        assert_eq!(
            attrs.get_as_string("author_2").as_deref(),
            Some("Lazarus het Draeke")
        );
        assert!(!attrs.has("email_2"));
        // moved out of the section
        match &doc.elements[0] {
            Element::Section(section) => assert!(!section.attributes.has(ATTR_AUTHORS)),
            other => panic!("unexpected element {other:?}"),
        }
    }

    #[test]
    fn header_revision_is_expanded() {
        let mut doc = RawDocument::new(vec![header(
            vec![],
            Some(DocumentRevision {
                revnumber: "1.0".to_string(),
                revdate: "2020-01-01".to_string(),
                revremark: String::new(),
            }),
        )]);
        let attrs = doc.header_attributes();
        assert_eq!(attrs.get_as_string("revnumber").as_deref(), Some("1.0"));
        assert_eq!(attrs.get_as_string("revdate").as_deref(), Some("2020-01-01"));
        assert!(!attrs.has("revremark"));
    }

    #[test]
    fn header_scan_stops_at_first_content_block() {
        let mut doc = RawDocument::new(vec![
            Element::AttributeDeclaration {
                name: "foo".to_string(),
                value: AttrValue::from("bar"),
            },
            Element::BlankLine,
            Element::AttributeReset {
                name: "baz".to_string(),
            },
            Element::paragraph(vec![vec![Element::text("content")]]),
            Element::AttributeDeclaration {
                name: "late".to_string(),
                value: AttrValue::from("value"),
            },
        ]);
        let attrs = doc.header_attributes();
        assert_eq!(attrs.get_as_string("foo").as_deref(), Some("bar"));
        assert_eq!(attrs.get("baz"), Some(&AttrValue::Nil));
        assert!(!attrs.has("late"));
    }

    #[test]
    fn front_matter_entries_become_attributes() {
        let fm = FrontMatter::from_yaml("title: a title\ndraft: true\nweight: 3\nempty:\n").unwrap();
        assert_eq!(fm.content.get_as_string("title").as_deref(), Some("a title"));
        assert_eq!(fm.content.get("draft"), Some(&AttrValue::Bool(true)));
        assert_eq!(fm.content.get_as_string("weight").as_deref(), Some("3"));
        assert_eq!(fm.content.get("empty"), Some(&AttrValue::Nil));
    }

    #[test]
    fn invalid_front_matter_is_a_config_error() {
        let err = FrontMatter::from_yaml("- just\n- a list\n").unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Config);
    }
}
