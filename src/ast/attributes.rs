//! Attribute containers shared by elements and documents.
//!
//! An attribute value is either absent ([`AttrValue::Nil`], which is also how a reset is
//! recorded), a string, a boolean, or structured data. A name mapped to `Nil` is observably
//! different from a name that was never declared.

// ============================================================================
// IMPORTS
// ============================================================================

use std::fmt;

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::ast::Element;

// ============================================================================
// WELL-KNOWN ATTRIBUTE NAMES
// ============================================================================

/// Identifier of a section or block.
pub const ATTR_ID: &str = "id";
/// Set when the identifier was given explicitly in the document.
pub const ATTR_CUSTOM_ID: &str = "@customID";
pub const ATTR_IDPREFIX: &str = "idprefix";
pub const ATTR_IDSEPARATOR: &str = "idseparator";
pub const DEFAULT_IDPREFIX: &str = "_";
pub const DEFAULT_IDSEPARATOR: &str = "_";
pub const ATTR_IMAGESDIR: &str = "imagesdir";
pub const ATTR_IMAGE_ALT: &str = "alt";
pub const ATTR_IMAGE_WIDTH: &str = "width";
pub const ATTR_IMAGE_HEIGHT: &str = "height";
/// Pseudo block kind, e.g. a paragraph styled as a listing.
pub const ATTR_BLOCK_KIND: &str = "block-kind";
/// Explicit substitution directive of a block.
pub const ATTR_SUBSTITUTIONS: &str = "subs";
pub const ATTR_QUOTE_AUTHOR: &str = "quoteAuthor";
pub const ATTR_ROLE: &str = "role";
/// Text of an inline link.
pub const ATTR_INLINE_LINK_TEXT: &str = "positional-1";
pub const ATTR_AUTHORS: &str = "authors";
pub const ATTR_REVISION: &str = "revision";

// ============================================================================
// VALUES
// ============================================================================

/// A document author, as found in the header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentAuthor {
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A document revision, as found in the header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DocumentRevision {
    #[serde(default)]
    pub revnumber: String,
    #[serde(default)]
    pub revdate: String,
    #[serde(default)]
    pub revremark: String,
}

/// The value of an attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrValue {
    /// Declared without value, or reset.
    Nil,
    String(String),
    Bool(bool),
    /// Inline content, e.g. the text of a link.
    Elements(Vec<Element>),
    Roles(Vec<String>),
    Authors(Vec<DocumentAuthor>),
    Revision(DocumentRevision),
}

impl AttrValue {
    pub fn is_nil(&self) -> bool {
        matches!(self, AttrValue::Nil)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::String(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::String(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<Vec<Element>> for AttrValue {
    fn from(value: Vec<Element>) -> Self {
        AttrValue::Elements(value)
    }
}

/// String coercion used by lookups and by attribute substitution.
impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Nil => Ok(()),
            AttrValue::String(s) => f.write_str(s),
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Elements(elements) => f.write_str(&crate::ast::plain_text(elements)),
            AttrValue::Roles(roles) => f.write_str(&roles.join(" ")),
            AttrValue::Authors(authors) => {
                let names: Vec<&str> = authors.iter().map(|a| a.full_name.as_str()).collect();
                f.write_str(&names.join("; "))
            }
            AttrValue::Revision(revision) => f.write_str(&revision.revnumber),
        }
    }
}

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// An ordered, case-sensitive attribute mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes(OrdMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut AttrValue> {
        self.0.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        self.0.remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the value as a string, unless missing or `Nil`.
    pub fn get_as_string(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            None | Some(AttrValue::Nil) => None,
            Some(value) => Some(value.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    /// Copies every entry of `other` into `self`, `other` winning on conflicts.
    pub fn extend(&mut self, other: Attributes) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Rebuilds every element-valued attribute through `f`.
    pub fn try_map_elements<F, E>(self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(Vec<Element>) -> Result<Vec<Element>, E>,
    {
        let mut result = OrdMap::new();
        for (key, value) in self.0 {
            let value = match value {
                AttrValue::Elements(elements) => AttrValue::Elements(f(elements)?),
                other => other,
            };
            result.insert(key, value);
        }
        Ok(Attributes(result))
    }
}

impl FromIterator<(String, AttrValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, AttrValue)>>(iter: T) -> Self {
        Attributes(iter.into_iter().collect())
    }
}
