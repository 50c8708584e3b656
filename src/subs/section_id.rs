//! Default section identifiers derived from substituted titles.

use crate::ast::attributes::{
    ATTR_CUSTOM_ID, ATTR_ID, ATTR_IDPREFIX, ATTR_IDSEPARATOR, DEFAULT_IDPREFIX,
    DEFAULT_IDSEPARATOR,
};
use crate::ast::{plain_text, AttrValue, Element, Section};
use crate::store::AttributeStore;

/// Assigns the section its default `id`, unless the document gave one explicitly.
pub fn resolve_id(section: &mut Section, attributes: &AttributeStore) {
    if is_custom(section.attributes.get(ATTR_CUSTOM_ID)) {
        return;
    }
    let separator = attributes.get_as_string_or(ATTR_IDSEPARATOR, DEFAULT_IDSEPARATOR);
    let prefix = attributes.get_as_string_or(ATTR_IDPREFIX, DEFAULT_IDPREFIX);
    let id = format!("{}{}", prefix, replace_non_alphanumerics(&section.title, &separator));
    tracing::debug!(id = %id, level = section.level, "resolved section id");
    section.attributes.set(ATTR_ID, id);
}

fn is_custom(value: Option<&AttrValue>) -> bool {
    match value {
        Some(AttrValue::Bool(custom)) => *custom,
        Some(AttrValue::String(s)) => s == "true",
        _ => false,
    }
}

/// Lowercases letters and digits and collapses every other run of characters into a single
/// `separator`. Separators are never leading or trailing.
pub fn replace_non_alphanumerics(title: &[Element], separator: &str) -> String {
    let mut out = String::new();
    let mut pending_separator = false;
    for c in plain_text(title).chars() {
        if c.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push_str(separator);
            }
            pending_separator = false;
            out.extend(c.to_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}
