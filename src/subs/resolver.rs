//! Resolves attribute references and counters, and applies attribute declarations and resets.
//!
//! The walk is pre-order and document-ordered: a declaration takes effect for everything that
//! follows it, and counters advance in encounter order.

use crate::ast::{CounterSubstitution, CounterValue, Element};
use crate::diagnostics::{Warning, Warnings};
use crate::store::AttributeStore;
use crate::subs::merge::merge;
use crate::{err_msg, GlossError};

/// Resolves every element of `elements`, then merges adjacent text.
pub fn resolve_elements(
    elements: Vec<Element>,
    attributes: &mut AttributeStore,
    warnings: &mut Warnings,
) -> Result<Vec<Element>, GlossError> {
    let mut result = Vec::with_capacity(elements.len());
    for element in elements {
        result.push(resolve_element(element, attributes, warnings)?);
    }
    Ok(merge(result))
}

pub fn resolve_element(
    element: Element,
    attributes: &mut AttributeStore,
    warnings: &mut Warnings,
) -> Result<Element, GlossError> {
    match element {
        Element::AttributeDeclaration { name, value } => {
            tracing::debug!(name = %name, "attribute declared");
            attributes.set(name.clone(), value.clone());
            Ok(Element::AttributeDeclaration { name, value })
        }
        Element::AttributeReset { name } => {
            tracing::debug!(name = %name, "attribute reset");
            attributes.reset(name.clone());
            Ok(Element::AttributeReset { name })
        }
        Element::AttributeSubstitution { name } => match attributes.get_as_string(&name) {
            Some(value) => Ok(Element::Text(value)),
            None => {
                let literal = format!("{{{name}}}");
                warnings.push(Warning::MissingAttribute { name });
                Ok(Element::Text(literal))
            }
        },
        Element::CounterSubstitution(counter) => resolve_counter(counter, attributes),
        other => other.try_map_children(&mut |children| {
            resolve_elements(children, attributes, warnings)
        }),
    }
}

fn resolve_counter(
    counter: CounterSubstitution,
    attributes: &mut AttributeStore,
) -> Result<Element, GlossError> {
    let value = match counter.value {
        Some(pinned) => pinned,
        None => increment(&counter.name, attributes.counter(&counter.name))?,
    };
    let rendered = match &value {
        CounterValue::Number(n) => n.to_string(),
        CounterValue::Character(c) => c.to_string(),
        CounterValue::Text(text) => return Err(invalid_counter(&counter.name, text)),
    };
    tracing::trace!(name = %counter.name, value = %rendered, hidden = counter.hidden, "counter");
    attributes.set_counter(counter.name, value);
    if counter.hidden {
        // empty text so that merging removes it
        Ok(Element::text(""))
    } else {
        Ok(Element::Text(rendered))
    }
}

fn increment(name: &str, current: CounterValue) -> Result<CounterValue, GlossError> {
    match current {
        CounterValue::Number(n) => n.checked_add(1).map(CounterValue::Number).ok_or_else(|| {
            err_msg!(InvalidCounterType, "counter '{}' cannot advance past {}", name, n)
        }),
        // surrogates are not characters, the next one after U+D7FF is U+E000
        CounterValue::Character(c) => (c as u32 + 1..=char::MAX as u32)
            .find_map(char::from_u32)
            .map(CounterValue::Character)
            .ok_or_else(|| {
                err_msg!(
                    InvalidCounterType,
                    "counter '{}' cannot advance past '{}'",
                    name,
                    c
                )
            }),
        CounterValue::Text(text) => Err(invalid_counter(name, &text)),
    }
}

fn invalid_counter(name: &str, value: &str) -> GlossError {
    err_msg!(
        InvalidCounterType,
        "counter '{}' holds '{}', which is neither a number nor a single character",
        name,
        value
    )
    .with_help("start a counter with a number ({counter:name:1}) or a character ({counter:name:a})")
}
