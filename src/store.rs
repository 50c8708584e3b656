//! The attribute store of a processing pass: live attributes, immutable overrides and counters.

use std::collections::BTreeMap;

use im::OrdMap;

use crate::ast::{AttrValue, Attributes, CounterValue};

/// Live document attributes layered under external overrides, plus named counters.
///
/// Overrides are fixed at construction and always win. Declarations and resets only ever touch
/// the live attributes.
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    content: Attributes,
    overrides: Attributes,
    counters: OrdMap<String, CounterValue>,
}

impl AttributeStore {
    pub fn new(overrides: &BTreeMap<String, String>) -> Self {
        AttributeStore {
            content: Attributes::new(),
            overrides: overrides
                .iter()
                .map(|(k, v)| (k.clone(), AttrValue::String(v.clone())))
                .collect(),
            counters: OrdMap::new(),
        }
    }

    /// Seeds the live attributes, e.g. from front matter or the header.
    pub fn add_all(&mut self, attributes: Attributes) {
        self.content.extend(attributes);
    }

    /// Looks up `name`, overrides first. `Some(AttrValue::Nil)` means the attribute was reset.
    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.overrides.get(name).or_else(|| self.content.get(name))
    }

    /// The value of `name` as a string, or `None` when it is missing or reset.
    pub fn get_as_string(&self, name: &str) -> Option<String> {
        match self.get(name) {
            None | Some(AttrValue::Nil) => None,
            Some(value) => Some(value.to_string()),
        }
    }

    /// The value of `name` as a string: `default` when missing, empty when reset.
    pub fn get_as_string_or(&self, name: &str, default: &str) -> String {
        match self.get(name) {
            None => default.to_string(),
            Some(value) => value.to_string(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        let name = name.into();
        let value = value.into();
        if self.overrides.has(&name) {
            tracing::debug!(name = %name, "attribute is overridden, declaration only affects live value");
        }
        self.content.set(name, value);
    }

    pub fn reset(&mut self, name: impl Into<String>) {
        self.set(name, AttrValue::Nil);
    }

    /// Current value of the counter, zero before first use.
    pub fn counter(&self, name: &str) -> CounterValue {
        self.counters
            .get(name)
            .cloned()
            .unwrap_or(CounterValue::Number(0))
    }

    pub fn set_counter(&mut self, name: impl Into<String>, value: CounterValue) {
        self.counters.insert(name.into(), value);
    }

    pub fn overrides(&self) -> &Attributes {
        &self.overrides
    }

    /// Live attributes merged with the overrides.
    pub fn snapshot(&self) -> Attributes {
        let mut result = self.content.clone();
        result.extend(self.overrides.clone());
        result
    }
}
