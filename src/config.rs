//! Configuration of a substitution pass.
//!
//! A configuration carries the attribute overrides supplied from outside the document (they win
//! over every declaration inside it) and the name of the file being processed. It can be built in
//! code or loaded from YAML:
//!
//! ```yaml
//! filename: guide.adoc
//! attributes:
//!   imagesdir: ./assets
//!   product: Gloss
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::GlossError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    /// Attribute values that override the document's own declarations.
    #[serde(rename = "attributes")]
    pub attribute_overrides: BTreeMap<String, String>,
    /// Name of the processed document, used in diagnostics.
    pub filename: Option<PathBuf>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attribute_overrides.insert(name.into(), value.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, GlossError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| GlossError::config("invalid configuration", e))
    }

    /// Loads a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, GlossError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GlossError::config(format!("cannot read configuration '{}'", path.display()), e)
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_yaml_str(&content)
            .map_err(|e| e.with_help(format!("in configuration file '{}'", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;

    #[test]
    fn builder_collects_overrides() {
        let config = Configuration::new()
            .with_attribute_override("foo", "bar")
            .with_attribute_override("imagesdir", "assets")
            .with_filename("test.adoc");
        assert_eq!(config.attribute_overrides.len(), 2);
        assert_eq!(config.attribute_overrides["foo"], "bar");
        assert_eq!(config.filename, Some(PathBuf::from("test.adoc")));
    }

    #[test]
    fn yaml_configuration() {
        let config = Configuration::from_yaml_str(
            "filename: guide.adoc\nattributes:\n  imagesdir: ./assets\n  product: Gloss\n",
        )
        .unwrap();
        assert_eq!(config.attribute_overrides["imagesdir"], "./assets");
        assert_eq!(config.attribute_overrides["product"], "Gloss");
        assert_eq!(config.filename, Some(PathBuf::from("guide.adoc")));
    }

    #[test]
    fn empty_yaml_is_the_default() {
        assert_eq!(Configuration::from_yaml_str("").unwrap(), Configuration::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Configuration::from_yaml_str("colour: blue\n").unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Configuration::from_file(Path::new("/nonexistent/gloss.yaml")).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.message().contains("cannot read configuration"));
    }
}
