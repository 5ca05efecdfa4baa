use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Controls how much of each unit is modeled.
///
/// ```toml
/// model-unannotated-members = false
/// annotations-of-interest = ["com.example.Service"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParsingConfig {
    /// Keep fields and methods that carry no annotation.
    pub model_unannotated_members: bool,
    /// When non-empty, only types carrying one of these annotations get their
    /// members visited.
    pub annotations_of_interest: BTreeSet<String>,
}

impl ParsingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_unannotated_members(mut self, enabled: bool) -> Self {
        self.model_unannotated_members = enabled;
        self
    }

    pub fn with_annotation_of_interest(mut self, annotation: impl Into<String>) -> Self {
        self.annotations_of_interest.insert(annotation.into());
        self
    }

    pub fn with_annotations_of_interest<I, S>(mut self, annotations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.annotations_of_interest
            .extend(annotations.into_iter().map(Into::into));
        self
    }

    /// Members are visited unconditionally when no filter is configured.
    pub fn always_deep(&self) -> bool {
        self.annotations_of_interest.is_empty()
    }

    pub fn is_of_interest(&self, annotation: &str) -> bool {
        self.annotations_of_interest.contains(annotation)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
