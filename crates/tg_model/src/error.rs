use std::path::PathBuf;

use thiserror::Error;

use crate::model::TypeCategory;

/// Integrity problems found while visiting units.
///
/// None of these abort a build. They are reported to the
/// [`ParsingContext`](crate::ParsingContext) and the offending unit or member is
/// skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("type {name} is already modeled as {existing}, cannot redefine it as {requested}")]
    CategoryConflict {
        name: String,
        existing: TypeCategory,
        requested: TypeCategory,
    },
    #[error("{name} cannot extend {parent}: {parent} already inherits from {name}")]
    CyclicInheritance { name: String, parent: String },
    #[error("annotation type {owner} cannot declare field {member}")]
    UnsupportedMember { owner: String, member: String },
    #[error("unit visitor misuse: {reason}")]
    VisitorMisuse { reason: String },
    #[error("malformed descriptor '{descriptor}' on {owner}.{member}")]
    MalformedDescriptor {
        owner: String,
        member: String,
        descriptor: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read parsing config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid parsing config: {0}")]
    Toml(#[from] toml::de::Error),
}
