//! Drives class-unit visitation over directories and archives.
//!
//! A [`Parser`] reads the class entries of its inputs, decodes them and
//! visits them in parallel into one shared [`ParsingContext`]. Names that
//! stay unresolved afterwards can be looked up on a classpath through a
//! [`ResourceLocator`] with [`Parser::reconcile`].

mod archive;
mod locator;
mod parser;

pub use archive::split_classpath;
pub use locator::{ClasspathLocator, LocatedClass, ResourceLocator};
pub use parser::{ParseReport, Parser, ReconcileReport};
pub use tg_model::ParsingContext;

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use zip::result::ZipError;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error while reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("ZIP error while reading {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}
