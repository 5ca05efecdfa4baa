use std::fs;
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use tg_classfile::{parse_class, ClassParseError};
use tg_model::{ParsingContext, TypeNode, Types};
use tracing::{debug, info, warn};
use url::Url;

use crate::archive::{self, ClassEntry};
use crate::locator::ResourceLocator;
use crate::ParseError;

/// Units visited and entries that could not be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub units: usize,
    pub failures: usize,
}

impl ParseReport {
    pub fn merge(self, other: Self) -> Self {
        Self {
            units: self.units + other.units,
            failures: self.failures + other.failures,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Units found through the locator and visited.
    pub located: usize,
    /// Names this pass could not resolve, sorted.
    pub missing: Vec<String>,
}

pub struct Parser {
    context: Arc<ParsingContext>,
    locator: Option<Arc<dyn ResourceLocator>>,
}

impl Parser {
    pub fn new(context: Arc<ParsingContext>) -> Self {
        Self {
            context,
            locator: None,
        }
    }

    pub fn with_locator(mut self, locator: Arc<dyn ResourceLocator>) -> Self {
        self.locator = Some(locator);
        self
    }

    pub fn context(&self) -> &Arc<ParsingContext> {
        &self.context
    }

    pub fn types(&self) -> Types {
        self.context.types()
    }

    /// Visits every class under `path`: a directory, an archive or a single
    /// class file. Everything found is an application type.
    pub fn parse(&self, path: &Path) -> Result<ParseReport, ParseError> {
        let metadata = fs::metadata(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if metadata.is_dir() {
            let contents = archive::read_directory(path)?;
            let mut report = self.visit_entries(&contents.classes, archive::location_of(path));
            for nested in &contents.archives {
                report = report.merge(self.parse_archive(nested)?);
            }
            info!(
                path = %path.display(),
                units = report.units,
                failures = report.failures,
                "parsed directory"
            );
            return Ok(report);
        }

        if archive::is_archive(path) {
            return self.parse_archive(path);
        }

        if archive::is_class_file(path) {
            let entry = archive::read_class_file(path)?;
            return Ok(self.visit_entries(
                std::slice::from_ref(&entry),
                archive::location_of(path),
            ));
        }

        debug!(path = %path.display(), "ignoring input that is neither a class nor an archive");
        Ok(ParseReport::default())
    }

    /// Parses several inputs concurrently into the same store.
    pub fn parse_all<P>(&self, paths: &[P]) -> Result<ParseReport, ParseError>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .map(|path| self.parse(path.as_ref()))
            .try_reduce(ParseReport::default, |left, right| Ok(left.merge(right)))
    }

    /// Decodes and visits a single unit. `Ok(None)` means the unit was
    /// decoded but skipped by the visitor.
    pub fn parse_bytes(
        &self,
        bytes: &[u8],
        location: Option<Url>,
        application: bool,
    ) -> Result<Option<Arc<TypeNode>>, ClassParseError> {
        let unit = parse_class(bytes)?;
        Ok(self.context.visitor(location, application).accept(&unit))
    }

    /// Resolves what the inputs left unresolved, fetching class bytes from the
    /// locator until no new names turn up. Located units are library types.
    pub fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        self.context.store().drain_non_visited(|proxy| {
            let name = proxy.name();
            let Some(locator) = &self.locator else {
                report.missing.push(name.to_string());
                return;
            };
            let Some(found) = locator.locate(name) else {
                debug!(name, "no class found for unresolved name");
                report.missing.push(name.to_string());
                return;
            };
            if let Err(error) = self.parse_bytes(&found.bytes, found.location, false) {
                warn!(name, %error, "skipping undecodable class");
            }
            if proxy.is_visited() {
                report.located += 1;
            } else {
                report.missing.push(name.to_string());
            }
        });
        report.missing.sort_unstable();
        report.missing.dedup();
        info!(
            located = report.located,
            missing = report.missing.len(),
            "reconciled unresolved names"
        );
        report
    }

    fn parse_archive(&self, path: &Path) -> Result<ParseReport, ParseError> {
        let entries = archive::read_archive(path)?;
        let report = self.visit_entries(&entries, archive::location_of(path));
        info!(
            path = %path.display(),
            units = report.units,
            failures = report.failures,
            "parsed archive"
        );
        Ok(report)
    }

    fn visit_entries(&self, entries: &[ClassEntry], location: Option<Url>) -> ParseReport {
        entries
            .par_iter()
            .map(|entry| match self.parse_bytes(&entry.bytes, location.clone(), true) {
                Ok(_) => ParseReport {
                    units: 1,
                    failures: 0,
                },
                Err(error) => {
                    warn!(entry = %entry.path, %error, "skipping undecodable class");
                    ParseReport {
                        units: 0,
                        failures: 1,
                    }
                }
            })
            .reduce(ParseReport::default, ParseReport::merge)
    }
}
