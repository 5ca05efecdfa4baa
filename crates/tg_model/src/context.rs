use std::sync::Arc;

use tracing::warn;
use url::Url;

use crate::model::sync::SyncList;
use crate::store::ProxyStore;
use crate::types::Types;
use crate::visitor::UnitVisitor;
use crate::{ModelError, ParsingConfig};

/// Shared state of one build: configuration, the proxy store every visitor
/// writes into, and the diagnostics they report.
pub struct ParsingContext {
    config: ParsingConfig,
    store: Arc<ProxyStore>,
    diagnostics: SyncList<ModelError>,
}

impl Default for ParsingContext {
    fn default() -> Self {
        Self::new(ParsingConfig::default())
    }
}

impl ParsingContext {
    pub fn new(config: ParsingConfig) -> Self {
        Self::with_store(config, Arc::new(ProxyStore::new()))
    }

    pub fn with_store(config: ParsingConfig, store: Arc<ProxyStore>) -> Self {
        Self {
            config,
            store,
            diagnostics: SyncList::default(),
        }
    }

    pub fn config(&self) -> &ParsingConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ProxyStore> {
        &self.store
    }

    pub fn types(&self) -> Types {
        Types::new(Arc::clone(&self.store))
    }

    /// A visitor for one unit found at `location`.
    pub fn visitor(&self, location: Option<Url>, application: bool) -> UnitVisitor<'_> {
        UnitVisitor::new(self, location, application)
    }

    pub fn report(&self, error: ModelError) {
        warn!(%error, "skipping inconsistent class data");
        self.diagnostics.push(error);
    }

    pub fn diagnostics(&self) -> Vec<ModelError> {
        self.diagnostics.snapshot()
    }
}
