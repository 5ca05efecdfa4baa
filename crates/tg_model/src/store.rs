use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::model::{TypeCategory, TypePool};
use crate::proxy::TypeProxy;
use crate::ModelError;

/// The implicit root of every class hierarchy. It is never given a proxy.
pub const ROOT_TYPE: &str = "java.lang.Object";

/// Name-keyed registry of [`TypeProxy`] handles.
///
/// Lookups are lock-free on the hit path. Creation, promotion and re-homing
/// take a single store-wide lock so that a name never has two proxies, even
/// while it moves between pools.
pub struct ProxyStore {
    pools: [DashMap<String, Arc<TypeProxy>>; 3],
    unknown: DashMap<String, Arc<TypeProxy>>,
    non_visited: Mutex<Vec<Arc<TypeProxy>>>,
    creation: Mutex<()>,
}

impl Default for ProxyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyStore {
    pub fn new() -> Self {
        Self {
            pools: [DashMap::new(), DashMap::new(), DashMap::new()],
            unknown: DashMap::new(),
            non_visited: Mutex::new(Vec::new()),
            creation: Mutex::new(()),
        }
    }

    fn pool(&self, pool: TypePool) -> &DashMap<String, Arc<TypeProxy>> {
        &self.pools[pool.index()]
    }

    /// Finds an existing proxy without creating one.
    pub fn lookup(&self, name: &str) -> Option<Arc<TypeProxy>> {
        TypePool::ALL
            .iter()
            .map(|pool| self.pool(*pool))
            .chain(std::iter::once(&self.unknown))
            .find_map(|map| map.get(name).map(|entry| Arc::clone(entry.value())))
    }

    fn lookup_categorized(&self, name: &str) -> Option<(TypePool, Arc<TypeProxy>)> {
        TypePool::ALL.iter().find_map(|pool| {
            self.pool(*pool)
                .get(name)
                .map(|entry| (*pool, Arc::clone(entry.value())))
        })
    }

    /// Proxy for a name whose category is not known at the reference site.
    ///
    /// Returns `None` only for [`ROOT_TYPE`].
    pub fn get_or_create(&self, name: &str) -> Option<Arc<TypeProxy>> {
        if name == ROOT_TYPE {
            return None;
        }
        if let Some(proxy) = self.lookup(name) {
            return Some(proxy);
        }

        let _guard = self.creation.lock();
        if let Some(proxy) = self.lookup(name) {
            return Some(proxy);
        }
        let proxy = Arc::new(TypeProxy::new(name, None));
        self.unknown.insert(name.to_string(), Arc::clone(&proxy));
        self.non_visited.lock().push(Arc::clone(&proxy));
        trace!(name, "created proxy with unknown category");
        Some(proxy)
    }

    /// Proxy for a name referenced as `category`.
    ///
    /// A proxy waiting in the unknown pool is promoted into the category's
    /// pool; the same handle moves, so every reverse reference collected so
    /// far stays attached. A name already filed under another category keeps
    /// its proxy: the reference-site category is only a hint.
    pub fn get_or_create_in(&self, name: &str, category: TypeCategory) -> Option<Arc<TypeProxy>> {
        if name == ROOT_TYPE {
            return None;
        }
        let target = category.pool();
        if let Some(entry) = self.pool(target).get(name) {
            return Some(Arc::clone(entry.value()));
        }

        let _guard = self.creation.lock();
        if let Some((pool, proxy)) = self.lookup_categorized(name) {
            if pool != target {
                trace!(name, hint = %category, "keeping proxy in its existing pool");
            }
            return Some(proxy);
        }
        let waiting = self.unknown.get(name).map(|entry| Arc::clone(entry.value()));
        if let Some(proxy) = waiting {
            // Insert before removing so lock-free readers always find it.
            proxy.set_category(category);
            self.pool(target).insert(name.to_string(), Arc::clone(&proxy));
            self.unknown.remove(name);
            trace!(name, category = %category, "promoted proxy out of the unknown pool");
            return Some(proxy);
        }

        let proxy = Arc::new(TypeProxy::new(name, Some(category)));
        self.pool(target).insert(name.to_string(), Arc::clone(&proxy));
        self.non_visited.lock().push(Arc::clone(&proxy));
        trace!(name, category = %category, "created proxy");
        Some(proxy)
    }

    /// Proxy for a unit being visited as `category`.
    ///
    /// Unlike reference sites, the unit itself is authoritative: an unvisited
    /// proxy is re-homed into the category's pool. A proxy whose node was
    /// already visited under a different category is a conflict.
    pub fn define(&self, name: &str, category: TypeCategory) -> Result<Arc<TypeProxy>, ModelError> {
        if name == ROOT_TYPE {
            return Err(ModelError::VisitorMisuse {
                reason: format!("{ROOT_TYPE} is the implicit root and is not modeled"),
            });
        }
        let target = category.pool();
        let _guard = self.creation.lock();

        let existing = match self.lookup_categorized(name) {
            Some((pool, proxy)) => Some((Some(pool), proxy)),
            None => self
                .unknown
                .get(name)
                .map(|entry| (None, Arc::clone(entry.value()))),
        };

        let Some((pool, proxy)) = existing else {
            let proxy = Arc::new(TypeProxy::new(name, Some(category)));
            self.pool(target).insert(name.to_string(), Arc::clone(&proxy));
            self.non_visited.lock().push(Arc::clone(&proxy));
            trace!(name, category = %category, "created proxy for visited unit");
            return Ok(proxy);
        };

        if let Some(node) = proxy.get() {
            if node.category() != category {
                return Err(ModelError::CategoryConflict {
                    name: name.to_string(),
                    existing: node.category(),
                    requested: category,
                });
            }
        }

        match pool {
            Some(pool) if pool == target => {}
            Some(pool) => {
                self.pool(target).insert(name.to_string(), Arc::clone(&proxy));
                self.pool(pool).remove(name);
                debug!(name, category = %category, "re-homed proxy to its visited category");
            }
            None => {
                self.pool(target).insert(name.to_string(), Arc::clone(&proxy));
                self.unknown.remove(name);
                trace!(name, category = %category, "promoted proxy out of the unknown pool");
            }
        }
        proxy.set_category(category);
        Ok(proxy)
    }

    /// Every proxy, categorized or not.
    pub fn proxies(&self) -> Vec<Arc<TypeProxy>> {
        self.pools
            .iter()
            .chain(std::iter::once(&self.unknown))
            .flat_map(|map| {
                map.iter()
                    .map(|entry| Arc::clone(entry.value()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn proxies_in(&self, pool: TypePool) -> Vec<Arc<TypeProxy>> {
        self.pool(pool)
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pools.iter().map(DashMap::len).sum::<usize>() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries left on the non-visited worklist, visited or not.
    pub fn pending(&self) -> usize {
        self.non_visited.lock().len()
    }

    /// Drains the non-visited worklist, calling `handle` once for every proxy
    /// still unvisited when it is reached.
    ///
    /// Proxies created by `handle` itself (for example while visiting a unit
    /// fetched for an earlier proxy) are drained in the same call.
    pub fn drain_non_visited(&self, mut handle: impl FnMut(Arc<TypeProxy>)) {
        loop {
            let batch = std::mem::take(&mut *self.non_visited.lock());
            if batch.is_empty() {
                return;
            }
            for proxy in batch {
                if !proxy.is_visited() {
                    handle(proxy);
                }
            }
        }
    }
}
