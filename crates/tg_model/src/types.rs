use std::sync::Arc;

use crate::model::{TypeCategory, TypeNode};
use crate::proxy::TypeProxy;
use crate::store::ProxyStore;

/// Read-only queries over a built graph.
///
/// Only visited types are reported; names that were referenced but never
/// visited are reachable through [`proxy`](Self::proxy) and
/// [`unresolved_names`](Self::unresolved_names).
#[derive(Clone)]
pub struct Types {
    store: Arc<ProxyStore>,
}

impl Types {
    pub fn new(store: Arc<ProxyStore>) -> Self {
        Self { store }
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<TypeNode>> {
        self.store.lookup(name).and_then(|proxy| proxy.get())
    }

    /// `None` when the type is missing or of another category.
    pub fn get_by_name_as(&self, name: &str, category: TypeCategory) -> Option<Arc<TypeNode>> {
        self.get_by_name(name)
            .filter(|node| node.category() == category)
    }

    /// Every visited type, once each, in no particular order.
    pub fn all_types(&self) -> Vec<Arc<TypeNode>> {
        self.store
            .proxies()
            .into_iter()
            .filter_map(|proxy| proxy.get())
            .collect()
    }

    pub fn proxy(&self, name: &str) -> Option<Arc<TypeProxy>> {
        self.store.lookup(name)
    }

    /// Names referenced somewhere but never visited, sorted.
    pub fn unresolved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .store
            .proxies()
            .into_iter()
            .filter(|proxy| !proxy.is_visited())
            .map(|proxy| proxy.name().to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Types directly annotated with `annotation`.
    pub fn annotated_with(&self, annotation: &str) -> Vec<Arc<TypeNode>> {
        let Some(proxy) = self.store.lookup(annotation) else {
            return Vec::new();
        };
        proxy
            .annotated_elements()
            .iter()
            .filter_map(|element| element.upgrade())
            .filter_map(|element| element.as_type().cloned())
            .collect()
    }

    /// Every class that is an instance of `interface`. Works for interfaces
    /// that were never visited, from the implementations recorded on their
    /// proxy.
    pub fn implementations_of(&self, interface: &str) -> Vec<Arc<TypeNode>> {
        let Some(proxy) = self.store.lookup(interface) else {
            return Vec::new();
        };
        if let Some(node) = proxy.node() {
            return node.all_implementations();
        }
        let mut result: Vec<Arc<TypeNode>> = Vec::new();
        for implementation in proxy.implementations() {
            let descendants = implementation.all_sub_types();
            for node in std::iter::once(implementation).chain(descendants) {
                if !result.iter().any(|known| Arc::ptr_eq(known, &node)) {
                    result.push(node);
                }
            }
        }
        result
    }

    /// Number of visited types.
    pub fn len(&self) -> usize {
        self.store
            .proxies()
            .iter()
            .filter(|proxy| proxy.is_visited())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
