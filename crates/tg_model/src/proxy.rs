use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use crate::model::sync::SyncList;
use crate::model::{ElementRef, FieldModel, TypeCategory, TypeNode};

/// Forward-reference handle for one type name.
///
/// A proxy exists for every name that was ever referenced. It collects reverse
/// references from the moment it is created, long before (or without ever)
/// the named type's own unit being visited.
pub struct TypeProxy {
    name: String,
    category: RwLock<Option<TypeCategory>>,
    node: OnceLock<Arc<TypeNode>>,
    visited: AtomicBool,
    annotated_elements: SyncList<ElementRef>,
    field_refs: SyncList<Weak<FieldModel>>,
    sub_type_refs: SyncList<Weak<TypeNode>>,
    implementations: SyncList<Weak<TypeNode>>,
}

impl TypeProxy {
    pub(crate) fn new(name: &str, category: Option<TypeCategory>) -> Self {
        Self {
            name: name.to_string(),
            category: RwLock::new(category),
            node: OnceLock::new(),
            visited: AtomicBool::new(false),
            annotated_elements: SyncList::default(),
            field_refs: SyncList::default(),
            sub_type_refs: SyncList::default(),
            implementations: SyncList::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The category as far as it is known.
    pub fn category(&self) -> Option<TypeCategory> {
        *self.category.read()
    }

    pub fn is_visited(&self) -> bool {
        self.visited.load(Ordering::Acquire)
    }

    /// The node, once this type's own unit has been visited.
    pub fn get(&self) -> Option<Arc<TypeNode>> {
        if self.is_visited() {
            self.node.get().cloned()
        } else {
            None
        }
    }

    /// The node, including a placeholder installed before the visit.
    pub fn node(&self) -> Option<Arc<TypeNode>> {
        self.node.get().cloned()
    }

    pub fn annotated_elements(&self) -> Vec<ElementRef> {
        self.annotated_elements.snapshot()
    }

    pub fn field_references(&self) -> Vec<Arc<FieldModel>> {
        upgrade_all(&self.field_refs)
    }

    pub fn sub_types(&self) -> Vec<Arc<TypeNode>> {
        upgrade_all(&self.sub_type_refs)
    }

    pub fn implementations(&self) -> Vec<Arc<TypeNode>> {
        upgrade_all(&self.implementations)
    }

    /// Returns the installed node, creating it with `init` if this is the
    /// first writer. Concurrent callers all observe the winner.
    pub(crate) fn node_or_init(&self, init: impl FnOnce() -> TypeNode) -> Arc<TypeNode> {
        Arc::clone(self.node.get_or_init(|| Arc::new(init())))
    }

    /// Returns whether this call performed the transition.
    pub(crate) fn mark_visited(&self) -> bool {
        !self.visited.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn set_category(&self, category: TypeCategory) {
        *self.category.write() = Some(category);
    }

    pub(crate) fn add_annotated_element(&self, element: ElementRef) {
        self.annotated_elements
            .push_unless(element, |a, b| a.ptr_eq(b));
    }

    pub(crate) fn add_field_reference(&self, field: &Arc<FieldModel>) {
        self.field_refs
            .push_unless(Arc::downgrade(field), Weak::ptr_eq);
    }

    pub(crate) fn add_sub_type(&self, node: &Arc<TypeNode>) {
        self.sub_type_refs
            .push_unless(Arc::downgrade(node), Weak::ptr_eq);
    }

    pub(crate) fn add_implementation(&self, node: &Arc<TypeNode>) {
        self.implementations
            .push_unless(Arc::downgrade(node), Weak::ptr_eq);
    }
}

fn upgrade_all<T>(refs: &SyncList<Weak<T>>) -> Vec<Arc<T>> {
    refs.snapshot().iter().filter_map(Weak::upgrade).collect()
}

impl fmt::Debug for TypeProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeProxy")
            .field("name", &self.name)
            .field("category", &self.category())
            .field("visited", &self.is_visited())
            .finish_non_exhaustive()
    }
}
