use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use url::Url;

use crate::model::sync::SyncList;
use crate::model::{
    AnnotationModel, AnnotationValue, Element, ElementRef, FieldModel, MethodModel,
    ParameterizedType, TypeRef,
};
use crate::proxy::TypeProxy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory {
    Class,
    Interface,
    Annotation,
    Enum,
}

impl TypeCategory {
    /// Annotation beats interface, which beats enum, which beats class.
    pub fn from_access(access: u16) -> Self {
        use tg_classfile::access::{ACC_ANNOTATION, ACC_ENUM, ACC_INTERFACE};
        if access & ACC_ANNOTATION != 0 {
            Self::Annotation
        } else if access & ACC_INTERFACE != 0 {
            Self::Interface
        } else if access & ACC_ENUM != 0 {
            Self::Enum
        } else {
            Self::Class
        }
    }

    pub fn pool(self) -> TypePool {
        match self {
            Self::Class | Self::Enum => TypePool::Class,
            Self::Interface => TypePool::Interface,
            Self::Annotation => TypePool::Annotation,
        }
    }

    pub fn is_extensible(self) -> bool {
        self != Self::Annotation
    }
}

impl fmt::Display for TypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Annotation => "annotation",
            Self::Enum => "enum",
        })
    }
}

/// Proxy pools. Enums live with classes: a superclass reference cannot tell
/// whether its target is an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePool {
    Class,
    Interface,
    Annotation,
}

impl TypePool {
    pub const ALL: [TypePool; 3] = [Self::Class, Self::Interface, Self::Annotation];

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Class => 0,
            Self::Interface => 1,
            Self::Annotation => 2,
        }
    }
}

/// A class, interface, enum or annotation type.
///
/// Nodes are shared between the visitors of every unit that mentions them, so
/// all collections are internally synchronized and append-only.
pub struct TypeNode {
    name: String,
    category: RwLock<TypeCategory>,
    proxy: Weak<TypeProxy>,
    locations: SyncList<Url>,
    application: AtomicBool,
    annotations: SyncList<Arc<AnnotationModel>>,
    methods: SyncList<Arc<MethodModel>>,
    body: TypeBody,
}

enum TypeBody {
    Extensible(ExtensibleParts),
    Annotation(AnnotationParts),
}

#[derive(Default)]
struct ExtensibleParts {
    parent: RwLock<Option<TypeRef>>,
    parameterized_parent: RwLock<Option<ParameterizedType>>,
    interfaces: SyncList<TypeRef>,
    parameterized_interfaces: SyncList<ParameterizedType>,
    fields: SyncList<Arc<FieldModel>>,
    static_fields: SyncList<Arc<FieldModel>>,
    formal_type_parameters: RwLock<IndexMap<String, ParameterizedType>>,
}

#[derive(Default)]
struct AnnotationParts {
    default_values: RwLock<IndexMap<String, AnnotationValue>>,
}

impl TypeNode {
    pub(crate) fn new(name: &str, category: TypeCategory, proxy: &Arc<TypeProxy>) -> Self {
        let body = if category.is_extensible() {
            TypeBody::Extensible(ExtensibleParts::default())
        } else {
            TypeBody::Annotation(AnnotationParts::default())
        };
        Self {
            name: name.to_string(),
            category: RwLock::new(category),
            proxy: Arc::downgrade(proxy),
            locations: SyncList::default(),
            application: AtomicBool::new(false),
            annotations: SyncList::default(),
            methods: SyncList::default(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> TypeCategory {
        *self.category.read()
    }

    pub fn proxy(&self) -> Option<Arc<TypeProxy>> {
        self.proxy.upgrade()
    }

    /// Whether this node's own unit has been visited, as opposed to a
    /// placeholder installed for an ancestor.
    pub fn is_visited(&self) -> bool {
        self.proxy().is_some_and(|proxy| proxy.is_visited())
    }

    pub fn is_extensible(&self) -> bool {
        matches!(self.body, TypeBody::Extensible(_))
    }

    pub fn is_annotation_type(&self) -> bool {
        matches!(self.body, TypeBody::Annotation(_))
    }

    pub fn locations(&self) -> Vec<Url> {
        self.locations.snapshot()
    }

    pub fn was_defined_in(&self, locations: &[Url]) -> bool {
        self.locations
            .find(|location| locations.contains(location))
            .is_some()
    }

    /// Types parsed from the analyzed inputs, as opposed to types pulled in
    /// from a classpath while reconciling.
    pub fn is_application_type(&self) -> bool {
        self.application.load(Ordering::Acquire)
    }

    pub fn annotations(&self) -> Vec<Arc<AnnotationModel>> {
        self.annotations.snapshot()
    }

    pub fn annotation(&self, type_name: &str) -> Option<Arc<AnnotationModel>> {
        self.annotations
            .find(|annotation| annotation.type_name() == type_name)
    }

    pub fn methods(&self) -> Vec<Arc<MethodModel>> {
        self.methods.snapshot()
    }

    /// Finds a method by name and argument type names (`int[]`, `java.lang.String`).
    pub fn method(&self, name: &str, argument_types: &[&str]) -> Option<Arc<MethodModel>> {
        self.methods.find(|method| {
            method.name() == name && method.argument_type_names() == argument_types
        })
    }

    /// Fields of this type's kind declared anywhere in the graph.
    pub fn field_references(&self) -> Vec<Arc<FieldModel>> {
        self.proxy()
            .map(|proxy| proxy.field_references())
            .unwrap_or_default()
    }

    pub fn parent_ref(&self) -> Option<TypeRef> {
        self.extensible()
            .and_then(|parts| parts.parent.read().clone())
    }

    pub fn parent_name(&self) -> Option<String> {
        self.parent_ref().map(|parent| parent.name().to_string())
    }

    /// The superclass node. May be a placeholder if the superclass unit has not
    /// been visited; `None` for roots and unmodeled parents.
    pub fn parent(&self) -> Option<Arc<TypeNode>> {
        self.parent_ref().and_then(|parent| parent.node())
    }

    /// The superclass with its type arguments, when the unit carried a
    /// generic signature naming one other than the root type.
    pub fn parameterized_parent(&self) -> Option<ParameterizedType> {
        self.extensible()
            .and_then(|parts| parts.parameterized_parent.read().clone())
    }

    pub fn interfaces(&self) -> Vec<TypeRef> {
        self.extensible()
            .map(|parts| parts.interfaces.snapshot())
            .unwrap_or_default()
    }

    pub fn parameterized_interfaces(&self) -> Vec<ParameterizedType> {
        self.extensible()
            .map(|parts| parts.parameterized_interfaces.snapshot())
            .unwrap_or_default()
    }

    pub fn parameterized_interface(&self, type_name: &str) -> Option<ParameterizedType> {
        self.extensible().and_then(|parts| {
            parts
                .parameterized_interfaces
                .find(|interface| interface.type_name() == Some(type_name))
        })
    }

    /// Instance fields.
    pub fn fields(&self) -> Vec<Arc<FieldModel>> {
        self.extensible()
            .map(|parts| parts.fields.snapshot())
            .unwrap_or_default()
    }

    pub fn static_fields(&self) -> Vec<Arc<FieldModel>> {
        self.extensible()
            .map(|parts| parts.static_fields.snapshot())
            .unwrap_or_default()
    }

    /// Looks up an instance or static field.
    pub fn field(&self, name: &str) -> Option<Arc<FieldModel>> {
        let parts = self.extensible()?;
        parts
            .fields
            .find(|field| field.name() == name)
            .or_else(|| parts.static_fields.find(|field| field.name() == name))
    }

    pub fn formal_type_parameters(&self) -> IndexMap<String, ParameterizedType> {
        self.extensible()
            .map(|parts| parts.formal_type_parameters.read().clone())
            .unwrap_or_default()
    }

    /// Direct subclasses, or direct sub-interfaces for an interface.
    pub fn sub_types(&self) -> Vec<Arc<TypeNode>> {
        self.proxy()
            .map(|proxy| proxy.sub_types())
            .unwrap_or_default()
    }

    /// Transitive subtypes, each reported once. Terminates on cyclic data.
    pub fn all_sub_types(&self) -> Vec<Arc<TypeNode>> {
        let mut seen = HashSet::from([self.name.clone()]);
        let mut result = Vec::new();
        let mut queue: VecDeque<_> = self.sub_types().into();
        while let Some(node) = queue.pop_front() {
            if !seen.insert(node.name.clone()) {
                continue;
            }
            queue.extend(node.sub_types());
            result.push(node);
        }
        result
    }

    /// Classes declaring this interface directly.
    pub fn implementations(&self) -> Vec<Arc<TypeNode>> {
        self.proxy()
            .map(|proxy| proxy.implementations())
            .unwrap_or_default()
    }

    /// Every class that is an instance of this interface: direct
    /// implementors, implementors of sub-interfaces, and their subclasses.
    pub fn all_implementations(&self) -> Vec<Arc<TypeNode>> {
        let mut seen_interfaces = HashSet::from([self.name.clone()]);
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut interfaces = VecDeque::from([self.implementations_and_sub_interfaces()]);

        while let Some((implementations, sub_interfaces)) = interfaces.pop_front() {
            for implementation in implementations {
                let descendants = implementation.all_sub_types();
                for node in std::iter::once(implementation).chain(descendants) {
                    if seen.insert(node.name.clone()) {
                        result.push(node);
                    }
                }
            }
            for interface in sub_interfaces {
                if seen_interfaces.insert(interface.name.clone()) {
                    interfaces.push_back(interface.implementations_and_sub_interfaces());
                }
            }
        }
        result
    }

    fn implementations_and_sub_interfaces(&self) -> (Vec<Arc<TypeNode>>, Vec<Arc<TypeNode>>) {
        (self.implementations(), self.sub_types())
    }

    /// Whether this type is `type_name` or inherits from it through
    /// superclasses or interfaces. Unvisited ancestors match by name.
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        if self.name == type_name {
            return true;
        }
        let mut seen = HashSet::new();
        let mut queue: VecDeque<TypeRef> = self.supertype_refs().into();
        while let Some(supertype) = queue.pop_front() {
            if supertype.name() == type_name {
                return true;
            }
            if !seen.insert(supertype.name().to_string()) {
                continue;
            }
            if let Some(node) = supertype.node() {
                queue.extend(node.supertype_refs());
            }
        }
        false
    }

    fn supertype_refs(&self) -> Vec<TypeRef> {
        let mut refs: Vec<TypeRef> = self.parent_ref().into_iter().collect();
        refs.extend(self.interfaces());
        refs
    }

    /// Declared defaults of an annotation type's elements.
    pub fn default_values(&self) -> IndexMap<String, AnnotationValue> {
        match &self.body {
            TypeBody::Annotation(parts) => parts.default_values.read().clone(),
            TypeBody::Extensible(_) => IndexMap::new(),
        }
    }

    pub fn default_value(&self, element: &str) -> Option<AnnotationValue> {
        match &self.body {
            TypeBody::Annotation(parts) => parts.default_values.read().get(element).cloned(),
            TypeBody::Extensible(_) => None,
        }
    }

    /// Elements annotated with this annotation type.
    pub fn annotated_elements(&self) -> Vec<ElementRef> {
        self.proxy()
            .map(|proxy| proxy.annotated_elements())
            .unwrap_or_default()
    }

    /// Types carrying this annotation directly or through annotation types
    /// that are themselves annotated with it.
    pub fn all_annotated_types(&self) -> Vec<Arc<TypeNode>> {
        let mut seen = HashSet::from([self.name.clone()]);
        let mut result = Vec::new();
        let mut queue = VecDeque::from([self.annotated_elements()]);

        while let Some(elements) = queue.pop_front() {
            for element in elements.iter().filter_map(ElementRef::upgrade) {
                let Element::Type(node) = element else {
                    continue;
                };
                if !seen.insert(node.name.clone()) {
                    continue;
                }
                if node.is_annotation_type() {
                    queue.push_back(node.annotated_elements());
                } else {
                    result.push(node);
                }
            }
        }
        result
    }

    fn extensible(&self) -> Option<&ExtensibleParts> {
        match &self.body {
            TypeBody::Extensible(parts) => Some(parts),
            TypeBody::Annotation(_) => None,
        }
    }

    // Mutation, used by the unit visitor.

    /// Marks this node's unit as visited with `category`.
    ///
    /// A placeholder may still move between extensible categories; a visited
    /// node keeps the category of its first definition. The check and the
    /// transition happen under the category lock so concurrent definitions
    /// cannot both refine. Returns whether this call performed the first
    /// visit, or the existing category on conflict.
    pub(crate) fn claim(
        &self,
        proxy: &TypeProxy,
        category: TypeCategory,
    ) -> Result<Claim, TypeCategory> {
        let mut current = self.category.write();
        let mut refined = false;
        if *current != category {
            if proxy.is_visited() || self.is_extensible() != category.is_extensible() {
                return Err(*current);
            }
            *current = category;
            refined = true;
        }
        Ok(Claim {
            first: proxy.mark_visited(),
            refined,
        })
    }

    pub(crate) fn add_location(&self, location: Url) {
        self.locations.push_unless(location, |a, b| a == b);
    }

    pub(crate) fn mark_application(&self) {
        self.application.store(true, Ordering::Release);
    }

    pub(crate) fn add_annotation(&self, annotation: Arc<AnnotationModel>) {
        self.annotations.push(annotation);
    }

    pub(crate) fn add_method(&self, method: Arc<MethodModel>) {
        self.methods.push(method);
    }

    /// Installs the parent unless one is already present. Returns whether it
    /// was installed.
    pub(crate) fn set_parent(&self, parent: TypeRef) -> bool {
        let Some(parts) = self.extensible() else {
            return false;
        };
        let mut slot = parts.parent.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(parent);
        true
    }

    pub(crate) fn set_parameterized_parent(&self, parent: ParameterizedType) {
        if let Some(parts) = self.extensible() {
            parts.parameterized_parent.write().get_or_insert(parent);
        }
    }

    pub(crate) fn add_interface(&self, interface: TypeRef) {
        if let Some(parts) = self.extensible() {
            parts.interfaces.push_unless(interface, |a, b| a == b);
        }
    }

    pub(crate) fn add_parameterized_interface(&self, interface: ParameterizedType) {
        if let Some(parts) = self.extensible() {
            parts
                .parameterized_interfaces
                .push_unless(interface, |a, b| a == b);
        }
    }

    pub(crate) fn set_formal_type_parameters(&self, formals: IndexMap<String, ParameterizedType>) {
        if let Some(parts) = self.extensible() {
            let mut slot = parts.formal_type_parameters.write();
            for (name, bound) in formals {
                slot.entry(name).or_insert(bound);
            }
        }
    }

    pub(crate) fn add_field(&self, field: Arc<FieldModel>) {
        if let Some(parts) = self.extensible() {
            if field.is_static() {
                parts.static_fields.push(field);
            } else {
                parts.fields.push(field);
            }
        }
    }

    pub(crate) fn set_default_value(&self, element: String, value: AnnotationValue) {
        if let TypeBody::Annotation(parts) = &self.body {
            parts.default_values.write().entry(element).or_insert(value);
        }
    }
}

/// Outcome of [`TypeNode::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Claim {
    /// No earlier unit defined this type.
    pub(crate) first: bool,
    /// A placeholder's category was changed.
    pub(crate) refined: bool,
}

impl fmt::Debug for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeNode")
            .field("name", &self.name)
            .field("category", &self.category())
            .finish_non_exhaustive()
    }
}
