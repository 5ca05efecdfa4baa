use std::fmt;
use std::sync::{Arc, Weak};

use crate::model::{AnnotationModel, FieldModel, MethodModel, ParameterModel, TypeNode};
use crate::proxy::TypeProxy;

/// A named reference to a type.
///
/// The name is always available. The proxy handle is absent for primitives,
/// `void`, and the implicit root type, which the store never tracks.
#[derive(Clone)]
pub struct TypeRef {
    name: String,
    proxy: Option<Weak<TypeProxy>>,
}

impl TypeRef {
    pub fn new(name: impl Into<String>, proxy: Option<&Arc<TypeProxy>>) -> Self {
        Self {
            name: name.into(),
            proxy: proxy.map(Arc::downgrade),
        }
    }

    /// A reference with no proxy behind it.
    pub fn untracked(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proxy(&self) -> Option<Arc<TypeProxy>> {
        self.proxy.as_ref().and_then(Weak::upgrade)
    }

    /// The visited node behind this reference.
    pub fn get(&self) -> Option<Arc<TypeNode>> {
        self.proxy().and_then(|proxy| proxy.get())
    }

    /// The node behind this reference, including placeholders installed for
    /// ancestors that have not been visited yet.
    pub fn node(&self) -> Option<Arc<TypeNode>> {
        self.proxy().and_then(|proxy| proxy.node())
    }

    pub fn is_resolved(&self) -> bool {
        self.get().is_some()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TypeRef {}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.name).finish()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Weak handle to an element that can carry annotations.
#[derive(Clone)]
pub enum ElementRef {
    Type(Weak<TypeNode>),
    Field(Weak<FieldModel>),
    Method(Weak<MethodModel>),
    Parameter(Weak<ParameterModel>),
}

/// Upgraded form of an [`ElementRef`].
#[derive(Clone)]
pub enum Element {
    Type(Arc<TypeNode>),
    Field(Arc<FieldModel>),
    Method(Arc<MethodModel>),
    Parameter(Arc<ParameterModel>),
}

impl ElementRef {
    pub fn upgrade(&self) -> Option<Element> {
        match self {
            Self::Type(node) => node.upgrade().map(Element::Type),
            Self::Field(field) => field.upgrade().map(Element::Field),
            Self::Method(method) => method.upgrade().map(Element::Method),
            Self::Parameter(parameter) => parameter.upgrade().map(Element::Parameter),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Type(a), Self::Type(b)) => Weak::ptr_eq(a, b),
            (Self::Field(a), Self::Field(b)) => Weak::ptr_eq(a, b),
            (Self::Method(a), Self::Method(b)) => Weak::ptr_eq(a, b),
            (Self::Parameter(a), Self::Parameter(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(element) => write!(f, "ElementRef({})", element.name()),
            None => f.write_str("ElementRef(<dropped>)"),
        }
    }
}

impl Element {
    pub fn name(&self) -> String {
        match self {
            Self::Type(node) => node.name().to_string(),
            Self::Field(field) => field.name().to_string(),
            Self::Method(method) => method.name().to_string(),
            Self::Parameter(parameter) => parameter.name(),
        }
    }

    pub fn annotations(&self) -> Vec<Arc<AnnotationModel>> {
        match self {
            Self::Type(node) => node.annotations(),
            Self::Field(field) => field.annotations().to_vec(),
            Self::Method(method) => method.annotations().to_vec(),
            Self::Parameter(parameter) => parameter.annotations().to_vec(),
        }
    }

    /// The type itself, or the type declaring the member.
    pub fn declaring_type(&self) -> Option<Arc<TypeNode>> {
        match self {
            Self::Type(node) => Some(Arc::clone(node)),
            Self::Field(field) => field.declaring_type(),
            Self::Method(method) => method.declaring_type(),
            Self::Parameter(parameter) => parameter.method().and_then(|m| m.declaring_type()),
        }
    }

    pub fn as_type(&self) -> Option<&Arc<TypeNode>> {
        match self {
            Self::Type(node) => Some(node),
            _ => None,
        }
    }
}
