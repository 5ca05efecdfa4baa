use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use crate::model::{ElementRef, TypeNode, TypeRef};

/// One annotation occurrence on a type, member or parameter.
#[derive(Debug)]
pub struct AnnotationModel {
    type_ref: TypeRef,
    element: OnceLock<ElementRef>,
    values: IndexMap<String, AnnotationValue>,
}

impl AnnotationModel {
    pub(crate) fn new(type_ref: TypeRef, values: IndexMap<String, AnnotationValue>) -> Self {
        Self {
            type_ref,
            element: OnceLock::new(),
            values,
        }
    }

    pub fn type_name(&self) -> &str {
        self.type_ref.name()
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// The annotation type, once its own unit has been visited.
    pub fn annotation_type(&self) -> Option<Arc<TypeNode>> {
        self.type_ref.get()
    }

    /// The element this annotation is attached to. Nested annotations report
    /// the element of the outermost annotation.
    pub fn element(&self) -> Option<&ElementRef> {
        self.element.get()
    }

    pub fn values(&self) -> &IndexMap<String, AnnotationValue> {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&AnnotationValue> {
        self.values.get(key)
    }

    pub(crate) fn attach(&self, element: &ElementRef) {
        if self.element.set(element.clone()).is_err() {
            return;
        }
        for value in self.values.values() {
            value.attach(element);
        }
    }
}

/// An annotation element value.
#[derive(Debug, Clone)]
pub enum AnnotationValue {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// A class literal.
    Class(TypeRef),
    Enum { type_ref: TypeRef, constant: String },
    Annotation(Arc<AnnotationModel>),
    Sequence(Vec<AnnotationValue>),
}

impl AnnotationValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[AnnotationValue]> {
        match self {
            Self::Sequence(values) => Some(values),
            _ => None,
        }
    }

    fn attach(&self, element: &ElementRef) {
        match self {
            Self::Annotation(nested) => nested.attach(element),
            Self::Sequence(values) => values.iter().for_each(|value| value.attach(element)),
            _ => {}
        }
    }
}

impl PartialEq for AnnotationValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Short(a), Self::Short(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Class(a), Self::Class(b)) => a == b,
            (
                Self::Enum {
                    type_ref: a,
                    constant: x,
                },
                Self::Enum {
                    type_ref: b,
                    constant: y,
                },
            ) => a == b && x == y,
            (Self::Annotation(a), Self::Annotation(b)) => {
                a.type_ref == b.type_ref && a.values == b.values
            }
            (Self::Sequence(a), Self::Sequence(b)) => a == b,
            _ => false,
        }
    }
}
