use std::fmt;
use std::sync::{Arc, Weak};

use crate::model::{AnnotationModel, ParameterizedType, TypeNode, TypeRef};

/// A modeled field. Frozen once its declaring unit has been visited.
pub struct FieldModel {
    pub(crate) name: String,
    pub(crate) declaring: Weak<TypeNode>,
    pub(crate) type_ref: TypeRef,
    pub(crate) formal_type: Option<String>,
    pub(crate) is_static: bool,
    pub(crate) is_transient: bool,
    pub(crate) is_array: bool,
    pub(crate) parameterized_arguments: Vec<ParameterizedType>,
    pub(crate) annotations: Vec<Arc<AnnotationModel>>,
}

impl FieldModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> Option<Arc<TypeNode>> {
        self.declaring.upgrade()
    }

    /// Element type name; array dimensions are reported by [`is_array`](Self::is_array).
    pub fn type_name(&self) -> &str {
        self.type_ref.name()
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// The field's type, if its unit was visited.
    pub fn type_node(&self) -> Option<Arc<TypeNode>> {
        self.type_ref.get()
    }

    /// Type variable name when the field is declared as `T value`.
    pub fn formal_type(&self) -> Option<&str> {
        self.formal_type.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn parameterized_arguments(&self) -> &[ParameterizedType] {
        &self.parameterized_arguments
    }

    pub fn annotations(&self) -> &[Arc<AnnotationModel>] {
        &self.annotations
    }

    pub fn annotation(&self, type_name: &str) -> Option<&Arc<AnnotationModel>> {
        find_annotation(&self.annotations, type_name)
    }
}

impl fmt::Debug for FieldModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldModel")
            .field("name", &self.name)
            .field("type", &self.type_ref)
            .field("is_static", &self.is_static)
            .finish_non_exhaustive()
    }
}

pub struct MethodModel {
    pub(crate) name: String,
    pub(crate) declaring: Weak<TypeNode>,
    pub(crate) signature: String,
    pub(crate) generic_signature: Option<String>,
    pub(crate) is_static: bool,
    pub(crate) parameters: Vec<Arc<ParameterModel>>,
    pub(crate) return_type_name: Option<String>,
    pub(crate) return_type: Option<ParameterizedType>,
    pub(crate) exceptions: Vec<ParameterizedType>,
    pub(crate) annotations: Vec<Arc<AnnotationModel>>,
}

impl MethodModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> Option<Arc<TypeNode>> {
        self.declaring.upgrade()
    }

    /// Raw method descriptor, e.g. `(Ljava/lang/String;)V`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn generic_signature(&self) -> Option<&str> {
        self.generic_signature.as_deref()
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn parameters(&self) -> &[Arc<ParameterModel>] {
        &self.parameters
    }

    /// Java names of the parameter types, arrays included (`int[]`).
    pub fn argument_type_names(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|parameter| parameter.java_type_name())
            .collect()
    }

    /// `None` for `void`.
    pub fn return_type_name(&self) -> Option<&str> {
        self.return_type_name.as_deref()
    }

    /// Generic return type, or the raw descriptor's type when no usable
    /// signature was present. `None` for `void`.
    pub fn return_type(&self) -> Option<&ParameterizedType> {
        self.return_type.as_ref()
    }

    /// Thrown types named by the generic signature's throws clause. Empty
    /// when the method carries no signature.
    pub fn exceptions(&self) -> &[ParameterizedType] {
        &self.exceptions
    }

    pub fn annotations(&self) -> &[Arc<AnnotationModel>] {
        &self.annotations
    }

    pub fn annotation(&self, type_name: &str) -> Option<&Arc<AnnotationModel>> {
        find_annotation(&self.annotations, type_name)
    }
}

impl fmt::Debug for MethodModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodModel")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

pub struct ParameterModel {
    pub(crate) index: usize,
    pub(crate) name: Option<String>,
    pub(crate) method: Weak<MethodModel>,
    pub(crate) type_ref: TypeRef,
    pub(crate) dimensions: usize,
    pub(crate) parameterized: Option<ParameterizedType>,
    pub(crate) annotations: Vec<Arc<AnnotationModel>>,
}

impl ParameterModel {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Declared name when the unit recorded one, otherwise `argN`.
    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("arg{}", self.index),
        }
    }

    pub fn method(&self) -> Option<Arc<MethodModel>> {
        self.method.upgrade()
    }

    /// Element type name.
    pub fn type_name(&self) -> &str {
        self.type_ref.name()
    }

    pub fn java_type_name(&self) -> String {
        let mut name = self.type_ref.name().to_string();
        for _ in 0..self.dimensions {
            name.push_str("[]");
        }
        name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn type_node(&self) -> Option<Arc<TypeNode>> {
        self.type_ref.get()
    }

    pub fn is_array(&self) -> bool {
        self.dimensions > 0
    }

    pub fn parameterized_type(&self) -> Option<&ParameterizedType> {
        self.parameterized.as_ref()
    }

    pub fn annotations(&self) -> &[Arc<AnnotationModel>] {
        &self.annotations
    }

    pub fn annotation(&self, type_name: &str) -> Option<&Arc<AnnotationModel>> {
        find_annotation(&self.annotations, type_name)
    }
}

impl fmt::Debug for ParameterModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterModel")
            .field("index", &self.index)
            .field("type", &self.java_type_name())
            .finish_non_exhaustive()
    }
}

fn find_annotation<'a>(
    annotations: &'a [Arc<AnnotationModel>],
    type_name: &str,
) -> Option<&'a Arc<AnnotationModel>> {
    annotations
        .iter()
        .find(|annotation| annotation.type_name() == type_name)
}
