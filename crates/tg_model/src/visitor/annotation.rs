use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;
use tg_classfile::{AnnotationUnit, ElementValue, TypeDescriptor};

use crate::model::{AnnotationModel, AnnotationValue, ElementRef, TypeCategory, TypeRef};
use crate::store::ProxyStore;

/// Implicit key for unnamed values.
pub(crate) const VALUE_KEY: &str = "value";

/// Collects the name/value pairs of one annotation.
///
/// Unnamed values go under [`VALUE_KEY`]; a key visited more than once turns
/// into a sequence holding every value in encounter order.
pub(crate) struct AnnotationValueBuilder<'a> {
    store: &'a ProxyStore,
    values: IndexMap<String, AnnotationValue>,
}

impl<'a> AnnotationValueBuilder<'a> {
    pub(crate) fn new(store: &'a ProxyStore) -> Self {
        Self {
            store,
            values: IndexMap::new(),
        }
    }

    pub(crate) fn visit(&mut self, name: Option<&str>, value: AnnotationValue) {
        let key = name.unwrap_or(VALUE_KEY).to_string();
        match self.values.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                AnnotationValue::Sequence(values) => values.push(value),
                existing => {
                    let first = std::mem::replace(existing, AnnotationValue::Sequence(Vec::new()));
                    *existing = AnnotationValue::Sequence(vec![first, value]);
                }
            },
        }
    }

    /// Array values always end up as a sequence, even with zero or one
    /// element.
    pub(crate) fn visit_array(&mut self, name: Option<&str>, elements: &[ElementValue]) {
        let mut nested = AnnotationValueBuilder::new(self.store);
        for element in elements {
            nested.visit_element(None, element);
        }
        let sequence = match nested.values.shift_remove(VALUE_KEY) {
            Some(AnnotationValue::Sequence(values)) => values,
            Some(single) => vec![single],
            None => Vec::new(),
        };
        self.values.insert(
            name.unwrap_or(VALUE_KEY).to_string(),
            AnnotationValue::Sequence(sequence),
        );
    }

    pub(crate) fn visit_element(&mut self, name: Option<&str>, element: &ElementValue) {
        match element {
            ElementValue::Array(elements) => self.visit_array(name, elements),
            other => {
                let value = convert(self.store, other);
                self.visit(name, value);
            }
        }
    }

    pub(crate) fn finish(self) -> IndexMap<String, AnnotationValue> {
        self.values
    }
}

/// Models one annotation occurrence. The caller attaches it to its element.
pub(crate) fn build_annotation(store: &ProxyStore, unit: &AnnotationUnit) -> Arc<AnnotationModel> {
    let type_ref = match unit.type_name() {
        Some(name) => {
            let proxy = store.get_or_create_in(&name, TypeCategory::Annotation);
            TypeRef::new(name, proxy.as_ref())
        }
        None => TypeRef::untracked(unit.descriptor.clone()),
    };
    let mut builder = AnnotationValueBuilder::new(store);
    for (name, value) in &unit.values {
        builder.visit_element(Some(name), value);
    }
    Arc::new(AnnotationModel::new(type_ref, builder.finish()))
}

/// Converts a single element value, e.g. an annotation type's default.
pub(crate) fn element_value(store: &ProxyStore, element: &ElementValue) -> AnnotationValue {
    let mut builder = AnnotationValueBuilder::new(store);
    builder.visit_element(None, element);
    builder
        .values
        .shift_remove(VALUE_KEY)
        .unwrap_or(AnnotationValue::Sequence(Vec::new()))
}

/// Attaches top-level annotations to `element` and records the element on
/// each annotation type's reverse index.
pub(crate) fn attach_annotations(annotations: &[Arc<AnnotationModel>], element: &ElementRef) {
    for annotation in annotations {
        annotation.attach(element);
        if let Some(proxy) = annotation.type_ref().proxy() {
            proxy.add_annotated_element(element.clone());
        }
    }
}

fn convert(store: &ProxyStore, element: &ElementValue) -> AnnotationValue {
    match element {
        ElementValue::Byte(v) => AnnotationValue::Byte(*v),
        ElementValue::Char(v) => AnnotationValue::Char(*v),
        ElementValue::Short(v) => AnnotationValue::Short(*v),
        ElementValue::Int(v) => AnnotationValue::Int(*v),
        ElementValue::Long(v) => AnnotationValue::Long(*v),
        ElementValue::Float(v) => AnnotationValue::Float(*v),
        ElementValue::Double(v) => AnnotationValue::Double(*v),
        ElementValue::Boolean(v) => AnnotationValue::Boolean(*v),
        ElementValue::String(v) => AnnotationValue::String(v.clone()),
        ElementValue::Enum {
            descriptor,
            constant,
        } => {
            let type_ref = match TypeDescriptor::parse(descriptor) {
                Ok(TypeDescriptor::Object(name)) => {
                    let proxy = store.get_or_create_in(&name, TypeCategory::Enum);
                    TypeRef::new(name, proxy.as_ref())
                }
                _ => TypeRef::untracked(descriptor.clone()),
            };
            AnnotationValue::Enum {
                type_ref,
                constant: constant.clone(),
            }
        }
        ElementValue::Class(descriptor) => AnnotationValue::Class(class_literal(store, descriptor)),
        ElementValue::Annotation(nested) => AnnotationValue::Annotation(build_annotation(store, nested)),
        ElementValue::Array(elements) => AnnotationValue::Sequence(
            elements.iter().map(|element| convert(store, element)).collect(),
        ),
    }
}

/// Class literals can name anything, so the category stays unknown.
fn class_literal(store: &ProxyStore, descriptor: &str) -> TypeRef {
    match TypeDescriptor::parse_return(descriptor) {
        Ok(Some(TypeDescriptor::Object(name))) => {
            let proxy = store.get_or_create(&name);
            TypeRef::new(name, proxy.as_ref())
        }
        Ok(Some(other)) => TypeRef::untracked(other.java_name()),
        Ok(None) => TypeRef::untracked("void"),
        Err(_) => TypeRef::untracked(descriptor),
    }
}
