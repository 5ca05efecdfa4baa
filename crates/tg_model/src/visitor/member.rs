use std::sync::Arc;

use tg_classfile::{AnnotationUnit, FieldUnit, MethodDescriptor, MethodUnit, TypeDescriptor};
use tracing::debug;

use crate::context::ParsingContext;
use crate::model::{
    AnnotationModel, ElementRef, FieldModel, MethodModel, ParameterModel, ParameterizedType,
    TypeNode, TypeRef,
};
use crate::signature::{resolve_field_signature, resolve_method_signature};
use crate::store::ProxyStore;
use crate::ModelError;

use super::annotation::{attach_annotations, build_annotation, element_value};

pub(super) fn visit_field(
    context: &ParsingContext,
    node: &Arc<TypeNode>,
    unit: &FieldUnit,
) -> Result<Option<Arc<FieldModel>>, ModelError> {
    let store = context.store();
    let descriptor =
        TypeDescriptor::parse(&unit.descriptor).map_err(|_| ModelError::MalformedDescriptor {
            owner: node.name().to_string(),
            member: unit.name.clone(),
            descriptor: unit.descriptor.clone(),
        })?;

    let annotations = build_annotations(store, &unit.annotations);
    if annotations.is_empty() && !context.config().model_unannotated_members {
        debug!(owner = %node.name(), field = %unit.name, "discarding unannotated field");
        return Ok(None);
    }

    let type_ref = descriptor_ref(store, &descriptor);
    let mut formal_type = None;
    let mut parameterized_arguments = Vec::new();
    if let Some(signature) = unit.signature.as_deref() {
        match resolve_field_signature(store, signature, &node.formal_type_parameters()) {
            Ok(Some(resolved)) => {
                formal_type = resolved.formal_name().map(str::to_string);
                parameterized_arguments = resolved.arguments().to_vec();
            }
            Ok(None) => {}
            Err(error) => {
                debug!(owner = %node.name(), field = %unit.name, %error, "falling back to raw field type");
            }
        }
    }

    let field = Arc::new(FieldModel {
        name: unit.name.clone(),
        declaring: Arc::downgrade(node),
        type_ref,
        formal_type,
        is_static: unit.is_static(),
        is_transient: unit.is_transient(),
        is_array: descriptor.is_array(),
        parameterized_arguments,
        annotations,
    });

    attach_annotations(&field.annotations, &ElementRef::Field(Arc::downgrade(&field)));
    if let Some(proxy) = field.type_ref.proxy() {
        proxy.add_field_reference(&field);
    }
    node.add_field(Arc::clone(&field));
    Ok(Some(field))
}

pub(super) fn visit_method(
    context: &ParsingContext,
    node: &Arc<TypeNode>,
    unit: &MethodUnit,
) -> Result<Option<Arc<MethodModel>>, ModelError> {
    let store = context.store();
    let descriptor =
        MethodDescriptor::parse(&unit.descriptor).map_err(|_| ModelError::MalformedDescriptor {
            owner: node.name().to_string(),
            member: unit.name.clone(),
            descriptor: unit.descriptor.clone(),
        })?;

    let annotations = build_annotations(store, &unit.annotations);
    let parameter_annotations: Vec<Vec<Arc<AnnotationModel>>> =
        align_parameter_annotations(&unit.parameter_annotations, descriptor.parameters.len())
            .into_iter()
            .map(|units| build_annotations(store, units))
            .collect();

    let annotated = !annotations.is_empty() || parameter_annotations.iter().any(|a| !a.is_empty());
    if !annotated && !context.config().model_unannotated_members {
        debug!(owner = %node.name(), method = %unit.name, "discarding unannotated method");
        return Ok(None);
    }

    let mut generic_parameters = Vec::new();
    let mut generic_return = None;
    let mut exceptions = Vec::new();
    if let Some(signature) = unit.signature.as_deref() {
        match resolve_method_signature(store, signature, &node.formal_type_parameters()) {
            Ok(resolved) if resolved.parameters.len() == descriptor.parameters.len() => {
                generic_parameters = resolved.parameters;
                generic_return = resolved.return_type;
                exceptions = resolved.exceptions;
            }
            // Signatures of inner-class and enum constructors omit synthetic
            // leading parameters; only the return type lines up.
            Ok(resolved) => {
                generic_return = resolved.return_type;
                exceptions = resolved.exceptions;
            }
            Err(error) => {
                debug!(owner = %node.name(), method = %unit.name, %error, "falling back to raw method types");
            }
        }
    }

    let return_type_name = descriptor.return_type.as_ref().map(TypeDescriptor::java_name);
    let return_type = generic_return.or_else(|| {
        descriptor
            .return_type
            .as_ref()
            .map(|raw| raw_parameterized(store, raw))
    });

    let method = Arc::new_cyclic(|method| {
        let parameters = descriptor
            .parameters
            .iter()
            .zip(parameter_annotations)
            .enumerate()
            .map(|(index, (raw, annotations))| {
                let parameterized = generic_parameters
                    .get_mut(index)
                    .and_then(Option::take)
                    .unwrap_or_else(|| raw_parameterized(store, raw));
                Arc::new(ParameterModel {
                    index,
                    name: unit.parameter_name(index).map(str::to_string),
                    method: method.clone(),
                    type_ref: descriptor_ref(store, raw),
                    dimensions: raw.dimensions(),
                    parameterized: Some(parameterized),
                    annotations,
                })
            })
            .collect();

        MethodModel {
            name: unit.name.clone(),
            declaring: Arc::downgrade(node),
            signature: unit.descriptor.clone(),
            generic_signature: unit.signature.clone(),
            is_static: unit.is_static(),
            parameters,
            return_type_name,
            return_type,
            exceptions,
            annotations,
        }
    });

    attach_annotations(&method.annotations, &ElementRef::Method(Arc::downgrade(&method)));
    for parameter in &method.parameters {
        attach_annotations(
            &parameter.annotations,
            &ElementRef::Parameter(Arc::downgrade(parameter)),
        );
    }
    node.add_method(Arc::clone(&method));
    Ok(Some(method))
}

/// Stores an annotation type element's default value on the type.
pub(super) fn record_default(store: &ProxyStore, node: &TypeNode, unit: &MethodUnit) {
    if let Some(default) = &unit.annotation_default {
        node.set_default_value(unit.name.clone(), element_value(store, default));
    }
}

fn build_annotations(store: &ProxyStore, units: &[AnnotationUnit]) -> Vec<Arc<AnnotationModel>> {
    units
        .iter()
        .map(|unit| build_annotation(store, unit))
        .collect()
}

/// Parameter annotation tables may be shorter or longer than the descriptor's
/// parameter list (synthetic outer-instance or enum parameters). They are
/// aligned to the trailing parameters.
fn align_parameter_annotations(
    table: &[Vec<AnnotationUnit>],
    parameters: usize,
) -> Vec<&[AnnotationUnit]> {
    (0..parameters)
        .map(|index| {
            let slot = if table.len() >= parameters {
                Some(index + table.len() - parameters)
            } else {
                index.checked_sub(parameters - table.len())
            };
            slot.and_then(|slot| table.get(slot))
                .map(Vec::as_slice)
                .unwrap_or(&[])
        })
        .collect()
}

/// Reference to a descriptor's element type; primitives get an untracked
/// reference named after the keyword.
fn descriptor_ref(store: &ProxyStore, descriptor: &TypeDescriptor) -> TypeRef {
    match descriptor.object_name() {
        Some(name) => TypeRef::new(name, store.get_or_create(name).as_ref()),
        None => TypeRef::untracked(descriptor.element_name()),
    }
}

fn raw_parameterized(store: &ProxyStore, descriptor: &TypeDescriptor) -> ParameterizedType {
    ParameterizedType::of_type(descriptor_ref(store, descriptor))
        .with_dimensions(descriptor.dimensions())
}
