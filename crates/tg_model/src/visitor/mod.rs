//! Per-unit visitation.
//!
//! A [`UnitVisitor`] is created for exactly one [`ClassUnit`] and walks it in
//! the order header, type annotations, members, end. Several visitors may run
//! concurrently against the same [`ProxyStore`](crate::ProxyStore).

pub(crate) mod annotation;
mod member;

use std::collections::HashSet;
use std::sync::Arc;

use tg_classfile::{AnnotationUnit, ClassUnit, FieldUnit, MethodUnit};
use tracing::debug;
use url::Url;

use crate::context::ParsingContext;
use crate::model::{ElementRef, FieldModel, MethodModel, TypeCategory, TypeNode, TypeRef};
use crate::proxy::TypeProxy;
use crate::signature::resolve_class_signature;
use crate::store::ROOT_TYPE;
use crate::ModelError;

use self::annotation::{attach_annotations, build_annotation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Start,
    Header,
    Members,
    Ended,
}

struct Current {
    node: Arc<TypeNode>,
    category: TypeCategory,
    deep: bool,
    /// Another unit already defined this type; only its location and
    /// supertypes are merged.
    merging: bool,
}

pub struct UnitVisitor<'a> {
    context: &'a ParsingContext,
    location: Option<Url>,
    application: bool,
    state: VisitState,
    current: Option<Current>,
}

impl<'a> UnitVisitor<'a> {
    pub(crate) fn new(context: &'a ParsingContext, location: Option<Url>, application: bool) -> Self {
        Self {
            context,
            location,
            application,
            state: VisitState::Start,
            current: None,
        }
    }

    /// Visits a whole unit. Integrity problems are reported to the context;
    /// `None` means the unit was skipped.
    pub fn accept(mut self, unit: &ClassUnit) -> Option<Arc<TypeNode>> {
        if unit.name == ROOT_TYPE {
            debug!(name = %unit.name, "skipping implicit root type");
            return None;
        }
        let node = match self.visit_header(unit) {
            Ok(node) => node,
            Err(error) => {
                self.context.report(error);
                return None;
            }
        };

        for annotation in &unit.annotations {
            if let Err(error) = self.visit_annotation(annotation) {
                self.context.report(error);
            }
        }
        for field in &unit.fields {
            if let Err(error) = self.visit_field(field) {
                self.context.report(error);
            }
        }
        for method in &unit.methods {
            if let Err(error) = self.visit_method(method) {
                self.context.report(error);
            }
        }
        if let Err(error) = self.visit_end() {
            self.context.report(error);
        }
        Some(node)
    }

    /// Resolves the unit's own node and wires its supertypes.
    pub fn visit_header(&mut self, unit: &ClassUnit) -> Result<Arc<TypeNode>, ModelError> {
        self.expect_state(&[VisitState::Start], "visit_header")?;
        let category = TypeCategory::from_access(unit.access);
        let context = self.context;
        let proxy = context.store().define(&unit.name, category)?;
        let node = proxy.node_or_init(|| TypeNode::new(&unit.name, category, &proxy));

        let claim = node
            .claim(&proxy, category)
            .map_err(|existing| ModelError::CategoryConflict {
                name: unit.name.clone(),
                existing,
                requested: category,
            })?;
        if claim.refined {
            debug!(name = %unit.name, category = %category, "refined placeholder category");
        }
        if !claim.first {
            debug!(name = %unit.name, "merging another definition of an already visited type");
        }
        if let Some(location) = &self.location {
            node.add_location(location.clone());
        }
        if self.application {
            node.mark_application();
        }

        if category.is_extensible() {
            if let Some(super_name) = unit.super_name.as_deref() {
                if let Err(error) = self.wire_parent(&node, super_name) {
                    self.context.report(error);
                }
            }
            self.wire_interfaces(&node, category, unit);
        }

        self.current = Some(Current {
            node: Arc::clone(&node),
            category,
            deep: self.context.config().always_deep(),
            merging: !claim.first,
        });
        self.state = VisitState::Header;
        Ok(node)
    }

    fn wire_parent(&self, node: &Arc<TypeNode>, super_name: &str) -> Result<(), ModelError> {
        let store = self.context.store();
        let Some(parent) = store.get_or_create_in(super_name, TypeCategory::Class) else {
            return Ok(());
        };
        if super_name == node.name() || inherits_from(&parent, node.name()) {
            return Err(ModelError::CyclicInheritance {
                name: node.name().to_string(),
                parent: super_name.to_string(),
            });
        }

        // Queries made before the parent's own unit arrives still see a
        // named ancestor.
        parent.node_or_init(|| TypeNode::new(super_name, TypeCategory::Class, &parent));
        if !node.set_parent(TypeRef::new(super_name, Some(&parent)))
            && node.parent_name().as_deref() != Some(super_name)
        {
            debug!(name = %node.name(), parent = super_name, "keeping the first definition's superclass");
            return Ok(());
        }
        parent.add_sub_type(node);
        Ok(())
    }

    fn wire_interfaces(&self, node: &Arc<TypeNode>, category: TypeCategory, unit: &ClassUnit) {
        let store = self.context.store();
        for interface in &unit.interfaces {
            let proxy = store.get_or_create_in(interface, TypeCategory::Interface);
            if let Some(proxy) = &proxy {
                if category == TypeCategory::Interface {
                    proxy.add_sub_type(node);
                } else {
                    proxy.add_implementation(node);
                }
            }
            node.add_interface(TypeRef::new(interface.clone(), proxy.as_ref()));
        }

        let Some(signature) = unit.signature.as_deref() else {
            return;
        };
        match resolve_class_signature(store, signature) {
            Ok(resolved) => {
                if let Some(superclass) = resolved.superclass {
                    node.set_parameterized_parent(superclass);
                }
                for interface in resolved.interfaces {
                    node.add_parameterized_interface(interface);
                }
                node.set_formal_type_parameters(resolved.formals);
            }
            Err(error) => {
                debug!(name = %unit.name, %error, "ignoring malformed class signature");
            }
        }
    }

    /// Attaches an annotation to the type itself. Seeing an annotation of
    /// interest turns on member visitation.
    pub fn visit_annotation(&mut self, unit: &AnnotationUnit) -> Result<(), ModelError> {
        self.expect_state(&[VisitState::Header], "visit_annotation")?;
        let context = self.context;
        let current = self.current_mut()?;
        if current.merging {
            return Ok(());
        }

        let annotation = build_annotation(context.store(), unit);
        attach_annotations(
            std::slice::from_ref(&annotation),
            &ElementRef::Type(Arc::downgrade(&current.node)),
        );
        if !current.deep && context.config().is_of_interest(annotation.type_name()) {
            debug!(
                name = %current.node.name(),
                annotation = %annotation.type_name(),
                "annotation of interest, visiting members"
            );
            current.deep = true;
        }
        current.node.add_annotation(annotation);
        Ok(())
    }

    /// Returns the modeled field, or `None` when it was not kept.
    pub fn visit_field(&mut self, field: &FieldUnit) -> Result<Option<Arc<FieldModel>>, ModelError> {
        self.enter_members("visit_field")?;
        let current = self.current()?;
        if current.merging || !current.deep || field.is_synthetic() {
            return Ok(None);
        }
        if current.category == TypeCategory::Annotation {
            if field.is_static() {
                debug!(owner = %current.node.name(), field = %field.name, "skipping annotation type constant");
                return Ok(None);
            }
            return Err(ModelError::UnsupportedMember {
                owner: current.node.name().to_string(),
                member: field.name.clone(),
            });
        }
        member::visit_field(self.context, &current.node, field)
    }

    /// Returns the modeled method, or `None` when it was not kept.
    ///
    /// Annotation element defaults are recorded even when the method itself
    /// is not kept.
    pub fn visit_method(
        &mut self,
        method: &MethodUnit,
    ) -> Result<Option<Arc<MethodModel>>, ModelError> {
        self.enter_members("visit_method")?;
        let current = self.current()?;
        if current.merging || method.is_synthetic() || method.is_initializer() {
            return Ok(None);
        }
        if current.category == TypeCategory::Annotation {
            member::record_default(self.context.store(), &current.node, method);
        }
        if !current.deep {
            return Ok(None);
        }
        member::visit_method(self.context, &current.node, method)
    }

    pub fn visit_end(&mut self) -> Result<Arc<TypeNode>, ModelError> {
        self.expect_state(&[VisitState::Header, VisitState::Members], "visit_end")?;
        let node = Arc::clone(&self.current()?.node);
        self.state = VisitState::Ended;
        Ok(node)
    }

    fn enter_members(&mut self, operation: &str) -> Result<(), ModelError> {
        self.expect_state(&[VisitState::Header, VisitState::Members], operation)?;
        self.state = VisitState::Members;
        Ok(())
    }

    fn expect_state(&self, allowed: &[VisitState], operation: &str) -> Result<(), ModelError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ModelError::VisitorMisuse {
                reason: format!("{operation} called in state {:?}", self.state),
            })
        }
    }

    fn current(&self) -> Result<&Current, ModelError> {
        self.current.as_ref().ok_or_else(|| ModelError::VisitorMisuse {
            reason: "no unit header has been visited".to_string(),
        })
    }

    fn current_mut(&mut self) -> Result<&mut Current, ModelError> {
        self.current.as_mut().ok_or_else(|| ModelError::VisitorMisuse {
            reason: "no unit header has been visited".to_string(),
        })
    }
}

/// Whether the chain of superclasses starting at `start` reaches `name`.
fn inherits_from(start: &Arc<TypeProxy>, name: &str) -> bool {
    let mut seen = HashSet::new();
    let mut current = start.node();
    while let Some(node) = current {
        if node.name() == name {
            return true;
        }
        if !seen.insert(node.name().to_string()) {
            return false;
        }
        current = node.parent();
    }
    false
}
