//! Resolves generic signatures into [`ParameterizedType`] trees.
//!
//! Class types are resolved against the [`ProxyStore`] as they are read, so a
//! generic argument naming a type that has not been visited yet still gets a
//! proxy and becomes navigable once its unit arrives.

use indexmap::IndexMap;
use tg_classfile::{SignatureError, SignatureReader, SignatureVisitor};
use tracing::trace;

use crate::model::{ParameterizedType, TypeCategory, TypeRef};
use crate::store::{ProxyStore, ROOT_TYPE};

pub(crate) type Formals = IndexMap<String, ParameterizedType>;

/// Generic data of a class signature.
#[derive(Debug, Default)]
pub(crate) struct ClassSignature {
    pub(crate) superclass: Option<ParameterizedType>,
    pub(crate) interfaces: Vec<ParameterizedType>,
    pub(crate) formals: Formals,
}

/// Generic data of a method signature. Parameter slots the signature could
/// not express (primitives, `Object`) are `None`.
#[derive(Debug, Default)]
pub(crate) struct MethodSignature {
    pub(crate) parameters: Vec<Option<ParameterizedType>>,
    pub(crate) return_type: Option<ParameterizedType>,
    pub(crate) exceptions: Vec<ParameterizedType>,
}

pub(crate) fn resolve_class_signature(
    store: &ProxyStore,
    signature: &str,
) -> Result<ClassSignature, SignatureError> {
    let mut resolver = SignatureResolver::new(store, None);
    SignatureReader::new(signature).accept_class(&mut resolver)?;
    Ok(ClassSignature {
        superclass: resolver.superclass,
        interfaces: resolver.interfaces,
        formals: resolver.formals,
    })
}

/// `owner_formals` are the declaring type's formal parameters, consulted for
/// type variables the method does not declare itself.
pub(crate) fn resolve_method_signature(
    store: &ProxyStore,
    signature: &str,
    owner_formals: &Formals,
) -> Result<MethodSignature, SignatureError> {
    let mut resolver = SignatureResolver::new(store, Some(owner_formals));
    SignatureReader::new(signature).accept_method(&mut resolver)?;
    Ok(MethodSignature {
        parameters: resolver.parameters,
        return_type: resolver.return_type,
        exceptions: resolver.exceptions,
    })
}

pub(crate) fn resolve_field_signature(
    store: &ProxyStore,
    signature: &str,
    owner_formals: &Formals,
) -> Result<Option<ParameterizedType>, SignatureError> {
    let mut resolver = SignatureResolver::new(store, Some(owner_formals));
    resolver.position = Position::Field;
    SignatureReader::new(signature).accept_type(&mut resolver)?;
    Ok(resolver.field)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Unset,
    ClassBound,
    InterfaceBound,
    Superclass,
    Interface,
    Parameter,
    Return,
    Exception,
    Field,
}

enum Frame {
    Node(ParameterizedType),
    /// The root type, which never becomes a node. Its closing event still has
    /// to be matched.
    Skipped,
}

struct SignatureResolver<'a> {
    store: &'a ProxyStore,
    inherited: Option<&'a Formals>,
    formals: Formals,
    pending_formal: Option<String>,
    position: Position,
    stack: Vec<Frame>,
    dimensions: usize,

    superclass: Option<ParameterizedType>,
    interfaces: Vec<ParameterizedType>,
    parameters: Vec<Option<ParameterizedType>>,
    return_type: Option<ParameterizedType>,
    exceptions: Vec<ParameterizedType>,
    field: Option<ParameterizedType>,
}

impl<'a> SignatureResolver<'a> {
    fn new(store: &'a ProxyStore, inherited: Option<&'a Formals>) -> Self {
        Self {
            store,
            inherited,
            formals: Formals::new(),
            pending_formal: None,
            position: Position::Unset,
            stack: Vec::new(),
            dimensions: 0,
            superclass: None,
            interfaces: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            exceptions: Vec::new(),
            field: None,
        }
    }

    fn at(&mut self, position: Position) {
        self.position = position;
        self.dimensions = 0;
        if !matches!(position, Position::ClassBound | Position::InterfaceBound) {
            self.pending_formal = None;
        }
    }

    fn type_ref(&self, name: &str) -> TypeRef {
        let proxy = match (self.stack.is_empty(), self.position) {
            (true, Position::Superclass) => {
                self.store.get_or_create_in(name, TypeCategory::Class)
            }
            (true, Position::Interface) => {
                self.store.get_or_create_in(name, TypeCategory::Interface)
            }
            _ => self.store.get_or_create(name),
        };
        TypeRef::new(name, proxy.as_ref())
    }

    fn lookup_formal(&self, name: &str) -> ParameterizedType {
        self.formals
            .get(name)
            .or_else(|| self.inherited.and_then(|formals| formals.get(name)))
            .map(ParameterizedType::reference)
            .unwrap_or_else(|| ParameterizedType::formal(name))
    }

    /// Hands a completed type to the enclosing node, or to the current
    /// position when it is a top-level type.
    fn attach(&mut self, node: ParameterizedType) {
        match self.stack.last_mut() {
            Some(Frame::Node(parent)) => {
                parent.push_argument(node);
                return;
            }
            Some(Frame::Skipped) => return,
            None => {}
        }

        match self.position {
            Position::ClassBound | Position::InterfaceBound => {
                if let Some(name) = &self.pending_formal {
                    if let Some(formal) = self.formals.get_mut(name) {
                        formal.bind(node);
                    }
                }
            }
            Position::Superclass => self.superclass = Some(node),
            Position::Interface => self.interfaces.push(node),
            Position::Parameter => {
                if let Some(slot) = self.parameters.last_mut() {
                    *slot = Some(node);
                }
            }
            Position::Return => self.return_type = Some(node),
            Position::Exception => self.exceptions.push(node),
            Position::Field => self.field = Some(node),
            Position::Unset => trace!(%node, "dropping type outside any position"),
        }
    }
}

impl SignatureVisitor for SignatureResolver<'_> {
    fn visit_formal_type_parameter(&mut self, name: &str) {
        self.pending_formal = Some(name.to_string());
        self.formals
            .entry(name.to_string())
            .or_insert_with(|| ParameterizedType::formal(name));
    }

    fn visit_class_bound(&mut self) {
        self.at(Position::ClassBound);
    }

    fn visit_interface_bound(&mut self) {
        self.at(Position::InterfaceBound);
    }

    fn visit_superclass(&mut self) {
        self.at(Position::Superclass);
    }

    fn visit_interface(&mut self) {
        self.at(Position::Interface);
    }

    fn visit_parameter_type(&mut self) {
        self.at(Position::Parameter);
        self.parameters.push(None);
    }

    fn visit_return_type(&mut self) {
        self.at(Position::Return);
    }

    fn visit_exception_type(&mut self) {
        self.at(Position::Exception);
    }

    // Primitives are left to the raw descriptor.
    fn visit_base_type(&mut self, _descriptor: char) {
        self.dimensions = 0;
    }

    fn visit_type_variable(&mut self, name: &str) {
        let dimensions = std::mem::take(&mut self.dimensions);
        let node = self.lookup_formal(name).with_dimensions(dimensions);
        self.attach(node);
    }

    fn visit_array_type(&mut self) {
        self.dimensions += 1;
    }

    fn visit_class_type(&mut self, name: &str) {
        let dimensions = std::mem::take(&mut self.dimensions);
        if name == ROOT_TYPE {
            self.stack.push(Frame::Skipped);
            return;
        }
        let node = ParameterizedType::of_type(self.type_ref(name)).with_dimensions(dimensions);
        self.stack.push(Frame::Node(node));
    }

    fn visit_inner_class_type(&mut self, name: &str) {
        let Some(Frame::Node(outer)) = self.stack.last() else {
            return;
        };
        let Some(outer_name) = outer.type_name() else {
            return;
        };
        let inner = format!("{outer_name}${name}");
        let proxy = self.store.get_or_create(&inner);
        if let Some(Frame::Node(node)) = self.stack.last_mut() {
            node.rebind(TypeRef::new(inner, proxy.as_ref()));
        }
    }

    fn visit_end(&mut self) {
        match self.stack.pop() {
            Some(Frame::Node(node)) => self.attach(node),
            Some(Frame::Skipped) | None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(types: &[ParameterizedType]) -> Vec<String> {
        types.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn class_signature_yields_formals_and_parameterized_interfaces() {
        let store = ProxyStore::new();
        let resolved = resolve_class_signature(
            &store,
            "<K::Ljava/lang/Comparable<TK;>;V:Ljava/lang/Number;>Lcom/example/Base<TV;>;Ljava/util/Map<TK;Ljava/util/List<TV;>;>;",
        )
        .expect("signature");

        let k = &resolved.formals["K"];
        assert_eq!(k.type_name(), Some("java.lang.Comparable"));
        assert_eq!(names(k.arguments()), vec!["K"]);
        let v = &resolved.formals["V"];
        assert_eq!(v.type_name(), Some("java.lang.Number"));

        let superclass = resolved.superclass.expect("superclass");
        assert_eq!(superclass.to_string(), "com.example.Base<V>");
        assert_eq!(
            superclass.arguments()[0].type_name(),
            Some("java.lang.Number")
        );

        assert_eq!(
            names(&resolved.interfaces),
            vec!["java.util.Map<K, java.util.List<V>>"]
        );

        let map = store.lookup("java.util.Map").expect("interface proxy");
        assert_eq!(map.category(), Some(TypeCategory::Interface));
        let base = store.lookup("com.example.Base").expect("superclass proxy");
        assert_eq!(base.category(), Some(TypeCategory::Class));
        let list = store.lookup("java.util.List").expect("argument proxy");
        assert_eq!(list.category(), None);
    }

    #[test]
    fn object_is_never_a_node() {
        let store = ProxyStore::new();
        let resolved = resolve_class_signature(
            &store,
            "<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Iterable<Ljava/lang/Object;>;",
        )
        .expect("signature");
        assert!(resolved.superclass.is_none());
        assert_eq!(resolved.formals["T"].type_ref(), None);
        assert_eq!(names(&resolved.interfaces), vec!["java.lang.Iterable"]);
        assert!(store.lookup(ROOT_TYPE).is_none());
    }

    #[test]
    fn method_signature_leaves_primitives_to_the_descriptor() {
        let store = ProxyStore::new();
        let owner: Formals = [(
            "E".to_string(),
            ParameterizedType::formal("E"),
        )]
        .into_iter()
        .collect();

        let resolved = resolve_method_signature(
            &store,
            "<T:Ljava/lang/Number;>(ITE;[TT;Ljava/lang/Object;)Ljava/util/Set<+TT;>;^Ljava/io/IOException;",
            &owner,
        )
        .expect("signature");

        assert_eq!(resolved.parameters.len(), 4);
        assert!(resolved.parameters[0].is_none());
        assert_eq!(
            resolved.parameters[1].as_ref().map(ToString::to_string),
            Some("E".to_string())
        );
        let array = resolved.parameters[2].as_ref().expect("array parameter");
        assert_eq!(array.to_string(), "T[]");
        assert_eq!(array.type_name(), Some("java.lang.Number"));
        assert!(resolved.parameters[3].is_none());

        let returned = resolved.return_type.expect("return type");
        assert_eq!(returned.to_string(), "java.util.Set<T>");
        assert_eq!(names(&resolved.exceptions), vec!["java.io.IOException"]);
    }

    #[test]
    fn void_return_stays_empty() {
        let store = ProxyStore::new();
        let resolved =
            resolve_method_signature(&store, "(Ljava/util/List<*>;)V", &Formals::new())
                .expect("signature");
        assert!(resolved.return_type.is_none());
        let list = resolved.parameters[0].as_ref().expect("parameter");
        assert!(list.arguments().is_empty());
    }

    #[test]
    fn inner_class_types_are_renamed() {
        let store = ProxyStore::new();
        let field = resolve_field_signature(
            &store,
            "Lcom/example/Outer<TT;>.Inner<Ljava/lang/String;>;",
            &Formals::new(),
        )
        .expect("signature")
        .expect("field type");
        assert_eq!(field.to_string(), "com.example.Outer$Inner<java.lang.String>");
        assert!(store.lookup("com.example.Outer$Inner").is_some());
    }

    #[test]
    fn field_type_variable_uses_owner_bound() {
        let store = ProxyStore::new();
        let owner = resolve_class_signature(&store, "<T:Ljava/lang/Number;>Ljava/lang/Object;")
            .expect("class signature")
            .formals;
        let field = resolve_field_signature(&store, "TT;", &owner)
            .expect("signature")
            .expect("field type");
        assert_eq!(field.formal_name(), Some("T"));
        assert_eq!(field.type_name(), Some("java.lang.Number"));
    }

    #[test]
    fn malformed_signatures_are_errors() {
        let store = ProxyStore::new();
        assert!(resolve_field_signature(&store, "Ljava/util/List<", &Formals::new()).is_err());
        assert!(resolve_method_signature(&store, "(I", &Formals::new()).is_err());
    }

    #[test]
    fn unmatched_end_is_ignored() {
        let store = ProxyStore::new();
        let mut resolver = SignatureResolver::new(&store, None);
        resolver.visit_end();
        resolver.visit_end();
        assert!(resolver.stack.is_empty());
    }
}
