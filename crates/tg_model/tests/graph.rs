use std::sync::Arc;

use tg_classfile::access::*;
use tg_classfile::{AnnotationUnit, ClassUnit, ElementValue, FieldUnit, MethodUnit};
use tg_model::{
    AnnotationValue, Element, ModelError, ParsingConfig, ParsingContext, TypeCategory, TypeNode,
};
use url::Url;

fn class(name: &str) -> ClassUnit {
    ClassUnit::new(ACC_PUBLIC, name).with_super("java.lang.Object")
}

fn interface(name: &str) -> ClassUnit {
    ClassUnit::new(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT, name).with_super("java.lang.Object")
}

fn annotation_type(name: &str) -> ClassUnit {
    ClassUnit::new(
        ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION,
        name,
    )
    .with_super("java.lang.Object")
    .with_interface("java.lang.annotation.Annotation")
}

fn marker(name: &str) -> AnnotationUnit {
    AnnotationUnit::of_type(name)
}

fn visit_all(context: &ParsingContext, units: &[ClassUnit]) {
    for unit in units {
        context.visitor(None, true).accept(unit);
    }
}

fn names(nodes: &[Arc<TypeNode>]) -> Vec<String> {
    let mut names: Vec<String> = nodes.iter().map(|node| node.name().to_string()).collect();
    names.sort();
    names
}

#[test]
fn subclass_and_superclass_give_the_same_graph_in_either_order() {
    let base = class("com.example.Base");
    let child = class("com.example.Child").with_super("com.example.Base");
    let grandchild = class("com.example.GrandChild").with_super("com.example.Child");

    let orders = [
        vec![base.clone(), child.clone(), grandchild.clone()],
        vec![grandchild.clone(), child.clone(), base.clone()],
        vec![child, grandchild, base],
    ];

    for order in orders {
        let context = ParsingContext::default();
        visit_all(&context, &order);
        let types = context.types();

        let base = types.get_by_name("com.example.Base").expect("base");
        let child = types.get_by_name("com.example.Child").expect("child");
        let parent = child.parent().expect("child parent");
        assert!(Arc::ptr_eq(&parent, &base));
        assert_eq!(names(&base.sub_types()), vec!["com.example.Child"]);
        assert_eq!(
            names(&base.all_sub_types()),
            vec!["com.example.Child", "com.example.GrandChild"]
        );
        assert!(base.parent().is_none());
        assert_eq!(types.len(), 3);
        assert!(types.unresolved_names().is_empty());
    }
}

#[test]
fn implementations_are_recorded_in_either_order() {
    let iface = interface("com.example.I");
    let implementor = class("com.example.C").with_interface("com.example.I");

    for order in [
        vec![iface.clone(), implementor.clone()],
        vec![implementor, iface],
    ] {
        let context = ParsingContext::default();
        visit_all(&context, &order);
        let types = context.types();

        let i = types
            .get_by_name_as("com.example.I", TypeCategory::Interface)
            .expect("interface");
        let c = types
            .get_by_name_as("com.example.C", TypeCategory::Class)
            .expect("class");
        assert_eq!(names(&i.implementations()), vec!["com.example.C"]);
        assert!(c.interfaces().iter().any(|r| r.name() == "com.example.I"));
        assert!(c.is_instance_of("com.example.I"));
        assert!(types
            .get_by_name_as("com.example.I", TypeCategory::Class)
            .is_none());
    }
}

#[test]
fn unvisited_field_type_stays_nameable() {
    let context = ParsingContext::new(ParsingConfig::new().with_model_unannotated_members(true));
    let unit = class("com.example.A").with_field(FieldUnit::new(ACC_PRIVATE, "f", "Lcom/example/B;"));
    visit_all(&context, &[unit]);

    let a = context.types().get_by_name("com.example.A").expect("A");
    let fields = a.fields();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].name(), "f");
    assert_eq!(fields[0].type_name(), "com.example.B");
    assert!(fields[0].type_node().is_none());
    assert!(context.types().get_by_name("com.example.B").is_none());
    assert_eq!(context.types().unresolved_names(), vec!["com.example.B"]);
}

#[test]
fn promotion_keeps_field_references() {
    let context = ParsingContext::default();
    let holder = class("com.example.Holder")
        .with_annotation(
            marker("com.example.Config").with_value("target", ElementValue::class("com.example.X")),
        )
        .with_field(
            FieldUnit::new(ACC_PRIVATE, "x", "Lcom/example/X;")
                .with_annotation(marker("com.example.Inject")),
        );
    visit_all(&context, &[holder]);

    let proxy = context.types().proxy("com.example.X").expect("proxy for X");
    assert_eq!(proxy.category(), None);
    assert_eq!(proxy.field_references().len(), 1);

    visit_all(&context, &[class("com.example.X")]);
    let x = context.types().get_by_name("com.example.X").expect("X");
    assert!(Arc::ptr_eq(&x.proxy().expect("proxy"), &proxy));
    assert_eq!(proxy.category(), Some(TypeCategory::Class));

    let references = x.field_references();
    assert_eq!(references.len(), 1);
    assert_eq!(references[0].name(), "x");
    let declaring = references[0].declaring_type().expect("declaring type");
    assert_eq!(declaring.name(), "com.example.Holder");
    assert!(Arc::ptr_eq(
        &references[0].type_node().expect("resolved field type"),
        &x
    ));
}

#[test]
fn unannotated_members_are_discarded_by_default() {
    let unit = class("com.example.Bean")
        .with_field(
            FieldUnit::new(ACC_PRIVATE, "kept", "I").with_annotation(marker("com.example.Inject")),
        )
        .with_field(FieldUnit::new(ACC_PRIVATE, "dropped", "I"))
        .with_method(MethodUnit::new(ACC_PUBLIC, "plain", "()V"))
        .with_method(
            MethodUnit::new(ACC_PUBLIC, "setName", "(Ljava/lang/String;)V")
                .with_parameter_annotation(0, marker("com.example.NotNull")),
        );

    let context = ParsingContext::default();
    visit_all(&context, &[unit.clone()]);
    let bean = context.types().get_by_name("com.example.Bean").expect("bean");
    assert_eq!(bean.fields().len(), 1);
    assert_eq!(bean.fields()[0].name(), "kept");
    assert_eq!(bean.methods().len(), 1);
    assert!(bean.method("setName", &["java.lang.String"]).is_some());

    let context = ParsingContext::new(ParsingConfig::new().with_model_unannotated_members(true));
    visit_all(&context, &[unit]);
    let bean = context.types().get_by_name("com.example.Bean").expect("bean");
    assert_eq!(bean.fields().len(), 2);
    assert_eq!(bean.methods().len(), 2);
}

#[test]
fn annotations_of_interest_gate_member_visits() {
    let config = ParsingConfig::new()
        .with_model_unannotated_members(true)
        .with_annotation_of_interest("com.example.Service");
    let context = ParsingContext::new(config);

    let plain = class("com.example.Plain").with_field(FieldUnit::new(ACC_PRIVATE, "a", "I"));
    let service = class("com.example.Impl")
        .with_annotation(marker("com.example.Service"))
        .with_field(FieldUnit::new(ACC_PRIVATE, "b", "I"));
    visit_all(&context, &[plain, service]);

    let types = context.types();
    let plain = types.get_by_name("com.example.Plain").expect("plain");
    assert!(plain.fields().is_empty());
    assert_eq!(plain.annotations().len(), 0);
    let service = types.get_by_name("com.example.Impl").expect("service");
    assert_eq!(service.fields().len(), 1);
    assert_eq!(names(&types.annotated_with("com.example.Service")), vec!["com.example.Impl"]);
}

#[test]
fn cyclic_superclasses_are_refused_and_traversals_terminate() {
    let context = ParsingContext::default();
    visit_all(
        &context,
        &[
            class("com.example.A").with_super("com.example.B"),
            class("com.example.B").with_super("com.example.A"),
            class("com.example.Self").with_super("com.example.Self"),
        ],
    );

    let diagnostics = context.diagnostics();
    assert!(diagnostics.contains(&ModelError::CyclicInheritance {
        name: "com.example.B".to_string(),
        parent: "com.example.A".to_string(),
    }));
    assert!(diagnostics.contains(&ModelError::CyclicInheritance {
        name: "com.example.Self".to_string(),
        parent: "com.example.Self".to_string(),
    }));

    let types = context.types();
    let a = types.get_by_name("com.example.A").expect("A");
    let b = types.get_by_name("com.example.B").expect("B");
    assert_eq!(a.parent_name().as_deref(), Some("com.example.B"));
    assert!(b.parent().is_none());
    assert_eq!(names(&b.all_sub_types()), vec!["com.example.A"]);
    assert!(a.is_instance_of("com.example.B"));
    assert!(!b.is_instance_of("com.example.A"));
}

#[test]
fn cyclic_interfaces_do_not_hang_traversals() {
    let context = ParsingContext::default();
    visit_all(
        &context,
        &[
            interface("com.example.I").with_interface("com.example.J"),
            interface("com.example.J").with_interface("com.example.I"),
            class("com.example.C").with_interface("com.example.I"),
        ],
    );
    let types = context.types();
    let c = types.get_by_name("com.example.C").expect("C");
    assert!(c.is_instance_of("com.example.J"));
    assert!(!c.is_instance_of("com.example.Missing"));
    let j = types.get_by_name("com.example.J").expect("J");
    assert_eq!(names(&j.all_implementations()), vec!["com.example.C"]);
    assert_eq!(names(&j.all_sub_types()), vec!["com.example.I"]);
}

#[test]
fn category_conflicts_skip_the_later_unit() {
    let context = ParsingContext::default();
    visit_all(
        &context,
        &[
            class("com.example.Thing"),
            annotation_type("com.example.Thing"),
        ],
    );
    assert_eq!(
        context.diagnostics(),
        vec![ModelError::CategoryConflict {
            name: "com.example.Thing".to_string(),
            existing: TypeCategory::Class,
            requested: TypeCategory::Annotation,
        }]
    );
    let thing = context.types().get_by_name("com.example.Thing").expect("thing");
    assert_eq!(thing.category(), TypeCategory::Class);
}

#[test]
fn placeholder_parent_is_visible_before_its_unit() {
    let context = ParsingContext::default();
    visit_all(&context, &[class("com.example.Child").with_super("com.example.Mode")]);

    let types = context.types();
    assert!(types.get_by_name("com.example.Mode").is_none());
    let child = types.get_by_name("com.example.Child").expect("child");
    let placeholder = child.parent().expect("placeholder parent");
    assert_eq!(placeholder.name(), "com.example.Mode");
    assert!(!placeholder.is_visited());
    assert_eq!(types.unresolved_names(), vec!["com.example.Mode"]);

    // The placeholder is refined, not replaced, when the real unit turns out
    // to be an enum.
    let mode = ClassUnit::new(ACC_PUBLIC | ACC_FINAL | ACC_ENUM, "com.example.Mode")
        .with_super("java.lang.Enum");
    visit_all(&context, &[mode]);
    let visited = types.get_by_name("com.example.Mode").expect("mode");
    assert!(Arc::ptr_eq(&visited, &placeholder));
    assert_eq!(visited.category(), TypeCategory::Enum);
    assert_eq!(visited.parent_name().as_deref(), Some("java.lang.Enum"));
    assert!(context.diagnostics().is_empty());
}

#[test]
fn all_implementations_follow_sub_interfaces_and_subclasses() {
    let context = ParsingContext::default();
    visit_all(
        &context,
        &[
            interface("com.example.Service"),
            interface("com.example.Named").with_interface("com.example.Service"),
            class("com.example.Base").with_interface("com.example.Named"),
            class("com.example.Leaf").with_super("com.example.Base"),
            class("com.example.Direct").with_interface("com.example.Service"),
            class("com.example.Unrelated"),
        ],
    );
    let types = context.types();
    let service = types.get_by_name("com.example.Service").expect("service");
    assert_eq!(names(&service.implementations()), vec!["com.example.Direct"]);
    assert_eq!(names(&service.sub_types()), vec!["com.example.Named"]);
    assert_eq!(
        names(&service.all_implementations()),
        vec!["com.example.Base", "com.example.Direct", "com.example.Leaf"]
    );
    assert_eq!(
        names(&types.implementations_of("com.example.Service")),
        vec!["com.example.Base", "com.example.Direct", "com.example.Leaf"]
    );
    let leaf = types.get_by_name("com.example.Leaf").expect("leaf");
    assert!(leaf.is_instance_of("com.example.Service"));
}

#[test]
fn implementations_of_unvisited_interface_use_the_proxy() {
    let context = ParsingContext::default();
    visit_all(
        &context,
        &[
            class("com.example.Data").with_interface("java.io.Serializable"),
            class("com.example.MoreData").with_super("com.example.Data"),
        ],
    );
    assert_eq!(
        names(&context.types().implementations_of("java.io.Serializable")),
        vec!["com.example.Data", "com.example.MoreData"]
    );
}

#[test]
fn meta_annotations_are_followed() {
    let context = ParsingContext::default();
    visit_all(
        &context,
        &[
            annotation_type("com.example.Component"),
            annotation_type("com.example.Service").with_annotation(marker("com.example.Component")),
            class("com.example.Repository").with_annotation(marker("com.example.Component")),
            class("com.example.Mailer").with_annotation(marker("com.example.Service")),
        ],
    );
    let component = context
        .types()
        .get_by_name_as("com.example.Component", TypeCategory::Annotation)
        .expect("component");
    assert_eq!(component.annotated_elements().len(), 2);
    assert_eq!(
        names(&component.all_annotated_types()),
        vec!["com.example.Mailer", "com.example.Repository"]
    );
}

#[test]
fn annotation_types_store_defaults_and_skip_constants() {
    let context = ParsingContext::default();
    let timed = annotation_type("com.example.Timed")
        .with_method(MethodUnit::new(ACC_PUBLIC | ACC_ABSTRACT, "value", "()J").with_default(ElementValue::Long(30)))
        .with_method(
            MethodUnit::new(ACC_PUBLIC | ACC_ABSTRACT, "units", "()[Ljava/lang/String;")
                .with_default(ElementValue::Array(vec![ElementValue::String("ms".into())])),
        )
        .with_field(FieldUnit::new(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "LIMIT", "I"))
        .with_field(FieldUnit::new(
            ACC_PUBLIC | ACC_STATIC | ACC_FINAL,
            "DEFAULT_UNIT",
            "Ljava/lang/String;",
        ));
    visit_all(&context, &[timed]);

    let timed = context
        .types()
        .get_by_name_as("com.example.Timed", TypeCategory::Annotation)
        .expect("timed");
    assert_eq!(timed.default_value("value"), Some(AnnotationValue::Long(30)));
    assert_eq!(
        timed.default_value("units"),
        Some(AnnotationValue::Sequence(vec![AnnotationValue::String("ms".into())]))
    );
    assert_eq!(timed.default_values().len(), 2);
    assert!(timed.methods().is_empty());
    assert!(timed.fields().is_empty());
    assert!(timed.static_fields().is_empty());
    assert!(timed.parent().is_none());
    assert!(timed.interfaces().is_empty());
    assert!(context.diagnostics().is_empty());
}

#[test]
fn instance_fields_on_annotation_types_are_reported() {
    let context = ParsingContext::default();
    let broken = annotation_type("com.example.Broken")
        .with_field(FieldUnit::new(ACC_PRIVATE, "state", "I"));
    visit_all(&context, &[broken]);

    assert_eq!(
        context.diagnostics(),
        vec![ModelError::UnsupportedMember {
            owner: "com.example.Broken".to_string(),
            member: "state".to_string(),
        }]
    );
    assert!(context.types().get_by_name("com.example.Broken").is_some());
}

#[test]
fn generic_fields_and_methods_are_resolved() {
    let context = ParsingContext::new(ParsingConfig::new().with_model_unannotated_members(true));
    let mut find = MethodUnit::new(ACC_PUBLIC, "find", "(Ljava/lang/String;I)Ljava/util/Map;")
        .with_signature("(Ljava/lang/String;I)Ljava/util/Map<Ljava/lang/String;TT;>;")
        .with_annotation(marker("com.example.Query"));
    find.parameter_names = vec![Some("key".to_string()), Some("limit".to_string())];

    let repo = class("com.example.Repo")
        .with_signature("<T:Ljava/lang/Number;>Ljava/lang/Object;Ljava/lang/Iterable<TT;>;")
        .with_interface("java.lang.Iterable")
        .with_field(
            FieldUnit::new(ACC_PRIVATE, "items", "Ljava/util/List;")
                .with_signature("Ljava/util/List<TT;>;"),
        )
        .with_field(FieldUnit::new(ACC_PRIVATE, "current", "Ljava/lang/Number;").with_signature("TT;"))
        .with_field(
            FieldUnit::new(ACC_PRIVATE | ACC_TRANSIENT, "cache", "[Ljava/lang/Object;")
                .with_signature("Ljava/util/List<"),
        )
        .with_field(FieldUnit::new(ACC_PRIVATE | ACC_STATIC, "COUNT", "I"))
        .with_method(find)
        .with_method(MethodUnit::new(ACC_STATIC, "<clinit>", "()V"))
        .with_method(MethodUnit::new(ACC_PUBLIC | ACC_BRIDGE | ACC_SYNTHETIC, "bridge", "()V"));
    visit_all(&context, &[repo]);

    let repo = context.types().get_by_name("com.example.Repo").expect("repo");
    let formals = repo.formal_type_parameters();
    assert_eq!(formals["T"].type_name(), Some("java.lang.Number"));
    assert_eq!(
        repo.parameterized_interface("java.lang.Iterable")
            .map(|i| i.to_string()),
        Some("java.lang.Iterable<T>".to_string())
    );
    assert_eq!(repo.interfaces().len(), 1);

    let items = repo.field("items").expect("items");
    assert_eq!(items.type_name(), "java.util.List");
    assert_eq!(items.parameterized_arguments()[0].formal_name(), Some("T"));
    let current = repo.field("current").expect("current");
    assert_eq!(current.formal_type(), Some("T"));
    let cache = repo.field("cache").expect("cache");
    assert!(cache.is_array() && cache.is_transient());
    assert!(cache.parameterized_arguments().is_empty());
    assert_eq!(cache.type_name(), "java.lang.Object");
    assert_eq!(repo.static_fields().len(), 1);
    assert_eq!(repo.fields().len(), 3);

    assert_eq!(repo.methods().len(), 1);
    let find = repo.method("find", &["java.lang.String", "int"]).expect("find");
    assert_eq!(find.signature(), "(Ljava/lang/String;I)Ljava/util/Map;");
    assert_eq!(find.return_type_name(), Some("java.util.Map"));
    assert_eq!(
        find.return_type().map(ToString::to_string),
        Some("java.util.Map<java.lang.String, T>".to_string())
    );
    let parameters = find.parameters();
    assert_eq!(parameters[0].name(), "key");
    assert_eq!(
        parameters[1].parameterized_type().map(ToString::to_string),
        Some("int".to_string())
    );
    let owner = parameters[1].method().expect("owning method");
    assert!(Arc::ptr_eq(&owner, &find));
}

#[test]
fn generic_superclass_and_throws_clause_are_exposed() {
    let context = ParsingContext::new(ParsingConfig::new().with_model_unannotated_members(true));
    let load = MethodUnit::new(ACC_PUBLIC, "load", "(Ljava/lang/Object;)V")
        .with_signature("(TT;)V^Ljava/io/IOException;^Lcom/example/Failure<TT;>;");
    let repo = class("com.example.JdbcRepo")
        .with_super("com.example.AbstractRepo")
        .with_signature("<T:Ljava/lang/Object;>Lcom/example/AbstractRepo<TT;>;")
        .with_method(load)
        .with_method(MethodUnit::new(ACC_PUBLIC, "close", "()V"));
    let plain = class("com.example.Plain").with_signature("<T:Ljava/lang/Object;>Ljava/lang/Object;");
    visit_all(&context, &[repo, plain]);

    let types = context.types();
    let repo = types.get_by_name("com.example.JdbcRepo").expect("repo");
    let parent = repo.parameterized_parent().expect("generic superclass");
    assert_eq!(parent.to_string(), "com.example.AbstractRepo<T>");
    assert_eq!(parent.type_name(), Some("com.example.AbstractRepo"));
    assert_eq!(repo.parent_name().as_deref(), Some("com.example.AbstractRepo"));

    let load = repo.method("load", &["java.lang.Object"]).expect("load");
    let thrown: Vec<String> = load.exceptions().iter().map(ToString::to_string).collect();
    assert_eq!(thrown, vec!["java.io.IOException", "com.example.Failure<T>"]);
    assert!(types.proxy("com.example.Failure").is_some());
    let close = repo.method("close", &[]).expect("close");
    assert!(close.exceptions().is_empty());

    let plain = types.get_by_name("com.example.Plain").expect("plain");
    assert!(plain.parameterized_parent().is_none());
}

#[test]
fn annotations_know_their_elements() {
    let context = ParsingContext::default();
    let unit = class("com.example.Endpoint")
        .with_annotation(
            marker("com.example.Route")
                .with_value(
                    "filters",
                    ElementValue::Array(vec![
                        ElementValue::Annotation(marker("com.example.Filter")),
                        ElementValue::Annotation(marker("com.example.Filter")),
                    ]),
                )
                .with_value("method", ElementValue::enum_constant("com.example.Verb", "GET")),
        )
        .with_method(
            MethodUnit::new(ACC_PUBLIC, "handle", "(Ljava/lang/String;)V")
                .with_parameter_annotation(0, marker("com.example.Param").with_value("value", ElementValue::String("id".into()))),
        );
    visit_all(&context, &[unit]);

    let endpoint = context.types().get_by_name("com.example.Endpoint").expect("endpoint");
    let route = endpoint.annotation("com.example.Route").expect("route");
    let element = route.element().and_then(|e| e.upgrade()).expect("element");
    assert!(matches!(&element, Element::Type(node) if Arc::ptr_eq(node, &endpoint)));

    let filters = route
        .value("filters")
        .and_then(AnnotationValue::as_sequence)
        .expect("filters");
    assert_eq!(filters.len(), 2);
    for filter in filters {
        let AnnotationValue::Annotation(nested) = filter else {
            panic!("expected nested annotation, got {filter:?}");
        };
        let nested_element = nested.element().and_then(|e| e.upgrade()).expect("nested element");
        assert_eq!(nested_element.name(), "com.example.Endpoint");
    }
    // Nested annotations are not registered on their type's reverse index.
    let filter_proxy = context.types().proxy("com.example.Filter").expect("filter proxy");
    assert!(filter_proxy.annotated_elements().is_empty());

    let handle = endpoint.method("handle", &["java.lang.String"]).expect("handle");
    let param = &handle.parameters()[0];
    let annotation = param.annotation("com.example.Param").expect("param annotation");
    let element = annotation.element().and_then(|e| e.upgrade()).expect("param element");
    assert_eq!(element.name(), "arg0");
    assert_eq!(
        element.declaring_type().map(|t| t.name().to_string()).as_deref(),
        Some("com.example.Endpoint")
    );
    let param_proxy = context.types().proxy("com.example.Param").expect("param proxy");
    assert_eq!(param_proxy.annotated_elements().len(), 1);
}

#[test]
fn locations_and_application_flag_are_recorded() {
    let context = ParsingContext::default();
    let app = Url::parse("file:///work/app.jar").expect("url");
    let lib = Url::parse("file:///work/lib.jar").expect("url");

    context.visitor(Some(app.clone()), true).accept(&class("com.example.Split"));
    context.visitor(Some(lib.clone()), false).accept(&class("com.example.Split"));
    context.visitor(Some(lib.clone()), false).accept(&class("com.example.Library"));

    let types = context.types();
    let split = types.get_by_name("com.example.Split").expect("split");
    assert_eq!(split.locations(), vec![app.clone(), lib.clone()]);
    assert!(split.was_defined_in(&[app.clone()]));
    assert!(split.is_application_type());
    let library = types.get_by_name("com.example.Library").expect("library");
    assert!(!library.was_defined_in(&[app]));
    assert!(!library.is_application_type());
    assert!(context.diagnostics().is_empty());
}

#[test]
fn a_type_defined_twice_keeps_one_set_of_members() {
    let context = ParsingContext::default();
    let first = Url::parse("file:///work/a.jar").expect("url");
    let second = Url::parse("file:///work/b.jar").expect("url");
    let bean = class("com.example.Bean")
        .with_super("com.example.Base")
        .with_interface("com.example.Named")
        .with_annotation(marker("com.example.Component"))
        .with_field(
            FieldUnit::new(ACC_PRIVATE, "repository", "Lcom/example/Repository;")
                .with_annotation(marker("com.example.Inject")),
        )
        .with_method(
            MethodUnit::new(ACC_PUBLIC, "setName", "(Ljava/lang/String;)V")
                .with_annotation(marker("com.example.Inject")),
        );

    let visited = context.visitor(Some(first.clone()), true).accept(&bean).expect("first");
    let merged = context.visitor(Some(second.clone()), false).accept(&bean).expect("second");
    assert!(Arc::ptr_eq(&visited, &merged));

    let types = context.types();
    let bean = types.get_by_name("com.example.Bean").expect("bean");
    assert_eq!(bean.locations(), vec![first, second]);
    assert!(bean.is_application_type());
    assert_eq!(bean.fields().len(), 1);
    assert_eq!(bean.methods().len(), 1);
    assert_eq!(bean.annotations().len(), 1);
    assert_eq!(bean.interfaces().len(), 1);

    let inject = types.proxy("com.example.Inject").expect("inject proxy");
    assert_eq!(inject.annotated_elements().len(), 2);
    let component = types.proxy("com.example.Component").expect("component proxy");
    assert_eq!(component.annotated_elements().len(), 1);
    let repository = types.proxy("com.example.Repository").expect("repository proxy");
    assert_eq!(repository.field_references().len(), 1);
    let base = types.proxy("com.example.Base").expect("base proxy");
    assert_eq!(base.sub_types().len(), 1);
    assert!(context.diagnostics().is_empty());
}

#[test]
fn a_later_definition_does_not_replace_the_superclass() {
    let context = ParsingContext::default();
    visit_all(
        &context,
        &[
            class("com.example.Split").with_super("com.example.First"),
            class("com.example.Split").with_super("com.example.Second"),
        ],
    );

    let types = context.types();
    let split = types.get_by_name("com.example.Split").expect("split");
    assert_eq!(split.parent_name().as_deref(), Some("com.example.First"));
    assert_eq!(types.proxy("com.example.First").expect("first").sub_types().len(), 1);
    assert!(types.proxy("com.example.Second").expect("second").sub_types().is_empty());
}

#[test]
fn visitor_enforces_unit_order() {
    let context = ParsingContext::default();
    let mut visitor = context.visitor(None, true);
    assert!(matches!(
        visitor.visit_field(&FieldUnit::new(ACC_PRIVATE, "early", "I")),
        Err(ModelError::VisitorMisuse { .. })
    ));
    visitor.visit_header(&class("com.example.Ordered")).expect("header");
    assert!(matches!(
        visitor.visit_header(&class("com.example.Other")),
        Err(ModelError::VisitorMisuse { .. })
    ));
    visitor
        .visit_method(&MethodUnit::new(ACC_PUBLIC, "run", "()V"))
        .expect("method");
    assert!(matches!(
        visitor.visit_annotation(&marker("com.example.Late")),
        Err(ModelError::VisitorMisuse { .. })
    ));
    visitor.visit_end().expect("end");
    assert!(matches!(visitor.visit_end(), Err(ModelError::VisitorMisuse { .. })));
}

#[test]
fn malformed_descriptors_are_reported_and_skipped() {
    let context = ParsingContext::new(ParsingConfig::new().with_model_unannotated_members(true));
    visit_all(
        &context,
        &[class("com.example.Broken")
            .with_field(FieldUnit::new(ACC_PRIVATE, "bad", "Lcom/example/Missing"))
            .with_field(FieldUnit::new(ACC_PRIVATE, "good", "J"))],
    );
    let broken = context.types().get_by_name("com.example.Broken").expect("broken");
    assert_eq!(broken.fields().len(), 1);
    assert!(matches!(
        context.diagnostics().as_slice(),
        [ModelError::MalformedDescriptor { member, .. }] if member == "bad"
    ));
}

#[test]
fn root_type_unit_is_not_modeled() {
    let context = ParsingContext::default();
    let object = ClassUnit::new(ACC_PUBLIC, "java.lang.Object");
    assert!(context.visitor(None, false).accept(&object).is_none());
    assert!(context.types().is_empty());
    assert!(context.diagnostics().is_empty());
}
