use crate::descriptor::TypeDescriptor;

/// Access flag bits shared by classes, fields and methods.
pub mod access {
    pub const ACC_PUBLIC: u16 = 0x0001;
    pub const ACC_PRIVATE: u16 = 0x0002;
    pub const ACC_PROTECTED: u16 = 0x0004;
    pub const ACC_STATIC: u16 = 0x0008;
    pub const ACC_FINAL: u16 = 0x0010;
    pub const ACC_BRIDGE: u16 = 0x0040;
    pub const ACC_TRANSIENT: u16 = 0x0080;
    pub const ACC_INTERFACE: u16 = 0x0200;
    pub const ACC_ABSTRACT: u16 = 0x0400;
    pub const ACC_SYNTHETIC: u16 = 0x1000;
    pub const ACC_ANNOTATION: u16 = 0x2000;
    pub const ACC_ENUM: u16 = 0x4000;
}

use access::*;

/// One decoded class, interface, enum or annotation type.
///
/// Names are dotted binary names (`com.example.Outer$Inner`).
#[derive(Debug, Clone, PartialEq)]
pub struct ClassUnit {
    pub major_version: u16,
    pub access: u16,
    pub name: String,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationUnit>,
    pub fields: Vec<FieldUnit>,
    pub methods: Vec<MethodUnit>,
}

impl ClassUnit {
    /// Java 8 class files; the reader accepts any version.
    pub const DEFAULT_MAJOR_VERSION: u16 = 52;

    pub fn new(access: u16, name: impl Into<String>) -> Self {
        Self {
            major_version: Self::DEFAULT_MAJOR_VERSION,
            access,
            name: name.into(),
            super_name: None,
            interfaces: Vec::new(),
            signature: None,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn with_super(mut self, super_name: impl Into<String>) -> Self {
        self.super_name = Some(super_name.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationUnit) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_field(mut self, field: FieldUnit) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodUnit) -> Self {
        self.methods.push(method);
        self
    }

    pub fn is_interface(&self) -> bool {
        self.access & ACC_INTERFACE != 0
    }

    pub fn is_annotation(&self) -> bool {
        self.access & ACC_ANNOTATION != 0
    }

    pub fn is_enum(&self) -> bool {
        self.access & ACC_ENUM != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access & ACC_SYNTHETIC != 0
    }

    /// Package part of the name, empty for the default package.
    pub fn package(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(package, _)| package)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldUnit {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationUnit>,
}

impl FieldUnit {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            annotations: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationUnit) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn is_static(&self) -> bool {
        self.access & ACC_STATIC != 0
    }

    pub fn is_transient(&self) -> bool {
        self.access & ACC_TRANSIENT != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access & ACC_SYNTHETIC != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodUnit {
    pub access: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub annotations: Vec<AnnotationUnit>,
    /// Annotations per formal parameter. May be shorter than the descriptor's
    /// parameter list when the compiler omitted synthetic leading parameters.
    pub parameter_annotations: Vec<Vec<AnnotationUnit>>,
    pub parameter_names: Vec<Option<String>>,
    /// `AnnotationDefault` of an annotation type element.
    pub annotation_default: Option<ElementValue>,
}

impl MethodUnit {
    pub fn new(access: u16, name: impl Into<String>, descriptor: impl Into<String>) -> Self {
        Self {
            access,
            name: name.into(),
            descriptor: descriptor.into(),
            signature: None,
            annotations: Vec::new(),
            parameter_annotations: Vec::new(),
            parameter_names: Vec::new(),
            annotation_default: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationUnit) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_parameter_annotation(mut self, index: usize, annotation: AnnotationUnit) -> Self {
        if self.parameter_annotations.len() <= index {
            self.parameter_annotations.resize_with(index + 1, Vec::new);
        }
        self.parameter_annotations[index].push(annotation);
        self
    }

    pub fn with_default(mut self, value: ElementValue) -> Self {
        self.annotation_default = Some(value);
        self
    }

    pub fn is_static(&self) -> bool {
        self.access & ACC_STATIC != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access & (ACC_SYNTHETIC | ACC_BRIDGE) != 0
    }

    pub fn is_initializer(&self) -> bool {
        self.name == "<clinit>"
    }

    pub fn parameter_name(&self, index: usize) -> Option<&str> {
        self.parameter_names.get(index).and_then(|name| name.as_deref())
    }
}

/// An annotation attached to a class, member or parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUnit {
    /// Field descriptor of the annotation type (`Lcom/example/Marker;`).
    pub descriptor: String,
    pub visible: bool,
    pub values: Vec<(String, ElementValue)>,
}

impl AnnotationUnit {
    pub fn new(descriptor: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor.into(),
            visible: true,
            values: Vec::new(),
        }
    }

    /// Annotation of the given dotted type name.
    pub fn of_type(type_name: &str) -> Self {
        Self::new(TypeDescriptor::Object(type_name.to_string()).to_descriptor())
    }

    pub fn invisible(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: ElementValue) -> Self {
        self.values.push((name.into(), value));
        self
    }

    /// Dotted name of the annotation type, if the descriptor is an object type.
    pub fn type_name(&self) -> Option<String> {
        match TypeDescriptor::parse(&self.descriptor).ok()? {
            TypeDescriptor::Object(name) => Some(name),
            _ => None,
        }
    }
}

/// Value of an annotation element as stored in the class file.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
    Enum { descriptor: String, constant: String },
    /// Class literal, as a return descriptor (`Ljava/lang/String;`, `I`, `V`).
    Class(String),
    Annotation(AnnotationUnit),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    pub fn enum_constant(type_name: &str, constant: impl Into<String>) -> Self {
        Self::Enum {
            descriptor: TypeDescriptor::Object(type_name.to_string()).to_descriptor(),
            constant: constant.into(),
        }
    }

    pub fn class(type_name: &str) -> Self {
        Self::Class(TypeDescriptor::Object(type_name.to_string()).to_descriptor())
    }
}
