//! Class file writer for tests.
//!
//! Produces the minimal byte layout [`parse_class`](crate::parse_class) reads
//! back: constant pool, header, members and the structural attributes. Method
//! bodies are never emitted.

use std::collections::HashMap;

use crate::descriptor::binary_to_internal;
use crate::unit::{AnnotationUnit, ClassUnit, ElementValue, FieldUnit, MethodUnit};

/// Serializes `unit` into class file bytes.
pub fn write_class(unit: &ClassUnit) -> Vec<u8> {
    let mut pool = PoolWriter::default();
    let mut body = Vec::new();

    put_u2(&mut body, unit.access);
    let this_class = pool.class(&unit.name);
    put_u2(&mut body, this_class);
    let super_class = unit
        .super_name
        .as_deref()
        .map(|name| pool.class(name))
        .unwrap_or(0);
    put_u2(&mut body, super_class);

    put_u2(&mut body, unit.interfaces.len() as u16);
    for interface in &unit.interfaces {
        let index = pool.class(interface);
        put_u2(&mut body, index);
    }

    put_u2(&mut body, unit.fields.len() as u16);
    for field in &unit.fields {
        write_field(&mut body, &mut pool, field);
    }

    put_u2(&mut body, unit.methods.len() as u16);
    for method in &unit.methods {
        write_method(&mut body, &mut pool, method);
    }

    let mut attributes = Attributes::default();
    if let Some(signature) = &unit.signature {
        attributes.signature(&mut pool, signature);
    }
    attributes.annotations(&mut pool, &unit.annotations);
    attributes.finish(&mut body, &mut pool);

    let mut out = Vec::with_capacity(body.len() + 256);
    put_u4(&mut out, 0xCAFE_BABE);
    put_u2(&mut out, 0);
    put_u2(&mut out, unit.major_version);
    pool.write(&mut out);
    out.extend_from_slice(&body);
    out
}

fn write_field(out: &mut Vec<u8>, pool: &mut PoolWriter, field: &FieldUnit) {
    put_u2(out, field.access);
    put_u2(out, pool.utf8(&field.name));
    put_u2(out, pool.utf8(&field.descriptor));

    let mut attributes = Attributes::default();
    if let Some(signature) = &field.signature {
        attributes.signature(pool, signature);
    }
    attributes.annotations(pool, &field.annotations);
    attributes.finish(out, pool);
}

fn write_method(out: &mut Vec<u8>, pool: &mut PoolWriter, method: &MethodUnit) {
    put_u2(out, method.access);
    put_u2(out, pool.utf8(&method.name));
    put_u2(out, pool.utf8(&method.descriptor));

    let mut attributes = Attributes::default();
    if let Some(signature) = &method.signature {
        attributes.signature(pool, signature);
    }
    attributes.annotations(pool, &method.annotations);
    attributes.parameter_annotations(pool, &method.parameter_annotations);
    if let Some(default) = &method.annotation_default {
        let mut data = Vec::new();
        write_element_value(&mut data, pool, default);
        attributes.push("AnnotationDefault", data);
    }
    if !method.parameter_names.is_empty() {
        let mut data = vec![method.parameter_names.len() as u8];
        for name in &method.parameter_names {
            let index = name.as_deref().map(|name| pool.utf8(name)).unwrap_or(0);
            put_u2(&mut data, index);
            put_u2(&mut data, 0);
        }
        attributes.push("MethodParameters", data);
    }
    attributes.finish(out, pool);
}

#[derive(Default)]
struct Attributes {
    entries: Vec<(&'static str, Vec<u8>)>,
}

impl Attributes {
    fn push(&mut self, name: &'static str, data: Vec<u8>) {
        self.entries.push((name, data));
    }

    fn signature(&mut self, pool: &mut PoolWriter, signature: &str) {
        let mut data = Vec::new();
        put_u2(&mut data, pool.utf8(signature));
        self.push("Signature", data);
    }

    fn annotations(&mut self, pool: &mut PoolWriter, annotations: &[AnnotationUnit]) {
        for (name, visible) in [
            ("RuntimeVisibleAnnotations", true),
            ("RuntimeInvisibleAnnotations", false),
        ] {
            let selected: Vec<_> = annotations
                .iter()
                .filter(|annotation| annotation.visible == visible)
                .collect();
            if selected.is_empty() {
                continue;
            }
            let mut data = Vec::new();
            put_u2(&mut data, selected.len() as u16);
            for annotation in selected {
                write_annotation(&mut data, pool, annotation);
            }
            self.push(name, data);
        }
    }

    fn parameter_annotations(&mut self, pool: &mut PoolWriter, parameters: &[Vec<AnnotationUnit>]) {
        for (name, visible) in [
            ("RuntimeVisibleParameterAnnotations", true),
            ("RuntimeInvisibleParameterAnnotations", false),
        ] {
            let any = parameters
                .iter()
                .flatten()
                .any(|annotation| annotation.visible == visible);
            if !any {
                continue;
            }
            let mut data = vec![parameters.len() as u8];
            for annotations in parameters {
                let selected: Vec<_> = annotations
                    .iter()
                    .filter(|annotation| annotation.visible == visible)
                    .collect();
                put_u2(&mut data, selected.len() as u16);
                for annotation in selected {
                    write_annotation(&mut data, pool, annotation);
                }
            }
            self.push(name, data);
        }
    }

    fn finish(self, out: &mut Vec<u8>, pool: &mut PoolWriter) {
        put_u2(out, self.entries.len() as u16);
        for (name, data) in self.entries {
            put_u2(out, pool.utf8(name));
            put_u4(out, data.len() as u32);
            out.extend_from_slice(&data);
        }
    }
}

fn write_annotation(out: &mut Vec<u8>, pool: &mut PoolWriter, annotation: &AnnotationUnit) {
    put_u2(out, pool.utf8(&annotation.descriptor));
    put_u2(out, annotation.values.len() as u16);
    for (name, value) in &annotation.values {
        put_u2(out, pool.utf8(name));
        write_element_value(out, pool, value);
    }
}

fn write_element_value(out: &mut Vec<u8>, pool: &mut PoolWriter, value: &ElementValue) {
    match value {
        ElementValue::Byte(v) => tagged(out, b'B', pool.integer(i32::from(*v))),
        ElementValue::Char(v) => tagged(out, b'C', pool.integer(*v as i32)),
        ElementValue::Short(v) => tagged(out, b'S', pool.integer(i32::from(*v))),
        ElementValue::Boolean(v) => tagged(out, b'Z', pool.integer(i32::from(*v))),
        ElementValue::Int(v) => tagged(out, b'I', pool.integer(*v)),
        ElementValue::Long(v) => tagged(out, b'J', pool.long(*v)),
        ElementValue::Float(v) => tagged(out, b'F', pool.float(*v)),
        ElementValue::Double(v) => tagged(out, b'D', pool.double(*v)),
        ElementValue::String(v) => tagged(out, b's', pool.utf8(v)),
        ElementValue::Enum {
            descriptor,
            constant,
        } => {
            out.push(b'e');
            put_u2(out, pool.utf8(descriptor));
            put_u2(out, pool.utf8(constant));
        }
        ElementValue::Class(descriptor) => tagged(out, b'c', pool.utf8(descriptor)),
        ElementValue::Annotation(annotation) => {
            out.push(b'@');
            write_annotation(out, pool, annotation);
        }
        ElementValue::Array(values) => {
            out.push(b'[');
            put_u2(out, values.len() as u16);
            for value in values {
                write_element_value(out, pool, value);
            }
        }
    }
}

fn tagged(out: &mut Vec<u8>, tag: u8, index: u16) {
    out.push(tag);
    put_u2(out, index);
}

#[derive(Hash, PartialEq, Eq)]
enum PoolKey {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
}

#[derive(Default)]
struct PoolWriter {
    bytes: Vec<u8>,
    next: u16,
    indices: HashMap<PoolKey, u16>,
}

impl PoolWriter {
    fn intern(&mut self, key: PoolKey) -> u16 {
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }
        if self.next == 0 {
            self.next = 1;
        }
        let index = self.next;
        let slots = match &key {
            PoolKey::Utf8(value) => {
                self.bytes.push(1);
                put_u2(&mut self.bytes, value.len() as u16);
                self.bytes.extend_from_slice(value.as_bytes());
                1
            }
            PoolKey::Integer(value) => {
                self.bytes.push(3);
                put_u4(&mut self.bytes, *value as u32);
                1
            }
            PoolKey::Float(bits) => {
                self.bytes.push(4);
                put_u4(&mut self.bytes, *bits);
                1
            }
            PoolKey::Long(value) => {
                self.bytes.push(5);
                self.bytes.extend_from_slice(&value.to_be_bytes());
                2
            }
            PoolKey::Double(bits) => {
                self.bytes.push(6);
                self.bytes.extend_from_slice(&bits.to_be_bytes());
                2
            }
            PoolKey::Class(name_index) => {
                self.bytes.push(7);
                put_u2(&mut self.bytes, *name_index);
                1
            }
        };
        self.next += slots;
        self.indices.insert(key, index);
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        self.intern(PoolKey::Utf8(value.to_string()))
    }

    fn integer(&mut self, value: i32) -> u16 {
        self.intern(PoolKey::Integer(value))
    }

    fn float(&mut self, value: f32) -> u16 {
        self.intern(PoolKey::Float(value.to_bits()))
    }

    fn long(&mut self, value: i64) -> u16 {
        self.intern(PoolKey::Long(value))
    }

    fn double(&mut self, value: f64) -> u16 {
        self.intern(PoolKey::Double(value.to_bits()))
    }

    fn class(&mut self, dotted: &str) -> u16 {
        let name_index = self.utf8(&binary_to_internal(dotted));
        self.intern(PoolKey::Class(name_index))
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u2(out, self.next.max(1));
        out.extend_from_slice(&self.bytes);
    }
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u4(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}
