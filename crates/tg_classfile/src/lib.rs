//! Binary-unit decoding.
//!
//! This crate turns the bytes of a compiled class into a [`ClassUnit`]: the
//! declared name, access flags, superclass and interface names, generic
//! signature, annotations, and the field and method declarations with their
//! own descriptors, signatures and annotations. It does not look at bytecode.
//!
//! Generic signatures are kept as raw strings on the units; a
//! [`SignatureReader`] tokenises them on demand and drives a
//! [`SignatureVisitor`].

mod descriptor;
mod reader;
mod signature;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod unit;

pub use descriptor::{binary_to_internal, internal_to_binary, BaseType, MethodDescriptor, TypeDescriptor};
pub use reader::parse_class;
pub use signature::{SignatureError, SignatureReader, SignatureVisitor, Wildcard};
pub use unit::{access, AnnotationUnit, ClassUnit, ElementValue, FieldUnit, MethodUnit};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("malformed {attribute} attribute: {reason}")]
    MalformedAttribute {
        attribute: &'static str,
        reason: String,
    },
}
