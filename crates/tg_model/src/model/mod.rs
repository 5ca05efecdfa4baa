//! Entity model: type nodes, members, annotations and generic type uses.

mod annotation;
mod member;
mod node;
mod parameterized;
pub(crate) mod sync;
mod type_ref;

pub use annotation::{AnnotationModel, AnnotationValue};
pub use member::{FieldModel, MethodModel, ParameterModel};
pub use node::{TypeCategory, TypeNode, TypePool};
pub use parameterized::ParameterizedType;
pub use type_ref::{Element, ElementRef, TypeRef};
