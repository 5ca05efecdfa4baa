//! Cross-referenced type graph built from class units.
//!
//! Units may be visited in any order, and concurrently. Every type name
//! gets one [`TypeProxy`] in the [`ProxyStore`] the first time it is
//! mentioned, whether as a superclass, interface, field type, annotation or
//! generic argument. The proxy collects reverse references (subtypes,
//! implementations, field references, annotated elements) until the name's
//! own unit is visited and its [`TypeNode`] is installed. Names that are never
//! visited stay as unresolved proxies.
//!
//! ```no_run
//! use tg_model::{ParsingConfig, ParsingContext};
//! # fn units() -> Vec<tg_classfile::ClassUnit> { Vec::new() }
//!
//! let context = ParsingContext::new(ParsingConfig::default());
//! for unit in units() {
//!     context.visitor(None, true).accept(&unit);
//! }
//! let types = context.types();
//! for implementation in types.implementations_of("com.example.Service") {
//!     println!("{}", implementation.name());
//! }
//! ```

mod config;
mod context;
mod error;
pub mod model;
mod proxy;
mod signature;
mod store;
mod types;
mod visitor;

pub use config::ParsingConfig;
pub use context::ParsingContext;
pub use error::{ConfigError, ModelError};
pub use model::{
    AnnotationModel, AnnotationValue, Element, ElementRef, FieldModel, MethodModel,
    ParameterModel, ParameterizedType, TypeCategory, TypeNode, TypePool, TypeRef,
};
pub use proxy::TypeProxy;
pub use store::{ProxyStore, ROOT_TYPE};
pub use types::Types;
pub use visitor::UnitVisitor;
