use std::fmt;
use std::sync::Arc;

use crate::model::{TypeNode, TypeRef};

/// A generic type use: `List<String>`, a type variable `T`, or a bounded
/// variable (`T` with its bound's type and arguments).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedType {
    type_ref: Option<TypeRef>,
    formal_name: Option<String>,
    arguments: Vec<ParameterizedType>,
    dimensions: usize,
}

impl ParameterizedType {
    pub fn of_type(type_ref: TypeRef) -> Self {
        Self {
            type_ref: Some(type_ref),
            formal_name: None,
            arguments: Vec::new(),
            dimensions: 0,
        }
    }

    pub fn formal(name: impl Into<String>) -> Self {
        Self {
            type_ref: None,
            formal_name: Some(name.into()),
            arguments: Vec::new(),
            dimensions: 0,
        }
    }

    pub fn type_ref(&self) -> Option<&TypeRef> {
        self.type_ref.as_ref()
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_ref.as_ref().map(TypeRef::name)
    }

    pub fn type_node(&self) -> Option<Arc<TypeNode>> {
        self.type_ref.as_ref().and_then(TypeRef::get)
    }

    pub fn formal_name(&self) -> Option<&str> {
        self.formal_name.as_deref()
    }

    pub fn is_formal(&self) -> bool {
        self.formal_name.is_some()
    }

    pub fn arguments(&self) -> &[ParameterizedType] {
        &self.arguments
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub(crate) fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub(crate) fn push_argument(&mut self, argument: ParameterizedType) {
        self.arguments.push(argument);
    }

    /// Rebinds to a nested class, dropping the enclosing type's arguments.
    pub(crate) fn rebind(&mut self, type_ref: TypeRef) {
        self.type_ref = Some(type_ref);
        self.arguments.clear();
    }

    /// Adopts `bound` as the upper bound of this type variable, unless one was
    /// already recorded.
    pub(crate) fn bind(&mut self, bound: ParameterizedType) {
        if self.type_ref.is_none() {
            self.type_ref = bound.type_ref;
            self.arguments = bound.arguments;
            self.dimensions = bound.dimensions;
        }
    }

    /// A use site of this formal: its name and bound, without the bound's
    /// arguments.
    pub(crate) fn reference(&self) -> Self {
        Self {
            type_ref: self.type_ref.clone(),
            formal_name: self.formal_name.clone(),
            arguments: Vec::new(),
            dimensions: 0,
        }
    }
}

impl fmt::Display for ParameterizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.formal_name, &self.type_ref) {
            (Some(name), _) => f.write_str(name)?,
            (None, Some(type_ref)) => {
                f.write_str(type_ref.name())?;
                if !self.arguments.is_empty() {
                    f.write_str("<")?;
                    for (i, argument) in self.arguments.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{argument}")?;
                    }
                    f.write_str(">")?;
                }
            }
            (None, None) => f.write_str("?")?,
        }
        for _ in 0..self.dimensions {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_arguments_and_arrays() {
        let mut map = ParameterizedType::of_type(TypeRef::untracked("java.util.Map"));
        map.push_argument(ParameterizedType::of_type(TypeRef::untracked(
            "java.lang.String",
        )));
        let mut list = ParameterizedType::of_type(TypeRef::untracked("java.util.List"));
        list.push_argument(ParameterizedType::formal("T").with_dimensions(1));
        map.push_argument(list);
        assert_eq!(
            map.to_string(),
            "java.util.Map<java.lang.String, java.util.List<T[]>>"
        );
    }

    #[test]
    fn first_bound_wins() {
        let mut formal = ParameterizedType::formal("T");
        formal.bind(ParameterizedType::of_type(TypeRef::untracked(
            "java.lang.Number",
        )));
        formal.bind(ParameterizedType::of_type(TypeRef::untracked(
            "java.lang.Runnable",
        )));
        assert_eq!(formal.type_name(), Some("java.lang.Number"));
        assert_eq!(formal.formal_name(), Some("T"));
        assert_eq!(formal.to_string(), "T");
    }
}
