//! Generic signature tokenizer.
//!
//! Signatures are walked left to right and reported to a [`SignatureVisitor`]
//! as a flat event stream. Every class type opened by `visit_class_type` is
//! closed by exactly one `visit_end`, after its type arguments and inner
//! class segments have been reported.

use crate::descriptor::internal_to_binary;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wildcard {
    /// `? extends T`
    Extends,
    /// `? super T`
    Super,
    /// A plain `T` argument.
    Exact,
}

impl Wildcard {
    fn from_indicator(indicator: u8) -> Self {
        match indicator {
            b'+' => Self::Extends,
            b'-' => Self::Super,
            _ => Self::Exact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed signature '{signature}' at {position}: {message}")]
pub struct SignatureError {
    pub signature: String,
    pub position: usize,
    pub message: String,
}

/// Receives signature events. All methods default to doing nothing.
///
/// The position events (`visit_superclass`, `visit_parameter_type`, ...)
/// announce where the next complete type belongs.
#[allow(unused_variables)]
pub trait SignatureVisitor {
    fn visit_formal_type_parameter(&mut self, name: &str) {}
    fn visit_class_bound(&mut self) {}
    fn visit_interface_bound(&mut self) {}
    fn visit_superclass(&mut self) {}
    fn visit_interface(&mut self) {}
    fn visit_parameter_type(&mut self) {}
    fn visit_return_type(&mut self) {}
    fn visit_exception_type(&mut self) {}
    /// Primitive descriptor character, or `V` for a void return.
    fn visit_base_type(&mut self, descriptor: char) {}
    fn visit_type_variable(&mut self, name: &str) {}
    fn visit_array_type(&mut self) {}
    /// Dotted binary name of a top-level class type.
    fn visit_class_type(&mut self, name: &str) {}
    /// Simple name of a nested class segment (`Inner` in `Outer<T>.Inner`).
    fn visit_inner_class_type(&mut self, name: &str) {}
    /// A `*` type argument.
    fn visit_type_argument_unbounded(&mut self) {}
    fn visit_type_argument(&mut self, wildcard: Wildcard) {}
    fn visit_end(&mut self) {}
}

pub struct SignatureReader<'a> {
    signature: &'a str,
}

impl<'a> SignatureReader<'a> {
    pub fn new(signature: &'a str) -> Self {
        Self { signature }
    }

    /// Class signature: formal type parameters, superclass, then interfaces.
    pub fn accept_class<V: SignatureVisitor + ?Sized>(
        &self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        let mut cursor = Cursor::new(self.signature);
        cursor.formal_type_parameters(visitor)?;
        visitor.visit_superclass();
        cursor.class_type(visitor)?;
        while !cursor.at_end() {
            visitor.visit_interface();
            cursor.class_type(visitor)?;
        }
        Ok(())
    }

    /// Method signature: formal type parameters, parameters, return type and
    /// thrown types.
    pub fn accept_method<V: SignatureVisitor + ?Sized>(
        &self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        let mut cursor = Cursor::new(self.signature);
        cursor.formal_type_parameters(visitor)?;
        cursor.expect(b'(')?;
        while cursor.peek()? != b')' {
            visitor.visit_parameter_type();
            cursor.java_type(visitor)?;
        }
        cursor.expect(b')')?;

        visitor.visit_return_type();
        if cursor.peek()? == b'V' {
            cursor.pos += 1;
            visitor.visit_base_type('V');
        } else {
            cursor.java_type(visitor)?;
        }

        while !cursor.at_end() {
            cursor.expect(b'^')?;
            visitor.visit_exception_type();
            cursor.reference_type(visitor)?;
        }
        Ok(())
    }

    /// Field signature: a single type.
    pub fn accept_type<V: SignatureVisitor + ?Sized>(
        &self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        let mut cursor = Cursor::new(self.signature);
        cursor.java_type(visitor)?;
        if !cursor.at_end() {
            return Err(cursor.error("trailing characters"));
        }
        Ok(())
    }
}

struct Cursor<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, message: &str) -> SignatureError {
        SignatureError {
            signature: self.source.to_string(),
            position: self.pos,
            message: message.to_string(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Result<u8, SignatureError> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error("unexpected end"))
    }

    fn expect(&mut self, expected: u8) -> Result<(), SignatureError> {
        if self.peek()? != expected {
            return Err(self.error(&format!("expected '{}'", expected as char)));
        }
        self.pos += 1;
        Ok(())
    }

    /// Consumes an identifier up to (not including) one of `stops`.
    fn identifier(&mut self, stops: &[u8]) -> Result<&'a str, SignatureError> {
        let start = self.pos;
        while !stops.contains(&self.peek()?) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("empty identifier"));
        }
        Ok(&self.source[start..self.pos])
    }

    fn formal_type_parameters<V: SignatureVisitor + ?Sized>(
        &mut self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        if self.at_end() || self.peek()? != b'<' {
            return Ok(());
        }
        self.pos += 1;
        loop {
            let name = self.identifier(b":")?;
            visitor.visit_formal_type_parameter(name);
            self.expect(b':')?;
            // Interface-only bounds leave the class bound empty (`T::Ljava/lang/Runnable;`).
            if matches!(self.peek()?, b'L' | b'T' | b'[') {
                visitor.visit_class_bound();
                self.reference_type(visitor)?;
            }
            while self.peek()? == b':' {
                self.pos += 1;
                visitor.visit_interface_bound();
                self.reference_type(visitor)?;
            }
            if self.peek()? == b'>' {
                self.pos += 1;
                return Ok(());
            }
        }
    }

    fn java_type<V: SignatureVisitor + ?Sized>(
        &mut self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        match self.peek()? {
            tag @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.pos += 1;
                visitor.visit_base_type(tag as char);
                Ok(())
            }
            _ => self.reference_type(visitor),
        }
    }

    fn reference_type<V: SignatureVisitor + ?Sized>(
        &mut self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        match self.peek()? {
            b'L' => self.class_type(visitor),
            b'T' => {
                self.pos += 1;
                let name = self.identifier(b";")?;
                self.pos += 1;
                visitor.visit_type_variable(name);
                Ok(())
            }
            b'[' => {
                self.pos += 1;
                visitor.visit_array_type();
                self.java_type(visitor)
            }
            other => Err(self.error(&format!("unexpected type tag '{}'", other as char))),
        }
    }

    fn class_type<V: SignatureVisitor + ?Sized>(
        &mut self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        self.expect(b'L')?;
        let name = self.identifier(b"<.;")?;
        visitor.visit_class_type(&internal_to_binary(name));
        self.type_arguments(visitor)?;

        while self.peek()? == b'.' {
            self.pos += 1;
            let inner = self.identifier(b"<.;")?;
            visitor.visit_inner_class_type(inner);
            self.type_arguments(visitor)?;
        }

        self.expect(b';')?;
        visitor.visit_end();
        Ok(())
    }

    fn type_arguments<V: SignatureVisitor + ?Sized>(
        &mut self,
        visitor: &mut V,
    ) -> Result<(), SignatureError> {
        if self.peek()? != b'<' {
            return Ok(());
        }
        self.pos += 1;
        while self.peek()? != b'>' {
            match self.peek()? {
                b'*' => {
                    self.pos += 1;
                    visitor.visit_type_argument_unbounded();
                }
                indicator @ (b'+' | b'-') => {
                    self.pos += 1;
                    visitor.visit_type_argument(Wildcard::from_indicator(indicator));
                    self.reference_type(visitor)?;
                }
                _ => {
                    visitor.visit_type_argument(Wildcard::Exact);
                    self.reference_type(visitor)?;
                }
            }
        }
        self.pos += 1;
        Ok(())
    }
}
