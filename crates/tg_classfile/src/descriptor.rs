use crate::ClassParseError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    pub fn from_descriptor(tag: u8) -> Option<Self> {
        match tag {
            b'B' => Some(Self::Byte),
            b'C' => Some(Self::Char),
            b'D' => Some(Self::Double),
            b'F' => Some(Self::Float),
            b'I' => Some(Self::Int),
            b'J' => Some(Self::Long),
            b'S' => Some(Self::Short),
            b'Z' => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn descriptor(self) -> char {
        match self {
            Self::Byte => 'B',
            Self::Char => 'C',
            Self::Double => 'D',
            Self::Float => 'F',
            Self::Int => 'I',
            Self::Long => 'J',
            Self::Short => 'S',
            Self::Boolean => 'Z',
        }
    }

    pub fn java_name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Double => "double",
            Self::Float => "float",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Boolean => "boolean",
        }
    }
}

/// A decoded field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Base(BaseType),
    /// Dotted binary class name.
    Object(String),
    Array {
        element: Box<TypeDescriptor>,
        dimensions: usize,
    },
}

impl TypeDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self, ClassParseError> {
        let mut parser = DescriptorParser::new(descriptor);
        let ty = parser.parse_type()?;
        if parser.remaining() != 0 {
            return Err(ClassParseError::InvalidDescriptor(descriptor.to_string()));
        }
        Ok(ty)
    }

    /// Parses a class-literal descriptor, where `V` stands for `void.class`.
    pub fn parse_return(descriptor: &str) -> Result<Option<Self>, ClassParseError> {
        if descriptor == "V" {
            return Ok(None);
        }
        Self::parse(descriptor).map(Some)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    pub fn dimensions(&self) -> usize {
        match self {
            Self::Array { dimensions, .. } => *dimensions,
            _ => 0,
        }
    }

    /// The type with array dimensions stripped.
    pub fn element(&self) -> &TypeDescriptor {
        match self {
            Self::Array { element, .. } => element.element(),
            other => other,
        }
    }

    /// Class name of the element type, `None` for primitives.
    pub fn object_name(&self) -> Option<&str> {
        match self.element() {
            Self::Object(name) => Some(name),
            _ => None,
        }
    }

    /// Java name of the element type: `int`, `java.lang.String`.
    pub fn element_name(&self) -> &str {
        match self {
            Self::Base(base) => base.java_name(),
            Self::Object(name) => name,
            Self::Array { element, .. } => element.element_name(),
        }
    }

    /// Java source name including array brackets: `java.lang.String[][]`.
    pub fn java_name(&self) -> String {
        let mut name = self.element_name().to_string();
        for _ in 0..self.dimensions() {
            name.push_str("[]");
        }
        name
    }

    pub fn to_descriptor(&self) -> String {
        match self {
            Self::Base(base) => base.descriptor().to_string(),
            Self::Object(name) => format!("L{};", binary_to_internal(name)),
            Self::Array {
                element,
                dimensions,
            } => format!("{}{}", "[".repeat(*dimensions), element.to_descriptor()),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.java_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<TypeDescriptor>,
    /// `None` for `void`.
    pub return_type: Option<TypeDescriptor>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> Result<Self, ClassParseError> {
        let mut parser = DescriptorParser::new(descriptor);
        parser.expect('(')?;
        let mut parameters = Vec::new();
        while !parser.peek_char(')')? {
            parameters.push(parser.parse_type()?);
        }
        parser.expect(')')?;
        let return_type = if parser.peek_char('V')? {
            parser.advance(1);
            None
        } else {
            Some(parser.parse_type()?)
        };

        if parser.remaining() != 0 {
            return Err(ClassParseError::InvalidDescriptor(descriptor.to_string()));
        }

        Ok(Self {
            parameters,
            return_type,
        })
    }
}

/// `com/example/Outer$Inner` to `com.example.Outer$Inner`.
pub fn internal_to_binary(name: &str) -> String {
    name.replace('/', ".")
}

/// `com.example.Outer$Inner` to `com/example/Outer$Inner`.
pub fn binary_to_internal(name: &str) -> String {
    name.replace('.', "/")
}

struct DescriptorParser<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DescriptorParser<'a> {
    fn new(descriptor: &'a str) -> Self {
        Self {
            source: descriptor,
            bytes: descriptor.as_bytes(),
            pos: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn error(&self, reason: &str) -> ClassParseError {
        ClassParseError::InvalidDescriptor(format!("{reason} in '{}'", self.source))
    }

    fn expect(&mut self, ch: char) -> Result<(), ClassParseError> {
        if self.remaining() < 1 {
            return Err(self.error("unexpected end"));
        }
        if self.bytes[self.pos] != ch as u8 {
            return Err(self.error(&format!("expected '{ch}'")));
        }
        self.pos += 1;
        Ok(())
    }

    fn advance(&mut self, count: usize) {
        self.pos += count;
    }

    fn peek_char(&self, ch: char) -> Result<bool, ClassParseError> {
        if self.remaining() < 1 {
            return Err(self.error("unexpected end"));
        }
        Ok(self.bytes[self.pos] == ch as u8)
    }

    fn parse_type(&mut self) -> Result<TypeDescriptor, ClassParseError> {
        if self.remaining() == 0 {
            return Err(self.error("unexpected end"));
        }

        let start = self.bytes[self.pos];
        if let Some(base) = BaseType::from_descriptor(start) {
            self.pos += 1;
            return Ok(TypeDescriptor::Base(base));
        }
        match start {
            b'L' => self.parse_reference_type(),
            b'[' => self.parse_array_type(),
            _ => Err(self.error(&format!("unexpected descriptor tag '{}'", start as char))),
        }
    }

    fn parse_reference_type(&mut self) -> Result<TypeDescriptor, ClassParseError> {
        self.expect('L')?;
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b';' {
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() || self.pos == start {
            return Err(self.error("unterminated reference descriptor"));
        }
        let name = &self.source[start..self.pos];
        self.pos += 1; // consume ';'
        Ok(TypeDescriptor::Object(internal_to_binary(name)))
    }

    fn parse_array_type(&mut self) -> Result<TypeDescriptor, ClassParseError> {
        let mut dimensions = 0;
        while self.remaining() > 0 && self.bytes[self.pos] == b'[' {
            dimensions += 1;
            self.pos += 1;
        }
        let element = self.parse_type()?;
        Ok(TypeDescriptor::Array {
            element: Box::new(element),
            dimensions,
        })
    }
}
