use crate::descriptor::internal_to_binary;
use crate::unit::{AnnotationUnit, ClassUnit, ElementValue, FieldUnit, MethodUnit};
use crate::ClassParseError;

const MAGIC: u32 = 0xCAFEBABE;

/// Decodes one class file into a [`ClassUnit`].
///
/// Only the structural attributes are decoded (`Signature`, annotations,
/// parameter annotations, `AnnotationDefault`, `MethodParameters`); code and
/// debug attributes are skipped without inspection.
pub fn parse_class(bytes: &[u8]) -> Result<ClassUnit, ClassParseError> {
    let mut reader = ClassReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let major_version = reader.read_u2()?;
    let constant_pool = ConstantPool::parse(&mut reader)?;

    let access = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let mut unit = ClassUnit::new(access, constant_pool.class_name(this_class)?);
    unit.major_version = major_version;
    if super_class != 0 {
        unit.super_name = Some(constant_pool.class_name(super_class)?);
    }

    let interfaces_count = reader.read_u2()?;
    for _ in 0..interfaces_count {
        let index = reader.read_u2()?;
        unit.interfaces.push(constant_pool.class_name(index)?);
    }

    let fields_count = reader.read_u2()?;
    for _ in 0..fields_count {
        let field = read_field(&mut reader, &constant_pool)?;
        unit.fields.push(field);
    }

    let methods_count = reader.read_u2()?;
    for _ in 0..methods_count {
        let method = read_method(&mut reader, &constant_pool)?;
        unit.methods.push(method);
    }

    let mut signature = None;
    let mut annotations = Vec::new();
    for_each_attribute(&mut reader, &constant_pool, |name, mut body| {
        match name {
            "Signature" => signature = Some(constant_pool.utf8(body.read_u2()?)?.to_string()),
            "RuntimeVisibleAnnotations" => {
                annotations.extend(read_annotations(&mut body, &constant_pool, true)?)
            }
            "RuntimeInvisibleAnnotations" => {
                annotations.extend(read_annotations(&mut body, &constant_pool, false)?)
            }
            _ => {}
        }
        Ok(())
    })?;
    unit.signature = signature;
    unit.annotations = annotations;

    Ok(unit)
}

fn read_field(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<FieldUnit, ClassParseError> {
    let access = reader.read_u2()?;
    let name = pool.utf8(reader.read_u2()?)?;
    let descriptor = pool.utf8(reader.read_u2()?)?;
    let mut field = FieldUnit::new(access, name, descriptor);

    for_each_attribute(reader, pool, |attribute, mut body| {
        match attribute {
            "Signature" => field.signature = Some(pool.utf8(body.read_u2()?)?.to_string()),
            "RuntimeVisibleAnnotations" => {
                field
                    .annotations
                    .extend(read_annotations(&mut body, pool, true)?)
            }
            "RuntimeInvisibleAnnotations" => {
                field
                    .annotations
                    .extend(read_annotations(&mut body, pool, false)?)
            }
            _ => {}
        }
        Ok(())
    })?;

    Ok(field)
}

fn read_method(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
) -> Result<MethodUnit, ClassParseError> {
    let access = reader.read_u2()?;
    let name = pool.utf8(reader.read_u2()?)?;
    let descriptor = pool.utf8(reader.read_u2()?)?;
    let mut method = MethodUnit::new(access, name, descriptor);

    for_each_attribute(reader, pool, |attribute, mut body| {
        match attribute {
            "Signature" => method.signature = Some(pool.utf8(body.read_u2()?)?.to_string()),
            "RuntimeVisibleAnnotations" => method
                .annotations
                .extend(read_annotations(&mut body, pool, true)?),
            "RuntimeInvisibleAnnotations" => method
                .annotations
                .extend(read_annotations(&mut body, pool, false)?),
            "RuntimeVisibleParameterAnnotations" => merge_parameter_annotations(
                &mut method.parameter_annotations,
                read_parameter_annotations(&mut body, pool, true)?,
            ),
            "RuntimeInvisibleParameterAnnotations" => merge_parameter_annotations(
                &mut method.parameter_annotations,
                read_parameter_annotations(&mut body, pool, false)?,
            ),
            "AnnotationDefault" => {
                method.annotation_default = Some(read_element_value(&mut body, pool, true)?)
            }
            "MethodParameters" => {
                let count = body.read_u1()?;
                for _ in 0..count {
                    let name_index = body.read_u2()?;
                    let _flags = body.read_u2()?;
                    let name = if name_index == 0 {
                        None
                    } else {
                        Some(pool.utf8(name_index)?.to_string())
                    };
                    method.parameter_names.push(name);
                }
            }
            _ => {}
        }
        Ok(())
    })?;

    Ok(method)
}

fn for_each_attribute<'a, F>(
    reader: &mut ClassReader<'a>,
    pool: &ConstantPool,
    mut handle: F,
) -> Result<(), ClassParseError>
where
    F: FnMut(&str, ClassReader<'a>) -> Result<(), ClassParseError>,
{
    let count = reader.read_u2()?;
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let body = reader.read_slice(length)?;
        handle(pool.utf8(name_index)?, ClassReader::new(body))?;
    }
    Ok(())
}

fn merge_parameter_annotations(
    target: &mut Vec<Vec<AnnotationUnit>>,
    incoming: Vec<Vec<AnnotationUnit>>,
) {
    if target.len() < incoming.len() {
        target.resize_with(incoming.len(), Vec::new);
    }
    for (slot, annotations) in target.iter_mut().zip(incoming) {
        slot.extend(annotations);
    }
}

fn read_parameter_annotations(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<Vec<Vec<AnnotationUnit>>, ClassParseError> {
    let parameters = reader.read_u1()?;
    (0..parameters)
        .map(|_| read_annotations(reader, pool, visible))
        .collect()
}

fn read_annotations(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<Vec<AnnotationUnit>, ClassParseError> {
    let count = reader.read_u2()?;
    (0..count)
        .map(|_| read_annotation(reader, pool, visible))
        .collect()
}

fn read_annotation(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<AnnotationUnit, ClassParseError> {
    let mut annotation = AnnotationUnit::new(pool.utf8(reader.read_u2()?)?);
    annotation.visible = visible;
    let pairs = reader.read_u2()?;
    for _ in 0..pairs {
        let name = pool.utf8(reader.read_u2()?)?.to_string();
        let value = read_element_value(reader, pool, visible)?;
        annotation.values.push((name, value));
    }
    Ok(annotation)
}

fn read_element_value(
    reader: &mut ClassReader<'_>,
    pool: &ConstantPool,
    visible: bool,
) -> Result<ElementValue, ClassParseError> {
    let tag = reader.read_u1()?;
    let value = match tag {
        b'B' => ElementValue::Byte(pool.integer(reader.read_u2()?)? as i8),
        b'C' => {
            let code = pool.integer(reader.read_u2()?)? as u32;
            ElementValue::Char(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
        }
        b'S' => ElementValue::Short(pool.integer(reader.read_u2()?)? as i16),
        b'Z' => ElementValue::Boolean(pool.integer(reader.read_u2()?)? != 0),
        b'I' => ElementValue::Int(pool.integer(reader.read_u2()?)?),
        b'J' => ElementValue::Long(pool.long(reader.read_u2()?)?),
        b'F' => ElementValue::Float(pool.float(reader.read_u2()?)?),
        b'D' => ElementValue::Double(pool.double(reader.read_u2()?)?),
        b's' => ElementValue::String(pool.utf8(reader.read_u2()?)?.to_string()),
        b'e' => {
            let descriptor = pool.utf8(reader.read_u2()?)?.to_string();
            let constant = pool.utf8(reader.read_u2()?)?.to_string();
            ElementValue::Enum {
                descriptor,
                constant,
            }
        }
        b'c' => ElementValue::Class(pool.utf8(reader.read_u2()?)?.to_string()),
        b'@' => ElementValue::Annotation(read_annotation(reader, pool, visible)?),
        b'[' => {
            let count = reader.read_u2()?;
            let values = (0..count)
                .map(|_| read_element_value(reader, pool, visible))
                .collect::<Result<Vec<_>, _>>()?;
            ElementValue::Array(values)
        }
        other => {
            return Err(ClassParseError::MalformedAttribute {
                attribute: "element_value",
                reason: format!("unknown element value tag '{}'", other as char),
            })
        }
    };
    Ok(value)
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut ClassReader<'_>) -> Result<Self, ClassParseError> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    Constant::Utf8(decode_utf8(reader.read_slice(length)?))
                }
                3 => Constant::Integer(reader.read_u4()? as i32),
                4 => Constant::Float(f32::from_bits(reader.read_u4()?)),
                5 | 6 => {
                    let high = u64::from(reader.read_u4()?);
                    let low = u64::from(reader.read_u4()?);
                    let bits = (high << 32) | low;
                    // Eight-byte constants occupy two pool slots.
                    let constant = if tag == 5 {
                        Constant::Long(bits as i64)
                    } else {
                        Constant::Double(f64::from_bits(bits))
                    };
                    entries.push(constant);
                    index += 1;
                    Constant::Unusable
                }
                7 => Constant::Class {
                    name_index: reader.read_u2()?,
                },
                8 | 16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Constant, ClassParseError> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassParseError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn integer(&self, index: u16) -> Result<i32, ClassParseError> {
        match self.get(index)? {
            Constant::Integer(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn float(&self, index: u16) -> Result<f32, ClassParseError> {
        match self.get(index)? {
            Constant::Float(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn long(&self, index: u16) -> Result<i64, ClassParseError> {
        match self.get(index)? {
            Constant::Long(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn double(&self, index: u16) -> Result<f64, ClassParseError> {
        match self.get(index)? {
            Constant::Double(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn class_name(&self, index: u16) -> Result<String, ClassParseError> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(internal_to_binary(self.utf8(*name_index)?)),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

/// Constant-pool strings are modified UTF-8: NUL is encoded on two bytes and
/// supplementary characters as surrogate pairs. Plain UTF-8 covers nearly
/// every real name, so only fall back to the slow path when it fails.
fn decode_utf8(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => decode_modified_utf8(bytes),
    }
}

fn decode_modified_utf8(bytes: &[u8]) -> String {
    let mut units = Vec::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let lead = bytes[pos];
        let (unit, width) = if lead & 0x80 == 0 {
            (u16::from(lead), 1)
        } else if lead & 0xE0 == 0xC0 && pos + 1 < bytes.len() {
            let unit = (u16::from(lead & 0x1F) << 6) | u16::from(bytes[pos + 1] & 0x3F);
            (unit, 2)
        } else if lead & 0xF0 == 0xE0 && pos + 2 < bytes.len() {
            let unit = (u16::from(lead & 0x0F) << 12)
                | (u16::from(bytes[pos + 1] & 0x3F) << 6)
                | u16::from(bytes[pos + 2] & 0x3F);
            (unit, 3)
        } else {
            (0xFFFD, 1)
        };
        units.push(unit);
        pos += width;
    }
    String::from_utf16_lossy(&units)
}

struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        let magic = self.read_u4()?;
        if magic != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let value = *self
            .data
            .get(self.pos)
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        if self.pos + len > self.data.len() {
            return Err(ClassParseError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_class;
    use crate::unit::access::*;

    #[test]
    fn rejects_bad_magic_and_truncation() {
        assert!(matches!(
            parse_class(&[0xCA, 0xFE, 0xBA, 0xBF, 0, 0]),
            Err(ClassParseError::InvalidMagic)
        ));

        let bytes = write_class(&ClassUnit::new(ACC_PUBLIC, "com.example.Widget"));
        assert!(matches!(
            parse_class(&bytes[..bytes.len() - 3]),
            Err(ClassParseError::UnexpectedEof)
        ));
    }

    #[test]
    fn decodes_header_and_members() {
        let unit = ClassUnit::new(ACC_PUBLIC | ACC_FINAL, "com.example.Widget")
            .with_super("com.example.Base")
            .with_interface("java.io.Serializable")
            .with_interface("com.example.Named")
            .with_signature("Lcom/example/Base;Ljava/io/Serializable;Lcom/example/Named;")
            .with_field(
                FieldUnit::new(ACC_PRIVATE | ACC_TRANSIENT, "cache", "[Ljava/lang/String;")
                    .with_annotation(AnnotationUnit::of_type("com.example.Inject")),
            )
            .with_method(
                MethodUnit::new(ACC_PUBLIC, "rename", "(Ljava/lang/String;I)V")
                    .with_parameter_annotation(
                        1,
                        AnnotationUnit::of_type("com.example.Min")
                            .with_value("value", ElementValue::Long(3)),
                    ),
            );

        let parsed = parse_class(&write_class(&unit)).expect("parse widget");
        assert_eq!(parsed, unit);
        assert_eq!(parsed.package(), "com.example");
        assert!(parsed.fields[0].is_transient());
        assert_eq!(
            parsed.methods[0].parameter_annotations[1][0].type_name(),
            Some("com.example.Min".to_string())
        );
    }

    #[test]
    fn decodes_every_element_value_kind() {
        let nested = AnnotationUnit::of_type("com.example.Inner")
            .with_value("weight", ElementValue::Double(0.25));
        let annotation = AnnotationUnit::of_type("com.example.Everything")
            .with_value("b", ElementValue::Byte(-3))
            .with_value("c", ElementValue::Char('λ'))
            .with_value("s", ElementValue::Short(1024))
            .with_value("z", ElementValue::Boolean(true))
            .with_value("i", ElementValue::Int(-7))
            .with_value("j", ElementValue::Long(1 << 40))
            .with_value("f", ElementValue::Float(1.5))
            .with_value("text", ElementValue::String("héllo".to_string()))
            .with_value(
                "mode",
                ElementValue::enum_constant("java.lang.annotation.RetentionPolicy", "RUNTIME"),
            )
            .with_value("type", ElementValue::class("java.lang.String"))
            .with_value("primitive", ElementValue::Class("I".to_string()))
            .with_value("inner", ElementValue::Annotation(nested))
            .with_value(
                "list",
                ElementValue::Array(vec![ElementValue::Int(1), ElementValue::Int(2)]),
            );
        let unit = ClassUnit::new(ACC_PUBLIC, "com.example.Annotated")
            .with_annotation(annotation.clone())
            .with_annotation(AnnotationUnit::of_type("com.example.Hidden").invisible());

        let parsed = parse_class(&write_class(&unit)).expect("parse annotated");
        assert_eq!(parsed.annotations.len(), 2);
        assert_eq!(parsed.annotations[0], annotation);
        assert!(!parsed.annotations[1].visible);
    }

    #[test]
    fn decodes_annotation_defaults_and_parameter_names() {
        let method = MethodUnit::new(ACC_PUBLIC | ACC_ABSTRACT, "timeout", "()J")
            .with_default(ElementValue::Long(30));
        let mut setter = MethodUnit::new(ACC_PUBLIC, "setName", "(Ljava/lang/String;)V");
        setter.parameter_names = vec![Some("name".to_string())];
        let unit = ClassUnit::new(
            ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION,
            "com.example.Timed",
        )
        .with_interface("java.lang.annotation.Annotation")
        .with_method(method)
        .with_method(setter);

        let parsed = parse_class(&write_class(&unit)).expect("parse annotation type");
        assert!(parsed.is_annotation());
        assert!(parsed.is_interface());
        assert_eq!(
            parsed.methods[0].annotation_default,
            Some(ElementValue::Long(30))
        );
        assert_eq!(parsed.methods[1].parameter_name(0), Some("name"));
    }

    #[test]
    fn decodes_modified_utf8() {
        // "a\u{0}b" with NUL encoded on two bytes.
        assert_eq!(decode_utf8(&[b'a', 0xC0, 0x80, b'b']), "a\u{0}b");
        // U+1F600 as a surrogate pair, three bytes per half.
        let encoded = [0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80];
        assert_eq!(decode_utf8(&encoded), "\u{1F600}");
    }
}
