//! Decoder for compiled `.class` files.
//!
//! Only the structural parts needed for type information are kept: the constant pool is
//! resolved while reading and discarded afterwards, and attribute bodies are stored as
//! raw bytes (base64 for `Code`).

use crate::domain::model::{
    AccessFlags, AttributeData, ClassVersion, DecodedAttribute, DecodedClass, DecodedField,
    DecodedMethod,
};
use crate::utils::error::{Result, TypeInfoError};
use base64::engine::general_purpose::STANDARD as Base64;
use base64::Engine;
use std::path::Path;

const CLASS_MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Slot zero, and the second slot taken by every long and double.
    Unusable,
}

#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn read(reader: &mut ClassReader<'_>) -> Result<Self> {
        let count = reader.u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable);

        while entries.len() < count {
            let index = entries.len();
            let tag = reader.u1()?;
            let constant = match tag {
                1 => {
                    let length = reader.u2()? as usize;
                    Constant::Utf8(decode_modified_utf8(reader.bytes(length)?)?)
                }
                3 => Constant::Integer(reader.u4()? as i32),
                4 => Constant::Float(f32::from_bits(reader.u4()?)),
                5 => Constant::Long(reader.u8()? as i64),
                6 => Constant::Double(f64::from_bits(reader.u8()?)),
                7 => Constant::Class {
                    name_index: reader.u2()?,
                },
                8 => Constant::String {
                    string_index: reader.u2()?,
                },
                9 => Constant::FieldRef {
                    class_index: reader.u2()?,
                    name_and_type_index: reader.u2()?,
                },
                10 => Constant::MethodRef {
                    class_index: reader.u2()?,
                    name_and_type_index: reader.u2()?,
                },
                11 => Constant::InterfaceMethodRef {
                    class_index: reader.u2()?,
                    name_and_type_index: reader.u2()?,
                },
                12 => Constant::NameAndType {
                    name_index: reader.u2()?,
                    descriptor_index: reader.u2()?,
                },
                15 => Constant::MethodHandle {
                    kind: reader.u1()?,
                    reference_index: reader.u2()?,
                },
                16 => Constant::MethodType {
                    descriptor_index: reader.u2()?,
                },
                17 => Constant::Dynamic {
                    bootstrap_index: reader.u2()?,
                    name_and_type_index: reader.u2()?,
                },
                18 => Constant::InvokeDynamic {
                    bootstrap_index: reader.u2()?,
                    name_and_type_index: reader.u2()?,
                },
                19 => Constant::Module {
                    name_index: reader.u2()?,
                },
                20 => Constant::Package {
                    name_index: reader.u2()?,
                },
                _ => return Err(TypeInfoError::UnsupportedConstantPoolTag { tag, index }),
            };
            let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
            entries.push(constant);
            if wide {
                entries.push(Constant::Unusable);
            }
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(TypeInfoError::class_format(format!(
                "constant pool index {} is not usable",
                index
            ))),
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Utf8(s) => Ok(s),
            other => Err(TypeInfoError::class_format(format!(
                "constant pool index {} is {:?}, expected a UTF-8 entry",
                index, other
            ))),
        }
    }

    pub fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            other => Err(TypeInfoError::class_format(format!(
                "constant pool index {} is {:?}, expected a class entry",
                index, other
            ))),
        }
    }
}

struct ClassReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| {
                TypeInfoError::class_format(format!(
                    "truncated class file: needed {} bytes at offset {}",
                    count, self.pos
                ))
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u1(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u2(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u4(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u8(&mut self) -> Result<u64> {
        let b = self.bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }
}

/// Decode the class file held in `bytes`.
pub fn decode_class(bytes: &[u8]) -> Result<DecodedClass> {
    let mut reader = ClassReader::new(bytes);
    if reader.bytes(4)? != CLASS_MAGIC {
        return Err(TypeInfoError::class_format("invalid class file signature"));
    }
    let minor = reader.u2()?;
    let major = reader.u2()?;
    let pool = ConstantPool::read(&mut reader)?;

    let mods = AccessFlags(reader.u2()?);
    let thisclass = pool.class_name(reader.u2()?)?.to_string();
    // java/lang/Object is the only class without a superclass
    let superclass = match reader.u2()? {
        0 => None,
        index => Some(pool.class_name(index)?.to_string()),
    };

    let interface_count = reader.u2()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(reader.u2()?)?.to_string());
    }

    let field_count = reader.u2()?;
    let mut fields = Vec::with_capacity(field_count as usize);
    for _ in 0..field_count {
        fields.push(DecodedField {
            mods: AccessFlags(reader.u2()?),
            name: pool.utf8(reader.u2()?)?.to_string(),
            descriptor: pool.utf8(reader.u2()?)?.to_string(),
            attributes: read_attributes(&mut reader, &pool)?,
            docs: String::new(),
        });
    }

    let method_count = reader.u2()?;
    let mut methods = Vec::with_capacity(method_count as usize);
    for _ in 0..method_count {
        methods.push(DecodedMethod {
            mods: AccessFlags(reader.u2()?),
            name: pool.utf8(reader.u2()?)?.to_string(),
            sig: pool.utf8(reader.u2()?)?.to_string(),
            attributes: read_attributes(&mut reader, &pool)?,
            docs: String::new(),
            pnames: Vec::new(),
        });
    }

    let attributes = read_attributes(&mut reader, &pool)?;

    tracing::trace!(
        "Decoded {} (v{}.{}): {} fields, {} methods, {} constants",
        thisclass,
        major,
        minor,
        fields.len(),
        methods.len(),
        pool.len()
    );

    Ok(DecodedClass {
        version: ClassVersion { minor, major },
        mods,
        thisclass,
        superclass,
        interfaces,
        fields,
        methods,
        attributes,
        docs: String::new(),
    })
}

pub fn decode_class_file<P: AsRef<Path>>(path: P) -> Result<DecodedClass> {
    let bytes = std::fs::read(path)?;
    decode_class(&bytes)
}

fn read_attributes(reader: &mut ClassReader<'_>, pool: &ConstantPool) -> Result<Vec<DecodedAttribute>> {
    let count = reader.u2()?;
    let mut attributes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = pool.utf8(reader.u2()?)?.to_string();
        let length = reader.u4()? as usize;
        let info = reader.bytes(length)?;

        let signature = if name == "Signature" {
            if info.len() != 2 {
                return Err(TypeInfoError::class_format(format!(
                    "Signature attribute has length {}, expected 2",
                    info.len()
                )));
            }
            Some(pool.utf8(u16::from_be_bytes([info[0], info[1]]))?.to_string())
        } else {
            None
        };

        let info = if name == "Code" {
            AttributeData::Encoded(Base64.encode(info))
        } else {
            AttributeData::Raw(info.to_vec())
        };

        attributes.push(DecodedAttribute {
            name,
            info,
            signature,
        });
    }
    Ok(attributes)
}

/// Class files store strings as "modified UTF-8": NUL is two bytes and supplementary
/// characters are surrogate pairs encoded separately.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return Ok(s.to_string());
    }

    fn continuation(bytes: &[u8], index: usize) -> Result<u16> {
        match bytes.get(index) {
            Some(b) if b & 0xC0 == 0x80 => Ok((b & 0x3F) as u16),
            _ => Err(TypeInfoError::class_format(format!(
                "invalid modified UTF-8 continuation at byte {}",
                index
            ))),
        }
    }

    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let (unit, width) = match b {
            0x00..=0x7F => (b as u16, 1),
            0xC0..=0xDF => ((((b & 0x1F) as u16) << 6) | continuation(bytes, i + 1)?, 2),
            0xE0..=0xEF => (
                (((b & 0x0F) as u16) << 12)
                    | (continuation(bytes, i + 1)? << 6)
                    | continuation(bytes, i + 2)?,
                3,
            ),
            _ => {
                return Err(TypeInfoError::class_format(format!(
                    "invalid modified UTF-8 byte 0x{:02x}",
                    b
                )))
            }
        };
        units.push(unit);
        i += width;
    }

    Ok(char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}
