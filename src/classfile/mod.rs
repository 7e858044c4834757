//! Compiled type header parser
//!
//! Reads just enough of a `.class` file to answer "what is this type called
//! and what does it extend": the magic number, version, constant pool, access
//! flags, this/super class and the interface table. Fields, methods and
//! attributes are never touched.

use thiserror::Error;

mod reader;

use reader::ByteReader;

/// Magic number at the start of every compiled type
pub const MAGIC: u32 = 0xCAFE_BABE;

bitflags::bitflags! {
    /// Type-level access flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

/// Errors produced while parsing a type header
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassFormatError {
    #[error("bad magic number 0x{0:08X}")]
    BadMagic(u32),

    #[error("unexpected end of data at offset {0}")]
    Truncated(usize),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("constant pool index {index} does not refer to {expected}")]
    BadConstant { index: u16, expected: &'static str },

    #[error("invalid modified UTF-8 in constant {0}")]
    InvalidUtf8(u16),
}

/// Parsed type header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub minor_version: u16,
    pub major_version: u16,
    pub access: AccessFlags,
    /// Qualified name of the type itself (`a.b.C`)
    pub this_class: String,
    /// Qualified name of the direct supertype, `None` for root types and modules
    pub super_class: Option<String>,
    /// Qualified names of directly implemented interfaces, in declaration order
    pub interfaces: Vec<String>,
}

/// Constant pool slot; only what header resolution needs is kept
#[derive(Debug, Clone)]
enum Constant {
    /// Unused slot (index 0 and the upper half of long/double)
    Empty,
    Utf8(String),
    Class { name_index: u16 },
    Other,
}

/// Parse the header of a compiled type
///
/// # Errors
/// Returns a [`ClassFormatError`] if the data is not a well-formed type header.
pub fn parse(bytes: &[u8]) -> Result<ClassHeader, ClassFormatError> {
    let mut reader = ByteReader::new(bytes);

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFormatError::BadMagic(magic));
    }

    let minor_version = reader.u16()?;
    let major_version = reader.u16()?;
    let pool = read_constant_pool(&mut reader)?;

    let access = AccessFlags::from_bits_retain(reader.u16()?);
    let this_class = class_name(&pool, reader.u16()?)?;
    let super_class = match reader.u16()? {
        0 => None,
        index => Some(class_name(&pool, index)?),
    };

    let interface_count = reader.u16()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0..interface_count {
        interfaces.push(class_name(&pool, reader.u16()?)?);
    }

    Ok(ClassHeader {
        minor_version,
        major_version,
        access,
        this_class,
        super_class,
        interfaces,
    })
}

/// Convert an internal name (`a/b/C`) to qualified form (`a.b.C`)
#[must_use]
pub fn to_qualified(internal: &str) -> String {
    internal.replace('/', ".")
}

fn read_constant_pool(reader: &mut ByteReader<'_>) -> Result<Vec<Constant>, ClassFormatError> {
    let count = reader.u16()?;
    let mut pool = Vec::with_capacity(usize::from(count));
    pool.push(Constant::Empty);

    let mut index: u16 = 1;
    while index < count {
        let tag = reader.u8()?;
        let constant = match tag {
            1 => {
                let len = usize::from(reader.u16()?);
                let raw = reader.bytes(len)?;
                let text = decode_modified_utf8(raw).ok_or(ClassFormatError::InvalidUtf8(index))?;
                Constant::Utf8(text)
            }
            // Integer, Float
            3 | 4 => {
                reader.skip(4)?;
                Constant::Other
            }
            // Long and Double take two slots
            5 | 6 => {
                reader.skip(8)?;
                pool.push(Constant::Other);
                pool.push(Constant::Empty);
                index = index.saturating_add(2);
                continue;
            }
            7 => Constant::Class {
                name_index: reader.u16()?,
            },
            // String, MethodType, Module, Package
            8 | 16 | 19 | 20 => {
                reader.skip(2)?;
                Constant::Other
            }
            // Field/Method/InterfaceMethod refs, NameAndType, Dynamic, InvokeDynamic
            9 | 10 | 11 | 12 | 17 | 18 => {
                reader.skip(4)?;
                Constant::Other
            }
            // MethodHandle
            15 => {
                reader.skip(3)?;
                Constant::Other
            }
            _ => return Err(ClassFormatError::UnknownTag { tag, index }),
        };
        pool.push(constant);
        index += 1;
    }

    Ok(pool)
}

fn class_name(pool: &[Constant], index: u16) -> Result<String, ClassFormatError> {
    let name_index = match pool.get(usize::from(index)) {
        Some(Constant::Class { name_index }) => *name_index,
        _ => {
            return Err(ClassFormatError::BadConstant {
                index,
                expected: "a class",
            })
        }
    };

    match pool.get(usize::from(name_index)) {
        Some(Constant::Utf8(name)) => Ok(to_qualified(name)),
        _ => Err(ClassFormatError::BadConstant {
            index: name_index,
            expected: "a UTF-8 string",
        }),
    }
}

/// Decode the modified UTF-8 used by constant pool strings
///
/// Differs from standard UTF-8 in two ways: NUL is encoded as `C0 80` and
/// supplementary characters are encoded as a surrogate pair of 3-byte sequences.
fn decode_modified_utf8(raw: &[u8]) -> Option<String> {
    if let Ok(text) = std::str::from_utf8(raw) {
        if !raw.contains(&0) {
            return Some(text.to_owned());
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b0 = raw[i];
        match b0 {
            0x01..=0x7F => {
                units.push(u16::from(b0));
                i += 1;
            }
            0xC0..=0xDF => {
                let b1 = continuation(raw, i + 1)?;
                units.push((u16::from(b0 & 0x1F) << 6) | b1);
                i += 2;
            }
            0xE0..=0xEF => {
                let b1 = continuation(raw, i + 1)?;
                let b2 = continuation(raw, i + 2)?;
                units.push((u16::from(b0 & 0x0F) << 12) | (b1 << 6) | b2);
                i += 3;
            }
            _ => return None,
        }
    }

    String::from_utf16(&units).ok()
}

fn continuation(raw: &[u8], at: usize) -> Option<u16> {
    match raw.get(at) {
        Some(b) if b & 0xC0 == 0x80 => Some(u16::from(b & 0x3F)),
        _ => None,
    }
}
