use crate::error::{ClassFileError, Result};
use crate::stream::{Reader, Writer};

/// The tag values for each type of constant pool entry.
///
/// Only the eleven tags spec'd here are recognised; `CONSTANT_MethodHandle`
/// (15), `CONSTANT_MethodType` (16) and `CONSTANT_InvokeDynamic` (18) are
/// not part of this crate's data model (see DESIGN.md).
mod tags {
    pub const CONSTANT_UTF8: u8 = 1;
    pub const CONSTANT_INTEGER: u8 = 3;
    pub const CONSTANT_FLOAT: u8 = 4;
    pub const CONSTANT_LONG: u8 = 5;
    pub const CONSTANT_DOUBLE: u8 = 6;
    pub const CONSTANT_CLASS: u8 = 7;
    pub const CONSTANT_STRING: u8 = 8;
    pub const CONSTANT_FIELDREF: u8 = 9;
    pub const CONSTANT_METHODREF: u8 = 10;
    pub const CONSTANT_INTERFACE_METHODREF: u8 = 11;
    pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
}

/// A single constant pool entry.
///
/// Decoding performs no cross-index verification: `name_index` et al. are
/// stored as raw `u16`s and only resolved lazily by
/// [`super::ConstantPoolManager`].
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolEntry {
    Utf8 { data: String },
    Integer { value: i32 },
    Float { value: u32 },
    Long { value: i64 },
    Double { value: u64 },
    Class { name_index: u16 },
    String { string_index: u16 },
    Fieldref { class_index: u16, name_and_type_index: u16 },
    Methodref { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodref { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
}

impl ConstantPoolEntry {
    pub fn tag(&self) -> u8 {
        match self {
            Self::Utf8 { .. } => tags::CONSTANT_UTF8,
            Self::Integer { .. } => tags::CONSTANT_INTEGER,
            Self::Float { .. } => tags::CONSTANT_FLOAT,
            Self::Long { .. } => tags::CONSTANT_LONG,
            Self::Double { .. } => tags::CONSTANT_DOUBLE,
            Self::Class { .. } => tags::CONSTANT_CLASS,
            Self::String { .. } => tags::CONSTANT_STRING,
            Self::Fieldref { .. } => tags::CONSTANT_FIELDREF,
            Self::Methodref { .. } => tags::CONSTANT_METHODREF,
            Self::InterfaceMethodref { .. } => tags::CONSTANT_INTERFACE_METHODREF,
            Self::NameAndType { .. } => tags::CONSTANT_NAME_AND_TYPE,
        }
    }

    pub fn read(r: &mut Reader, index: u16) -> Result<Self> {
        match r.read_u1()? {
            tags::CONSTANT_UTF8 => {
                let length = r.read_u2()?;
                let bytes = r.read_bytes(length as usize)?.to_vec();
                Ok(Self::Utf8 {
                    data: String::from_utf8(bytes)?,
                })
            }
            tags::CONSTANT_INTEGER => Ok(Self::Integer {
                value: r.read_i32()?,
            }),
            tags::CONSTANT_FLOAT => Ok(Self::Float {
                value: r.read_u4()?,
            }),
            tags::CONSTANT_LONG => Ok(Self::Long {
                value: r.read_u8()? as i64,
            }),
            tags::CONSTANT_DOUBLE => Ok(Self::Double {
                value: r.read_u8()?,
            }),
            tags::CONSTANT_CLASS => Ok(Self::Class {
                name_index: r.read_u2()?,
            }),
            tags::CONSTANT_STRING => Ok(Self::String {
                string_index: r.read_u2()?,
            }),
            tags::CONSTANT_FIELDREF => Ok(Self::Fieldref {
                class_index: r.read_u2()?,
                name_and_type_index: r.read_u2()?,
            }),
            tags::CONSTANT_METHODREF => Ok(Self::Methodref {
                class_index: r.read_u2()?,
                name_and_type_index: r.read_u2()?,
            }),
            tags::CONSTANT_INTERFACE_METHODREF => Ok(Self::InterfaceMethodref {
                class_index: r.read_u2()?,
                name_and_type_index: r.read_u2()?,
            }),
            tags::CONSTANT_NAME_AND_TYPE => Ok(Self::NameAndType {
                name_index: r.read_u2()?,
                descriptor_index: r.read_u2()?,
            }),
            other => Err(ClassFileError::UnknownConstantPoolTag(other, index)),
        }
    }

    pub fn write(&self, w: &mut Writer) {
        w.write_u1(self.tag());
        match self {
            Self::Utf8 { data } => {
                w.write_u2(data.len() as u16);
                w.write_bytes(data.as_bytes());
            }
            Self::Integer { value } => w.write_i32(*value),
            Self::Float { value } => w.write_u4(*value),
            Self::Long { value } => w.write_u8(*value as u64),
            Self::Double { value } => w.write_u8(*value),
            Self::Class { name_index } => w.write_u2(*name_index),
            Self::String { string_index } => w.write_u2(*string_index),
            Self::Fieldref {
                class_index,
                name_and_type_index,
            }
            | Self::Methodref {
                class_index,
                name_and_type_index,
            }
            | Self::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => {
                w.write_u2(*class_index);
                w.write_u2(*name_and_type_index);
            }
            Self::NameAndType {
                name_index,
                descriptor_index,
            } => {
                w.write_u2(*name_index);
                w.write_u2(*descriptor_index);
            }
        }
    }
}
