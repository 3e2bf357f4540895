pub mod entry;

pub use entry::ConstantPoolEntry;

use crate::error::{ClassFileError, Result};
use crate::stream::{Reader, Writer};

/// A resolved `Fieldref`/`Methodref`/`InterfaceMethodref`: owning class name,
/// member name, and descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRef {
    pub class_name: String,
    pub name: String,
    pub descriptor: String,
}

/// The resolved projection of a constant pool entry usable as an `ldc`-family
/// immediate value. Only `CONSTANT_Integer` and `CONSTANT_String` are
/// resolved; every other tag is a [`ClassFileError::WrongConstantPoolTag`].
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedConstant {
    Integer(i32),
    String(String),
}

/// The constant pool: an interning, append-only, 1-indexed table of
/// [`ConstantPoolEntry`] values.
///
/// Every `create_*`/`get_*_index` method uses a linear scan to find an
/// existing match before appending (no hash index is kept; pool sizes in
/// practice are small enough that this is fine).
#[derive(Debug, Clone, Default)]
pub struct ConstantPoolManager {
    entries: Vec<ConstantPoolEntry>,
}

impl ConstantPoolManager {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Read `count - 1` entries (the constant_pool_count field includes the
    /// fictitious zero entry, so `count - 1` real entries follow).
    pub fn read(r: &mut Reader, count: u16) -> Result<Self> {
        let mut entries = Vec::with_capacity(count.saturating_sub(1) as usize);
        for i in 1..count {
            entries.push(ConstantPoolEntry::read(r, i)?);
        }
        Ok(Self { entries })
    }

    pub fn write(&self, w: &mut Writer) {
        w.write_u2((self.entries.len() + 1) as u16);
        for entry in &self.entries {
            entry.write(w);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-indexed constant pool count field value (`entries.len() + 1`).
    pub fn count(&self) -> u16 {
        (self.entries.len() + 1) as u16
    }

    /// Fetch the raw entry at a 1-based pool index.
    pub fn get_item(&self, idx: u16) -> Result<&ConstantPoolEntry> {
        if idx == 0 {
            return Err(ClassFileError::BadConstantPoolIndex(idx));
        }
        self.entries
            .get(idx as usize - 1)
            .ok_or(ClassFileError::BadConstantPoolIndex(idx))
    }

    /// Resolve a `CONSTANT_Utf8` entry's string value by index.
    pub fn get_string(&self, idx: u16) -> Result<&str> {
        match self.get_item(idx)? {
            ConstantPoolEntry::Utf8 { data } => Ok(data.as_str()),
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_Utf8",
            }),
        }
    }

    /// Resolve a `CONSTANT_Class` entry's class name by index.
    pub fn get_class(&self, idx: u16) -> Result<&str> {
        match self.get_item(idx)? {
            ConstantPoolEntry::Class { name_index } => self.get_string(*name_index),
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_Class",
            }),
        }
    }

    /// Resolve a `CONSTANT_NameAndType` entry into `(name, descriptor)` by index.
    pub fn get_name_and_type(&self, idx: u16) -> Result<(&str, &str)> {
        match self.get_item(idx)? {
            ConstantPoolEntry::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.get_string(*name_index)?, self.get_string(*descriptor_index)?)),
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_NameAndType",
            }),
        }
    }

    /// Resolve a `CONSTANT_Methodref` entry into its owning class/name/descriptor.
    pub fn get_method(&self, idx: u16) -> Result<MemberRef> {
        match self.get_item(idx)? {
            ConstantPoolEntry::Methodref {
                class_index,
                name_and_type_index,
            } => {
                let class_name = self.get_class(*class_index)?.to_string();
                let (name, descriptor) = self.get_name_and_type(*name_and_type_index)?;
                Ok(MemberRef {
                    class_name,
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                })
            }
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_Methodref",
            }),
        }
    }

    /// Resolve a `CONSTANT_InterfaceMethodref` entry into its owning
    /// class/name/descriptor.
    pub fn get_interface_method(&self, idx: u16) -> Result<MemberRef> {
        match self.get_item(idx)? {
            ConstantPoolEntry::InterfaceMethodref {
                class_index,
                name_and_type_index,
            } => {
                let class_name = self.get_class(*class_index)?.to_string();
                let (name, descriptor) = self.get_name_and_type(*name_and_type_index)?;
                Ok(MemberRef {
                    class_name,
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                })
            }
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_InterfaceMethodref",
            }),
        }
    }

    /// Resolve a `CONSTANT_Fieldref` entry into its owning class/name/descriptor.
    pub fn get_field(&self, idx: u16) -> Result<MemberRef> {
        match self.get_item(idx)? {
            ConstantPoolEntry::Fieldref {
                class_index,
                name_and_type_index,
            } => {
                let class_name = self.get_class(*class_index)?.to_string();
                let (name, descriptor) = self.get_name_and_type(*name_and_type_index)?;
                Ok(MemberRef {
                    class_name,
                    name: name.to_string(),
                    descriptor: descriptor.to_string(),
                })
            }
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_Fieldref",
            }),
        }
    }

    /// Resolve a `CONSTANT_String` entry's referenced string by index.
    pub fn get_string_constant(&self, idx: u16) -> Result<&str> {
        match self.get_item(idx)? {
            ConstantPoolEntry::String { string_index } => self.get_string(*string_index),
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_String",
            }),
        }
    }

    /// Map a `newarray` `atype` operand byte (4..=11) to its array type name.
    /// Not a pool lookup — kept here to match spec.md §4.2's operation table,
    /// which groups it alongside the other `get_*` resolvers.
    pub fn get_array_type(&self, atype: u8) -> Result<crate::item::opcodes::ArrayTypeCode> {
        crate::item::opcodes::ArrayTypeCode::decode(atype)
    }

    /// Resolve a `CONSTANT_Integer` entry's value by index.
    pub fn get_integer(&self, idx: u16) -> Result<i32> {
        match self.get_item(idx)? {
            ConstantPoolEntry::Integer { value } => Ok(*value),
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_Integer",
            }),
        }
    }

    /// Resolve a constant loadable by the `ldc` family of opcodes. Only
    /// `CONSTANT_Integer` and `CONSTANT_String` are supported; every other
    /// tag fails, matching `get_value`'s contract in `original_source`.
    pub fn get_value(&self, idx: u16) -> Result<ResolvedConstant> {
        match self.get_item(idx)? {
            ConstantPoolEntry::Integer { value } => Ok(ResolvedConstant::Integer(*value)),
            ConstantPoolEntry::String { string_index } => {
                Ok(ResolvedConstant::String(self.get_string(*string_index)?.to_string()))
            }
            _ => Err(ClassFileError::WrongConstantPoolTag {
                index: idx,
                expected: "CONSTANT_Integer or CONSTANT_String",
            }),
        }
    }

    fn push(&mut self, entry: ConstantPoolEntry) -> u16 {
        self.entries.push(entry);
        self.entries.len() as u16
    }

    /// Find the index of an existing `CONSTANT_Utf8` entry with this exact text.
    pub fn get_string_index(&self, value: &str) -> Option<u16> {
        self.entries.iter().position(|e| matches!(e, ConstantPoolEntry::Utf8 { data } if data == value))
            .map(|i| (i + 1) as u16)
    }

    pub fn get_integer_index(&self, value: i32) -> Option<u16> {
        self.entries
            .iter()
            .position(|e| matches!(e, ConstantPoolEntry::Integer { value: v } if *v == value))
            .map(|i| (i + 1) as u16)
    }

    pub fn get_cstring_index(&self, value: &str) -> Option<u16> {
        self.entries.iter().position(|e| match e {
            ConstantPoolEntry::String { string_index } => self.get_string(*string_index) == Ok(value),
            _ => false,
        })
        .map(|i| (i + 1) as u16)
    }

    pub fn get_name_and_type_index(&self, name_index: u16, descriptor_index: u16) -> Option<u16> {
        self.entries
            .iter()
            .position(|e| {
                matches!(e, ConstantPoolEntry::NameAndType { name_index: n, descriptor_index: d }
                    if *n == name_index && *d == descriptor_index)
            })
            .map(|i| (i + 1) as u16)
    }

    pub fn get_class_by_name_index(&self, name_index: u16) -> Option<u16> {
        self.entries
            .iter()
            .position(|e| matches!(e, ConstantPoolEntry::Class { name_index: n } if *n == name_index))
            .map(|i| (i + 1) as u16)
    }

    pub fn get_method_ref_index(&self, class_index: u16, name_and_type_index: u16) -> Option<u16> {
        self.entries
            .iter()
            .position(|e| {
                matches!(e, ConstantPoolEntry::Methodref { class_index: c, name_and_type_index: n }
                    if *c == class_index && *n == name_and_type_index)
            })
            .map(|i| (i + 1) as u16)
    }

    pub fn get_field_ref_index(&self, class_index: u16, name_and_type_index: u16) -> Option<u16> {
        self.entries
            .iter()
            .position(|e| {
                matches!(e, ConstantPoolEntry::Fieldref { class_index: c, name_and_type_index: n }
                    if *c == class_index && *n == name_and_type_index)
            })
            .map(|i| (i + 1) as u16)
    }

    /// Intern a UTF-8 string, returning its existing index if already present.
    pub fn add_string(&mut self, value: &str) -> u16 {
        if let Some(idx) = self.get_string_index(value) {
            return idx;
        }
        self.push(ConstantPoolEntry::Utf8 { data: value.to_string() })
    }

    /// Intern a `CONSTANT_Class` entry for this binary class name.
    pub fn create_class(&mut self, name: &str) -> u16 {
        let name_index = self.add_string(name);
        if let Some(idx) = self.get_class_by_name_index(name_index) {
            return idx;
        }
        self.push(ConstantPoolEntry::Class { name_index })
    }

    /// Intern a `CONSTANT_NameAndType` entry for this name/descriptor pair.
    pub fn create_name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.add_string(name);
        let descriptor_index = self.add_string(descriptor);
        self.create_name_and_type_by_index(name_index, descriptor_index)
    }

    pub fn create_name_and_type_by_index(&mut self, name_index: u16, descriptor_index: u16) -> u16 {
        if let Some(idx) = self.get_name_and_type_index(name_index, descriptor_index) {
            return idx;
        }
        self.push(ConstantPoolEntry::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    /// Intern a `CONSTANT_Methodref` entry for the given class/name-and-type indices.
    pub fn create_method_ref(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        if let Some(idx) = self.get_method_ref_index(class_index, name_and_type_index) {
            return idx;
        }
        self.push(ConstantPoolEntry::Methodref {
            class_index,
            name_and_type_index,
        })
    }

    /// Intern a `CONSTANT_Fieldref` entry for the given class/name-and-type indices.
    pub fn create_field_ref(&mut self, class_index: u16, name_and_type_index: u16) -> u16 {
        if let Some(idx) = self.get_field_ref_index(class_index, name_and_type_index) {
            return idx;
        }
        self.push(ConstantPoolEntry::Fieldref {
            class_index,
            name_and_type_index,
        })
    }

    /// Intern a `CONSTANT_Integer` entry for this value.
    pub fn create_integer(&mut self, value: i32) -> u16 {
        if let Some(idx) = self.get_integer_index(value) {
            return idx;
        }
        self.push(ConstantPoolEntry::Integer { value })
    }

    /// Intern a `CONSTANT_String` entry (and its backing `CONSTANT_Utf8`) for this value.
    pub fn create_string(&mut self, value: &str) -> u16 {
        if let Some(idx) = self.get_cstring_index(value) {
            return idx;
        }
        let string_index = self.add_string(value);
        self.push(ConstantPoolEntry::String { string_index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_string_is_idempotent() {
        let mut pool = ConstantPoolManager::new();
        let a = pool.add_string("hello");
        let b = pool.add_string("hello");
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn create_method_ref_is_idempotent() {
        let mut pool = ConstantPoolManager::new();
        let class_index = pool.create_class("java/lang/Object");
        let nat_index = pool.create_name_and_type("<init>", "()V");
        let a = pool.create_method_ref(class_index, nat_index);
        let b = pool.create_method_ref(class_index, nat_index);
        assert_eq!(a, b);

        let resolved = pool.get_method(a).unwrap();
        assert_eq!(resolved.class_name, "java/lang/Object");
        assert_eq!(resolved.name, "<init>");
        assert_eq!(resolved.descriptor, "()V");
    }

    #[test]
    fn round_trip_read_write() {
        let mut pool = ConstantPoolManager::new();
        pool.create_string("x");
        pool.create_integer(42);

        let mut w = Writer::new();
        pool.write(&mut w);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let count = r.read_u2().unwrap();
        let read_back = ConstantPoolManager::read(&mut r, count).unwrap();
        assert_eq!(read_back.len(), pool.len());
        assert_eq!(read_back.get_integer(read_back.len() as u16).unwrap(), 42);
    }
}
