use crate::error::{ClassFileError, Result};
use crate::item::attributes::AttributesCollection;
use crate::item::constant_pool::ConstantPoolManager;
use crate::stream::{Reader, Writer};

bitflags::bitflags! {
    pub struct FieldAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared private; usable only within the defining class.
        const ACC_PRIVATE = 0x0002;
        /// Declared protected; may be accessed within subclasses.
        const ACC_PROTECTED = 0x0004;
        /// Declared static.
        const ACC_STATIC = 0x0008;
        /// Declared final; never directly assigned to after object construction.
        const ACC_FINAL = 0x0010;
        /// Declared volatile; cannot be cached.
        const ACC_VOLATILE = 0x0040;
        /// Declared transient; not written or read by a persistent object manager.
        const ACC_TRANSIENT = 0x0080;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
        /// Declared as an element of an enum.
        const ACC_ENUM = 0x4000;
    }
}

/// A `field_info` structure: access flags, name, descriptor, and an
/// attributes table (typically just `ConstantValue` for a `static final`
/// field with a compile-time constant).
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access_flags: FieldAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: AttributesCollection,
}

impl FieldInfo {
    pub fn decode(r: &mut Reader, pool: &ConstantPoolManager) -> Result<Self> {
        let bits = r.read_u2()?;
        let access_flags = FieldAccessFlags::from_bits(bits).ok_or(ClassFileError::BadAccessFlags {
            kind: "field",
            bits,
        })?;
        let name_index = r.read_u2()?;
        let descriptor_index = r.read_u2()?;
        let attributes = AttributesCollection::decode(r, pool)?;

        Ok(Self {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    pub fn encode(&self, w: &mut Writer, pool: &mut ConstantPoolManager) {
        w.write_u2(self.access_flags.bits());
        w.write_u2(self.name_index);
        w.write_u2(self.descriptor_index);
        self.attributes.encode(w, pool);
    }

    pub fn get_name<'a>(&self, pool: &'a ConstantPoolManager) -> Result<&'a str> {
        pool.get_string(self.name_index)
    }

    pub fn get_descriptor<'a>(&self, pool: &'a ConstantPoolManager) -> Result<&'a str> {
        pool.get_string(self.descriptor_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let mut pool = ConstantPoolManager::new();
        let name_index = pool.add_string("count");
        let descriptor_index = pool.add_string("I");

        let mut w = Writer::new();
        w.write_u2(FieldAccessFlags::ACC_PRIVATE.bits());
        w.write_u2(name_index);
        w.write_u2(descriptor_index);
        w.write_u2(0); // attributes_count
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let field = FieldInfo::decode(&mut r, &pool).unwrap();
        assert_eq!(field.get_name(&pool).unwrap(), "count");
        assert_eq!(field.get_descriptor(&pool).unwrap(), "I");
        assert!(field.access_flags.contains(FieldAccessFlags::ACC_PRIVATE));

        let mut w2 = Writer::new();
        field.encode(&mut w2, &mut pool);
        assert_eq!(w2.into_bytes(), bytes);
    }

    #[test]
    fn rejects_unknown_access_flag_bits() {
        let pool = ConstantPoolManager::new();
        let mut w = Writer::new();
        w.write_u2(0x8000); // no ACC_* constant covers this bit
        w.write_u2(1);
        w.write_u2(1);
        w.write_u2(0);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert!(matches!(
            FieldInfo::decode(&mut r, &pool),
            Err(ClassFileError::BadAccessFlags { kind: "field", .. })
        ));
    }
}
