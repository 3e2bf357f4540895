use crate::error::{ClassFileError, Result};
use crate::item::attributes::{Attribute, AttributesCollection, CodeAttribute};
use crate::item::constant_pool::ConstantPoolManager;
use crate::stream::{Reader, Writer};

bitflags::bitflags! {
    pub struct MethodAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared private; accessible only within the defining class.
        const ACC_PRIVATE = 0x0002;
        /// Declared protected; may be accessed within subclasses.
        const ACC_PROTECTED = 0x0004;
        /// Declared static.
        const ACC_STATIC = 0x0008;
        /// Declared final; must not be overridden.
        const ACC_FINAL = 0x0010;
        /// Declared synchronized; invocation is wrapped by a monitor lock.
        const ACC_SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler.
        const ACC_BRIDGE = 0x0040;
        /// Declared with a variable number of arguments.
        const ACC_VARARGS = 0x0080;
        /// Declared native; implemented in a language other than the JVM's.
        const ACC_NATIVE = 0x0100;
        /// Declared abstract; no implementation is provided.
        const ACC_ABSTRACT = 0x0400;
        /// Declared strictfp.
        const ACC_STRICT = 0x0800;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
    }
}

/// A `method_info` structure: access flags, name, descriptor, and an
/// attributes table. Non-abstract, non-native methods carry a `Code`
/// attribute; [`MethodInfo::get_code`] is the shortcut to it.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: AttributesCollection,
}

impl MethodInfo {
    pub fn decode(r: &mut Reader, pool: &ConstantPoolManager) -> Result<Self> {
        let bits = r.read_u2()?;
        let access_flags = MethodAccessFlags::from_bits(bits).ok_or(ClassFileError::BadAccessFlags {
            kind: "method",
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

    pub fn set_name(&mut self, name: &str, pool: &mut ConstantPoolManager) {
        self.name_index = pool.add_string(name);
    }

    pub fn get_descriptor<'a>(&self, pool: &'a ConstantPoolManager) -> Result<&'a str> {
        pool.get_string(self.descriptor_index)
    }

    /// Does this method already have this exact descriptor? A read-only
    /// predicate, not a setter — mirrors `with_descriptor` in
    /// `original_source`, which is just
    /// `descriptor == CM.get_string(descriptor_index)`.
    pub fn with_descriptor(&self, descriptor: &str, pool: &ConstantPoolManager) -> bool {
        pool.get_string(self.descriptor_index).map(|d| d == descriptor).unwrap_or(false)
    }

    pub fn get_code(&self) -> Result<&CodeAttribute> {
        self.attributes
            .get("Code")
            .and_then(|a| match a {
                Attribute::Code(code) => Some(code),
                _ => None,
            })
            .ok_or_else(|| ClassFileError::NoCodeAttribute(self.name_index.to_string()))
    }

    pub fn get_code_mut(&mut self) -> Result<&mut CodeAttribute> {
        self.attributes
            .get_mut("Code")
            .and_then(|a| match a {
                Attribute::Code(code) => Some(code),
                _ => None,
            })
            .ok_or_else(|| ClassFileError::NoCodeAttribute(self.name_index.to_string()))
    }

    pub fn get_attributes(&self) -> &AttributesCollection {
        &self.attributes
    }

    pub fn get_access(&self) -> MethodAccessFlags {
        self.access_flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_attr_bytes(pool: &mut ConstantPoolManager) -> Vec<u8> {
        let name_index = pool.add_string("Code");
        let mut body = Writer::new();
        body.write_u2(2); // max_stack
        body.write_u2(1); // max_locals
        let code = [0xb1]; // return
        body.write_u4(code.len() as u32);
        body.write_bytes(&code);
        body.write_u2(0); // exception_table_length
        body.write_u2(0); // attributes_count
        let body = body.into_bytes();

        let mut w = Writer::new();
        w.write_u2(name_index);
        w.write_u4(body.len() as u32);
        w.write_bytes(&body);
        w.into_bytes()
    }

    #[test]
    fn round_trips_through_bytes_with_code() {
        let mut pool = ConstantPoolManager::new();
        let name_index = pool.add_string("run");
        let descriptor_index = pool.add_string("()V");
        let code_attr = code_attr_bytes(&mut pool);

        let mut w = Writer::new();
        w.write_u2(MethodAccessFlags::ACC_PUBLIC.bits());
        w.write_u2(name_index);
        w.write_u2(descriptor_index);
        w.write_u2(1); // attributes_count
        w.write_bytes(&code_attr);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let method = MethodInfo::decode(&mut r, &pool).unwrap();
        assert_eq!(method.get_name(&pool).unwrap(), "run");
        let code = method.get_code().unwrap();
        assert_eq!(code.get_max_stack(), 2);
        assert_eq!(code.get_bc().len(), 1);

        let mut w2 = Writer::new();
        method.encode(&mut w2, &mut pool);
        assert_eq!(w2.into_bytes(), bytes);
    }

    #[test]
    fn get_code_fails_without_code_attribute() {
        let mut pool = ConstantPoolManager::new();
        let name_index = pool.add_string("values");
        let descriptor_index = pool.add_string("()[I");

        let mut w = Writer::new();
        w.write_u2(MethodAccessFlags::ACC_PUBLIC.bits() | MethodAccessFlags::ACC_ABSTRACT.bits());
        w.write_u2(name_index);
        w.write_u2(descriptor_index);
        w.write_u2(0);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        let method = MethodInfo::decode(&mut r, &pool).unwrap();
        assert!(matches!(method.get_code(), Err(ClassFileError::NoCodeAttribute(_))));
    }
}
