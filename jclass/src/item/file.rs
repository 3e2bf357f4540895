use regex::Regex;

use crate::error::{ClassFileError, Result};
use crate::importer;
use crate::item::attributes::{Attribute, AttributesCollection, CodeAttribute};
use crate::item::constant_pool::ConstantPoolManager;
use crate::item::fields::FieldInfo;
use crate::item::methods::{MethodAccessFlags, MethodInfo};
use crate::item::opcodes::{InstructionList, SpecOperand};
use crate::stream::{Reader, Writer};

pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// `re.is_match` searches anywhere in the string; Python's `re.match`
/// (what these lookups are grounded on) only ever tries a match starting at
/// position 0. `Regex` has no direct equivalent, so this checks that the
/// leftmost match, if any, starts at the beginning.
fn matches_prefix(re: &Regex, haystack: &str) -> bool {
    re.find(haystack).map(|m| m.start() == 0).unwrap_or(false)
}

bitflags::bitflags! {
    pub struct ClassAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared final; no subclasses allowed.
        const ACC_FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by `invokespecial`.
        const ACC_SUPER = 0x0020;
        /// Is an interface, not a class.
        const ACC_INTERFACE = 0x0200;
        /// Declared abstract; must not be instantiated.
        const ACC_ABSTRACT = 0x0400;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
        /// Declared as an annotation type.
        const ACC_ANNOTATION = 0x2000;
        /// Declared as an enum type.
        const ACC_ENUM = 0x4000;
    }
}

/// A decoded `.class` file: the constant pool plus the header fields,
/// fields, methods, and attributes that reference it.
#[derive(Debug, Clone)]
pub struct ClassFile {
    pub version: (u16, u16),
    pub constant_pool: ConstantPoolManager,
    pub access_flags: ClassAccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: AttributesCollection,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);

        let magic = r.read_u4()?;
        if magic != CLASS_MAGIC {
            return Err(ClassFileError::BadMagicNumber(magic));
        }

        let minor_version = r.read_u2()?;
        let major_version = r.read_u2()?;

        let constant_pool_count = r.read_u2()?;
        let constant_pool = ConstantPoolManager::read(&mut r, constant_pool_count)?;

        let bits = r.read_u2()?;
        let access_flags = ClassAccessFlags::from_bits(bits).ok_or(ClassFileError::BadAccessFlags {
            kind: "class",
            bits,
        })?;

        let this_class = r.read_u2()?;
        let super_class = r.read_u2()?;

        let interfaces_count = r.read_u2()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(r.read_u2()?);
        }

        let fields_count = r.read_u2()?;
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            fields.push(FieldInfo::decode(&mut r, &constant_pool)?);
        }

        let methods_count = r.read_u2()?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(MethodInfo::decode(&mut r, &constant_pool)?);
        }

        let attributes = AttributesCollection::decode(&mut r, &constant_pool)?;

        Ok(Self {
            version: (major_version, minor_version),
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    pub fn save(&mut self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_u4(CLASS_MAGIC);
        w.write_u2(self.version.1);
        w.write_u2(self.version.0);

        // The constant pool may grow while fields/methods/attributes encode
        // (attribute names are re-interned, inserted methods may reference
        // fresh entries), so the pool header is written last via a
        // temporary buffer, not patched in place.
        let mut body = Writer::new();
        body.write_u2(self.access_flags.bits());
        body.write_u2(self.this_class);
        body.write_u2(self.super_class);
        body.write_u2(self.interfaces.len() as u16);
        for idx in &self.interfaces {
            body.write_u2(*idx);
        }
        body.write_u2(self.fields.len() as u16);
        for field in &self.fields {
            field.encode(&mut body, &mut self.constant_pool);
        }
        body.write_u2(self.methods.len() as u16);
        for method in &self.methods {
            method.encode(&mut body, &mut self.constant_pool);
        }
        self.attributes.encode(&mut body, &mut self.constant_pool);

        self.constant_pool.write(&mut w);
        w.write_bytes(&body.into_bytes());
        w.into_bytes()
    }

    pub fn get_class_manager(&self) -> &ConstantPoolManager {
        &self.constant_pool
    }

    pub fn get_class_manager_mut(&mut self) -> &mut ConstantPoolManager {
        &mut self.constant_pool
    }

    /// Alias for [`Self::get_class_manager`], matching spec.md §6's surface,
    /// which names both `get_constant_pool()` and `get_class_manager()`.
    pub fn get_constant_pool(&self) -> &ConstantPoolManager {
        &self.constant_pool
    }

    pub fn get_fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn get_methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn this_class_name(&self) -> Result<&str> {
        self.constant_pool.get_class(self.this_class)
    }

    /// Every `CONSTANT_Utf8` string literal value in the pool, in pool order.
    pub fn get_strings(&self) -> Vec<&str> {
        (1..self.constant_pool.count())
            .filter_map(|idx| self.constant_pool.get_string(idx).ok())
            .collect()
    }

    pub fn insert_string(&mut self, value: &str) -> u16 {
        self.constant_pool.add_string(value)
    }

    /// Fields whose name matches `pattern`, anchored at the start of the name
    /// (a prefix match, not a substring search — mirrors Python's `re.match`).
    pub fn get_field(&self, pattern: &str) -> Result<Vec<&FieldInfo>> {
        let re = Regex::new(pattern).map_err(|_| ClassFileError::MemberNotFound {
            kind: "field",
            name: pattern.to_string(),
        })?;
        Ok(self
            .fields
            .iter()
            .filter(|f| f.get_name(&self.constant_pool).map(|n| matches_prefix(&re, n)).unwrap_or(false))
            .collect())
    }

    /// Methods whose name matches `pattern`, anchored at the start (see
    /// [`Self::get_field`]).
    pub fn get_method(&self, pattern: &str) -> Result<Vec<&MethodInfo>> {
        let re = Regex::new(pattern).map_err(|_| ClassFileError::MemberNotFound {
            kind: "method",
            name: pattern.to_string(),
        })?;
        Ok(self
            .methods
            .iter()
            .filter(|m| m.get_name(&self.constant_pool).map(|n| matches_prefix(&re, n)).unwrap_or(false))
            .collect())
    }

    /// A single method matching a name pattern and an exact descriptor,
    /// optionally restricted to this exact class.
    ///
    /// When `class_name` is given and doesn't match this class's own name,
    /// the lookup short-circuits to `None` without scanning any methods.
    pub fn get_method_descriptor(
        &self,
        class_name: Option<&str>,
        name_pattern: &str,
        descriptor: &str,
    ) -> Result<Option<&MethodInfo>> {
        if let Some(class_name) = class_name {
            if self.this_class_name()? != class_name {
                return Ok(None);
            }
        }
        let re = Regex::new(name_pattern).map_err(|_| ClassFileError::MemberNotFound {
            kind: "method",
            name: name_pattern.to_string(),
        })?;
        Ok(self.methods.iter().find(|m| {
            let name_matches = m.get_name(&self.constant_pool).map(|n| matches_prefix(&re, n)).unwrap_or(false);
            let descriptor_matches = m
                .get_descriptor(&self.constant_pool)
                .map(|d| d == descriptor)
                .unwrap_or(false);
            name_matches && descriptor_matches
        }))
    }

    /// Build a brand-new method from scratch (no importer involved) out of a
    /// mnemonic+operand instruction list, interning its name and descriptor.
    #[allow(clippy::too_many_arguments)]
    pub fn insert_craft_method(
        &mut self,
        name: &str,
        access_flags: MethodAccessFlags,
        return_descriptor: &str,
        argument_descriptors: &[String],
        max_stack: u16,
        max_locals: u16,
        instructions: Vec<(String, SpecOperand)>,
    ) -> Result<()> {
        let descriptor = format!("({}){}", argument_descriptors.join(""), return_descriptor);

        if self
            .methods
            .iter()
            .any(|m| {
                m.get_name(&self.constant_pool).ok() == Some(name)
                    && m.get_descriptor(&self.constant_pool).ok() == Some(descriptor.as_str())
            })
        {
            return Err(ClassFileError::DuplicateMethod {
                name: name.to_string(),
                descriptor,
            });
        }

        let name_index = self.constant_pool.add_string(name);
        let descriptor_index = self.constant_pool.add_string(&descriptor);

        let mut code = InstructionList::decode(&[])?;
        for (mnemonic, operand) in instructions {
            let instr =
                crate::item::opcodes::Instruction::assemble(&mnemonic, operand, &mut self.constant_pool)?;
            let idx = code.len();
            code.insert_at(idx, instr)?;
        }

        let mut attributes = AttributesCollection::default();
        attributes.push(
            "Code",
            Attribute::Code(CodeAttribute {
                max_stack,
                max_locals,
                code,
                exception_table: Vec::new(),
                attributes: AttributesCollection::default(),
            }),
        );

        self.methods.push(MethodInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        });
        Ok(())
    }

    /// Import one method from `source` into this class, rebinding every
    /// constant pool reference it carries. See [`crate::importer::import_method`].
    pub fn insert_direct_method(&mut self, source: &ClassFile, method_name: &str, descriptor: &str) -> Result<()> {
        importer::import_method(self, source, method_name, descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_class_bytes() -> (Vec<u8>, u16, u16) {
        let mut pool = ConstantPoolManager::new();
        let object_class = pool.create_class("java/lang/Object");
        let this_class = pool.create_class("com/example/Widget");
        let nat = pool.create_name_and_type("<init>", "()V");
        let _method_ref = pool.create_method_ref(object_class, nat);

        let mut w = Writer::new();
        w.write_u4(CLASS_MAGIC);
        w.write_u2(0); // minor
        w.write_u2(52); // major

        pool.write(&mut w);

        w.write_u2(ClassAccessFlags::ACC_PUBLIC.bits() | ClassAccessFlags::ACC_SUPER.bits());
        w.write_u2(this_class);
        w.write_u2(object_class);
        w.write_u2(0); // interfaces_count
        w.write_u2(0); // fields_count
        w.write_u2(0); // methods_count
        w.write_u2(0); // attributes_count

        (w.into_bytes(), this_class, object_class)
    }

    #[test]
    fn parses_minimal_class() {
        let (bytes, this_class, super_class) = minimal_class_bytes();
        let class_file = ClassFile::parse(&bytes).unwrap();
        assert_eq!(class_file.version, (52, 0));
        assert_eq!(class_file.this_class, this_class);
        assert_eq!(class_file.super_class, super_class);
        assert!(class_file.fields.is_empty());
        assert!(class_file.methods.is_empty());
        assert_eq!(class_file.this_class_name().unwrap(), "com/example/Widget");
    }

    #[test]
    fn save_is_idempotent_across_a_second_decode() {
        let (bytes, ..) = minimal_class_bytes();
        let mut class_file = ClassFile::parse(&bytes).unwrap();
        let once = class_file.save();

        let mut reparsed = ClassFile::parse(&once).unwrap();
        let twice = reparsed.save();
        assert_eq!(once, twice);
    }

    #[test]
    fn save_round_trips() {
        let (bytes, ..) = minimal_class_bytes();
        let mut class_file = ClassFile::parse(&bytes).unwrap();
        let re_saved = class_file.save();
        assert_eq!(re_saved, bytes);
    }

    #[test]
    fn insert_craft_method_then_find_it() {
        let (bytes, ..) = minimal_class_bytes();
        let mut class_file = ClassFile::parse(&bytes).unwrap();

        class_file
            .insert_craft_method(
                "answer",
                MethodAccessFlags::ACC_PUBLIC | MethodAccessFlags::ACC_STATIC,
                "I",
                &[],
                1,
                0,
                vec![
                    ("bipush".to_string(), SpecOperand::Immediate(42)),
                    ("ireturn".to_string(), SpecOperand::None),
                ],
            )
            .unwrap();

        let found = class_file.get_method_descriptor(None, "answer", "()I").unwrap();
        assert!(found.is_some());
        let method = found.unwrap();
        let code = method.get_code().unwrap();
        assert_eq!(code.get_bc().len(), 2);

        assert!(class_file
            .get_method_descriptor(Some("com/example/Widget"), "answer", "()I")
            .unwrap()
            .is_some());
        assert!(class_file
            .get_method_descriptor(Some("com/example/Other"), "answer", "()I")
            .unwrap()
            .is_none());
    }

    #[test]
    fn get_method_is_anchored_at_the_start_of_the_name() {
        let (bytes, ..) = minimal_class_bytes();
        let mut class_file = ClassFile::parse(&bytes).unwrap();
        class_file
            .insert_craft_method(
                "getValue",
                MethodAccessFlags::ACC_PUBLIC,
                "V",
                &[],
                0,
                1,
                vec![("return".to_string(), SpecOperand::None)],
            )
            .unwrap();

        assert_eq!(class_file.get_method("get").unwrap().len(), 1);
        assert!(class_file.get_method("Value").unwrap().is_empty());
    }

    #[test]
    fn insert_craft_method_rejects_duplicate() {
        let (bytes, ..) = minimal_class_bytes();
        let mut class_file = ClassFile::parse(&bytes).unwrap();
        let build = |cf: &mut ClassFile| {
            cf.insert_craft_method(
                "run",
                MethodAccessFlags::ACC_PUBLIC,
                "V",
                &[],
                0,
                1,
                vec![("return".to_string(), SpecOperand::None)],
            )
        };
        build(&mut class_file).unwrap();
        assert!(matches!(build(&mut class_file), Err(ClassFileError::DuplicateMethod { .. })));
    }
}
