pub mod stack_map;

pub use stack_map::{StackMapFrame, VerificationTypeInfo};

use crate::error::{ClassFileError, Result};
use crate::item::constant_pool::ConstantPoolManager;
use crate::item::opcodes::{Instruction, InstructionList, SpecOperand};
use crate::stream::{Reader, Writer};

/// One entry of a `Code` attribute's exception table.
///
/// These offsets are not patched by code edits (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    fn decode(r: &mut Reader) -> Result<Self> {
        Ok(Self {
            start_pc: r.read_u2()?,
            end_pc: r.read_u2()?,
            handler_pc: r.read_u2()?,
            catch_type: r.read_u2()?,
        })
    }

    fn encode(&self, w: &mut Writer) {
        w.write_u2(self.start_pc);
        w.write_u2(self.end_pc);
        w.write_u2(self.handler_pc);
        w.write_u2(self.catch_type);
    }
}

/// `LineNumberTable` entry: one `(start_pc, line_number)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumberEntry {
    pub start_pc: u16,
    pub line_number: u16,
}

impl LineNumberEntry {
    fn decode(r: &mut Reader) -> Result<Self> {
        Ok(Self {
            start_pc: r.read_u2()?,
            line_number: r.read_u2()?,
        })
    }

    fn encode(&self, w: &mut Writer) {
        w.write_u2(self.start_pc);
        w.write_u2(self.line_number);
    }
}

/// `LocalVariableTable` entry: `(start_pc, length, name_index, descriptor_index, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalVariableEntry {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub index: u16,
}

impl LocalVariableEntry {
    fn decode(r: &mut Reader) -> Result<Self> {
        Ok(Self {
            start_pc: r.read_u2()?,
            length: r.read_u2()?,
            name_index: r.read_u2()?,
            descriptor_index: r.read_u2()?,
            index: r.read_u2()?,
        })
    }

    fn encode(&self, w: &mut Writer) {
        w.write_u2(self.start_pc);
        w.write_u2(self.length);
        w.write_u2(self.name_index);
        w.write_u2(self.descriptor_index);
        w.write_u2(self.index);
    }
}

/// `InnerClasses` entry: `(inner_class_info_index, outer_class_info_index,
/// inner_name_index, inner_class_access_flags)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InnerClassEntry {
    pub inner_class_info_index: u16,
    pub outer_class_info_index: u16,
    pub inner_name_index: u16,
    pub inner_class_access_flags: u16,
}

impl InnerClassEntry {
    fn decode(r: &mut Reader) -> Result<Self> {
        Ok(Self {
            inner_class_info_index: r.read_u2()?,
            outer_class_info_index: r.read_u2()?,
            inner_name_index: r.read_u2()?,
            inner_class_access_flags: r.read_u2()?,
        })
    }

    fn encode(&self, w: &mut Writer) {
        w.write_u2(self.inner_class_info_index);
        w.write_u2(self.outer_class_info_index);
        w.write_u2(self.inner_name_index);
        w.write_u2(self.inner_class_access_flags);
    }
}

/// A `Code` attribute: bytecode plus the exception table and nested
/// attributes (`LineNumberTable`, `LocalVariableTable`, `StackMapTable`, ...).
///
/// `code_length` is never stored: it is always `code.code_length()`, so an
/// edit can never leave a stale length lying around to desync from the
/// actual instruction stream.
#[derive(Debug, Clone)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: InstructionList,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: AttributesCollection,
}

impl CodeAttribute {
    fn decode(r: &mut Reader, pool: &ConstantPoolManager) -> Result<Self> {
        let max_stack = r.read_u2()?;
        let max_locals = r.read_u2()?;
        let code_length = r.read_u4()?;
        let code_bytes = r.read_bytes(code_length as usize)?;
        let code = InstructionList::decode(code_bytes)?;

        let exception_table_length = r.read_u2()?;
        let mut exception_table = Vec::with_capacity(exception_table_length as usize);
        for _ in 0..exception_table_length {
            exception_table.push(ExceptionTableEntry::decode(r)?);
        }

        let attributes = AttributesCollection::decode(r, pool)?;

        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table,
            attributes,
        })
    }

    fn encode(&self, w: &mut Writer, pool: &mut ConstantPoolManager) {
        w.write_u2(self.max_stack);
        w.write_u2(self.max_locals);

        let mut code_buf = Writer::new();
        self.code.encode(&mut code_buf);
        let code_bytes = code_buf.into_bytes();
        w.write_u4(code_bytes.len() as u32);
        w.write_bytes(&code_bytes);

        w.write_u2(self.exception_table.len() as u16);
        for entry in &self.exception_table {
            entry.encode(w);
        }

        self.attributes.encode(w, pool);
    }

    pub fn get_at(&self, idx: usize) -> Option<&Instruction> {
        self.code.get_at(idx)
    }

    pub fn gets_at(&self, indices: &[usize]) -> Vec<Option<&Instruction>> {
        self.code.gets_at(indices)
    }

    /// Build an instruction from `(mnemonic, operand)` and insert it at `idx`,
    /// fixing up every branch's delta. Returns the byte-length delta.
    pub fn insert_at(
        &mut self,
        idx: usize,
        mnemonic: &str,
        operand: SpecOperand,
        pool: &mut ConstantPoolManager,
    ) -> Result<i64> {
        if idx > self.code.len() {
            return Err(ClassFileError::BadInstructionIndex(idx));
        }
        let instr = Instruction::assemble(mnemonic, operand, pool)?;
        self.code.insert_at(idx, instr)
    }

    pub fn remove_at(&mut self, idx: usize) -> Result<i64> {
        if idx >= self.code.len() {
            return Err(ClassFileError::BadInstructionIndex(idx));
        }
        self.code.remove_at(idx)
    }

    /// Remove every index in `indices`, shifting later indices down after
    /// each removal.
    pub fn removes_at(&mut self, indices: &[usize]) -> Result<i64> {
        self.code.removes_at(indices)
    }

    pub fn replace_at(
        &mut self,
        idx: usize,
        mnemonic: &str,
        operand: SpecOperand,
        pool: &mut ConstantPoolManager,
    ) -> Result<i64> {
        if idx >= self.code.len() {
            return Err(ClassFileError::BadInstructionIndex(idx));
        }
        let instr = Instruction::assemble(mnemonic, operand, pool)?;
        self.code.replace_at(idx, instr)
    }

    pub fn get_bc(&self) -> &InstructionList {
        &self.code
    }

    pub fn get_exceptions(&self) -> &[ExceptionTableEntry] {
        &self.exception_table
    }

    /// Local variable types drawn from the first `FullFrame` in this code's
    /// `StackMapTable`, if any; empty otherwise.
    pub fn get_local_variables(&self) -> Vec<VerificationTypeInfo> {
        for attr in &self.attributes.0 {
            if let Attribute::StackMapTable { frames } = &attr.value {
                for frame in frames {
                    if let Some(locals) = frame.full_frame_locals() {
                        return locals.to_vec();
                    }
                }
            }
        }
        Vec::new()
    }

    pub fn get_max_stack(&self) -> u16 {
        self.max_stack
    }

    pub fn get_max_locals(&self) -> u16 {
        self.max_locals
    }

    pub fn stack_map_table_mut(&mut self) -> Option<&mut Vec<StackMapFrame>> {
        self.attributes.0.iter_mut().find_map(|a| match &mut a.value {
            Attribute::StackMapTable { frames } => Some(frames),
            _ => None,
        })
    }
}

/// The typed body of an attribute, dispatched on by name at decode time.
///
/// Restricted to exactly the eight kinds this crate supports (see DESIGN.md).
#[derive(Debug, Clone)]
pub enum Attribute {
    ConstantValue { index: u16 },
    Code(CodeAttribute),
    StackMapTable { frames: Vec<StackMapFrame> },
    Exceptions { exception_index_table: Vec<u16> },
    SourceFile { index: u16 },
    InnerClasses { classes: Vec<InnerClassEntry> },
    LineNumberTable { entries: Vec<LineNumberEntry> },
    LocalVariableTable { entries: Vec<LocalVariableEntry> },
}

mod names {
    pub const CONSTANT_VALUE: &str = "ConstantValue";
    pub const CODE: &str = "Code";
    pub const STACK_MAP_TABLE: &str = "StackMapTable";
    pub const EXCEPTIONS: &str = "Exceptions";
    pub const SOURCE_FILE: &str = "SourceFile";
    pub const INNER_CLASSES: &str = "InnerClasses";
    pub const LINE_NUMBER_TABLE: &str = "LineNumberTable";
    pub const LOCAL_VARIABLE_TABLE: &str = "LocalVariableTable";
}

impl Attribute {
    fn decode(name: &str, r: &mut Reader, pool: &ConstantPoolManager) -> Result<Self> {
        Ok(match name {
            names::CONSTANT_VALUE => Self::ConstantValue { index: r.read_u2()? },
            names::CODE => Self::Code(CodeAttribute::decode(r, pool)?),
            names::STACK_MAP_TABLE => {
                let count = r.read_u2()?;
                let mut frames = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    frames.push(StackMapFrame::decode(r)?);
                }
                Self::StackMapTable { frames }
            }
            names::EXCEPTIONS => {
                let count = r.read_u2()?;
                let mut exception_index_table = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    exception_index_table.push(r.read_u2()?);
                }
                Self::Exceptions { exception_index_table }
            }
            names::SOURCE_FILE => Self::SourceFile { index: r.read_u2()? },
            names::INNER_CLASSES => {
                let count = r.read_u2()?;
                let mut classes = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    classes.push(InnerClassEntry::decode(r)?);
                }
                Self::InnerClasses { classes }
            }
            names::LINE_NUMBER_TABLE => {
                let count = r.read_u2()?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    entries.push(LineNumberEntry::decode(r)?);
                }
                Self::LineNumberTable { entries }
            }
            names::LOCAL_VARIABLE_TABLE => {
                let count = r.read_u2()?;
                let mut entries = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    entries.push(LocalVariableEntry::decode(r)?);
                }
                Self::LocalVariableTable { entries }
            }
            other => return Err(ClassFileError::UnknownAttribute(other.to_string())),
        })
    }

    fn encode(&self, w: &mut Writer, pool: &mut ConstantPoolManager) {
        match self {
            Self::ConstantValue { index } => w.write_u2(*index),
            Self::Code(code) => code.encode(w, pool),
            Self::StackMapTable { frames } => {
                w.write_u2(frames.len() as u16);
                for frame in frames {
                    frame.encode(w);
                }
            }
            Self::Exceptions { exception_index_table } => {
                w.write_u2(exception_index_table.len() as u16);
                for idx in exception_index_table {
                    w.write_u2(*idx);
                }
            }
            Self::SourceFile { index } => w.write_u2(*index),
            Self::InnerClasses { classes } => {
                w.write_u2(classes.len() as u16);
                for entry in classes {
                    entry.encode(w);
                }
            }
            Self::LineNumberTable { entries } => {
                w.write_u2(entries.len() as u16);
                for entry in entries {
                    entry.encode(w);
                }
            }
            Self::LocalVariableTable { entries } => {
                w.write_u2(entries.len() as u16);
                for entry in entries {
                    entry.encode(w);
                }
            }
        }
    }
}

/// One name/attribute pair. The name is kept as an owned string rather than
/// a cached pool index: every encode re-interns it (`add_string` is
/// idempotent), so an attribute carried over from another class file's pool
/// (method import) never needs its name_index patched by hand.
#[derive(Debug, Clone)]
pub struct AttributeInfo {
    pub name: String,
    pub value: Attribute,
}

/// An ordered attributes table (class, field, method, or `Code` level).
///
/// Kept as a `Vec`, not a `HashMap<String, Vec<Attribute>>` —
/// round-trip encoding requires attributes to re-encode in
/// their original declaration order, which a hash map can't guarantee.
#[derive(Debug, Clone, Default)]
pub struct AttributesCollection(pub Vec<AttributeInfo>);

impl AttributesCollection {
    pub fn decode(r: &mut Reader, pool: &ConstantPoolManager) -> Result<Self> {
        let count = r.read_u2()?;
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = r.read_u2()?;
            let length = r.read_u4()?;
            let body = r.read_bytes(length as usize)?;
            let name = pool.get_string(name_index)?.to_string();
            let mut body_r = Reader::new(body);
            let value = Attribute::decode(&name, &mut body_r, pool)?;
            out.push(AttributeInfo { name, value });
        }
        Ok(Self(out))
    }

    pub fn encode(&self, w: &mut Writer, pool: &mut ConstantPoolManager) {
        w.write_u2(self.0.len() as u16);
        for attr in &self.0 {
            let name_index = pool.add_string(&attr.name);
            w.write_u2(name_index);

            let mut body = Writer::new();
            attr.value.encode(&mut body, pool);
            let body = body.into_bytes();

            w.write_u4(body.len() as u32);
            w.write_bytes(&body);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.name == name).map(|a| &a.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.0.iter_mut().find(|a| a.name == name).map(|a| &mut a.value)
    }

    pub fn push(&mut self, name: impl Into<String>, value: Attribute) {
        self.0.push(AttributeInfo { name: name.into(), value });
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeInfo> {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::constant_pool::ConstantPoolManager;

    fn attr_bytes(pool: &mut ConstantPoolManager) -> Vec<u8> {
        // aload_0; invokespecial java/lang/Object.<init>:()V; return
        let class_index = pool.create_class("java/lang/Object");
        let nat_index = pool.create_name_and_type("<init>", "()V");
        let method_index = pool.create_method_ref(class_index, nat_index);
        assert_eq!(method_index, 1);

        let name_index = pool.add_string("Code");
        let mut w = Writer::new();
        w.write_u2(name_index);
        let mut body = Writer::new();
        body.write_u2(1); // max_stack
        body.write_u2(1); // max_locals
        let code = [0x2a, 0xb7, 0x00, 0x01, 0xb1];
        body.write_u4(code.len() as u32);
        body.write_bytes(&code);
        body.write_u2(0); // exception_table_length
        body.write_u2(0); // attributes_count
        let body = body.into_bytes();
        w.write_u4(body.len() as u32);
        w.write_bytes(&body);
        w.into_bytes()
    }

    #[test]
    fn code_attribute_round_trips() {
        let mut pool = ConstantPoolManager::new();
        let attr_bytes = attr_bytes(&mut pool);

        let mut full = Writer::new();
        full.write_u2(1); // attributes_count
        full.write_bytes(&attr_bytes);
        let full = full.into_bytes();

        let mut r = Reader::new(&full);
        let attrs = AttributesCollection::decode(&mut r, &pool).unwrap();
        assert_eq!(attrs.0.len(), 1);
        assert_eq!(attrs.0[0].name, "Code");

        let mut w = Writer::new();
        attrs.encode(&mut w, &mut pool);
        assert_eq!(w.into_bytes(), full);
    }

    #[test]
    fn code_insert_shifts_offsets() {
        let mut pool = ConstantPoolManager::new();
        let attr_bytes = attr_bytes(&mut pool);
        let mut full = Writer::new();
        full.write_u2(1);
        full.write_bytes(&attr_bytes);
        let full = full.into_bytes();

        let mut r = Reader::new(&full);
        let attrs = AttributesCollection::decode(&mut r, &pool).unwrap();
        let Attribute::Code(mut code) = attrs.0.into_iter().next().unwrap().value else {
            panic!("expected Code");
        };

        assert_eq!(code.get_bc().offsets(), &[0, 1, 4]);
        code.insert_at(1, "nop", SpecOperand::None, &mut pool).unwrap();
        assert_eq!(code.get_bc().offsets(), &[0, 1, 2, 5]);
        assert_eq!(code.get_bc().code_length(), 6);
    }
}
