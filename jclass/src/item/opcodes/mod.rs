pub mod table;

use crate::error::{ClassFileError, Result};
use crate::item::constant_pool::{ConstantPoolManager, MemberRef, ResolvedConstant};
use crate::stream::{Reader, Writer};

pub use table::{ArrayTypeCode, Shape};

/// A decoded instruction: the raw opcode byte plus its operand payload.
///
/// Keeps an explicit `Operand` union rather than a raw buffer, since this
/// crate needs to re-derive the encoded bytes from the operand on every edit
/// rather than caching them.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: u8,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    /// Local variable slot index (`aload`, `istore`, `ret`, ...).
    Local(u8),
    Iinc { index: u8, constant: i8 },
    ImmByte(i8),
    ImmShort(i16),
    /// A raw, not-yet-resolved constant pool reference. Disambiguated by
    /// opcode at resolve/encode time since several families (class refs,
    /// field refs, method refs, `ldc`) all share a pool-index operand shape.
    PoolRef(u16),
    InvokeInterface { index: u16, count: u8 },
    MultiANewArray { index: u16, dimensions: u8 },
    NewArray(u8),
    /// Signed byte offset from this instruction's own byte offset, stored
    /// uniformly regardless of whether it's encoded as 16 or 32 bits.
    Branch(i32),
    /// `tableswitch`, `lookupswitch`, and `wide` bodies, kept as the raw
    /// bytes following the opcode. Not edited or resolved.
    Opaque(Vec<u8>),
}

/// The resolved, human-readable projection of an instruction's operand.
///
/// The resolved, human-readable form: e.g. `invokevirtual`
/// projects to `(class_name, method_name, descriptor)` rather than a raw
/// pool index.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedOperand {
    None,
    Local(u8),
    Iinc { index: u8, constant: i8 },
    Immediate(i32),
    Branch(i32),
    Class(String),
    Member(MemberRef),
    Constant(ResolvedConstant),
    ArrayType(ArrayTypeCode),
    NewArray(ArrayTypeCode),
    MultiANewArray { class_name: String, dimensions: u8 },
    InvokeInterface { member: MemberRef, count: u8 },
    Opaque,
}

/// The human-readable instruction shape: a mnemonic
/// plus whatever operands that mnemonic's shape calls for. Used by
/// `CodeAttribute::insert_at`/`replace_at` and by the method importer when
/// patching an imported method's bytecode onto the local pool.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecOperand {
    None,
    Local(u8),
    Iinc { index: u8, constant: i8 },
    Immediate(i32),
    Branch(i32),
    /// `new`, `anewarray`, `checkcast`, `instanceof`.
    Class(String),
    /// `getstatic`, `getfield`, `putfield`, `putstatic`, and the `invoke*` family.
    Member { class_name: String, name: String, descriptor: String },
    InvokeInterface { class_name: String, name: String, descriptor: String, count: u8 },
    NewArray(ArrayTypeCode),
    MultiANewArray { class_name: String, dimensions: u8 },
    /// `ldc`/`ldc_w`/`ldc2_w`: `("CONSTANT_Integer", i32)` or `("CONSTANT_String", String)`.
    Constant(ResolvedConstant),
}

impl Instruction {
    pub fn mnemonic(&self) -> &'static str {
        table::mnemonic(self.opcode)
    }

    /// Assemble an instruction from a mnemonic plus a human-readable operand,
    /// interning whatever constant pool entries that operand needs. Used both
    /// to build a fresh instruction and to patch an existing bytecode's
    /// operand onto a different pool, since both need the same
    /// pool-interning-then-pack sequence.
    pub fn assemble(mnemonic: &str, operand: SpecOperand, pool: &mut ConstantPoolManager) -> Result<Self> {
        let opcode = table::from_mnemonic(mnemonic)
            .ok_or_else(|| ClassFileError::UnknownMnemonic(mnemonic.to_string()))?;
        let shape = table::shape(opcode);
        let mismatch = || ClassFileError::OperandShapeMismatch { mnemonic: table::mnemonic(opcode) };

        let built = match (shape, operand) {
            (Some(Shape::None), SpecOperand::None) => Operand::None,
            (Some(Shape::Local), SpecOperand::Local(i)) => Operand::Local(i),
            (Some(Shape::Iinc), SpecOperand::Iinc { index, constant }) => Operand::Iinc { index, constant },
            (Some(Shape::ImmByte), SpecOperand::Immediate(v)) => Operand::ImmByte(v as i8),
            (Some(Shape::ImmShort), SpecOperand::Immediate(v)) => Operand::ImmShort(v as i16),
            (Some(Shape::Branch16), SpecOperand::Branch(d)) | (Some(Shape::Branch32), SpecOperand::Branch(d)) => {
                Operand::Branch(d)
            }
            (Some(Shape::NewArray), SpecOperand::NewArray(code)) => Operand::NewArray(code.encode()),
            (Some(Shape::ClassRef), SpecOperand::Class(name)) => {
                let idx = pool.create_class(&name);
                Operand::PoolRef(idx)
            }
            (Some(Shape::FieldRef), SpecOperand::Member { class_name, name, descriptor }) => {
                let class_index = pool.create_class(&class_name);
                let nat_index = pool.create_name_and_type(&name, &descriptor);
                let idx = pool.create_field_ref(class_index, nat_index);
                Operand::PoolRef(idx)
            }
            (Some(Shape::MethodRef), SpecOperand::Member { class_name, name, descriptor }) => {
                let class_index = pool.create_class(&class_name);
                let nat_index = pool.create_name_and_type(&name, &descriptor);
                let idx = pool.create_method_ref(class_index, nat_index);
                Operand::PoolRef(idx)
            }
            (
                Some(Shape::InvokeInterface),
                SpecOperand::InvokeInterface { class_name, name, descriptor, count },
            ) => {
                let class_index = pool.create_class(&class_name);
                let nat_index = pool.create_name_and_type(&name, &descriptor);
                let idx = pool.create_method_ref(class_index, nat_index);
                Operand::InvokeInterface { index: idx, count }
            }
            (Some(Shape::MultiANewArray), SpecOperand::MultiANewArray { class_name, dimensions }) => {
                let idx = pool.create_class(&class_name);
                Operand::MultiANewArray { index: idx, dimensions }
            }
            (Some(Shape::Ldc), SpecOperand::Constant(value))
            | (Some(Shape::LdcW), SpecOperand::Constant(value))
            | (Some(Shape::Ldc2W), SpecOperand::Constant(value)) => {
                let idx = match value {
                    ResolvedConstant::Integer(v) => pool.create_integer(v),
                    ResolvedConstant::String(s) => pool.create_string(&s),
                };
                Operand::PoolRef(idx)
            }
            _ => return Err(mismatch()),
        };
        Ok(Self { opcode, operand: built })
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.operand, Operand::Branch(_))
    }

    /// Byte length of this instruction's encoded form, including the opcode byte.
    pub fn len(&self) -> u32 {
        1 + match table::shape(self.opcode) {
            Some(Shape::None) => 0,
            Some(Shape::Local) => 1,
            Some(Shape::Iinc) => 2,
            Some(Shape::ImmByte) => 1,
            Some(Shape::ImmShort) => 2,
            Some(Shape::Ldc) => 1,
            Some(Shape::LdcW) | Some(Shape::Ldc2W) => 2,
            Some(Shape::ClassRef) | Some(Shape::FieldRef) | Some(Shape::MethodRef) => 2,
            Some(Shape::InvokeInterface) => 4,
            Some(Shape::MultiANewArray) => 3,
            Some(Shape::NewArray) => 1,
            Some(Shape::Branch16) => 2,
            Some(Shape::Branch32) => 4,
            Some(Shape::TableSwitch) | Some(Shape::LookupSwitch) | Some(Shape::Wide) => {
                match &self.operand {
                    Operand::Opaque(bytes) => bytes.len() as u32,
                    _ => 0,
                }
            }
            None => 0,
        }
    }

    /// Project this instruction's operand into its human-readable, resolved form.
    pub fn resolve(&self, pool: &ConstantPoolManager) -> Result<ResolvedOperand> {
        Ok(match (&self.operand, table::shape(self.opcode)) {
            (Operand::None, _) => ResolvedOperand::None,
            (Operand::Local(i), _) => ResolvedOperand::Local(*i),
            (Operand::Iinc { index, constant }, _) => ResolvedOperand::Iinc {
                index: *index,
                constant: *constant,
            },
            (Operand::ImmByte(v), _) => ResolvedOperand::Immediate(*v as i32),
            (Operand::ImmShort(v), _) => ResolvedOperand::Immediate(*v as i32),
            (Operand::Branch(d), _) => ResolvedOperand::Branch(*d),
            (Operand::NewArray(code), _) => ResolvedOperand::NewArray(ArrayTypeCode::decode(*code)?),
            (Operand::PoolRef(idx), Some(Shape::Ldc))
            | (Operand::PoolRef(idx), Some(Shape::LdcW))
            | (Operand::PoolRef(idx), Some(Shape::Ldc2W)) => {
                ResolvedOperand::Constant(pool.get_value(*idx)?)
            }
            (Operand::PoolRef(idx), Some(Shape::ClassRef)) => {
                ResolvedOperand::Class(pool.get_class(*idx)?.to_string())
            }
            (Operand::PoolRef(idx), Some(Shape::FieldRef)) => {
                ResolvedOperand::Member(pool.get_field(*idx)?)
            }
            (Operand::PoolRef(idx), Some(Shape::MethodRef)) => {
                ResolvedOperand::Member(pool.get_method(*idx)?)
            }
            (Operand::InvokeInterface { index, count }, _) => ResolvedOperand::InvokeInterface {
                member: pool.get_interface_method(*index)?,
                count: *count,
            },
            (Operand::MultiANewArray { index, dimensions }, _) => ResolvedOperand::MultiANewArray {
                class_name: pool.get_class(*index)?.to_string(),
                dimensions: *dimensions,
            },
            (Operand::Opaque(_), _) => ResolvedOperand::Opaque,
            _ => ResolvedOperand::None,
        })
    }

    /// Re-encode this instruction's current operand into bytes, opcode included.
    pub fn encode(&self, w: &mut Writer) {
        w.write_u1(self.opcode);
        match &self.operand {
            Operand::None => {}
            Operand::Local(i) => w.write_u1(*i),
            Operand::Iinc { index, constant } => {
                w.write_u1(*index);
                w.write_u1(*constant as u8);
            }
            Operand::ImmByte(v) => w.write_u1(*v as u8),
            Operand::ImmShort(v) => w.write_i16(*v),
            Operand::PoolRef(idx) => match table::shape(self.opcode) {
                Some(Shape::Ldc) => w.write_u1(*idx as u8),
                _ => w.write_u2(*idx),
            },
            Operand::InvokeInterface { index, count } => {
                w.write_u2(*index);
                w.write_u1(*count);
                w.write_u1(0);
            }
            Operand::MultiANewArray { index, dimensions } => {
                w.write_u2(*index);
                w.write_u1(*dimensions);
            }
            Operand::NewArray(code) => w.write_u1(*code),
            Operand::Branch(delta) => match table::shape(self.opcode) {
                Some(Shape::Branch32) => w.write_i32(*delta),
                _ => w.write_i16(*delta as i16),
            },
            Operand::Opaque(bytes) => w.write_bytes(bytes),
        }
    }

    /// Decode one instruction starting at `offset` bytes into the owning code array.
    pub fn decode(r: &mut Reader, offset: u32) -> Result<Self> {
        let opcode = r.read_u1()?;
        let shape = table::shape(opcode).ok_or(ClassFileError::UnknownOpcode(opcode, offset))?;
        let operand = match shape {
            Shape::None => Operand::None,
            Shape::Local => Operand::Local(r.read_u1()?),
            Shape::Iinc => Operand::Iinc {
                index: r.read_u1()?,
                constant: r.read_u1()? as i8,
            },
            Shape::ImmByte => Operand::ImmByte(r.read_u1()? as i8),
            Shape::ImmShort => Operand::ImmShort(r.read_i16()?),
            Shape::Ldc => Operand::PoolRef(r.read_u1()? as u16),
            Shape::LdcW | Shape::Ldc2W | Shape::ClassRef | Shape::FieldRef | Shape::MethodRef => {
                Operand::PoolRef(r.read_u2()?)
            }
            Shape::InvokeInterface => {
                let index = r.read_u2()?;
                let count = r.read_u1()?;
                let _reserved = r.read_u1()?;
                Operand::InvokeInterface { index, count }
            }
            Shape::MultiANewArray => Operand::MultiANewArray {
                index: r.read_u2()?,
                dimensions: r.read_u1()?,
            },
            Shape::NewArray => Operand::NewArray(r.read_u1()?),
            Shape::Branch16 => Operand::Branch(r.read_i16()? as i32),
            Shape::Branch32 => Operand::Branch(r.read_i32()?),
            Shape::TableSwitch => Operand::Opaque(read_tableswitch(r, offset)?),
            Shape::LookupSwitch => Operand::Opaque(read_lookupswitch(r, offset)?),
            Shape::Wide => Operand::Opaque(read_wide(r)?),
        };
        Ok(Self { opcode, operand })
    }
}

fn read_padding(r: &mut Reader, offset: u32) -> Result<Vec<u8>> {
    let pad = (4 - ((offset + 1) % 4)) % 4;
    Ok(r.read_bytes(pad as usize)?.to_vec())
}

fn read_tableswitch(r: &mut Reader, offset: u32) -> Result<Vec<u8>> {
    let mut body = read_padding(r, offset)?;
    body.extend_from_slice(r.read_bytes(8)?); // default, low
    let low = i32::from_be_bytes(body[body.len() - 4..].try_into().unwrap());
    let high_bytes = r.read_bytes(4)?;
    body.extend_from_slice(high_bytes);
    let high = i32::from_be_bytes(high_bytes.try_into().unwrap());
    let count = (high - low + 1).max(0) as usize;
    body.extend_from_slice(r.read_bytes(count * 4)?);
    Ok(body)
}

fn read_lookupswitch(r: &mut Reader, offset: u32) -> Result<Vec<u8>> {
    let mut body = read_padding(r, offset)?;
    body.extend_from_slice(r.read_bytes(4)?); // default
    let npairs_bytes = r.read_bytes(4)?;
    body.extend_from_slice(npairs_bytes);
    let npairs = u32::from_be_bytes(npairs_bytes.try_into().unwrap()) as usize;
    body.extend_from_slice(r.read_bytes(npairs * 8)?);
    Ok(body)
}

fn read_wide(r: &mut Reader) -> Result<Vec<u8>> {
    let modified_opcode = r.read_u1()?;
    let mut body = vec![modified_opcode];
    body.extend_from_slice(r.read_bytes(2)?);
    if modified_opcode == table::IINC {
        body.extend_from_slice(r.read_bytes(2)?);
    }
    Ok(body)
}

/// An ordered, editable list of decoded instructions for one `Code` attribute.
///
/// `insert_at`/`remove_at`/`replace_at` keep `offsets` and `branches` in sync
/// and implement the branch fix-up algorithm described below.
#[derive(Debug, Clone, Default)]
pub struct InstructionList {
    instructions: Vec<Instruction>,
    offsets: Vec<u32>,
    branches: Vec<usize>,
}

impl InstructionList {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let mut instructions = Vec::new();
        let mut offsets = Vec::new();
        let mut branches = Vec::new();

        while r.remaining() > 0 {
            let offset = r.position() as u32;
            let instr = Instruction::decode(&mut r, offset)?;
            if instr.is_branch() {
                branches.push(instructions.len());
            }
            offsets.push(offset);
            instructions.push(instr);
        }

        Ok(Self {
            instructions,
            offsets,
            branches,
        })
    }

    pub fn encode(&self, w: &mut Writer) {
        for instr in &self.instructions {
            instr.encode(w);
        }
    }

    pub fn code_length(&self) -> u32 {
        self.instructions.iter().map(Instruction::len).sum()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn get_at(&self, idx: usize) -> Option<&Instruction> {
        self.instructions.get(idx)
    }

    pub fn gets_at(&self, indices: &[usize]) -> Vec<Option<&Instruction>> {
        indices.iter().map(|&i| self.get_at(i)).collect()
    }

    /// Recompute every instruction's byte offset from scratch. Called after
    /// any structural edit.
    fn recompute_offsets(&mut self) {
        let mut offset = 0;
        self.offsets.clear();
        for instr in &self.instructions {
            self.offsets.push(offset);
            offset += instr.len();
        }
    }

    /// Fix up a branch's delta when a
    /// region of length `removed_len` at byte offset `removed_offset` is
    /// removed. `self_offset` is the branch instruction's own byte offset.
    fn adjust_for_removal(delta: i32, self_offset: u32, removed_offset: u32, removed_len: u32) -> i32 {
        let self_offset = self_offset as i64;
        let removed_offset = removed_offset as i64;
        let removed_len = removed_len as i64;
        let delta = delta as i64;
        let target = self_offset + delta;
        let adjusted = if self_offset > removed_offset {
            if target < removed_offset {
                delta + removed_len
            } else {
                delta
            }
        } else if self_offset < removed_offset {
            if target > removed_offset {
                delta - removed_len
            } else {
                delta
            }
        } else {
            delta
        };
        adjusted as i32
    }

    /// The insertion-side mirror of
    /// [`Self::adjust_for_removal`].
    fn adjust_for_insertion(delta: i32, self_offset: u32, inserted_offset: u32, inserted_len: u32) -> i32 {
        let self_offset = self_offset as i64;
        let inserted_offset = inserted_offset as i64;
        let inserted_len = inserted_len as i64;
        let delta = delta as i64;
        let target = self_offset + delta;
        let adjusted = if self_offset > inserted_offset {
            if target < inserted_offset {
                delta - inserted_len
            } else {
                delta
            }
        } else if self_offset < inserted_offset {
            if target > inserted_offset {
                delta + inserted_len
            } else {
                delta
            }
        } else {
            delta
        };
        adjusted as i32
    }

    /// Remove the instruction at `idx`, fixing up every remaining branch's
    /// delta. Returns the byte-length delta (always negative).
    pub fn remove_at(&mut self, idx: usize) -> Result<i64> {
        let removed_offset = self.offsets[idx];
        let removed_len = self.instructions[idx].len();

        self.branches.retain(|&b| b != idx);

        for &b in &self.branches {
            let self_offset = self.offsets[b];
            if let Operand::Branch(delta) = self.instructions[b].operand {
                let adjusted = Self::adjust_for_removal(delta, self_offset, removed_offset, removed_len);
                if adjusted != delta {
                    self.instructions[b].operand = Operand::Branch(adjusted);
                }
            }
        }

        self.instructions.remove(idx);
        self.offsets.remove(idx);
        for b in self.branches.iter_mut() {
            if *b > idx {
                *b -= 1;
            }
        }

        self.recompute_offsets();
        Ok(-(removed_len as i64))
    }

    /// Remove every index in `indices`, shifting later indices down after
    /// each removal — mirrors `CodeAttribute.removes_at`.
    pub fn removes_at(&mut self, indices: &[usize]) -> Result<i64> {
        let mut indices = indices.to_vec();
        let mut total = 0i64;
        let mut i = 0;
        while i < indices.len() {
            total += self.remove_at(indices[i])?;
            for j in i + 1..indices.len() {
                if indices[j] > indices[i] {
                    indices[j] -= 1;
                }
            }
            i += 1;
        }
        Ok(total)
    }

    /// Insert `instr` at `idx`, fixing up every existing branch's delta.
    /// Returns the byte-length delta (always positive).
    pub fn insert_at(&mut self, idx: usize, instr: Instruction) -> Result<i64> {
        let insert_offset = if idx < self.offsets.len() {
            self.offsets[idx]
        } else {
            self.code_length()
        };
        let inserted_len = instr.len();

        for &b in &self.branches {
            let self_offset = self.offsets[b];
            if let Operand::Branch(delta) = self.instructions[b].operand {
                let adjusted = Self::adjust_for_insertion(delta, self_offset, insert_offset, inserted_len);
                if adjusted != delta {
                    self.instructions[b].operand = Operand::Branch(adjusted);
                }
            }
        }

        let is_branch = instr.is_branch();
        self.instructions.insert(idx, instr);
        self.offsets.insert(idx, insert_offset);
        for b in self.branches.iter_mut() {
            if *b >= idx {
                *b += 1;
            }
        }
        if is_branch {
            self.branches.push(idx);
        }

        self.recompute_offsets();
        Ok(inserted_len as i64)
    }

    /// Replace the instruction at `idx` (remove then insert). Returns the net
    /// byte-length delta.
    pub fn replace_at(&mut self, idx: usize, instr: Instruction) -> Result<i64> {
        let removed = self.remove_at(idx)?;
        let inserted = self.insert_at(idx, instr)?;
        Ok(removed + inserted)
    }

    /// Overwrite the instruction at `idx` in place without touching offsets
    /// or branch deltas.
    ///
    /// Used by the method importer to rematerialise an instruction's pool
    /// reference onto a different pool: the mnemonic, and therefore the
    /// encoded length, never changes, only the pool index the operand packs
    /// to, so this isn't a structural edit and none of `insert_at`/
    /// `remove_at`'s branch fix-up machinery applies.
    pub fn set_operand_at(&mut self, idx: usize, instr: Instruction) -> Result<()> {
        let existing = self
            .instructions
            .get(idx)
            .ok_or(ClassFileError::BadInstructionIndex(idx))?;
        debug_assert_eq!(existing.len(), instr.len(), "set_operand_at must not change instruction length");
        self.instructions[idx] = instr;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::constant_pool::ConstantPoolManager;

    fn instr(mnemonic: &str, operand: SpecOperand) -> Instruction {
        let mut pool = ConstantPoolManager::new();
        Instruction::assemble(mnemonic, operand, &mut pool).unwrap()
    }

    /// `ifeq +6; iconst_0; ireturn; iconst_1; ireturn` at offsets 0,3,4,5,6.
    /// Inserting a `nop` at index 1 (offset 3) must widen the `ifeq`'s delta
    /// to +7 so it still lands on `iconst_1`, and removing that `nop` again
    /// must restore the original delta exactly.
    fn branch_fixture() -> InstructionList {
        let mut list = InstructionList::default();
        for (i, (mnemonic, operand)) in [
            ("ifeq", SpecOperand::Branch(6)),
            ("iconst_0", SpecOperand::None),
            ("ireturn", SpecOperand::None),
            ("iconst_1", SpecOperand::None),
            ("ireturn", SpecOperand::None),
        ]
        .into_iter()
        .enumerate()
        {
            let idx = list.len();
            assert_eq!(idx, i);
            list.insert_at(idx, instr(mnemonic, operand)).unwrap();
        }
        list
    }

    #[test]
    fn branch_fixture_has_expected_offsets() {
        let list = branch_fixture();
        assert_eq!(list.offsets(), &[0, 3, 4, 5, 6]);
        assert_eq!(list.code_length(), 7);
    }

    #[test]
    fn insert_before_branch_target_widens_delta_and_preserves_target_identity() {
        let mut list = branch_fixture();
        let target_before = list.get_at(3).cloned().unwrap(); // iconst_1

        list.insert_at(1, instr("nop", SpecOperand::None)).unwrap();

        assert_eq!(list.offsets(), &[0, 3, 4, 5, 6, 7]);
        let Operand::Branch(delta) = list.get_at(0).unwrap().operand else {
            panic!("expected a branch instruction at index 0");
        };
        assert_eq!(delta, 7);

        // The branch's absolute target (offset 0 + delta 7 == 7) must still
        // land on the same instruction, now at index 4.
        let landing_offset = list.offsets()[4];
        assert_eq!(landing_offset, 7);
        assert_eq!(list.get_at(4).unwrap().mnemonic(), target_before.mnemonic());
        assert_eq!(list.get_at(4).unwrap(), &target_before);
    }

    #[test]
    fn removing_the_inserted_nop_restores_the_original_delta_and_layout() {
        let mut list = branch_fixture();
        list.insert_at(1, instr("nop", SpecOperand::None)).unwrap();
        list.remove_at(1).unwrap();

        assert_eq!(list.offsets(), &[0, 3, 4, 5, 6]);
        let Operand::Branch(delta) = list.get_at(0).unwrap().operand else {
            panic!("expected a branch instruction at index 0");
        };
        assert_eq!(delta, 6);
    }

    #[test]
    fn branch_fixture_round_trips_bytes() {
        let list = branch_fixture();
        let mut w = Writer::new();
        list.encode(&mut w);
        let bytes = w.into_bytes();

        let decoded = InstructionList::decode(&bytes).unwrap();
        assert_eq!(decoded.offsets(), list.offsets());
        assert_eq!(decoded.len(), list.len());
    }

    #[test]
    fn removing_a_branch_drops_it_from_the_branch_set() {
        let mut list = branch_fixture();
        list.remove_at(0).unwrap(); // remove the ifeq itself
        assert_eq!(list.offsets(), &[0, 1, 2, 3]);
        // No more branches to adjust; a further insert must not panic on a
        // stale branch index.
        list.insert_at(0, instr("nop", SpecOperand::None)).unwrap();
        assert_eq!(list.offsets(), &[0, 1, 2, 3, 4]);
    }
}
