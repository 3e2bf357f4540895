use crate::error::{ClassFileError, Result};
use crate::item::constant_pool::ConstantPoolManager;
use crate::stream::{Reader, Writer};

/// A single verification-type-info item inside a `StackMapTable` frame.
///
/// `Object`'s `cpool_index` is the cross-reference that must be rewritten
/// on method import.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationTypeInfo {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    Object { cpool_index: u16 },
    Uninitialized { offset: u16 },
}

impl VerificationTypeInfo {
    pub fn decode(r: &mut Reader) -> Result<Self> {
        Ok(match r.read_u1()? {
            0 => Self::Top,
            1 => Self::Integer,
            2 => Self::Float,
            3 => Self::Double,
            4 => Self::Long,
            5 => Self::Null,
            6 => Self::UninitializedThis,
            7 => Self::Object { cpool_index: r.read_u2()? },
            8 => Self::Uninitialized { offset: r.read_u2()? },
            other => return Err(ClassFileError::UnknownVerificationTypeInfo(other)),
        })
    }

    pub fn encode(&self, w: &mut Writer) {
        match self {
            Self::Top => w.write_u1(0),
            Self::Integer => w.write_u1(1),
            Self::Float => w.write_u1(2),
            Self::Double => w.write_u1(3),
            Self::Long => w.write_u1(4),
            Self::Null => w.write_u1(5),
            Self::UninitializedThis => w.write_u1(6),
            Self::Object { cpool_index } => {
                w.write_u1(7);
                w.write_u2(*cpool_index);
            }
            Self::Uninitialized { offset } => {
                w.write_u1(8);
                w.write_u2(*offset);
            }
        }
    }

    /// Rewrite an `Object` item's class cross-reference onto `dest_pool`
    /// when a method carrying this frame is imported into another class.
    /// A reference to the source class itself becomes a reference to the
    /// destination's own `this_class`; any other class name is interned
    /// (or found) in the destination pool unchanged.
    ///
    /// Rewrites the class cross-reference, not the whole entry, since only
    /// `Object` carries one.
    pub fn rebind_class(
        &mut self,
        source_pool: &ConstantPoolManager,
        source_this_class: &str,
        dest_pool: &mut ConstantPoolManager,
        dest_this_class: &str,
    ) -> Result<()> {
        if let Self::Object { cpool_index } = self {
            let class_name = source_pool.get_class(*cpool_index)?.to_string();
            *cpool_index = if class_name == source_this_class {
                dest_pool.create_class(dest_this_class)
            } else {
                dest_pool.create_class(&class_name)
            };
        }
        Ok(())
    }
}

/// One frame of a `StackMapTable` attribute.
///
/// The original `frame_type` byte is kept on every variant whose tag encodes
/// more than just "which variant" (`SameFrame`'s offset_delta *is* the tag;
/// `ChopFrame`/`AppendFrame`'s local-count delta *is* the tag minus a base),
/// so re-encoding never has to re-derive it.
#[derive(Debug, Clone, PartialEq)]
pub enum StackMapFrame {
    SameFrame { frame_type: u8 },
    SameLocals1StackItemFrame { frame_type: u8, stack: VerificationTypeInfo },
    SameLocals1StackItemFrameExtended { offset_delta: u16, stack: VerificationTypeInfo },
    ChopFrame { frame_type: u8, offset_delta: u16 },
    SameFrameExtended { offset_delta: u16 },
    AppendFrame { frame_type: u8, offset_delta: u16, locals: Vec<VerificationTypeInfo> },
    FullFrame { offset_delta: u16, locals: Vec<VerificationTypeInfo>, stack: Vec<VerificationTypeInfo> },
}

impl StackMapFrame {
    pub fn decode(r: &mut Reader) -> Result<Self> {
        let frame_type = r.read_u1()?;
        Ok(match frame_type {
            0..=63 => Self::SameFrame { frame_type },
            64..=127 => Self::SameLocals1StackItemFrame {
                frame_type,
                stack: VerificationTypeInfo::decode(r)?,
            },
            247 => Self::SameLocals1StackItemFrameExtended {
                offset_delta: r.read_u2()?,
                stack: VerificationTypeInfo::decode(r)?,
            },
            248..=250 => Self::ChopFrame {
                frame_type,
                offset_delta: r.read_u2()?,
            },
            251 => Self::SameFrameExtended {
                offset_delta: r.read_u2()?,
            },
            252..=254 => {
                let offset_delta = r.read_u2()?;
                let count = (frame_type - 251) as usize;
                let mut locals = Vec::with_capacity(count);
                for _ in 0..count {
                    locals.push(VerificationTypeInfo::decode(r)?);
                }
                Self::AppendFrame { frame_type, offset_delta, locals }
            }
            255 => {
                let offset_delta = r.read_u2()?;
                let n_locals = r.read_u2()? as usize;
                let mut locals = Vec::with_capacity(n_locals);
                for _ in 0..n_locals {
                    locals.push(VerificationTypeInfo::decode(r)?);
                }
                let n_stack = r.read_u2()? as usize;
                let mut stack = Vec::with_capacity(n_stack);
                for _ in 0..n_stack {
                    stack.push(VerificationTypeInfo::decode(r)?);
                }
                Self::FullFrame { offset_delta, locals, stack }
            }
            other => return Err(ClassFileError::UnknownStackMapFrameTag(other)),
        })
    }

    pub fn encode(&self, w: &mut Writer) {
        match self {
            Self::SameFrame { frame_type } => w.write_u1(*frame_type),
            Self::SameLocals1StackItemFrame { frame_type, stack } => {
                w.write_u1(*frame_type);
                stack.encode(w);
            }
            Self::SameLocals1StackItemFrameExtended { offset_delta, stack } => {
                w.write_u1(247);
                w.write_u2(*offset_delta);
                stack.encode(w);
            }
            Self::ChopFrame { frame_type, offset_delta } => {
                w.write_u1(*frame_type);
                w.write_u2(*offset_delta);
            }
            Self::SameFrameExtended { offset_delta } => {
                w.write_u1(251);
                w.write_u2(*offset_delta);
            }
            Self::AppendFrame { frame_type, offset_delta, locals } => {
                w.write_u1(*frame_type);
                w.write_u2(*offset_delta);
                for l in locals {
                    l.encode(w);
                }
            }
            Self::FullFrame { offset_delta, locals, stack } => {
                w.write_u1(255);
                w.write_u2(*offset_delta);
                w.write_u2(locals.len() as u16);
                for l in locals {
                    l.encode(w);
                }
                w.write_u2(stack.len() as u16);
                for s in stack {
                    s.encode(w);
                }
            }
        }
    }

    /// Local variable types from a `FullFrame`, empty for every other variant.
    pub fn full_frame_locals(&self) -> Option<&[VerificationTypeInfo]> {
        match self {
            Self::FullFrame { locals, .. } => Some(locals),
            _ => None,
        }
    }

    pub fn rebind_classes(
        &mut self,
        source_pool: &ConstantPoolManager,
        source_this_class: &str,
        dest_pool: &mut ConstantPoolManager,
        dest_this_class: &str,
    ) -> Result<()> {
        match self {
            Self::SameLocals1StackItemFrame { stack, .. }
            | Self::SameLocals1StackItemFrameExtended { stack, .. } => {
                stack.rebind_class(source_pool, source_this_class, dest_pool, dest_this_class)?;
            }
            Self::AppendFrame { locals, .. } => {
                for l in locals {
                    l.rebind_class(source_pool, source_this_class, dest_pool, dest_this_class)?;
                }
            }
            Self::FullFrame { locals, stack, .. } => {
                for l in locals {
                    l.rebind_class(source_pool, source_this_class, dest_pool, dest_this_class)?;
                }
                for s in stack {
                    s.rebind_class(source_pool, source_this_class, dest_pool, dest_this_class)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_frame_round_trips() {
        let bytes = [10u8];
        let mut r = Reader::new(&bytes);
        let frame = StackMapFrame::decode(&mut r).unwrap();
        assert_eq!(frame, StackMapFrame::SameFrame { frame_type: 10 });
        let mut w = Writer::new();
        frame.encode(&mut w);
        assert_eq!(w.into_bytes(), bytes);
    }

    #[test]
    fn full_frame_round_trips() {
        let bytes = [255u8, 0, 5, 0, 1, 1, 0, 0];
        let mut r = Reader::new(&bytes);
        let frame = StackMapFrame::decode(&mut r).unwrap();
        assert_eq!(
            frame,
            StackMapFrame::FullFrame {
                offset_delta: 5,
                locals: vec![VerificationTypeInfo::Integer],
                stack: vec![],
            }
        );
        let mut w = Writer::new();
        frame.encode(&mut w);
        assert_eq!(w.into_bytes(), bytes);
    }
}
