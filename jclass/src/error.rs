use std::string::FromUtf8Error;

use thiserror::Error;

/// An error which can occur while decoding, editing, or re-encoding a class file.
#[derive(Error, Debug)]
pub enum ClassFileError {
    /// The stream ran out of bytes before a value could be fully read.
    #[error("unexpected end of input at offset {offset}, needed {needed} more byte(s)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// Returned when a class file has a bad magic number.
    #[error("bad magic number: {0:#010x} (expected 0xcafebabe)")]
    BadMagicNumber(u32),

    /// Returned when an unknown constant pool tag is found.
    #[error("unknown constant pool tag {0} at index {1}")]
    UnknownConstantPoolTag(u8, u16),

    /// Returned when invalid UTF-8 is found in a `CONSTANT_Utf8` entry.
    #[error("invalid modified utf-8 in constant pool: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// A constant pool index was out of bounds or pointed at zero.
    #[error("constant pool index {0} is out of bounds")]
    BadConstantPoolIndex(u16),

    /// A constant pool entry existed at the given index but had the wrong tag.
    #[error("constant pool entry at index {index} has unexpected tag (expected {expected})")]
    WrongConstantPoolTag { index: u16, expected: &'static str },

    /// Returned when an unknown verification-type-info tag is found in a `StackMapTable`.
    #[error("unknown verification type info tag {0}")]
    UnknownVerificationTypeInfo(u8),

    /// Returned when an unknown stack map frame tag is found.
    #[error("unknown stack map frame tag {0}")]
    UnknownStackMapFrameTag(u8),

    /// Returned when an unknown attribute name is found (attribute decoding is closed-world).
    #[error("unknown attribute {0:?}")]
    UnknownAttribute(String),

    /// Returned when an unknown opcode is found in a code array.
    #[error("unknown opcode {0:#04x} at bytecode offset {1}")]
    UnknownOpcode(u8, u32),

    /// Returned when a method or field lookup by name (and optionally descriptor) fails.
    #[error("no such {kind} {name:?}")]
    MemberNotFound { kind: &'static str, name: String },

    /// Returned when a method lacks a `Code` attribute but one was required.
    #[error("method {0:?} has no Code attribute")]
    NoCodeAttribute(String),

    /// Returned by the method importer when the imported method calls something
    /// outside the `java*` namespace that the destination class can't resolve.
    #[error("imported method {method:?} calls {target:?}, which is outside the java* namespace")]
    ImportNamespaceViolation { method: String, target: String },

    /// Returned by the method importer when the destination class already defines
    /// a method with the same name and descriptor.
    #[error("method {name:?} with descriptor {descriptor:?} already exists in the destination class")]
    DuplicateMethod { name: String, descriptor: String },

    /// Returned when an instruction spec names a mnemonic the opcode table doesn't know.
    #[error("unknown mnemonic {0:?}")]
    UnknownMnemonic(String),

    /// Returned when an instruction spec's operand shape doesn't match what its
    /// mnemonic expects (e.g. a branch offset given for `invokevirtual`).
    #[error("operand for {mnemonic:?} doesn't match its expected shape")]
    OperandShapeMismatch { mnemonic: &'static str },

    /// Returned when an edit targets an instruction index past the end of the list.
    #[error("instruction index {0} is out of bounds")]
    BadInstructionIndex(usize),

    /// Returned when an access-flags bitfield has bits set that none of the
    /// known ACC_* constants account for.
    #[error("invalid {kind} access flags: {bits:#06x}")]
    BadAccessFlags { kind: &'static str, bits: u16 },
}

pub type Result<T> = std::result::Result<T, ClassFileError>;
