//! Class file object model with live bytecode editing.
//!
//! Reads, edits, and re-serialises JVM class files: the constant pool,
//! fields, methods, attributes, and each method's bytecode body are exposed
//! as a mutable model that can be edited in place and written back as a
//! byte-for-byte valid class file.

pub mod error;
pub mod importer;
pub mod item;
pub mod stream;

pub use error::{ClassFileError, Result};
pub use item::file::ClassFile;
