use std::{collections::TryReserveError, path::PathBuf};

use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Failed to open class file '{}'", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Out of memory: {0}")]
    AllocationFailed(#[from] TryReserveError),
    #[error("Invalid magic identifier: 0x{0:08X}")]
    InvalidMagicIdentifier(u32),
    #[error("Unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("Invalid constant pool count: {0}")]
    ConstantPoolTooLarge(u16),
    #[error("UTF8 string too long ({0})")]
    StringTooLong(usize),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Failed reading constant pool entry at index {index}: {source}")]
    ConstantPoolEntry {
        index: u16,
        #[source]
        source: Box<ClassFileError>,
    },
    #[error("Method count {0} is suspiciously large")]
    TooManyMethods(u16),
    #[error("attribute_name_index {index} out of range (constant pool count {count})")]
    AttributeNameIndexOutOfRange { index: u16, count: u16 },
    #[error("Code attribute declares {declared} bytes but spans {actual}")]
    AttributeLengthMismatch { declared: u32, actual: u64 },
    #[error("Method {0} has more than one Code attribute")]
    DuplicateCodeAttribute(u16),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
    #[error("Constant pool index {0} out of range")]
    ConstantPoolIndexOutOfRange(u16),
    #[error("Constant pool entry {0} is not valid UTF-8")]
    InvalidUtf8(u16),
}

/// Broad classification of a [`ClassFileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be opened or ended early.
    Io,
    /// The bytes were read but violate the class file structure.
    Format,
    /// An allocation could not be satisfied.
    Resource,
}

impl ClassFileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IOError(_) | Self::Open { .. } => ErrorKind::Io,
            Self::AllocationFailed(_) => ErrorKind::Resource,
            Self::ConstantPoolEntry { source, .. } => source.kind(),
            Self::InvalidMagicIdentifier(_)
            | Self::UnsupportedVersion { .. }
            | Self::ConstantPoolTooLarge(_)
            | Self::StringTooLong(_)
            | Self::InvalidCpInfoTag(_)
            | Self::TooManyMethods(_)
            | Self::AttributeNameIndexOutOfRange { .. }
            | Self::AttributeLengthMismatch { .. }
            | Self::DuplicateCodeAttribute(_)
            | Self::UnexpectedConstantPoolEntry(..)
            | Self::ConstantPoolIndexOutOfRange(_)
            | Self::InvalidUtf8(_) => ErrorKind::Format,
        }
    }
}
