// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html

mod access_flags;
pub mod attributes;
mod class_file;
mod config;
#[macro_use]
pub mod constant_pool;
mod error;
mod parser;

pub use self::class_file::{ClassFile, MethodInfo, MAGIC};
pub use access_flags::AccessFlags;
pub use attributes::CodeAttribute;
pub use config::{DecoderConfig, UnknownTagPolicy};
pub use constant_pool::{ConstantPool, CpInfo};
pub use error::{ClassFileError, ErrorKind};
pub use parser::{Parser, MAX_METHODS, SUPPORTED_MAJOR_VERSIONS};

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;
