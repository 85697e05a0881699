use std::{fs::File, io::Read, path::Path};

use crate::{
    attributes::CodeAttribute, constant_pool::ClassInfo, matches_cp_info, parser::Parser,
    AccessFlags, ClassFileError, ConstantPool, DecoderConfig, Result,
};

pub const MAGIC: u32 = 0xCAFEBABE;

#[derive(Debug)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool_count: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces_count: u16,
    pub fields_count: u16,
    pub methods: Vec<MethodInfo>,
}
impl ClassFile {
    /// Opens and decodes the class file at `path`. The file is closed before
    /// this returns, whatever the outcome.
    pub fn open(path: impl AsRef<Path>, config: &DecoderConfig) -> Result<ClassFile> {
        let path = path.as_ref();
        if config.debug {
            log::debug!("Opening class file: {}", path.display());
        }

        let file = File::open(path).map_err(|source| ClassFileError::Open {
            path: path.to_owned(),
            source,
        })?;

        Self::parse(file, config)
    }

    pub fn parse(bytes: impl Read, config: &DecoderConfig) -> Result<ClassFile> {
        Parser::with_config(bytes, *config).parse()
    }

    /// Releases everything the class file owns. Taking `self` by value means
    /// a released class file cannot be used or released again.
    pub fn release(self) {
        drop(self)
    }

    pub fn magic(&self) -> u32 {
        self.magic
    }

    /// `(major, minor)`
    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn constant_pool_count(&self) -> u16 {
        self.constant_pool_count
    }

    pub fn methods_count(&self) -> u16 {
        self.methods.len() as u16
    }

    pub fn super_class(&self) -> Result<Option<&str>> {
        // If the value of the super_class item is zero, then this class file must represent the class Object,
        // the only class or interface without a direct superclass.
        if self.super_class == 0 {
            return Ok(None);
        }

        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.super_class, Class)?;

        Ok(Some(self.utf8(*name_index)?))
    }

    pub fn class_name(&self) -> Result<&str> {
        // The constant_pool entry at this_class must be a CONSTANT_Class_info structure
        // representing the class or interface defined by this class file.
        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.this_class, Class)?;

        self.utf8(*name_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<&str> {
        self.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<&str> {
        self.utf8(method.descriptor_index)
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            self.method_name(m).map_or(false, |n| n == name)
                && self.method_descriptor(m).map_or(false, |d| d == descriptor)
        })
    }

    fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self.constant_pool, index, Utf8)?
            .as_str()
            .ok_or(ClassFileError::InvalidUtf8(index))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct MethodInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes_count: u16,
    pub code: Option<CodeAttribute>,
}
impl MethodInfo {
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.code.as_ref()
    }
}
