use std::io::{self, BufReader, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    attributes::{self, CodeAttribute},
    class_file::{MethodInfo, MAGIC},
    constant_pool::{
        ClassInfo, CpInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo,
        RefInfo, Tag, Utf8Info, WideInfo, MAX_CONSTANT_POOL_SIZE, MAX_STRING_LENGTH,
    },
    UnknownTagPolicy,
};

use super::*;

type Endian = BigEndian;

pub const SUPPORTED_MAJOR_VERSIONS: std::ops::RangeInclusive<u16> = 45..=69;
pub const MAX_METHODS: u16 = 1000;

macro_rules! debug {
    ($parser:expr, $($arg:tt)+) => {
        if $parser.config.debug {
            log::debug!($($arg)+);
        }
    };
}

/// Decodes a class file from a forward-only byte source.
///
/// The parser owns its source; it is dropped, and a file closed, when
/// [`Parser::parse`] returns.
pub struct Parser<R> {
    r: BufReader<R>,
    config: DecoderConfig,
}
impl<R: Read> Parser<R> {
    pub fn new(r: R) -> Self {
        Self::with_config(r, DecoderConfig::default())
    }

    pub fn with_config(r: R, config: DecoderConfig) -> Self {
        Self {
            r: BufReader::new(r),
            config,
        }
    }

    pub fn parse(mut self) -> Result<ClassFile> {
        let magic = self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;

        let (constant_pool_count, constant_pool) = self.parse_constant_pool()?;
        let access_flags = AccessFlags::from_bits_truncate(self.read_u2()?);
        let this_class = self.read_u2()?;
        let super_class = self.read_u2()?;

        let interfaces_count = self.read_u2()?;
        self.skip(interfaces_count as u64 * 2)?;

        let fields_count = self.skip_fields()?;
        let methods = self.parse_methods(&constant_pool)?;

        Ok(ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool_count,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces_count,
            fields_count,
            methods,
        })
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        let magic = self.read_u4()?;
        debug!(self, "Read magic number: 0x{:08X}", magic);

        match magic {
            MAGIC => Ok(magic),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u2()?;
        let major = self.read_u2()?;

        if !SUPPORTED_MAJOR_VERSIONS.contains(&major) {
            return Err(ClassFileError::UnsupportedVersion { major, minor });
        }
        Ok((major, minor))
    }

    fn parse_constant_pool(&mut self) -> Result<(u16, ConstantPool)> {
        let constant_pool_count = self.read_u2()?;
        debug!(self, "Constant pool count: {}", constant_pool_count);

        if constant_pool_count > MAX_CONSTANT_POOL_SIZE {
            return Err(ClassFileError::ConstantPoolTooLarge(constant_pool_count));
        }

        let count = constant_pool_count as usize;
        let mut res = Vec::new();
        res.try_reserve_exact(count)?;
        if count > 0 {
            res.push(CpInfo::Unusable);
        }

        while res.len() < count {
            let index = res.len() as u16;
            let (cp_info, slot_size) = self.parse_cp_info().map_err(|source| {
                ClassFileError::ConstantPoolEntry {
                    index,
                    source: Box::new(source),
                }
            })?;
            res.push(cp_info);

            // The slot after a Long or Double stays empty; it may also be one past the end.
            let reserved = (slot_size - 1).min(count - res.len());
            res.extend(std::iter::repeat(CpInfo::Unusable).take(reserved));
        }

        Ok((constant_pool_count, ConstantPool::new(res)))
    }

    fn parse_cp_info(&mut self) -> Result<(CpInfo, usize)> {
        let tag = self.read_u1()?;
        debug!(self, "Reading constant pool entry with tag: {}", tag);

        let tag = match Tag::try_from(tag) {
            Ok(tag) => tag,
            Err(tag) => return self.unknown_cp_info(tag),
        };

        let cp_info = match tag {
            Tag::Utf8 => self.parse_utf8()?,
            Tag::Integer => CpInfo::Integer(self.read_u4()?),
            Tag::Float => CpInfo::Float(self.read_u4()?),
            Tag::Long => CpInfo::Long(self.parse_wide_info()?),
            Tag::Double => CpInfo::Double(self.parse_wide_info()?),
            Tag::Class => CpInfo::Class(ClassInfo {
                name_index: self.read_u2()?,
            }),
            Tag::String => CpInfo::String {
                string_index: self.read_u2()?,
            },
            Tag::FieldRef => CpInfo::FieldRef(self.parse_ref_info()?),
            Tag::MethodRef => CpInfo::MethodRef(self.parse_ref_info()?),
            Tag::InterfaceMethodRef => CpInfo::InterfaceMethodRef(self.parse_ref_info()?),
            Tag::NameAndType => self.parse_name_and_type_info()?,
            Tag::MethodHandle => self.parse_method_handle()?,
            Tag::MethodType => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u2()?,
            }),
            Tag::Dynamic => CpInfo::Dynamic(self.parse_dynamic_info()?),
            Tag::InvokeDynamic => CpInfo::InvokeDynamic(self.parse_dynamic_info()?),
            Tag::Module => CpInfo::Module {
                name_index: self.read_u2()?,
            },
            Tag::Package => CpInfo::Package {
                name_index: self.read_u2()?,
            },
        };

        Ok((cp_info, tag.slot_size()))
    }

    fn unknown_cp_info(&mut self, tag: u8) -> Result<(CpInfo, usize)> {
        match self.config.unknown_tags {
            UnknownTagPolicy::Reject => Err(ClassFileError::InvalidCpInfoTag(tag)),
            UnknownTagPolicy::Skip => {
                log::warn!("Unknown constant pool entry tag: {}. Skipping.", tag);
                Ok((CpInfo::Unknown(tag), 1))
            }
        }
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.read_u2()? as usize;
        check_string_length(length)?;
        let bytes = self.read_bytes(length)?;

        Ok(CpInfo::Utf8(Utf8Info::new(bytes)))
    }

    fn parse_wide_info(&mut self) -> Result<WideInfo> {
        let high_bytes = self.read_u4()?;
        let low_bytes = self.read_u4()?;

        Ok(WideInfo {
            high_bytes,
            low_bytes,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u2()?;
        let name_and_type_index = self.read_u2()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u2()?;
        let descriptor_index = self.read_u2()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u1()?;
        let reference_index = self.read_u2()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u2()?;
        let name_and_type_index = self.read_u2()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    /// Walks past the fields, returning how many there were.
    fn skip_fields(&mut self) -> Result<u16> {
        let fields_count = self.read_u2()?;

        for i in 0..fields_count {
            let access_flags = self.read_u2()?;
            let name_index = self.read_u2()?;
            let descriptor_index = self.read_u2()?;
            let attributes_count = self.read_u2()?;
            debug!(
                self,
                "Field {}: access_flags=0x{:04X}, name_index={}, descriptor_index={}, attributes_count={}",
                i,
                access_flags,
                name_index,
                descriptor_index,
                attributes_count
            );

            for j in 0..attributes_count {
                let (name_index, length) = self.skip_attribute()?;
                debug!(
                    self,
                    "Field {}, Attribute {}: name_index={}, length={}", i, j, name_index, length
                );
            }
        }

        Ok(fields_count)
    }

    fn parse_methods(&mut self, constant_pool: &ConstantPool) -> Result<Vec<MethodInfo>> {
        let methods_count = self.read_u2()?;
        debug!(self, "Methods count: {}", methods_count);

        if methods_count > MAX_METHODS {
            return Err(ClassFileError::TooManyMethods(methods_count));
        }

        let mut methods = Vec::new();
        methods.try_reserve_exact(methods_count as usize)?;
        for i in 0..methods_count {
            methods.push(self.parse_method_info(i, constant_pool)?);
        }

        Ok(methods)
    }

    fn parse_method_info(
        &mut self,
        method_index: u16,
        constant_pool: &ConstantPool,
    ) -> Result<MethodInfo> {
        let access_flags = self.read_u2()?;
        let name_index = self.read_u2()?;
        let descriptor_index = self.read_u2()?;
        let attributes_count = self.read_u2()?;
        debug!(
            self,
            "Method[{}]: access=0x{:04X}, name_index={}, desc_index={}, attr_count={}",
            method_index,
            access_flags,
            name_index,
            descriptor_index,
            attributes_count
        );

        let mut code = None;
        for _ in 0..attributes_count {
            let attribute_name_index = self.read_u2()?;
            let attribute_length = self.read_u4()?;

            let name = constant_pool.get(attribute_name_index).ok_or(
                ClassFileError::AttributeNameIndexOutOfRange {
                    index: attribute_name_index,
                    count: constant_pool.len() as u16,
                },
            )?;

            if !attributes::is_code_attribute(name) {
                self.skip(attribute_length as u64)?;
                continue;
            }

            if code.is_some() {
                if self.config.strict {
                    return Err(ClassFileError::DuplicateCodeAttribute(method_index));
                }
                log::warn!(
                    "Method[{}] has more than one Code attribute, keeping the last",
                    method_index
                );
            }
            debug!(self, " -> Found Code attribute");
            code = Some(self.parse_code_attribute(method_index, attribute_length)?);
        }

        Ok(MethodInfo {
            access_flags: AccessFlags::from_bits_truncate(access_flags),
            name_index,
            descriptor_index,
            attributes_count,
            code,
        })
    }

    fn parse_code_attribute(
        &mut self,
        method_index: u16,
        attribute_length: u32,
    ) -> Result<CodeAttribute> {
        let max_stack = self.read_u2()?;
        let max_locals = self.read_u2()?;
        let code_length = self.read_u4()?;
        let code = self.read_bytes(code_length as usize)?;

        let exception_table_length = self.read_u2()?;
        self.skip(exception_table_length as u64 * 8)?;

        let attributes_count = self.read_u2()?;
        let mut consumed =
            2 + 2 + 4 + code_length as u64 + 2 + exception_table_length as u64 * 8 + 2;
        for k in 0..attributes_count {
            let (name_index, length) = self.skip_attribute()?;
            debug!(
                self,
                "Method[{}], Code attribute, Sub-attribute {}: name_index={}, length={}",
                method_index,
                k,
                name_index,
                length
            );
            consumed += 6 + length as u64;
        }

        if consumed != attribute_length as u64 {
            if self.config.strict {
                return Err(ClassFileError::AttributeLengthMismatch {
                    declared: attribute_length,
                    actual: consumed,
                });
            }
            log::warn!(
                "Method[{}]: Code attribute declares {} bytes but spans {}",
                method_index,
                attribute_length,
                consumed
            );
        }

        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table_length,
            attributes_count,
        })
    }

    /// Reads an attribute header and discards its payload.
    fn skip_attribute(&mut self) -> Result<(u16, u32)> {
        let attribute_name_index = self.read_u2()?;
        let attribute_length = self.read_u4()?;
        self.skip(attribute_length as u64)?;

        Ok((attribute_name_index, attribute_length))
    }

    /// Reads exactly `length` bytes into a freshly allocated buffer.
    fn read_bytes(&mut self, length: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(length)?;

        let read = (&mut self.r).take(length as u64).read_to_end(&mut bytes)?;
        if read < length {
            return Err(unexpected_eof(length as u64, read as u64));
        }
        Ok(bytes)
    }

    /// Discards exactly `length` bytes.
    fn skip(&mut self, length: u64) -> Result<()> {
        let skipped = io::copy(&mut (&mut self.r).take(length), &mut io::sink())?;
        if skipped < length {
            return Err(unexpected_eof(length, skipped));
        }
        Ok(())
    }

    fn read_u4(&mut self) -> Result<u32> {
        Ok(self.r.read_u32::<Endian>()?)
    }

    fn read_u2(&mut self) -> Result<u16> {
        Ok(self.r.read_u16::<Endian>()?)
    }

    fn read_u1(&mut self) -> Result<u8> {
        Ok(self.r.read_u8()?)
    }
}

fn check_string_length(length: usize) -> Result<()> {
    if length > MAX_STRING_LENGTH {
        return Err(ClassFileError::StringTooLong(length));
    }
    Ok(())
}

fn unexpected_eof(expected: u64, found: u64) -> ClassFileError {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("Unexpected end of file: expected {expected} bytes, found {found}"),
    )
    .into()
}

#[cfg(test)]
fn parser(bytes: &[u8]) -> Parser<&[u8]> {
    Parser::new(bytes)
}


#[cfg(test)]
mod parse_magic_identifier_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_the_correct_identifier() {
        assert_eq!(
            parser(&[0xca, 0xfe, 0xba, 0xbe])
                .parse_magic_identifier()
                .unwrap(),
            MAGIC
        );
    }

    #[test]
    fn it_should_fail_if_there_is_not_enough_data() {
        assert!(matches!(
            parser(&[0xca, 0xfe, 0xba]).parse_magic_identifier(),
            Err(ClassFileError::IOError(_))
        ));
    }

    #[test]
    fn it_should_fail_if_the_magic_identifier_is_incorrect() {
        assert!(matches!(
            parser(&[0xde, 0xad, 0xbe, 0xef]).parse_magic_identifier(),
            Err(ClassFileError::InvalidMagicIdentifier(0xDEADBEEF))
        ));
    }
}

#[cfg(test)]
mod parse_version_tests {
    use super::*;

    #[test]
    fn it_should_be_able_to_parse_a_version() {
        assert_eq!(
            parser(&[0x00, 0x03, 0x00, 0x34])
                .parse_version()
                .unwrap(),
            (52, 3)
        );
    }

    #[test]
    fn it_should_accept_the_bounds_of_the_supported_range() {
        assert!(parser(&[0, 0, 0, 45]).parse_version().is_ok());
        assert!(parser(&[0, 0, 0, 69]).parse_version().is_ok());
    }

    #[test]
    fn it_should_reject_versions_outside_the_supported_range() {
        assert!(matches!(
            parser(&[0, 0, 0, 44]).parse_version(),
            Err(ClassFileError::UnsupportedVersion { major: 44, minor: 0 })
        ));
        assert!(matches!(
            parser(&[0, 0, 0, 70]).parse_version(),
            Err(ClassFileError::UnsupportedVersion { major: 70, minor: 0 })
        ));
    }
}


#[cfg(test)]
mod parse_code_attribute_tests {
    use super::*;

    #[test]
    fn it_should_parse_code_and_skip_the_rest() {
        let bytes = [
            0, 2, // max_stack
            0, 1, // max_locals
            0, 0, 0, 3, // code_length
            0x2a, 0xb7, 0xb1, // code
            0, 1, // exception_table_length
            0, 0, 0, 3, 0, 3, 0, 0, // exception table
            0, 1, // attributes_count
            0, 9, 0, 0, 0, 2, 0xaa, 0xbb, // sub-attribute
            0xff, // trailing
        ];
        let mut parser = parser(&bytes);

        let code = parser.parse_code_attribute(0, 31).unwrap();
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.code, vec![0x2a, 0xb7, 0xb1]);
        assert_eq!(code.code_length(), 3);
        assert_eq!(code.exception_table_length, 1);
        assert_eq!(code.attributes_count, 1);
        assert_eq!(parser.read_u1().unwrap(), 0xff);
    }

    #[test]
    fn it_should_accept_a_declared_length_that_does_not_match() {
        let bytes = [0, 1, 0, 1, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0];

        let code = parser(&bytes).parse_code_attribute(0, 14).unwrap();
        assert_eq!(code.code, vec![0xb1]);
    }

    #[test]
    fn it_should_reject_a_declared_length_that_does_not_match_when_strict() {
        let bytes = [0, 1, 0, 1, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0];
        let config = DecoderConfig::default().with_strict(true);

        assert!(matches!(
            Parser::with_config(&bytes[..], config).parse_code_attribute(0, 14),
            Err(ClassFileError::AttributeLengthMismatch {
                declared: 14,
                actual: 13
            })
        ));
    }

    #[test]
    fn it_should_fail_on_truncated_code() {
        let bytes = [0, 1, 0, 1, 0, 0, 0, 8, 0xb1, 0xb1];

        assert_eq!(
            parser(&bytes)
                .parse_code_attribute(0, 20)
                .unwrap_err()
                .kind(),
            ErrorKind::Io
        );
    }
}
