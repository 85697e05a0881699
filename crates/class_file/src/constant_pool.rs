use std::{fmt, ops::Index};

use crate::{ClassFileError, Result};

pub const MAX_CONSTANT_POOL_SIZE: u16 = 32767;
pub const MAX_STRING_LENGTH: usize = 65535;

/// The constant pool of a class file, addressed by the one-based indices used
/// throughout the format.
///
/// Slot 0 and the slot following every `Long` or `Double` hold
/// [`CpInfo::Unusable`].
#[derive(Debug, Default)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    /// Number of slots, including the unused slot 0. A pool declared with a
    /// count of 0 has no slots at all.
    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    /// True when the pool has no usable entries. Slot 0 never counts, so this
    /// holds for `len()` of 0 or 1.
    pub fn is_empty(&self) -> bool {
        self.cp_infos.len() <= 1
    }

    pub fn get(&self, index: u16) -> Option<&CpInfo> {
        self.cp_infos.get(index as usize)
    }

    pub fn try_get(&self, index: u16) -> Result<&CpInfo> {
        self.get(index)
            .ok_or(ClassFileError::ConstantPoolIndexOutOfRange(index))
    }

    /// Text of the `Utf8` entry at `index`, if that slot holds one.
    pub fn utf8(&self, index: u16) -> Option<&Utf8Info> {
        match self.get(index)? {
            CpInfo::Utf8(utf8) => Some(utf8),
            _ => None,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CpInfo> {
        self.cp_infos.iter()
    }
}
impl Index<u16> for ConstantPool {
    type Output = CpInfo;

    fn index(&self, index: u16) -> &Self::Output {
        &self.cp_infos[index as usize]
    }
}
impl<'a> IntoIterator for &'a ConstantPool {
    type Item = &'a CpInfo;
    type IntoIter = std::slice::Iter<'a, CpInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.cp_infos.iter()
    }
}

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.try_get($index)? {
            $crate::constant_pool::CpInfo::$i(n) => Ok(n),
            c => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
        }
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Tag {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    FieldRef = 9,
    MethodRef = 10,
    InterfaceMethodRef = 11,
    NameAndType = 12,
    MethodHandle = 15,
    MethodType = 16,
    Dynamic = 17,
    InvokeDynamic = 18,
    Module = 19,
    Package = 20,
}
impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Tag::Utf8),
            3 => Ok(Tag::Integer),
            4 => Ok(Tag::Float),
            5 => Ok(Tag::Long),
            6 => Ok(Tag::Double),
            7 => Ok(Tag::Class),
            8 => Ok(Tag::String),
            9 => Ok(Tag::FieldRef),
            10 => Ok(Tag::MethodRef),
            11 => Ok(Tag::InterfaceMethodRef),
            12 => Ok(Tag::NameAndType),
            15 => Ok(Tag::MethodHandle),
            16 => Ok(Tag::MethodType),
            17 => Ok(Tag::Dynamic),
            18 => Ok(Tag::InvokeDynamic),
            19 => Ok(Tag::Module),
            20 => Ok(Tag::Package),
            _ => Err(value),
        }
    }
}
impl Tag {
    /// Long and Double take up two slots of the pool.
    pub fn slot_size(self) -> usize {
        match self {
            Tag::Long | Tag::Double => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CpInfo {
    MethodRef(RefInfo),
    FieldRef(RefInfo),
    InterfaceMethodRef(RefInfo),
    Class(ClassInfo),
    NameAndType(NameAndTypeInfo),
    Utf8(Utf8Info),
    String { string_index: u16 },
    Integer(u32),
    Float(u32),
    Long(WideInfo),
    Double(WideInfo),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// A record whose tag was not recognised, kept only when unknown tags are
    /// skipped instead of rejected.
    Unknown(u8),
    Unusable,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ClassInfo {
    // The value of the name_index item must be a valid index into the constant_pool table.
    // The constant_pool entry at that index must be a CONSTANT_Utf8_info structure
    // representing a valid binary class or interface name encoded in internal form.
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}

/// The two big-endian words of a `Long` or `Double` constant.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct WideInfo {
    pub high_bytes: u32,
    pub low_bytes: u32,
}
impl WideInfo {
    pub fn bits(&self) -> u64 {
        (self.high_bytes as u64) << 32 | self.low_bytes as u64
    }

    pub fn as_i64(&self) -> i64 {
        self.bits() as i64
    }

    pub fn as_f64(&self) -> f64 {
        f64::from_bits(self.bits())
    }
}

/// Raw bytes of a `CONSTANT_Utf8_info`, in the class file's modified UTF-8.
#[derive(PartialEq, Eq, Clone)]
pub struct Utf8Info {
    bytes: Vec<u8>,
}
impl Utf8Info {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Modified UTF-8 only differs from UTF-8 for NUL and supplementary
    /// characters, so plain identifiers and descriptors always convert.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}
impl fmt::Debug for Utf8Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.bytes))
    }
}
impl PartialEq<str> for Utf8Info {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}
impl PartialEq<&str> for Utf8Info {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}
