use std::fmt;

use crate::constant_pool::CpInfo;

pub const CODE: &str = "Code";

/// Whether an attribute whose name resolves to `name` carries method code.
pub fn is_code_attribute(name: &CpInfo) -> bool {
    matches!(name, CpInfo::Utf8(utf8) if *utf8 == CODE)
}

/// The `Code` attribute of a method. The exception table and nested
/// attributes are skipped; only their sizes are kept.
#[derive(PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table_length: u16,
    pub attributes_count: u16,
}
impl CodeAttribute {
    pub fn code_length(&self) -> u32 {
        self.code.len() as u32
    }
}
impl fmt::Debug for CodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeAttribute")
            .field("max_stack", &self.max_stack)
            .field("max_locals", &self.max_locals)
            .field("code", &format!("({} bytes)", self.code.len()))
            .field("exception_table_length", &self.exception_table_length)
            .field("attributes_count", &self.attributes_count)
            .finish()
    }
}

#[cfg(test)]
mod is_code_attribute_tests {
    use super::*;
    use crate::constant_pool::Utf8Info;

    #[test]
    fn it_should_match_the_code_name() {
        assert!(is_code_attribute(&CpInfo::Utf8(Utf8Info::new(
            b"Code".to_vec()
        ))));
    }

    #[test]
    fn it_should_not_match_other_names_or_kinds() {
        assert!(!is_code_attribute(&CpInfo::Utf8(Utf8Info::new(
            b"LineNumberTable".to_vec()
        ))));
        assert!(!is_code_attribute(&CpInfo::Utf8(Utf8Info::new(
            b"code".to_vec()
        ))));
        assert!(!is_code_attribute(&CpInfo::String { string_index: 1 }));
        assert!(!is_code_attribute(&CpInfo::Unusable));
    }
}
