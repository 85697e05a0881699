/// What to do with a constant pool tag the decoder does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownTagPolicy {
    /// Fail with [`ClassFileError::InvalidCpInfoTag`](crate::ClassFileError::InvalidCpInfoTag).
    #[default]
    Reject,
    /// Record [`CpInfo::Unknown`](crate::constant_pool::CpInfo::Unknown) and
    /// carry on with the next byte. Unknown records have no length field, so
    /// any payload they carry is then read as the next tag.
    Skip,
}

/// Options for a single decode.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoderConfig {
    pub debug: bool,
    pub unknown_tags: UnknownTagPolicy,
    /// Reject a method with more than one `Code` attribute, or a `Code`
    /// attribute whose contents disagree with its declared length. When off,
    /// both are logged as warnings and a later `Code` attribute replaces an
    /// earlier one.
    pub strict: bool,
}
impl DecoderConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_unknown_tags(mut self, unknown_tags: UnknownTagPolicy) -> Self {
        self.unknown_tags = unknown_tags;
        self
    }
}
