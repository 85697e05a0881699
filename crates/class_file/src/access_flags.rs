use bitflags::bitflags;

bitflags! {
    /// `ACC_*` flags shared by classes, fields and methods. Bits that mean
    /// different things depending on where they appear are named after their
    /// method meaning; see the associated aliases for the others.
    pub struct AccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

impl AccessFlags {
    pub const SUPER: Self = Self::SYNCHRONIZED;
    pub const VOLATILE: Self = Self::BRIDGE;
    pub const TRANSIENT: Self = Self::VARARGS;
}
