//! Access flags for classes, fields and methods
//!
//! Bit values match the dex format. Predicates are available both on the raw
//! [`AccessFlags`] word and on anything implementing [`HasAccess`].

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICT = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags {
    pub const VISIBILITY_MASK: AccessFlags = AccessFlags::PUBLIC
        .union(AccessFlags::PRIVATE)
        .union(AccessFlags::PROTECTED);

    /// Parse a lowercase flag name such as `public` or `declared_synchronized`
    pub fn from_flag_name(name: &str) -> Option<Self> {
        Self::from_name(&name.to_ascii_uppercase())
    }

    /// Lowercase names of the set flags, in declaration order
    pub fn flag_names(self) -> Vec<String> {
        self.iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect()
    }

    pub fn is_package_private(self) -> bool {
        !self.intersects(AccessFlags::PUBLIC | AccessFlags::PRIVATE | AccessFlags::PROTECTED)
    }

    pub fn with_public(self) -> Self {
        (self - Self::VISIBILITY_MASK) | AccessFlags::PUBLIC
    }
}

/// Read access to the flag word of a class or member
pub trait HasAccess {
    fn access(&self) -> AccessFlags;

    fn is_public(&self) -> bool {
        self.access().contains(AccessFlags::PUBLIC)
    }

    fn is_private(&self) -> bool {
        self.access().contains(AccessFlags::PRIVATE)
    }

    fn is_protected(&self) -> bool {
        self.access().contains(AccessFlags::PROTECTED)
    }

    fn is_package_private(&self) -> bool {
        self.access().is_package_private()
    }

    fn is_static(&self) -> bool {
        self.access().contains(AccessFlags::STATIC)
    }

    fn is_final(&self) -> bool {
        self.access().contains(AccessFlags::FINAL)
    }

    fn is_interface(&self) -> bool {
        self.access().contains(AccessFlags::INTERFACE)
    }

    fn is_abstract(&self) -> bool {
        self.access().contains(AccessFlags::ABSTRACT)
    }

    fn is_annotation(&self) -> bool {
        self.access().contains(AccessFlags::ANNOTATION)
    }

    fn is_constructor(&self) -> bool {
        self.access().contains(AccessFlags::CONSTRUCTOR)
    }
}
