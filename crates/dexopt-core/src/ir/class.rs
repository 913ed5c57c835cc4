use super::code::MethodCode;
use super::proto::Proto;
use crate::access::{AccessFlags, HasAccess};
use crate::type_interner::TypeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexField {
    pub name: String,
    pub ty: TypeId,
    pub access: AccessFlags,
}

impl DexField {
    pub fn new(name: impl Into<String>, ty: TypeId, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            ty,
            access,
        }
    }
}

impl HasAccess for DexField {
    fn access(&self) -> AccessFlags {
        self.access
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexMethod {
    pub name: String,
    pub proto: Proto,
    pub access: AccessFlags,
    pub code: Option<MethodCode>,
}

impl DexMethod {
    pub fn new(name: impl Into<String>, proto: Proto, access: AccessFlags) -> Self {
        Self {
            name: name.into(),
            proto,
            access,
            code: None,
        }
    }

    pub fn with_code(mut self, code: MethodCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Dispatched through a vtable: not static, not private, not a constructor
    pub fn is_virtual(&self) -> bool {
        !self.is_static() && !self.is_private() && !self.is_constructor() && self.name != "<init>"
    }
}

impl HasAccess for DexMethod {
    fn access(&self) -> AccessFlags {
        self.access
    }
}

/// A class or interface definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DexClass {
    pub ty: TypeId,
    pub super_class: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    pub access: AccessFlags,
    /// Defined outside the optimizable scope (library or platform class)
    pub external: bool,
    /// Types of the annotations applied to the class
    pub annotations: Vec<TypeId>,
    pub fields: Vec<DexField>,
    pub methods: Vec<DexMethod>,
}

impl DexClass {
    pub fn new(ty: TypeId, access: AccessFlags) -> Self {
        Self {
            ty,
            super_class: None,
            interfaces: Vec::new(),
            access,
            external: false,
            annotations: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn find_method(&self, name: &str, proto: &Proto) -> Option<&DexMethod> {
        self.methods
            .iter()
            .find(|m| m.name == name && &m.proto == proto)
    }

    /// Every type mentioned by the class header and member signatures
    pub fn signature_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.super_class
            .iter()
            .copied()
            .chain(self.interfaces.iter().copied())
            .chain(self.fields.iter().map(|f| f.ty))
            .chain(self.methods.iter().flat_map(|m| m.proto.types()))
    }
}

impl HasAccess for DexClass {
    fn access(&self) -> AccessFlags {
        self.access
    }
}
