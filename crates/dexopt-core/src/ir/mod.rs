//! In-memory representation of an application image
//!
//! The image is a set of ordered containers holding internal classes, plus a
//! list of external (library/platform) classes that are only ever read.

mod class;
mod code;
mod dump;
mod proto;
mod scope;

pub use class::{DexClass, DexField, DexMethod};
pub use code::{DebugInfo, DebugOpcode, FieldOp, Instruction, InvokeKind, MethodCode, TypeOp};
pub use proto::{parse_field_descriptor, FieldRef, MethodRef, Proto};
pub use scope::{DexClasses, DexClassesVector, Scope};

use crate::type_interner::{TypeId, TypeInterner};

/// A loaded application image
#[derive(Debug, Clone, Default)]
pub struct DexProgram {
    pub types: TypeInterner,
    pub dexen: DexClassesVector,
    /// External classes, resolvable by type but never optimized
    pub library: Vec<DexClass>,
}

impl DexProgram {
    pub fn new(types: TypeInterner) -> Self {
        Self {
            types,
            dexen: Vec::new(),
            library: Vec::new(),
        }
    }

    /// Number of internal classes across all containers
    pub fn class_count(&self) -> usize {
        self.dexen.iter().map(Vec::len).sum()
    }

    pub fn classes(&self) -> impl Iterator<Item = &DexClass> + '_ {
        self.dexen.iter().flatten()
    }

    /// Find an internal or library class by descriptor
    pub fn find_class(&self, descriptor: &str) -> Option<&DexClass> {
        let ty = self.types.get(descriptor)?;
        self.find_class_by_type(ty)
    }

    pub fn find_class_by_type(&self, ty: TypeId) -> Option<&DexClass> {
        self.classes()
            .chain(self.library.iter())
            .find(|class| class.ty == ty)
    }
}
