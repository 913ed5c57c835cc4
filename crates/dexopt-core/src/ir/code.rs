use super::proto::{FieldRef, MethodRef};
use crate::type_interner::{TypeId, TypeInterner};

/// Dispatch kind of an invoke instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
    Virtual,
    Super,
    Direct,
    Static,
    Interface,
}

impl InvokeKind {
    pub fn mnemonic(self) -> &'static str {
        match self {
            InvokeKind::Virtual => "invoke-virtual",
            InvokeKind::Super => "invoke-super",
            InvokeKind::Direct => "invoke-direct",
            InvokeKind::Static => "invoke-static",
            InvokeKind::Interface => "invoke-interface",
        }
    }

    pub fn from_mnemonic(op: &str) -> Option<Self> {
        Some(match op {
            "invoke-virtual" => InvokeKind::Virtual,
            "invoke-super" => InvokeKind::Super,
            "invoke-direct" => InvokeKind::Direct,
            "invoke-static" => InvokeKind::Static,
            "invoke-interface" => InvokeKind::Interface,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    InstanceGet,
    InstancePut,
    StaticGet,
    StaticPut,
}

impl FieldOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            FieldOp::InstanceGet => "iget",
            FieldOp::InstancePut => "iput",
            FieldOp::StaticGet => "sget",
            FieldOp::StaticPut => "sput",
        }
    }

    pub fn from_mnemonic(op: &str) -> Option<Self> {
        Some(match op {
            "iget" => FieldOp::InstanceGet,
            "iput" => FieldOp::InstancePut,
            "sget" => FieldOp::StaticGet,
            "sput" => FieldOp::StaticPut,
            _ => return None,
        })
    }
}

/// Instruction with a bare type operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOp {
    CheckCast,
    InstanceOf,
    NewInstance,
    NewArray,
    FilledNewArray,
    ConstClass,
}

impl TypeOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            TypeOp::CheckCast => "check-cast",
            TypeOp::InstanceOf => "instance-of",
            TypeOp::NewInstance => "new-instance",
            TypeOp::NewArray => "new-array",
            TypeOp::FilledNewArray => "filled-new-array",
            TypeOp::ConstClass => "const-class",
        }
    }

    pub fn from_mnemonic(op: &str) -> Option<Self> {
        Some(match op {
            "check-cast" => TypeOp::CheckCast,
            "instance-of" => TypeOp::InstanceOf,
            "new-instance" => TypeOp::NewInstance,
            "new-array" => TypeOp::NewArray,
            "filled-new-array" => TypeOp::FilledNewArray,
            "const-class" => TypeOp::ConstClass,
            _ => return None,
        })
    }
}

/// A single instruction. Only the operands this optimizer cares about are
/// modelled; everything else is carried as an opaque mnemonic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    Invoke { kind: InvokeKind, method: MethodRef },
    Field { op: FieldOp, field: FieldRef },
    Type { op: TypeOp, ty: TypeId },
    Other(String),
}

impl Instruction {
    pub fn invoke(kind: InvokeKind, method: MethodRef) -> Self {
        Instruction::Invoke { kind, method }
    }

    pub fn field(op: FieldOp, field: FieldRef) -> Self {
        Instruction::Field { op, field }
    }

    pub fn type_op(op: TypeOp, ty: TypeId) -> Self {
        Instruction::Type { op, ty }
    }

    pub fn other(mnemonic: impl Into<String>) -> Self {
        Instruction::Other(mnemonic.into())
    }

    pub fn mnemonic(&self) -> &str {
        match self {
            Instruction::Invoke { kind, .. } => kind.mnemonic(),
            Instruction::Field { op, .. } => op.mnemonic(),
            Instruction::Type { op, .. } => op.mnemonic(),
            Instruction::Other(mnemonic) => mnemonic,
        }
    }

    /// Every type this instruction references, owners included
    pub fn referenced_types(&self) -> Vec<TypeId> {
        match self {
            Instruction::Invoke { method, .. } => {
                std::iter::once(method.owner).chain(method.proto.types()).collect()
            }
            Instruction::Field { field, .. } => vec![field.owner, field.ty],
            Instruction::Type { ty, .. } => vec![*ty],
            Instruction::Other(_) => Vec::new(),
        }
    }

    pub fn display(&self, types: &TypeInterner) -> String {
        match self {
            Instruction::Invoke { kind, method } => {
                format!("{} {}", kind.mnemonic(), method.display(types))
            }
            Instruction::Field { op, field } => format!("{} {}", op.mnemonic(), field.display(types)),
            Instruction::Type { op, ty } => format!("{} {}", op.mnemonic(), types.resolve(*ty)),
            Instruction::Other(mnemonic) => mnemonic.clone(),
        }
    }
}

/// Debug-info opcode stream entries
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DebugOpcode {
    AdvancePc(u32),
    AdvanceLine(i32),
    StartLocal {
        register: u32,
        name: String,
        ty: TypeId,
        signature: Option<String>,
    },
    EndLocal(u32),
    RestartLocal(u32),
    SetPrologueEnd,
    SetEpilogueBegin,
    SetFile(Option<String>),
    Special(u8),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugInfo {
    pub line_start: u32,
    pub opcodes: Vec<DebugOpcode>,
}

/// Body of a method
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodCode {
    pub insns: Vec<Instruction>,
    /// Catch types of the method's try regions; catch-alls are not listed
    pub catches: Vec<TypeId>,
    pub debug: Option<DebugInfo>,
}

impl MethodCode {
    pub fn new(insns: Vec<Instruction>) -> Self {
        Self {
            insns,
            ..Self::default()
        }
    }
}
