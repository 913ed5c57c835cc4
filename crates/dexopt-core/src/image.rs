//! JSON rendition of an application image
//!
//! ```json
//! {
//!   "library": [ { "name": "Ljava/lang/Object;", "access": ["public"] } ],
//!   "dexes": [[
//!     {
//!       "name": "Lcom/app/Impl;",
//!       "superClass": "Ljava/lang/Object;",
//!       "interfaces": ["Lcom/app/Service;"],
//!       "access": ["public", "final"],
//!       "methods": [{
//!         "name": "run", "proto": "()V", "access": ["public"],
//!         "code": { "insns": [ { "op": "return-void" } ] }
//!       }]
//!     }
//!   ]]
//! }
//! ```
//!
//! Descriptors and member references are validated while loading, so the IR
//! never holds a malformed type.

use crate::access::AccessFlags;
use crate::errors::ImageError;
use crate::ir::{
    parse_field_descriptor, DebugInfo, DebugOpcode, DexClass, DexField, DexMethod, DexProgram,
    FieldOp, FieldRef, Instruction, InvokeKind, MethodCode, MethodRef, Proto, TypeOp,
};
use crate::type_interner::{TypeId, TypeInterner};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageFile {
    #[serde(default)]
    pub library: Vec<ClassDef>,
    #[serde(default)]
    pub dexes: Vec<Vec<ClassDef>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_class: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub access: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub external: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub access: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub proto: String,
    #[serde(default)]
    pub access: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeDef {
    #[serde(default)]
    pub insns: Vec<InsnDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catches: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugDef>,
}

/// An instruction: its mnemonic plus whichever operand it takes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InsnDef {
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugDef {
    #[serde(default)]
    pub line_start: u32,
    #[serde(default)]
    pub opcodes: Vec<DebugOpDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum DebugOpDef {
    AdvancePc {
        addr: u32,
    },
    AdvanceLine {
        line: i32,
    },
    StartLocal {
        register: u32,
        name: String,
        #[serde(rename = "type")]
        ty: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    EndLocal {
        register: u32,
    },
    RestartLocal {
        register: u32,
    },
    SetPrologueEnd,
    SetEpilogueBegin,
    SetFile {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Special {
        value: u8,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

// =============================================================================
// Loading
// =============================================================================

/// Parse and validate an image from JSON text
pub fn load_image(json: &str) -> Result<DexProgram, ImageError> {
    let file: ImageFile = serde_json::from_str(json)?;
    from_image(file)
}

/// Read an image file from disk
pub fn read_image(path: &Path) -> Result<DexProgram, ImageError> {
    if !path.exists() {
        return Err(ImageError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let json = std::fs::read_to_string(path)?;
    load_image(&json)
}

/// Convert a deserialized image into the IR
pub fn from_image(file: ImageFile) -> Result<DexProgram, ImageError> {
    let mut program = DexProgram::default();
    let mut defined = FxHashSet::default();

    for def in &file.library {
        let mut class = convert_class(def, &mut program.types)?;
        class.external = true;
        if !defined.insert(class.ty) {
            return Err(ImageError::DuplicateClass(def.name.clone()));
        }
        program.library.push(class);
    }

    for dex in &file.dexes {
        let mut classes = Vec::with_capacity(dex.len());
        for def in dex {
            let class = convert_class(def, &mut program.types)?;
            if !defined.insert(class.ty) {
                return Err(ImageError::DuplicateClass(def.name.clone()));
            }
            classes.push(class);
        }
        program.dexen.push(classes);
    }

    Ok(program)
}

fn convert_class(def: &ClassDef, types: &mut TypeInterner) -> Result<DexClass, ImageError> {
    let ty = parse_class_type(&def.name, types)?;
    let mut class = DexClass::new(ty, parse_access(&def.name, &def.access)?);
    class.external = def.external;
    class.super_class = def
        .super_class
        .as_deref()
        .map(|s| parse_class_type(s, types))
        .transpose()?;
    class.interfaces = def
        .interfaces
        .iter()
        .map(|i| parse_class_type(i, types))
        .collect::<Result<_, _>>()?;
    class.annotations = def
        .annotations
        .iter()
        .map(|a| parse_class_type(a, types))
        .collect::<Result<_, _>>()?;

    for field in &def.fields {
        let owner = format!("{}.{}", def.name, field.name);
        class.fields.push(DexField::new(
            field.name.clone(),
            parse_field_descriptor(&field.ty, types)?,
            parse_access(&owner, &field.access)?,
        ));
    }

    for method in &def.methods {
        let owner = format!("{}.{}:{}", def.name, method.name, method.proto);
        let mut converted = DexMethod::new(
            method.name.clone(),
            Proto::parse(&method.proto, types)?,
            parse_access(&owner, &method.access)?,
        );
        if let Some(code) = &method.code {
            converted.code = Some(convert_code(&owner, code, types)?);
        }
        class.methods.push(converted);
    }

    Ok(class)
}

fn convert_code(owner: &str, def: &CodeDef, types: &mut TypeInterner) -> Result<MethodCode, ImageError> {
    let insns = def
        .insns
        .iter()
        .map(|insn| convert_insn(owner, insn, types))
        .collect::<Result<_, _>>()?;
    let catches = def
        .catches
        .iter()
        .map(|c| parse_class_type(c, types))
        .collect::<Result<_, _>>()?;
    let debug = def
        .debug
        .as_ref()
        .map(|d| convert_debug(d, types))
        .transpose()?;
    Ok(MethodCode {
        insns,
        catches,
        debug,
    })
}

fn convert_insn(owner: &str, def: &InsnDef, types: &mut TypeInterner) -> Result<Instruction, ImageError> {
    let missing = |operand| ImageError::MissingOperand {
        method: owner.to_string(),
        op: def.op.clone(),
        operand,
    };

    if let Some(kind) = InvokeKind::from_mnemonic(&def.op) {
        let method = def.method.as_deref().ok_or_else(|| missing("method"))?;
        return Ok(Instruction::invoke(kind, MethodRef::parse(method, types)?));
    }
    if let Some(op) = FieldOp::from_mnemonic(&def.op) {
        let field = def.field.as_deref().ok_or_else(|| missing("field"))?;
        return Ok(Instruction::field(op, FieldRef::parse(field, types)?));
    }
    if let Some(op) = TypeOp::from_mnemonic(&def.op) {
        let ty = def.ty.as_deref().ok_or_else(|| missing("type"))?;
        return Ok(Instruction::type_op(op, parse_field_descriptor(ty, types)?));
    }
    Ok(Instruction::other(def.op.clone()))
}

fn convert_debug(def: &DebugDef, types: &mut TypeInterner) -> Result<DebugInfo, ImageError> {
    let opcodes = def
        .opcodes
        .iter()
        .map(|op| -> Result<DebugOpcode, ImageError> {
            Ok(match op {
                DebugOpDef::AdvancePc { addr } => DebugOpcode::AdvancePc(*addr),
                DebugOpDef::AdvanceLine { line } => DebugOpcode::AdvanceLine(*line),
                DebugOpDef::StartLocal {
                    register,
                    name,
                    ty,
                    signature,
                } => DebugOpcode::StartLocal {
                    register: *register,
                    name: name.clone(),
                    ty: parse_field_descriptor(ty, types)?,
                    signature: signature.clone(),
                },
                DebugOpDef::EndLocal { register } => DebugOpcode::EndLocal(*register),
                DebugOpDef::RestartLocal { register } => DebugOpcode::RestartLocal(*register),
                DebugOpDef::SetPrologueEnd => DebugOpcode::SetPrologueEnd,
                DebugOpDef::SetEpilogueBegin => DebugOpcode::SetEpilogueBegin,
                DebugOpDef::SetFile { name } => DebugOpcode::SetFile(name.clone()),
                DebugOpDef::Special { value } => DebugOpcode::Special(*value),
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(DebugInfo {
        line_start: def.line_start,
        opcodes,
    })
}

/// Class types must be `L...;` or array descriptors
fn parse_class_type(descriptor: &str, types: &mut TypeInterner) -> Result<TypeId, ImageError> {
    if !descriptor.starts_with('L') && !descriptor.starts_with('[') {
        return Err(ImageError::InvalidDescriptor(descriptor.to_string()));
    }
    parse_field_descriptor(descriptor, types)
}

fn parse_access(owner: &str, names: &[String]) -> Result<AccessFlags, ImageError> {
    names.iter().try_fold(AccessFlags::empty(), |flags, name| {
        AccessFlags::from_flag_name(name)
            .map(|flag| flags | flag)
            .ok_or_else(|| ImageError::UnknownAccessFlag {
                owner: owner.to_string(),
                flag: name.clone(),
            })
    })
}

// =============================================================================
// Writing
// =============================================================================

/// Convert the IR back into its serializable form
pub fn to_image(program: &DexProgram) -> ImageFile {
    let types = &program.types;
    ImageFile {
        library: program
            .library
            .iter()
            .map(|c| class_def(c, types, true))
            .collect(),
        dexes: program
            .dexen
            .iter()
            .map(|dex| dex.iter().map(|c| class_def(c, types, false)).collect())
            .collect(),
    }
}

/// Serialize the program as pretty-printed JSON
pub fn image_to_string(program: &DexProgram) -> Result<String, ImageError> {
    Ok(serde_json::to_string_pretty(&to_image(program))?)
}

pub fn write_image(program: &DexProgram, path: &Path) -> Result<(), ImageError> {
    std::fs::write(path, image_to_string(program)?)?;
    Ok(())
}

fn class_def(class: &DexClass, types: &TypeInterner, in_library: bool) -> ClassDef {
    let name = |ty: TypeId| types.resolve(ty).to_string();
    ClassDef {
        name: name(class.ty),
        super_class: class.super_class.map(name),
        interfaces: class.interfaces.iter().copied().map(name).collect(),
        access: class.access.flag_names(),
        // Library classes are external by position
        external: class.external && !in_library,
        annotations: class.annotations.iter().copied().map(name).collect(),
        fields: class
            .fields
            .iter()
            .map(|f| FieldDef {
                name: f.name.clone(),
                ty: name(f.ty),
                access: f.access.flag_names(),
            })
            .collect(),
        methods: class
            .methods
            .iter()
            .map(|m| MethodDef {
                name: m.name.clone(),
                proto: m.proto.descriptor(types),
                access: m.access.flag_names(),
                code: m.code.as_ref().map(|c| code_def(c, types)),
            })
            .collect(),
    }
}

fn code_def(code: &MethodCode, types: &TypeInterner) -> CodeDef {
    CodeDef {
        insns: code.insns.iter().map(|i| insn_def(i, types)).collect(),
        catches: code
            .catches
            .iter()
            .map(|&c| types.resolve(c).to_string())
            .collect(),
        debug: code.debug.as_ref().map(|d| DebugDef {
            line_start: d.line_start,
            opcodes: d.opcodes.iter().map(|op| debug_op_def(op, types)).collect(),
        }),
    }
}

fn insn_def(insn: &Instruction, types: &TypeInterner) -> InsnDef {
    let mut def = InsnDef {
        op: insn.mnemonic().to_string(),
        ..InsnDef::default()
    };
    match insn {
        Instruction::Invoke { method, .. } => def.method = Some(method.display(types)),
        Instruction::Field { field, .. } => def.field = Some(field.display(types)),
        Instruction::Type { ty, .. } => def.ty = Some(types.resolve(*ty).to_string()),
        Instruction::Other(_) => {}
    }
    def
}

fn debug_op_def(op: &DebugOpcode, types: &TypeInterner) -> DebugOpDef {
    match op {
        DebugOpcode::AdvancePc(addr) => DebugOpDef::AdvancePc { addr: *addr },
        DebugOpcode::AdvanceLine(line) => DebugOpDef::AdvanceLine { line: *line },
        DebugOpcode::StartLocal {
            register,
            name,
            ty,
            signature,
        } => DebugOpDef::StartLocal {
            register: *register,
            name: name.clone(),
            ty: types.resolve(*ty).to_string(),
            signature: signature.clone(),
        },
        DebugOpcode::EndLocal(register) => DebugOpDef::EndLocal {
            register: *register,
        },
        DebugOpcode::RestartLocal(register) => DebugOpDef::RestartLocal {
            register: *register,
        },
        DebugOpcode::SetPrologueEnd => DebugOpDef::SetPrologueEnd,
        DebugOpcode::SetEpilogueBegin => DebugOpDef::SetEpilogueBegin,
        DebugOpcode::SetFile(name) => DebugOpDef::SetFile { name: name.clone() },
        DebugOpcode::Special(value) => DebugOpDef::Special { value: *value },
    }
}
