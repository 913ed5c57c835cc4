//! Fluent construction of test programs
//!
//! The builder assembles the same serializable image the loader reads, so
//! every program it produces has gone through descriptor validation.

use dexopt_core::image::{
    from_image, ClassDef, CodeDef, DebugDef, DebugOpDef, FieldDef, ImageFile, InsnDef, MethodDef,
};
use dexopt_core::ir::{FieldOp, InvokeKind, TypeOp};
use dexopt_core::DexProgram;

pub const OBJECT: &str = "Ljava/lang/Object;";

/// Builds a [`DexProgram`] class by class.
///
/// Classes land in the current container; [`ProgramBuilder::new_dex`] starts
/// the next one. Members are added to the class named by their first argument.
///
/// ```ignore
/// let program = ProgramBuilder::new()
///     .interface("LA;", &[])
///     .abstract_method("LA;", "run", "()V")
///     .class("LC;", &["LA;"])
///     .method("LC;", "run", "()V", &["return-void"])
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    image: ImageFile,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    /// One empty container and `java.lang.Object` in the library
    pub fn new() -> Self {
        let mut builder = Self {
            image: ImageFile {
                library: Vec::new(),
                dexes: vec![Vec::new()],
            },
        };
        builder.library_class(OBJECT, None, &[]);
        builder
    }

    pub fn new_dex(&mut self) -> &mut Self {
        self.image.dexes.push(Vec::new());
        self
    }

    pub fn library_class(&mut self, name: &str, super_class: Option<&str>, interfaces: &[&str]) -> &mut Self {
        self.image.library.push(ClassDef {
            name: name.to_string(),
            super_class: super_class.map(str::to_string),
            interfaces: strings(interfaces),
            access: strings(&["public"]),
            ..ClassDef::default()
        });
        self
    }

    pub fn library_interface(&mut self, name: &str, extends: &[&str]) -> &mut Self {
        self.image.library.push(ClassDef {
            name: name.to_string(),
            interfaces: strings(extends),
            access: strings(&["public", "interface", "abstract"]),
            ..ClassDef::default()
        });
        self
    }

    pub fn interface(&mut self, name: &str, extends: &[&str]) -> &mut Self {
        self.push(ClassDef {
            name: name.to_string(),
            super_class: Some(OBJECT.to_string()),
            interfaces: strings(extends),
            access: strings(&["public", "interface", "abstract"]),
            ..ClassDef::default()
        })
    }

    /// A public class extending `java.lang.Object`
    pub fn class(&mut self, name: &str, implements: &[&str]) -> &mut Self {
        self.push(ClassDef {
            name: name.to_string(),
            super_class: Some(OBJECT.to_string()),
            interfaces: strings(implements),
            access: strings(&["public"]),
            ..ClassDef::default()
        })
    }

    pub fn extends(&mut self, class: &str, super_class: &str) -> &mut Self {
        self.class_def(class).super_class = Some(super_class.to_string());
        self
    }

    /// Replace the access flags of a class
    pub fn access(&mut self, class: &str, flags: &[&str]) -> &mut Self {
        self.class_def(class).access = strings(flags);
        self
    }

    /// Mark a class inside a container as external
    pub fn external(&mut self, class: &str) -> &mut Self {
        self.class_def(class).external = true;
        self
    }

    pub fn annotate(&mut self, class: &str, annotation: &str) -> &mut Self {
        self.class_def(class).annotations.push(annotation.to_string());
        self
    }

    pub fn field(&mut self, class: &str, name: &str, ty: &str) -> &mut Self {
        self.class_def(class).fields.push(FieldDef {
            name: name.to_string(),
            ty: ty.to_string(),
            access: strings(&["private"]),
        });
        self
    }

    pub fn static_field(&mut self, class: &str, name: &str, ty: &str) -> &mut Self {
        self.class_def(class).fields.push(FieldDef {
            name: name.to_string(),
            ty: ty.to_string(),
            access: strings(&["public", "static", "final"]),
        });
        self
    }

    pub fn abstract_method(&mut self, class: &str, name: &str, proto: &str) -> &mut Self {
        self.class_def(class).methods.push(MethodDef {
            name: name.to_string(),
            proto: proto.to_string(),
            access: strings(&["public", "abstract"]),
            code: None,
        });
        self
    }

    /// A public method whose body is given as instruction text, e.g.
    /// `invoke-interface LA;.run:()V` or `check-cast LA;`
    pub fn method(&mut self, class: &str, name: &str, proto: &str, insns: &[&str]) -> &mut Self {
        self.method_with_access(class, name, proto, &["public"], insns)
    }

    pub fn static_method(&mut self, class: &str, name: &str, proto: &str, insns: &[&str]) -> &mut Self {
        self.method_with_access(class, name, proto, &["public", "static"], insns)
    }

    pub fn method_with_access(
        &mut self,
        class: &str,
        name: &str,
        proto: &str,
        access: &[&str],
        insns: &[&str],
    ) -> &mut Self {
        self.class_def(class).methods.push(MethodDef {
            name: name.to_string(),
            proto: proto.to_string(),
            access: strings(access),
            code: Some(CodeDef {
                insns: insns.iter().map(|text| insn(text)).collect(),
                ..CodeDef::default()
            }),
        });
        self
    }

    /// Add a catch type to the most recently added method of `class`
    pub fn catches(&mut self, class: &str, ty: &str) -> &mut Self {
        self.last_code(class).catches.push(ty.to_string());
        self
    }

    /// Add a `start-local` to the most recently added method of `class`
    pub fn local(&mut self, class: &str, register: u32, name: &str, ty: &str) -> &mut Self {
        let code = self.last_code(class);
        code.debug
            .get_or_insert_with(DebugDef::default)
            .opcodes
            .push(DebugOpDef::StartLocal {
                register,
                name: name.to_string(),
                ty: ty.to_string(),
                signature: None,
            });
        self
    }

    pub fn image(&self) -> &ImageFile {
        &self.image
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.image).expect("image serializes")
    }

    pub fn build(&self) -> DexProgram {
        from_image(self.image.clone()).expect("builder produced an invalid image")
    }

    fn push(&mut self, def: ClassDef) -> &mut Self {
        if let Some(dex) = self.image.dexes.last_mut() {
            dex.push(def);
        }
        self
    }

    fn class_def(&mut self, name: &str) -> &mut ClassDef {
        self.image
            .dexes
            .iter_mut()
            .flatten()
            .chain(self.image.library.iter_mut())
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("class {name} has not been added"))
    }

    fn last_code(&mut self, class: &str) -> &mut CodeDef {
        self.class_def(class)
            .methods
            .last_mut()
            .and_then(|m| m.code.as_mut())
            .unwrap_or_else(|| panic!("class {class} has no method with code"))
    }
}

/// Parse `op operand` instruction text, routing the operand by opcode family
fn insn(text: &str) -> InsnDef {
    let (op, operand) = match text.split_once(' ') {
        Some((op, operand)) => (op, Some(operand.trim().to_string())),
        None => (text, None),
    };
    let mut def = InsnDef {
        op: op.to_string(),
        ..InsnDef::default()
    };
    if InvokeKind::from_mnemonic(op).is_some() {
        def.method = operand;
    } else if FieldOp::from_mnemonic(op).is_some() {
        def.field = operand;
    } else if TypeOp::from_mnemonic(op).is_some() {
        def.ty = operand;
    }
    def
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
