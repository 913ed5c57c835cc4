use super::class::DexClass;
use super::code::DebugOpcode;
use crate::access::AccessFlags;
use crate::type_interner::TypeInterner;
use std::fmt::Write;

impl DexClass {
    /// Render the class in a smali-like text form
    pub fn dump(&self, types: &TypeInterner) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_dump(&mut out, types);
        out
    }

    fn write_dump(&self, out: &mut String, types: &TypeInterner) -> std::fmt::Result {
        writeln!(out, ".class {}{}", flags(self.access), types.resolve(self.ty))?;
        if let Some(super_class) = self.super_class {
            writeln!(out, ".super {}", types.resolve(super_class))?;
        }
        for &intf in &self.interfaces {
            writeln!(out, ".implements {}", types.resolve(intf))?;
        }
        for &anno in &self.annotations {
            writeln!(out, ".annotation {}", types.resolve(anno))?;
        }
        for field in &self.fields {
            writeln!(
                out,
                ".field {}{}:{}",
                flags(field.access),
                field.name,
                types.resolve(field.ty)
            )?;
        }
        for method in &self.methods {
            writeln!(
                out,
                ".method {}{}:{}",
                flags(method.access),
                method.name,
                method.proto.descriptor(types)
            )?;
            if let Some(code) = &method.code {
                for insn in &code.insns {
                    writeln!(out, "    {}", insn.display(types))?;
                }
                for &catch in &code.catches {
                    writeln!(out, "    .catch {}", types.resolve(catch))?;
                }
                for opcode in code.debug.iter().flat_map(|d| &d.opcodes) {
                    if let DebugOpcode::StartLocal {
                        register, name, ty, ..
                    } = opcode
                    {
                        writeln!(out, "    .local v{} {}:{}", register, name, types.resolve(*ty))?;
                    }
                }
            }
            writeln!(out, ".end method")?;
        }
        Ok(())
    }
}

/// `public final ` style prefix, empty when no flag is set
fn flags(access: AccessFlags) -> String {
    access
        .flag_names()
        .into_iter()
        .map(|name| name + " ")
        .collect()
}
