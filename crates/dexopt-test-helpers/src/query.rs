//! Read-only queries over a program, for assertions

use dexopt_core::ir::{DebugOpcode, Instruction};
use dexopt_core::{DexClass, DexProgram, PgoInput, SingleImplConfig, SingleImplPass, SingleImplStats};

/// Run the single-implementation pass with `config`
pub fn run_single_impl_with(program: &mut DexProgram, config: SingleImplConfig) -> SingleImplStats {
    SingleImplPass::new(config)
        .run_pass(program, &PgoInput::default())
        .expect("single-impl pass failed")
}

pub fn run_single_impl(program: &mut DexProgram) -> SingleImplStats {
    run_single_impl_with(program, SingleImplConfig::default())
}

/// Descriptors of every internal class, in container order
pub fn class_names(program: &DexProgram) -> Vec<String> {
    program
        .classes()
        .map(|c| program.types.resolve(c.ty).to_string())
        .collect()
}

pub fn has_class(program: &DexProgram, descriptor: &str) -> bool {
    program
        .types
        .get(descriptor)
        .is_some_and(|ty| program.classes().any(|c| c.ty == ty))
}

pub fn class<'p>(program: &'p DexProgram, descriptor: &str) -> &'p DexClass {
    program
        .find_class(descriptor)
        .unwrap_or_else(|| panic!("no class {descriptor}"))
}

/// Implemented interfaces of a class as descriptors
pub fn interfaces_of(program: &DexProgram, descriptor: &str) -> Vec<String> {
    class(program, descriptor)
        .interfaces
        .iter()
        .map(|&i| program.types.resolve(i).to_string())
        .collect()
}

/// Every instruction of every method of a class, rendered as text
pub fn instructions_of(program: &DexProgram, descriptor: &str) -> Vec<String> {
    class(program, descriptor)
        .methods
        .iter()
        .filter_map(|m| m.code.as_ref())
        .flat_map(|code| code.insns.iter())
        .map(|insn| insn.display(&program.types))
        .collect()
}

/// Every instruction in the program, rendered as text
pub fn all_instructions(program: &DexProgram) -> Vec<String> {
    program
        .classes()
        .flat_map(|c| c.methods.iter())
        .filter_map(|m| m.code.as_ref())
        .flat_map(|code| code.insns.iter())
        .map(|insn| insn.display(&program.types))
        .collect()
}

/// Whether any internal class still mentions `descriptor` (or an array of it)
/// anywhere: header, member signatures, instructions, catches or debug locals
pub fn mentions(program: &DexProgram, descriptor: &str) -> bool {
    let Some(ty) = program.types.get(descriptor) else {
        return false;
    };
    let is_target = |t| program.types.element_type(t) == ty;

    program.classes().filter(|c| c.ty != ty).any(|class| {
        class.signature_types().any(is_target)
            || class.methods.iter().filter_map(|m| m.code.as_ref()).any(|code| {
                code.insns
                    .iter()
                    .flat_map(Instruction::referenced_types)
                    .any(is_target)
                    || code.catches.iter().copied().any(is_target)
                    || code.debug.iter().flat_map(|d| d.opcodes.iter()).any(|op| {
                        matches!(op, DebugOpcode::StartLocal { ty, .. } if is_target(*ty))
                    })
            })
    })
}

/// Smali-like text of every internal class, joined by blank lines
pub fn dump(program: &DexProgram) -> String {
    program
        .classes()
        .map(|c| c.dump(&program.types))
        .collect::<Vec<_>>()
        .join("\n")
}
