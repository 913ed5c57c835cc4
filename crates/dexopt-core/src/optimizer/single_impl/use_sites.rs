use super::subst::TypeSubstitution;
use crate::ir::{DebugOpcode, FieldRef, Instruction, InvokeKind, MethodCode, MethodRef, Scope};
use crate::type_interner::TypeInterner;

/// A place in the scope that mentions an interface about to be erased.
///
/// Indices address the scope as it was when the analysis ran; they stay valid
/// because nothing is deleted until every site has been rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UseSite {
    /// Declared type of a field
    FieldType { class: usize, field: usize },
    /// Return or argument type of a method
    MethodProto { class: usize, method: usize },
    /// `invoke-interface` on the interface; becomes `invoke-virtual` on the implementor
    InvokeInterface {
        class: usize,
        method: usize,
        insn: usize,
    },
    /// Method or field reference whose signature mentions the interface
    MemberRef {
        class: usize,
        method: usize,
        insn: usize,
    },
    /// check-cast, instance-of, new-array or filled-new-array operand
    TypeOperand {
        class: usize,
        method: usize,
        insn: usize,
    },
    CatchType {
        class: usize,
        method: usize,
        catch: usize,
    },
    /// `start-local` debug opcode typed with the interface
    DebugLocal {
        class: usize,
        method: usize,
        opcode: usize,
    },
}

impl UseSite {
    /// Rewrite the site with `subst`.
    ///
    /// Returns true when an `invoke-interface` was turned into `invoke-virtual`.
    /// Applying a site twice is harmless.
    pub fn apply(&self, scope: &mut Scope, types: &mut TypeInterner, subst: &TypeSubstitution) -> bool {
        match *self {
            UseSite::FieldType { class, field } => {
                if let Some(field) = scope.class_mut(class).fields.get_mut(field) {
                    subst.apply_in_place(types, &mut field.ty);
                }
                false
            }
            UseSite::MethodProto { class, method } => {
                if let Some(method) = scope.class_mut(class).methods.get_mut(method) {
                    subst.apply_proto(types, &mut method.proto);
                }
                false
            }
            UseSite::InvokeInterface { class, method, insn } => {
                let Some(Instruction::Invoke { kind, method: target }) =
                    code_mut(scope, class, method).and_then(|c| c.insns.get_mut(insn))
                else {
                    return false;
                };
                retype_method_ref(types, subst, target);
                if *kind == InvokeKind::Interface {
                    *kind = InvokeKind::Virtual;
                    true
                } else {
                    false
                }
            }
            UseSite::MemberRef { class, method, insn } => {
                match code_mut(scope, class, method).and_then(|c| c.insns.get_mut(insn)) {
                    Some(Instruction::Invoke { method: target, .. }) => {
                        retype_method_ref(types, subst, target)
                    }
                    Some(Instruction::Field { field, .. }) => retype_field_ref(types, subst, field),
                    _ => {}
                }
                false
            }
            UseSite::TypeOperand { class, method, insn } => {
                if let Some(Instruction::Type { ty, .. }) =
                    code_mut(scope, class, method).and_then(|c| c.insns.get_mut(insn))
                {
                    subst.apply_in_place(types, ty);
                }
                false
            }
            UseSite::CatchType {
                class,
                method,
                catch,
            } => {
                if let Some(ty) = code_mut(scope, class, method).and_then(|c| c.catches.get_mut(catch)) {
                    subst.apply_in_place(types, ty);
                }
                false
            }
            UseSite::DebugLocal {
                class,
                method,
                opcode,
            } => {
                let opcode = code_mut(scope, class, method)
                    .and_then(|c| c.debug.as_mut())
                    .and_then(|d| d.opcodes.get_mut(opcode));
                if let Some(DebugOpcode::StartLocal { ty, .. }) = opcode {
                    subst.apply_in_place(types, ty);
                }
                false
            }
        }
    }
}

fn code_mut(scope: &mut Scope, class: usize, method: usize) -> Option<&mut MethodCode> {
    scope
        .class_mut(class)
        .methods
        .get_mut(method)
        .and_then(|m| m.code.as_mut())
}

fn retype_method_ref(types: &mut TypeInterner, subst: &TypeSubstitution, method: &mut MethodRef) {
    subst.apply_in_place(types, &mut method.owner);
    subst.apply_proto(types, &mut method.proto);
}

fn retype_field_ref(types: &mut TypeInterner, subst: &TypeSubstitution, field: &mut FieldRef) {
    subst.apply_in_place(types, &mut field.owner);
    subst.apply_in_place(types, &mut field.ty);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessFlags;
    use crate::ir::{DebugInfo, DexClass, DexMethod, Proto, TypeOp};

    #[test]
    fn test_invoke_interface_becomes_virtual_once() {
        let mut types = TypeInterner::new();
        let intf = types.intern("LIntf;");
        let imp = types.intern("LImpl;");
        let caller = types.intern("LCaller;");
        let void = types.intern("V");

        let call = MethodRef::new(intf, "run", Proto::new(void, vec![intf]));
        let code = MethodCode::new(vec![Instruction::invoke(InvokeKind::Interface, call)]);
        let mut class = DexClass::new(caller, AccessFlags::PUBLIC);
        class.methods.push(
            DexMethod::new("main", Proto::new(void, vec![]), AccessFlags::PUBLIC).with_code(code),
        );
        let mut scope = Scope::from_dexen(vec![vec![class]]);

        let mut subst = TypeSubstitution::new();
        subst.insert(intf, imp);
        let site = UseSite::InvokeInterface {
            class: 0,
            method: 0,
            insn: 0,
        };

        assert!(site.apply(&mut scope, &mut types, &subst));
        assert!(!site.apply(&mut scope, &mut types, &subst));

        let insn = &scope.class(0).methods[0].code.as_ref().unwrap().insns[0];
        assert_eq!(insn.display(&types), "invoke-virtual LImpl;.run:(LImpl;)V");
    }

    #[test]
    fn test_operand_catch_and_debug_sites() {
        let mut types = TypeInterner::new();
        let intf = types.intern("LIntf;");
        let imp = types.intern("LImpl;");
        let array = types.intern("[LIntf;");
        let void = types.intern("V");

        let mut code = MethodCode::new(vec![Instruction::type_op(TypeOp::NewArray, array)]);
        code.catches.push(intf);
        code.debug = Some(DebugInfo {
            line_start: 1,
            opcodes: vec![DebugOpcode::StartLocal {
                register: 0,
                name: "x".to_string(),
                ty: intf,
                signature: None,
            }],
        });
        let mut class = DexClass::new(types.intern("LUser;"), AccessFlags::PUBLIC);
        class.methods.push(
            DexMethod::new("m", Proto::new(void, vec![]), AccessFlags::PUBLIC).with_code(code),
        );
        let mut scope = Scope::from_dexen(vec![vec![class]]);

        let mut subst = TypeSubstitution::new();
        subst.insert(intf, imp);
        let sites = [
            UseSite::TypeOperand {
                class: 0,
                method: 0,
                insn: 0,
            },
            UseSite::CatchType {
                class: 0,
                method: 0,
                catch: 0,
            },
            UseSite::DebugLocal {
                class: 0,
                method: 0,
                opcode: 0,
            },
        ];
        for site in sites {
            assert!(!site.apply(&mut scope, &mut types, &subst));
        }

        let code = scope.class(0).methods[0].code.as_ref().unwrap();
        assert_eq!(code.insns[0].display(&types), "new-array [LImpl;");
        assert_eq!(code.catches, vec![imp]);
        assert!(matches!(
            code.debug.as_ref().unwrap().opcodes[0],
            DebugOpcode::StartLocal { ty, .. } if ty == imp
        ));
    }
}
