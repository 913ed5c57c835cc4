use super::analysis::SingleImplAnalysis;
use crate::ir::{DebugOpcode, DexClass, Instruction, Scope};
use crate::type_interner::{TypeId, TypeInterner};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

/// What one rewrite step did to the scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Interfaces erased after backing out the ones still referenced
    pub removed: usize,
    pub invoke_interface_rewrites: usize,
}

/// Apply the accepted candidates of `analysis` and delete their interfaces.
///
/// All edits are made before anything is deleted, so the indices recorded in
/// the use sites stay valid throughout.
pub fn optimize(
    analysis: &SingleImplAnalysis,
    scope: &mut Scope,
    types: &mut TypeInterner,
) -> RewriteOutcome {
    let subst = analysis.substitution();
    if subst.is_empty() {
        return RewriteOutcome::default();
    }

    let mut outcome = RewriteOutcome::default();
    for candidate in analysis.accepted() {
        for site in &candidate.sites {
            if site.apply(scope, types, &subst) {
                outcome.invoke_interface_rewrites += 1;
            }
        }
    }

    let mut erased: FxHashSet<TypeId> = analysis.accepted().map(|c| c.interface).collect();
    for ty in still_referenced(scope, types, &erased) {
        warn!(
            "single-impl: {} is still referenced after rewriting, keeping it",
            types.resolve(ty)
        );
        erased.remove(&ty);
    }
    if erased.is_empty() {
        return outcome;
    }

    splice_interfaces(scope, &erased);
    // The driver checks this against what actually left the scope
    outcome.removed = erased.len();
    let deleted = scope.remove_types(&erased);
    debug!(
        "single-impl: erased {} interface(s) ({} class(es) deleted), rewrote {} invoke-interface(s)",
        outcome.removed, deleted, outcome.invoke_interface_rewrites
    );
    outcome
}

/// Erased interfaces still mentioned anywhere outside implements lists and the
/// erased classes themselves
fn still_referenced(
    scope: &Scope,
    types: &TypeInterner,
    erased: &FxHashSet<TypeId>,
) -> Vec<TypeId> {
    let mut found = FxHashSet::default();
    for class in scope.classes().filter(|c| !erased.contains(&c.ty)) {
        for ty in references(class) {
            let element = types.element_type(ty);
            if erased.contains(&element) {
                found.insert(element);
            }
        }
    }
    let mut found: Vec<_> = found.into_iter().collect();
    found.sort();
    found
}

fn references(class: &DexClass) -> Vec<TypeId> {
    let mut refs: Vec<TypeId> = class.super_class.into_iter().collect();
    refs.extend(class.fields.iter().map(|f| f.ty));
    for method in &class.methods {
        refs.extend(method.proto.types());
        let Some(code) = &method.code else {
            continue;
        };
        refs.extend(code.insns.iter().flat_map(Instruction::referenced_types));
        refs.extend(code.catches.iter().copied());
        if let Some(debug) = &code.debug {
            refs.extend(debug.opcodes.iter().filter_map(|op| match op {
                DebugOpcode::StartLocal { ty, .. } => Some(*ty),
                _ => None,
            }));
        }
    }
    refs
}

/// Drop erased interfaces from every implements list, replacing each with the
/// interfaces it extended
fn splice_interfaces(scope: &mut Scope, erased: &FxHashSet<TypeId>) {
    let supers: FxHashMap<TypeId, Vec<TypeId>> = scope
        .classes()
        .filter(|c| erased.contains(&c.ty))
        .map(|c| (c.ty, c.interfaces.clone()))
        .collect();

    for class in scope.classes_mut() {
        if class.is_external() || erased.contains(&class.ty) {
            continue;
        }
        if !class.interfaces.iter().any(|i| erased.contains(i)) {
            continue;
        }

        let mut spliced = Vec::with_capacity(class.interfaces.len());
        let mut visited = FxHashSet::default();
        // Reversed so popping yields the declared order
        let mut pending: Vec<TypeId> = class.interfaces.iter().rev().copied().collect();
        while let Some(intf) = pending.pop() {
            if !visited.insert(intf) {
                continue;
            }
            match supers.get(&intf) {
                Some(parents) => pending.extend(parents.iter().rev()),
                None if intf != class.ty => spliced.push(intf),
                None => {}
            }
        }
        class.interfaces = spliced;
    }
}
