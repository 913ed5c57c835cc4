//! Interface -> implementors map and single-implementation selection

use crate::access::HasAccess;
use crate::class_hierarchy::ClassHierarchy;
use crate::errors::{OptimizerError, Result};
use crate::ir::{DexClass, Scope};
use crate::type_interner::TypeId;
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use tracing::debug;

/// Interface -> classes implementing it, in discovery order without duplicates
pub type InterfaceImplementors = IndexMap<TypeId, Vec<TypeId>, FxBuildHasher>;

/// Interface -> its sole implementor
pub type SingleImplMap = IndexMap<TypeId, TypeId, FxBuildHasher>;

#[derive(Debug, Default)]
pub struct TypeMaps {
    pub implementors: InterfaceImplementors,
    /// Every class in scope declared as an interface
    pub interfaces: FxHashSet<TypeId>,
}

/// Build the interface map for the current scope.
///
/// An implementor of `A extends B` is recorded against both `A` and `B`, as
/// long as each is defined in the scope and not external:
///
/// ```text
/// interface B {}
/// interface A extends B {}
/// class C implements A {}      =>  { A => [C], B => [C] }
/// ```
///
/// If `B` were a library interface only `{ A => [C] }` would be recorded.
pub fn build_type_maps(scope: &Scope, hierarchy: &ClassHierarchy<'_>) -> TypeMaps {
    let mut maps = TypeMaps::default();
    for class in scope.classes() {
        if class.is_interface() {
            maps.interfaces.insert(class.ty);
            continue;
        }
        record_implementor(class, hierarchy, &mut maps.implementors);
    }
    maps
}

fn record_implementor(
    class: &DexClass,
    hierarchy: &ClassHierarchy<'_>,
    implementors: &mut InterfaceImplementors,
) {
    // Visited interfaces for this class; guards against cyclic and diamond
    // interface graphs
    let mut visited = FxHashSet::default();
    let mut pending: Vec<TypeId> = class.interfaces.iter().rev().copied().collect();

    while let Some(intf) = pending.pop() {
        if !hierarchy.is_internal(intf) || !visited.insert(intf) {
            continue;
        }
        let Some(intf_cls) = hierarchy.type_class(intf) else {
            continue;
        };
        let classes = implementors.entry(intf).or_default();
        if !classes.contains(&class.ty) {
            classes.push(class.ty);
        }
        pending.extend(intf_cls.interfaces.iter().rev());
    }
}

/// Keep the interfaces with exactly one implementor that may be erased
pub fn collect_single_impl(
    implementors: &InterfaceImplementors,
    hierarchy: &ClassHierarchy<'_>,
) -> Result<SingleImplMap> {
    let types = hierarchy.types();
    let mut single_impl = SingleImplMap::default();

    for (&intf, classes) in implementors {
        let [imp] = classes.as_slice() else {
            continue;
        };

        let intf_cls = hierarchy
            .type_class(intf)
            .filter(|_| hierarchy.is_internal(intf))
            .ok_or_else(|| OptimizerError::UnresolvedInterface {
                interface: types.resolve(intf).to_string(),
            })?;
        if intf_cls.is_annotation() {
            continue;
        }
        if !intf_cls.is_interface() {
            debug!(
                "single-impl: {} is implemented but not declared as an interface",
                types.resolve(intf)
            );
            continue;
        }

        let impl_cls = hierarchy
            .type_class(*imp)
            .filter(|_| hierarchy.is_internal(*imp))
            .ok_or_else(|| OptimizerError::UnresolvedImplementor {
                interface: types.resolve(intf).to_string(),
                implementor: types.resolve(*imp).to_string(),
            })?;
        // Not known to happen, cheap to rule out
        if impl_cls.is_annotation() {
            continue;
        }

        single_impl.insert(intf, *imp);
    }

    Ok(single_impl)
}
