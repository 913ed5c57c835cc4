//! Read-only class/type graph over a scope and its external library
//!
//! Built fresh at the start of every optimization cycle and dropped before the
//! scope is mutated.

use crate::access::HasAccess;
use crate::ir::{DexClass, DexMethod, Scope};
use crate::type_interner::{TypeId, TypeInterner};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassLocation {
    Scope(usize),
    Library(usize),
}

/// Class hierarchy information for whole-program analysis
#[derive(Debug)]
pub struct ClassHierarchy<'a> {
    scope: &'a Scope,
    library: &'a [DexClass],
    types: &'a TypeInterner,
    /// type -> definition (first definition wins, scope before library)
    location_of: FxHashMap<TypeId, ClassLocation>,
    /// type -> direct supertypes (superclass first, then interfaces)
    parents_of: FxHashMap<TypeId, Vec<TypeId>>,
    /// type -> direct subtypes (subclasses and implementors/extenders)
    children_of: FxHashMap<TypeId, Vec<TypeId>>,
}

impl<'a> ClassHierarchy<'a> {
    /// Build the hierarchy by scanning every scope and library class
    pub fn build(scope: &'a Scope, library: &'a [DexClass], types: &'a TypeInterner) -> Self {
        let mut hierarchy = ClassHierarchy {
            scope,
            library,
            types,
            location_of: FxHashMap::default(),
            parents_of: FxHashMap::default(),
            children_of: FxHashMap::default(),
        };

        let scoped = scope
            .classes()
            .enumerate()
            .map(|(i, class)| (ClassLocation::Scope(i), class));
        let external = library
            .iter()
            .enumerate()
            .map(|(i, class)| (ClassLocation::Library(i), class));

        for (location, class) in scoped.chain(external) {
            if hierarchy.location_of.contains_key(&class.ty) {
                continue;
            }
            hierarchy.location_of.insert(class.ty, location);

            let parents: Vec<TypeId> = class
                .super_class
                .iter()
                .chain(class.interfaces.iter())
                .copied()
                .collect();
            for &parent in &parents {
                hierarchy
                    .children_of
                    .entry(parent)
                    .or_default()
                    .push(class.ty);
            }
            hierarchy.parents_of.insert(class.ty, parents);
        }

        hierarchy
    }

    pub fn types(&self) -> &'a TypeInterner {
        self.types
    }

    pub fn scope(&self) -> &'a Scope {
        self.scope
    }

    pub fn library(&self) -> &'a [DexClass] {
        self.library
    }

    /// Resolve a type to its definition, internal or external
    pub fn type_class(&self, ty: TypeId) -> Option<&'a DexClass> {
        match self.location_of.get(&ty)? {
            ClassLocation::Scope(i) => Some(self.scope.class(*i)),
            ClassLocation::Library(i) => self.library.get(*i),
        }
    }

    /// Index of the type's definition within the scope, if defined there
    pub fn scope_index(&self, ty: TypeId) -> Option<usize> {
        match self.location_of.get(&ty)? {
            ClassLocation::Scope(i) => Some(*i),
            ClassLocation::Library(_) => None,
        }
    }

    /// Defined in the scope and not flagged external
    pub fn is_internal(&self, ty: TypeId) -> bool {
        self.scope_index(ty)
            .is_some_and(|i| !self.scope.class(i).is_external())
    }

    /// Direct superclass and interfaces
    pub fn parents(&self, ty: TypeId) -> &[TypeId] {
        self.parents_of.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct subclasses, implementors and extending interfaces
    pub fn children(&self, ty: TypeId) -> &[TypeId] {
        self.children_of.get(&ty).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every transitive supertype, superclasses and interfaces alike
    pub fn ancestors(&self, ty: TypeId) -> Vec<TypeId> {
        self.walk(ty, |t| self.parents(t))
    }

    /// Every transitive subtype
    pub fn descendants(&self, ty: TypeId) -> Vec<TypeId> {
        self.walk(ty, |t| self.children(t))
    }

    fn walk<'h>(&'h self, start: TypeId, next: impl Fn(TypeId) -> &'h [TypeId]) -> Vec<TypeId> {
        let mut visited = FxHashSet::default();
        visited.insert(start);
        let mut pending = vec![start];
        let mut found = Vec::new();
        while let Some(ty) = pending.pop() {
            for &other in next(ty) {
                if visited.insert(other) {
                    found.push(other);
                    pending.push(other);
                }
            }
        }
        found
    }

    /// Walk `ty` and its superclasses, stopping at the first unresolvable one
    pub fn superclass_chain(&self, ty: TypeId) -> Vec<&'a DexClass> {
        let mut chain = Vec::new();
        let mut visited = FxHashSet::default();
        let mut current = Some(ty);
        while let Some(ty) = current {
            if !visited.insert(ty) {
                break;
            }
            let Some(class) = self.type_class(ty) else {
                break;
            };
            chain.push(class);
            current = class.super_class;
        }
        chain
    }

    /// Resolve a virtual method on `ty` or one of its superclasses.
    ///
    /// Interfaces are not consulted: a method only reachable through an
    /// interface (a default method, or an abstract class leaving it
    /// unimplemented) does not resolve.
    pub fn resolve_virtual(
        &self,
        ty: TypeId,
        mut matches: impl FnMut(&DexMethod) -> bool,
    ) -> Option<(&'a DexClass, &'a DexMethod)> {
        self.superclass_chain(ty).into_iter().find_map(|class| {
            class
                .methods
                .iter()
                .find(|m| !m.is_static() && matches(m))
                .map(|m| (class, m))
        })
    }
}
