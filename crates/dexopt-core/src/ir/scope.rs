use super::class::DexClass;
use crate::type_interner::TypeId;
use rustc_hash::FxHashSet;

/// Classes of one container, in definition order
pub type DexClasses = Vec<DexClass>;

/// All containers of an application image, in load order
pub type DexClassesVector = Vec<DexClasses>;

#[derive(Debug, Clone)]
struct ScopeEntry {
    dex: usize,
    class: DexClass,
}

/// Flat, ordered view of every class across all containers
///
/// Each class remembers which container it came from so the container shape
/// can be restored with [`Scope::into_dexen`] once optimization is done.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: Vec<ScopeEntry>,
    dex_count: usize,
}

impl Scope {
    pub fn from_dexen(dexen: DexClassesVector) -> Self {
        let dex_count = dexen.len();
        let entries = dexen
            .into_iter()
            .enumerate()
            .flat_map(|(dex, classes)| {
                classes
                    .into_iter()
                    .map(move |class| ScopeEntry { dex, class })
            })
            .collect();
        Self { entries, dex_count }
    }

    /// Hand the (possibly smaller) classes back in their original containers.
    /// Containers that became empty are kept so indices stay stable.
    pub fn into_dexen(self) -> DexClassesVector {
        let mut dexen: DexClassesVector = vec![Vec::new(); self.dex_count];
        for entry in self.entries {
            dexen[entry.dex].push(entry.class);
        }
        dexen
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn class(&self, index: usize) -> &DexClass {
        &self.entries[index].class
    }

    pub fn class_mut(&mut self, index: usize) -> &mut DexClass {
        &mut self.entries[index].class
    }

    pub fn classes(&self) -> impl Iterator<Item = &DexClass> + '_ {
        self.entries.iter().map(|e| &e.class)
    }

    pub fn classes_mut(&mut self) -> impl Iterator<Item = &mut DexClass> + '_ {
        self.entries.iter_mut().map(|e| &mut e.class)
    }

    /// Delete the classes defining `types`; returns how many were removed
    pub fn remove_types(&mut self, types: &FxHashSet<TypeId>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !types.contains(&e.class.ty));
        before - self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessFlags;

    fn class(id: u32) -> DexClass {
        DexClass::new(TypeId::from_u32(id), AccessFlags::PUBLIC)
    }

    #[test]
    fn test_round_trip_preserves_container_shape() {
        let dexen = vec![vec![class(0), class(1)], vec![], vec![class(2)]];
        let scope = Scope::from_dexen(dexen.clone());

        assert_eq!(scope.len(), 3);
        assert_eq!(scope.into_dexen(), dexen);
    }

    #[test]
    fn test_remove_types() {
        let mut scope = Scope::from_dexen(vec![vec![class(0), class(1)], vec![class(2)]]);
        let doomed: FxHashSet<_> = [TypeId::from_u32(1), TypeId::from_u32(2)]
            .into_iter()
            .collect();

        assert_eq!(scope.remove_types(&doomed), 2);

        let dexen = scope.into_dexen();
        assert_eq!(dexen.len(), 2);
        assert_eq!(dexen[0], vec![class(0)]);
        assert!(dexen[1].is_empty());
    }
}
