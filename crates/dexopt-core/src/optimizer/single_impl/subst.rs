use crate::ir::Proto;
use crate::type_interner::{TypeId, TypeInterner};
use rustc_hash::FxHashMap;

/// A type as seen after substitution: array dimensions plus element type.
///
/// Lets the analysis compare retyped signatures without interning the array
/// descriptors a rewrite would create.
pub type TypeKey = (usize, TypeId);

/// Interface -> implementor mapping applied to every type position,
/// including array element types
#[derive(Debug, Clone, Default)]
pub struct TypeSubstitution {
    map: FxHashMap<TypeId, TypeId>,
}

impl TypeSubstitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: TypeId, to: TypeId) {
        self.map.insert(from, to);
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn contains(&self, ty: TypeId) -> bool {
        self.map.contains_key(&ty)
    }

    /// The substituted interface `ty` mentions, directly or as array element
    pub fn mentioned(&self, types: &TypeInterner, ty: TypeId) -> Option<TypeId> {
        let element = types.element_type(ty);
        self.map.contains_key(&element).then_some(element)
    }

    pub fn mentions(&self, types: &TypeInterner, ty: TypeId) -> bool {
        self.mentioned(types, ty).is_some()
    }

    pub fn proto_mentions(&self, types: &TypeInterner, proto: &Proto) -> bool {
        proto.types().any(|t| self.mentions(types, t))
    }

    pub fn type_key(&self, types: &TypeInterner, ty: TypeId) -> TypeKey {
        let (dims, element) = types.array_component(ty).unwrap_or((0, ty));
        (dims, self.map.get(&element).copied().unwrap_or(element))
    }

    pub fn proto_key(&self, types: &TypeInterner, proto: &Proto) -> Vec<TypeKey> {
        proto.types().map(|t| self.type_key(types, t)).collect()
    }

    /// Substitute `ty`, interning the retyped array descriptor if needed
    pub fn apply(&self, types: &mut TypeInterner, ty: TypeId) -> TypeId {
        let (dims, element) = types.array_component(ty).unwrap_or((0, ty));
        match self.map.get(&element) {
            Some(&replacement) => types.make_array(replacement, dims),
            None => ty,
        }
    }

    /// Substitute in place; returns whether anything changed
    pub fn apply_in_place(&self, types: &mut TypeInterner, ty: &mut TypeId) -> bool {
        let replaced = self.apply(types, *ty);
        let changed = replaced != *ty;
        *ty = replaced;
        changed
    }

    pub fn apply_proto(&self, types: &mut TypeInterner, proto: &mut Proto) -> bool {
        let mut changed = self.apply_in_place(types, &mut proto.rtype);
        for arg in &mut proto.args {
            changed |= self.apply_in_place(types, arg);
        }
        changed
    }
}
