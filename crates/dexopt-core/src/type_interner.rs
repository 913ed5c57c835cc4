use rustc_hash::FxHashMap;

/// A type interner that deduplicates type descriptors and assigns them unique IDs.
///
/// Descriptors follow the dex conventions: `Lcom/foo/Bar;` for classes, a single
/// letter for primitives and a `[` prefix per array dimension. Array descriptors
/// also record their dimension count and element type so that rewrites can map
/// `[LFoo;` whenever `LFoo;` is remapped.
#[derive(Debug, Default, Clone)]
pub struct TypeInterner {
    /// Map from descriptor to its ID
    descriptor_to_id: FxHashMap<String, TypeId>,
    /// Map from ID to descriptor
    id_to_descriptor: Vec<String>,
    /// Array type -> (dimensions, element type)
    array_components: FxHashMap<TypeId, (usize, TypeId)>,
}

/// A unique identifier for an interned type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeInterner {
    /// Create a new type interner
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a descriptor and return its ID
    /// If the descriptor is already interned, returns the existing ID
    pub fn intern(&mut self, descriptor: &str) -> TypeId {
        if let Some(&id) = self.descriptor_to_id.get(descriptor) {
            return id;
        }

        let id = TypeId(self.id_to_descriptor.len() as u32);
        self.id_to_descriptor.push(descriptor.to_string());
        self.descriptor_to_id.insert(descriptor.to_string(), id);

        let dims = descriptor.bytes().take_while(|&b| b == b'[').count();
        if dims > 0 {
            let element = self.intern(&descriptor[dims..]);
            self.array_components.insert(id, (dims, element));
        }
        id
    }

    /// Look up a descriptor without interning it
    pub fn get(&self, descriptor: &str) -> Option<TypeId> {
        self.descriptor_to_id.get(descriptor).copied()
    }

    /// Get the descriptor for a given ID
    /// Panics if the ID is invalid
    pub fn resolve(&self, id: TypeId) -> &str {
        &self.id_to_descriptor[id.0 as usize]
    }

    /// Dimensions and element type of an array type
    pub fn array_component(&self, id: TypeId) -> Option<(usize, TypeId)> {
        self.array_components.get(&id).copied()
    }

    /// The innermost element type of an array, or the type itself
    pub fn element_type(&self, id: TypeId) -> TypeId {
        self.array_component(id).map_or(id, |(_, element)| element)
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        self.array_components.contains_key(&id)
    }

    /// Intern the `dims`-dimensional array of `element`
    pub fn make_array(&mut self, element: TypeId, dims: usize) -> TypeId {
        if dims == 0 {
            return element;
        }
        let descriptor = format!("{}{}", "[".repeat(dims), self.resolve(element));
        self.intern(&descriptor)
    }

    /// Get the number of unique descriptors interned
    pub fn len(&self) -> usize {
        self.id_to_descriptor.len()
    }

    /// Check if the interner is empty
    pub fn is_empty(&self) -> bool {
        self.id_to_descriptor.is_empty()
    }
}

impl TypeId {
    /// Get the raw u32 value of this ID
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Create a TypeId from a raw u32 value
    /// This is unchecked and doesn't validate the ID exists in the interner
    pub fn from_u32(id: u32) -> Self {
        Self(id)
    }
}
