use crate::errors::ImageError;
use crate::type_interner::{TypeId, TypeInterner};

/// Method prototype: return type plus ordered argument types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Proto {
    pub rtype: TypeId,
    pub args: Vec<TypeId>,
}

impl Proto {
    pub fn new(rtype: TypeId, args: Vec<TypeId>) -> Self {
        Self { rtype, args }
    }

    /// Return type first, then arguments
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::once(self.rtype).chain(self.args.iter().copied())
    }

    /// Parse a method descriptor such as `(ILFoo;[J)V`
    pub fn parse(descriptor: &str, types: &mut TypeInterner) -> Result<Self, ImageError> {
        let invalid = || ImageError::InvalidDescriptor(descriptor.to_string());

        let params = descriptor.strip_prefix('(').ok_or_else(invalid)?;
        let close = params.find(')').ok_or_else(invalid)?;
        let (mut rest, ret) = (&params[..close], &params[close + 1..]);

        let mut args = Vec::new();
        while !rest.is_empty() {
            let len = field_descriptor_len(rest).ok_or_else(invalid)?;
            args.push(types.intern(&rest[..len]));
            rest = &rest[len..];
        }

        if ret != "V" && field_descriptor_len(ret) != Some(ret.len()) {
            return Err(invalid());
        }
        Ok(Self::new(types.intern(ret), args))
    }

    pub fn descriptor(&self, types: &TypeInterner) -> String {
        let mut out = String::from("(");
        for &arg in &self.args {
            out.push_str(types.resolve(arg));
        }
        out.push(')');
        out.push_str(types.resolve(self.rtype));
        out
    }
}

/// Validate a single field descriptor
pub fn parse_field_descriptor(descriptor: &str, types: &mut TypeInterner) -> Result<TypeId, ImageError> {
    if field_descriptor_len(descriptor) == Some(descriptor.len()) {
        Ok(types.intern(descriptor))
    } else {
        Err(ImageError::InvalidDescriptor(descriptor.to_string()))
    }
}

/// Length of the leading field descriptor in `input`, if well formed
fn field_descriptor_len(input: &str) -> Option<usize> {
    let dims = input.bytes().take_while(|&b| b == b'[').count();
    let rest = &input[dims..];
    match rest.as_bytes().first()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(dims + 1),
        b'L' => {
            let end = rest.find(';')?;
            // `L;` names no class
            (end > 1).then_some(dims + end + 1)
        }
        _ => None,
    }
}

/// Reference to a method: `LOwner;.name:(args)ret`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: TypeId,
    pub name: String,
    pub proto: Proto,
}

impl MethodRef {
    pub fn new(owner: TypeId, name: impl Into<String>, proto: Proto) -> Self {
        Self {
            owner,
            name: name.into(),
            proto,
        }
    }

    pub fn parse(text: &str, types: &mut TypeInterner) -> Result<Self, ImageError> {
        let (owner, rest) = split_member(text)?;
        let (name, descriptor) = rest
            .split_once(':')
            .ok_or_else(|| ImageError::InvalidMemberRef(text.to_string()))?;
        Ok(Self::new(
            parse_field_descriptor(owner, types)?,
            name,
            Proto::parse(descriptor, types)?,
        ))
    }

    pub fn display(&self, types: &TypeInterner) -> String {
        format!(
            "{}.{}:{}",
            types.resolve(self.owner),
            self.name,
            self.proto.descriptor(types)
        )
    }
}

/// Reference to a field: `LOwner;.name:Type`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: TypeId,
    pub name: String,
    pub ty: TypeId,
}

impl FieldRef {
    pub fn new(owner: TypeId, name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            owner,
            name: name.into(),
            ty,
        }
    }

    pub fn parse(text: &str, types: &mut TypeInterner) -> Result<Self, ImageError> {
        let (owner, rest) = split_member(text)?;
        let (name, ty) = rest
            .split_once(':')
            .ok_or_else(|| ImageError::InvalidMemberRef(text.to_string()))?;
        Ok(Self::new(
            parse_field_descriptor(owner, types)?,
            name,
            parse_field_descriptor(ty, types)?,
        ))
    }

    pub fn display(&self, types: &TypeInterner) -> String {
        format!(
            "{}.{}:{}",
            types.resolve(self.owner),
            self.name,
            types.resolve(self.ty)
        )
    }
}

/// Split `LOwner;.rest` into the owner descriptor and `rest`
fn split_member(text: &str) -> Result<(&str, &str), ImageError> {
    let invalid = || ImageError::InvalidMemberRef(text.to_string());
    let owner_len = field_descriptor_len(text).ok_or_else(invalid)?;
    let rest = text[owner_len..].strip_prefix('.').ok_or_else(invalid)?;
    Ok((&text[..owner_len], rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proto() {
        let mut types = TypeInterner::new();
        let proto = Proto::parse("(ILFoo;[[J)V", &mut types).unwrap();

        assert_eq!(types.resolve(proto.rtype), "V");
        let args: Vec<_> = proto.args.iter().map(|&a| types.resolve(a)).collect();
        assert_eq!(args, vec!["I", "LFoo;", "[[J"]);
        assert_eq!(proto.descriptor(&types), "(ILFoo;[[J)V");
    }

    #[test]
    fn test_parse_proto_rejects_garbage() {
        let mut types = TypeInterner::new();
        for bad in ["", "V", "(", "(LFoo)V", "(I)", "(I)VV", "(Q)V", "(L;)V"] {
            assert!(Proto::parse(bad, &mut types).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_method_ref() {
        let mut types = TypeInterner::new();
        let method = MethodRef::parse("Lcom/foo/Bar;.run:(LBaz;)I", &mut types).unwrap();

        assert_eq!(types.resolve(method.owner), "Lcom/foo/Bar;");
        assert_eq!(method.name, "run");
        assert_eq!(method.display(&types), "Lcom/foo/Bar;.run:(LBaz;)I");
    }

    #[test]
    fn test_parse_array_owner_method_ref() {
        let mut types = TypeInterner::new();
        let method = MethodRef::parse("[LFoo;.clone:()Ljava/lang/Object;", &mut types).unwrap();

        assert_eq!(types.resolve(method.owner), "[LFoo;");
        assert_eq!(method.name, "clone");
    }

    #[test]
    fn test_parse_field_ref() {
        let mut types = TypeInterner::new();
        let field = FieldRef::parse("LHolder;.value:[LFoo;", &mut types).unwrap();

        assert_eq!(field.name, "value");
        assert_eq!(types.resolve(field.ty), "[LFoo;");
        assert!(FieldRef::parse("LHolder;value:I", &mut types).is_err());
        assert!(FieldRef::parse("LHolder;.value", &mut types).is_err());
    }
}
