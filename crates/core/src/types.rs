//! Explicit type descriptors.
//!
//! Every bindable type describes itself through [`TypeInfo`]; serializers dispatch on it and the
//! persisted `type`/`structure` metadata is derived from it.

use crate::bindable::Bindable;
use std::fmt;

/// Primitive categories stored natively in the document.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ScalarKind {
    #[strum(serialize = "boolean")]
    Bool,
    #[strum(serialize = "integer")]
    Int,
    Float,
    #[strum(serialize = "string")]
    Str,
}

/// Capability class of a type, used for catch-all registry keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    Scalar,
    Array,
    Collection,
    Map,
    Enum,
    Object,
    Opaque,
}

#[derive(Debug, Clone, Copy)]
pub struct EnumInfo {
    pub name: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumInfo {
    #[must_use]
    pub const fn new(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self { name, variants }
    }

    #[must_use]
    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.contains(&variant)
    }
}

/// Composite object description. Fields are produced lazily so self-referencing types stay finite.
#[derive(Debug, Clone, Copy)]
pub struct ObjectInfo {
    pub name: &'static str,
    fields: fn() -> Vec<FieldInfo>,
}

impl ObjectInfo {
    #[must_use]
    pub const fn new(name: &'static str, fields: fn() -> Vec<FieldInfo>) -> Self {
        Self { name, fields }
    }

    #[must_use]
    pub fn fields(&self) -> Vec<FieldInfo> {
        (self.fields)()
    }
}

/// One persisted field of a composite object.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: &'static str,
    pub type_info: TypeInfo,
    pub optional: bool,
}

impl FieldInfo {
    #[must_use]
    pub fn required<T: Bindable>(name: &'static str) -> Self {
        Self { name, type_info: T::type_info(), optional: false }
    }

    #[must_use]
    pub fn optional<T: Bindable>(name: &'static str) -> Self {
        Self { name, type_info: T::type_info(), optional: true }
    }
}

#[derive(Debug, Clone)]
pub enum TypeInfo {
    /// `name` is the Rust type, only used in diagnostics.
    Scalar { kind: ScalarKind, name: &'static str },
    Array { element: Box<TypeInfo>, len: Option<usize> },
    Collection { structure: &'static str, element: Box<TypeInfo> },
    Map { structure: &'static str, value: Box<TypeInfo> },
    Enum(EnumInfo),
    Object(ObjectInfo),
    Opaque { name: &'static str },
}

impl TypeInfo {
    #[must_use]
    pub const fn scalar(kind: ScalarKind, name: &'static str) -> Self {
        Self::Scalar { kind, name }
    }

    /// Name persisted in `type` metadata and used for exact registry lookups.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar { kind, .. } => (*kind).into(),
            Self::Array { .. } => "array",
            Self::Collection { structure, .. } | Self::Map { structure, .. } => *structure,
            Self::Enum(info) => info.name,
            Self::Object(info) => info.name,
            Self::Opaque { name } => *name,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Scalar { .. } => TypeKind::Scalar,
            Self::Array { .. } => TypeKind::Array,
            Self::Collection { .. } => TypeKind::Collection,
            Self::Map { .. } => TypeKind::Map,
            Self::Enum(_) => TypeKind::Enum,
            Self::Object(_) => TypeKind::Object,
            Self::Opaque { .. } => TypeKind::Opaque,
        }
    }

    #[must_use]
    pub const fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Structural identity. Object and enum types compare by name.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Scalar { kind: a, name: x }, Self::Scalar { kind: b, name: y }) => a == b && x == y,
            (Self::Array { element: a, len: x }, Self::Array { element: b, len: y }) => {
                x == y && a.same_as(b)
            },
            (
                Self::Collection { structure: x, element: a },
                Self::Collection { structure: y, element: b },
            )
            | (Self::Map { structure: x, value: a }, Self::Map { structure: y, value: b }) => {
                x == y && a.same_as(b)
            },
            (Self::Enum(a), Self::Enum(b)) => a.name == b.name,
            (Self::Object(a), Self::Object(b)) => a.name == b.name,
            (Self::Opaque { name: a }, Self::Opaque { name: b }) => a == b,
            _ => false,
        }
    }

    /// Element type of arrays and collections, value type of maps.
    #[must_use]
    pub fn element(&self) -> Option<&Self> {
        match self {
            Self::Array { element, .. } | Self::Collection { element, .. } => Some(element),
            Self::Map { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { name, .. } => f.write_str(name),
            Self::Array { element, len: Some(len) } => write!(f, "[{element}; {len}]"),
            Self::Array { element, len: None } => write!(f, "[{element}]"),
            Self::Collection { structure, element } => write!(f, "{structure}<{element}>"),
            Self::Map { structure, value } => write!(f, "{structure}<String, {value}>"),
            Self::Enum(info) => f.write_str(info.name),
            Self::Object(info) => f.write_str(info.name),
            Self::Opaque { name } => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn scalar_names_are_stable() {
        assert_eq!(i32::type_info().name(), "integer");
        assert_eq!(u8::type_info().name(), "integer");
        assert_eq!(f32::type_info().name(), "float");
        assert_eq!(String::type_info().name(), "string");
        assert_eq!(bool::type_info().name(), "boolean");
        assert_eq!(ScalarKind::Int.to_string(), "integer");
        assert_eq!("boolean".parse::<ScalarKind>().ok(), Some(ScalarKind::Bool));
    }

    #[test]
    fn composite_names_and_kinds() {
        let list = Vec::<String>::type_info();
        assert_eq!(list.name(), "Vec");
        assert_eq!(list.kind(), TypeKind::Collection);
        assert_eq!(list.element().map(TypeInfo::name), Some("string"));

        let map = BTreeMap::<String, i64>::type_info();
        assert_eq!(map.kind(), TypeKind::Map);
        assert_eq!(map.to_string(), "BTreeMap<String, i64>");

        assert_eq!(<[u16; 3]>::type_info().to_string(), "[u16; 3]");
    }

    #[test]
    fn same_as_compares_structure() {
        assert!(Vec::<i32>::type_info().same_as(&Vec::<i32>::type_info()));
        assert!(!Vec::<i32>::type_info().same_as(&Vec::<i64>::type_info()));
        assert!(!Vec::<i32>::type_info().same_as(&std::collections::VecDeque::<i32>::type_info()));
        assert!(!i32::type_info().same_as(&String::type_info()));
    }
}
