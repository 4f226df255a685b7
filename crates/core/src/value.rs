//! Dynamic runtime values exchanged between typed accessors, serializers and the document.

use crate::bindable::Bindable;
use crate::error::{BindError, Result};
use crate::node::{Node, Scalar};
use crate::types::{ScalarKind, TypeInfo, TypeKind};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Structure name of sequences read without metadata.
pub const GENERIC_LIST: &str = "List";
/// Structure name of mappings read without metadata.
pub const GENERIC_MAP: &str = "Map";

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array { items: Vec<Value> },
    List { structure: String, items: Vec<Value> },
    Map { structure: String, entries: Vec<(String, Value)> },
    Enum { type_name: String, variant: String },
    Object { type_name: String, fields: Vec<(String, Value)> },
    Opaque(OpaqueValue),
}

/// A value whose encoding belongs entirely to a registered serializer.
#[derive(Clone)]
pub struct OpaqueValue {
    type_name: String,
    data: Arc<dyn Any + Send + Sync>,
}

impl OpaqueValue {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, data: T) -> Self {
        Self { type_name: type_name.into(), data: Arc::new(data) }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }
}

impl fmt::Debug for OpaqueValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueValue").field("type_name", &self.type_name).finish_non_exhaustive()
    }
}

/// Opaque payloads compare by identity.
impl PartialEq for OpaqueValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.data, &other.data)
    }
}

#[allow(clippy::float_cmp)]
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array { items: a }, Self::Array { items: b }) => a == b,
            (Self::List { structure: x, items: a }, Self::List { structure: y, items: b }) => {
                x == y && a == b
            },
            (Self::Map { structure: x, entries: a }, Self::Map { structure: y, entries: b }) => {
                x == y && a == b
            },
            (
                Self::Enum { type_name: x, variant: a },
                Self::Enum { type_name: y, variant: b },
            ) => x == y && a == b,
            (
                Self::Object { type_name: x, fields: a },
                Self::Object { type_name: y, fields: b },
            ) => x == y && a == b,
            (Self::Opaque(a), Self::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_))
    }

    /// Name written to `type` metadata when this value is an element of a composite.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Array { .. } => "array",
            Self::List { structure, .. } | Self::Map { structure, .. } => structure,
            Self::Enum { type_name, .. } | Self::Object { type_name, .. } => type_name,
            Self::Opaque(opaque) => opaque.type_name(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> Option<TypeKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_) => Some(TypeKind::Scalar),
            Self::Array { .. } => Some(TypeKind::Array),
            Self::List { .. } => Some(TypeKind::Collection),
            Self::Map { .. } => Some(TypeKind::Map),
            Self::Enum { .. } => Some(TypeKind::Enum),
            Self::Object { .. } => Some(TypeKind::Object),
            Self::Opaque(_) => Some(TypeKind::Opaque),
        }
    }

    /// Arrays, collections and maps without a single element.
    #[must_use]
    pub fn is_empty_composite(&self) -> bool {
        match self {
            Self::Array { items } | Self::List { items, .. } => items.is_empty(),
            Self::Map { entries, .. } => entries.is_empty(),
            _ => false,
        }
    }

    /// Variant name of an enum value. Plain strings are accepted as legacy encodings.
    pub fn into_variant(self, expected: &str) -> Result<String> {
        match self {
            Self::Enum { type_name, variant } if type_name == expected => Ok(variant),
            Self::Enum { type_name, .. } => Err(BindError::type_mismatch(format!(
                "expected enum {expected}, found enum {type_name}"
            ))),
            Self::Str(variant) => Ok(variant),
            other => Err(BindError::type_mismatch(format!(
                "expected enum {expected}, found {}",
                other.type_name()
            ))),
        }
    }

    /// Shallow structural check of a value against a declared type.
    #[must_use]
    pub fn conforms_to(&self, declared: &TypeInfo) -> bool {
        match (self, declared) {
            (Self::Null, _) => true,
            (Self::Bool(_), TypeInfo::Scalar { kind: ScalarKind::Bool, .. })
            | (Self::Int(_), TypeInfo::Scalar { kind: ScalarKind::Int | ScalarKind::Float, .. })
            | (Self::Float(_), TypeInfo::Scalar { kind: ScalarKind::Float, .. })
            | (Self::Str(_), TypeInfo::Scalar { kind: ScalarKind::Str, .. }) => true,
            (Self::Str(text), TypeInfo::Scalar { kind: ScalarKind::Int, .. }) => {
                text.parse::<u64>().is_ok()
            },
            (Self::Array { items }, TypeInfo::Array { element, len }) => {
                len.is_none_or(|len| len == items.len()) && items.iter().all(|v| v.conforms_to(element))
            },
            (Self::List { items, .. }, TypeInfo::Collection { element, .. }) => {
                items.iter().all(|v| v.conforms_to(element))
            },
            (Self::Map { entries, .. }, TypeInfo::Map { value, .. }) => {
                entries.iter().all(|(_, v)| v.conforms_to(value))
            },
            (Self::Enum { type_name, variant }, TypeInfo::Enum(info)) => {
                type_name == info.name && info.has_variant(variant)
            },
            (Self::Object { type_name, fields }, TypeInfo::Object(info)) => {
                type_name == info.name
                    && info.fields().iter().all(|field| {
                        match fields.iter().find(|(name, _)| name == field.name) {
                            Some((_, value)) if !value.is_null() => value.conforms_to(&field.type_info),
                            _ => field.optional,
                        }
                    })
            },
            (Self::Opaque(opaque), TypeInfo::Opaque { name }) => opaque.type_name() == *name,
            _ => false,
        }
    }

    /// Generic view of a raw document node: scalars stay scalars, sequences become lists and
    /// mappings become string-keyed maps.
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        match node {
            Node::Null => Self::Null,
            Node::Scalar(scalar) => Self::from(scalar.clone()),
            Node::Sequence(items) => {
                Self::List { structure: GENERIC_LIST.to_owned(), items: items.iter().map(Self::from_node).collect() }
            },
            Node::Mapping(map) => Self::Map {
                structure: GENERIC_MAP.to_owned(),
                entries: map.iter().map(|(k, v)| (k.to_owned(), Self::from_node(v))).collect(),
            },
        }
    }

    /// Node for a scalar value, `None` for anything that needs a serializer.
    #[must_use]
    pub fn to_scalar_node(&self) -> Option<Node> {
        let scalar = match self {
            Self::Bool(value) => Scalar::Bool(*value),
            Self::Int(value) => Scalar::Int(*value),
            Self::Float(value) => Scalar::Float(*value),
            Self::Str(value) => Scalar::Str(value.clone()),
            _ => return None,
        };
        Some(Node::Scalar(scalar))
    }
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Bool(value) => Self::Bool(value),
            Scalar::Int(value) => Self::Int(value),
            Scalar::Float(value) => Self::Float(value),
            Scalar::Str(value) => Self::Str(value),
        }
    }
}

/// Assembles [`Value::Object`] field by field.
#[derive(Debug)]
pub struct ObjectBuilder {
    type_name: &'static str,
    fields: Vec<(String, Value)>,
}

impl ObjectBuilder {
    #[must_use]
    pub const fn new(type_name: &'static str) -> Self {
        Self { type_name, fields: Vec::new() }
    }

    pub fn field<T: Bindable>(&mut self, key: &str, value: T) {
        self.fields.push((key.to_owned(), value.into_value()));
    }

    /// `None` leaves the field out entirely.
    pub fn optional_field<T: Bindable>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.field(key, value);
        }
    }

    #[must_use]
    pub fn build(self) -> Value {
        Value::Object { type_name: self.type_name.to_owned(), fields: self.fields }
    }
}

/// Takes typed fields back out of a [`Value::Object`].
#[derive(Debug)]
pub struct ObjectFields {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl ObjectFields {
    pub fn from_value(value: Value, expected: &str) -> Result<Self> {
        match value {
            Value::Object { type_name, fields } if type_name == expected => {
                Ok(Self { type_name, fields })
            },
            other => Err(BindError::type_mismatch(format!(
                "expected object {expected}, found {}",
                other.type_name()
            ))),
        }
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(name, _)| name == key)?;
        Some(self.fields.swap_remove(index).1).filter(|value| !value.is_null())
    }

    pub fn required<T: Bindable>(&mut self, key: &str) -> Result<T> {
        let value = self.take(key).ok_or_else(|| {
            BindError::missing_required(format!("{}.{key} is not set", self.type_name))
        })?;
        T::from_value(value)
    }

    pub fn optional<T: Bindable>(&mut self, key: &str) -> Result<Option<T>> {
        self.take(key).map(T::from_value).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EnumInfo;

    #[test]
    fn enum_variant_accepts_legacy_strings() {
        let value = Value::Enum { type_name: "Mode".into(), variant: "Fast".into() };
        assert_eq!(value.into_variant("Mode").unwrap(), "Fast");
        assert_eq!(Value::Str("Slow".into()).into_variant("Mode").unwrap(), "Slow");

        let other = Value::Enum { type_name: "Level".into(), variant: "Fast".into() };
        assert!(matches!(other.into_variant("Mode"), Err(BindError::SchemaTypeMismatch { .. })));
    }

    #[test]
    fn conformance_checks_enum_variants() {
        let info = TypeInfo::Enum(EnumInfo::new("Mode", &["Fast", "Slow"]));
        let fast = Value::Enum { type_name: "Mode".into(), variant: "Fast".into() };
        let bogus = Value::Enum { type_name: "Mode".into(), variant: "Warp".into() };
        assert!(fast.conforms_to(&info));
        assert!(!bogus.conforms_to(&info));
        assert!(!Value::Int(1).conforms_to(&info));
    }

    #[test]
    fn integers_widen_into_floats() {
        assert!(Value::Int(3).conforms_to(&f64::type_info()));
        assert!(!Value::Float(3.5).conforms_to(&i64::type_info()));
    }

    #[test]
    fn object_fields_report_missing_required() {
        let mut builder = ObjectBuilder::new("Point");
        builder.field("x", 1_i32);
        builder.optional_field::<i32>("y", None);
        let mut fields = ObjectFields::from_value(builder.build(), "Point").unwrap();

        assert_eq!(fields.required::<i32>("x").unwrap(), 1);
        assert_eq!(fields.optional::<i32>("y").unwrap(), None);
        assert!(matches!(fields.required::<i32>("z"), Err(BindError::MissingRequiredField { .. })));
    }

    #[test]
    fn raw_nodes_become_generic_values() {
        let node = crate::yaml::parse("a:\n  - 1\n  - x\nb:\n  c: true\n").unwrap();
        let value = Value::from_node(&node);
        let Value::Map { structure, entries } = value else { panic!("expected map") };
        assert_eq!(structure, GENERIC_MAP);
        assert_eq!(
            entries[0].1,
            Value::List { structure: GENERIC_LIST.into(), items: vec![Value::Int(1), Value::Str("x".into())] }
        );
    }
}
