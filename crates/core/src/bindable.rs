//! The [`Bindable`] trait and its implementations for std and `uuid` types.

use crate::error::{BindError, Result};
use crate::types::{ScalarKind, TypeInfo};
use crate::value::{OpaqueValue, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use uuid::Uuid;

/// A type that can live in a bound configuration.
///
/// Implemented for primitives, `String`, std collections keyed by `String`, fixed arrays and
/// [`Uuid`]. Composite structs and unit enums get it from `#[derive(ConfigObject)]` and
/// `#[derive(ConfigEnum)]`.
pub trait Bindable: Sized {
    fn type_info() -> TypeInfo;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &TypeInfo, found: &Value) -> Result<T> {
    Err(BindError::type_mismatch(format!("expected {expected}, found {}", found.type_name())))
}

impl Bindable for bool {
    fn type_info() -> TypeInfo {
        TypeInfo::scalar(ScalarKind::Bool, "bool")
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(value) => Ok(value),
            other => mismatch(&Self::type_info(), &other),
        }
    }
}

macro_rules! small_int {
    ($($ty:ty),*) => {$(
        impl Bindable for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::scalar(ScalarKind::Int, stringify!($ty))
            }

            fn into_value(self) -> Value {
                Value::Int(i64::from(self))
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Int(value) => <$ty>::try_from(value).map_err(|_| {
                        BindError::invalid_data(format!("{value} is out of range for {}", stringify!($ty)))
                    }),
                    other => mismatch(&Self::type_info(), &other),
                }
            }
        }
    )*};
}

small_int!(i8, i16, i32, i64, u8, u16, u32);

// Values beyond i64 are kept as decimal strings.
macro_rules! wide_int {
    ($($ty:ty),*) => {$(
        impl Bindable for $ty {
            fn type_info() -> TypeInfo {
                TypeInfo::scalar(ScalarKind::Int, stringify!($ty))
            }

            fn into_value(self) -> Value {
                i64::try_from(self).map_or_else(|_| Value::Str(self.to_string()), Value::Int)
            }

            fn from_value(value: Value) -> Result<Self> {
                let out_of_range =
                    |shown: &dyn std::fmt::Display| BindError::invalid_data(format!("{shown} is out of range for {}", stringify!($ty)));
                match value {
                    Value::Int(value) => <$ty>::try_from(value).map_err(|_| out_of_range(&value)),
                    Value::Str(text) => text.parse::<$ty>().map_err(|_| out_of_range(&text)),
                    other => mismatch(&Self::type_info(), &other),
                }
            }
        }
    )*};
}

wide_int!(u64, usize);

impl Bindable for f64 {
    fn type_info() -> TypeInfo {
        TypeInfo::scalar(ScalarKind::Float, "f64")
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(value) => Ok(value),
            Value::Int(value) => Ok(value as Self),
            other => mismatch(&Self::type_info(), &other),
        }
    }
}

impl Bindable for f32 {
    fn type_info() -> TypeInfo {
        TypeInfo::scalar(ScalarKind::Float, "f32")
    }

    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(value) => Ok(value as Self),
            Value::Int(value) => Ok(value as Self),
            other => mismatch(&Self::type_info(), &other),
        }
    }
}

impl Bindable for char {
    fn type_info() -> TypeInfo {
        TypeInfo::scalar(ScalarKind::Str, "char")
    }

    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self> {
        let text = String::from_value(value)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(BindError::invalid_data(format!("`{text}` is not a single character"))),
        }
    }
}

impl Bindable for String {
    fn type_info() -> TypeInfo {
        TypeInfo::scalar(ScalarKind::Str, "String")
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    /// Any scalar reads as its text form.
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(value) => Ok(value),
            Value::Bool(value) => Ok(value.to_string()),
            Value::Int(value) => Ok(value.to_string()),
            Value::Float(value) => Ok(value.to_string()),
            other => mismatch(&Self::type_info(), &other),
        }
    }
}

impl<T: Bindable> Bindable for Box<T> {
    fn type_info() -> TypeInfo {
        T::type_info()
    }

    fn into_value(self) -> Value {
        (*self).into_value()
    }

    fn from_value(value: Value) -> Result<Self> {
        T::from_value(value).map(Self::new)
    }
}

fn sequence_items(expected: &TypeInfo, value: Value) -> Result<Vec<Value>> {
    match value {
        Value::List { items, .. } | Value::Array { items } => Ok(items),
        other => mismatch(expected, &other),
    }
}

macro_rules! collection {
    ($structure:literal, $ty:ident $(, $bound:path)*) => {
        impl<T: Bindable $(+ $bound)*> Bindable for $ty<T> {
            fn type_info() -> TypeInfo {
                TypeInfo::Collection { structure: $structure, element: Box::new(T::type_info()) }
            }

            fn into_value(self) -> Value {
                Value::List {
                    structure: $structure.to_owned(),
                    items: self.into_iter().map(Bindable::into_value).collect(),
                }
            }

            fn from_value(value: Value) -> Result<Self> {
                sequence_items(&Self::type_info(), value)?.into_iter().map(T::from_value).collect()
            }
        }
    };
}

collection!("Vec", Vec);
collection!("VecDeque", VecDeque);
collection!("BTreeSet", BTreeSet, Ord);
collection!("HashSet", HashSet, Eq, Hash);

impl<T: Bindable, const N: usize> Bindable for [T; N] {
    fn type_info() -> TypeInfo {
        TypeInfo::Array { element: Box::new(T::type_info()), len: Some(N) }
    }

    fn into_value(self) -> Value {
        Value::Array { items: self.into_iter().map(Bindable::into_value).collect() }
    }

    fn from_value(value: Value) -> Result<Self> {
        let items: Vec<T> = sequence_items(&Self::type_info(), value)?
            .into_iter()
            .map(T::from_value)
            .collect::<Result<_>>()?;
        let found = items.len();
        Self::try_from(items).map_err(|_| {
            BindError::type_mismatch(format!("expected {N} elements, found {found}"))
        })
    }
}

impl<T: Bindable> Bindable for Box<[T]> {
    fn type_info() -> TypeInfo {
        TypeInfo::Array { element: Box::new(T::type_info()), len: None }
    }

    fn into_value(self) -> Value {
        Value::Array { items: self.into_vec().into_iter().map(Bindable::into_value).collect() }
    }

    fn from_value(value: Value) -> Result<Self> {
        sequence_items(&Self::type_info(), value)?.into_iter().map(T::from_value).collect()
    }
}

macro_rules! string_map {
    ($structure:literal, $ty:ident) => {
        impl<V: Bindable> Bindable for $ty<String, V> {
            fn type_info() -> TypeInfo {
                TypeInfo::Map { structure: $structure, value: Box::new(V::type_info()) }
            }

            fn into_value(self) -> Value {
                Value::Map {
                    structure: $structure.to_owned(),
                    entries: self.into_iter().map(|(k, v)| (k, v.into_value())).collect(),
                }
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Map { entries, .. } => entries
                        .into_iter()
                        .map(|(k, v)| V::from_value(v).map(|v| (k, v)))
                        .collect(),
                    other => mismatch(&Self::type_info(), &other),
                }
            }
        }
    };
}

string_map!("HashMap", HashMap);
string_map!("BTreeMap", BTreeMap);

pub const UUID_TYPE: &str = "Uuid";

impl Bindable for Uuid {
    fn type_info() -> TypeInfo {
        TypeInfo::Opaque { name: UUID_TYPE }
    }

    fn into_value(self) -> Value {
        Value::Opaque(OpaqueValue::new(UUID_TYPE, self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Opaque(opaque) => opaque
                .downcast_ref::<Self>()
                .copied()
                .ok_or_else(|| BindError::type_mismatch(format!("expected Uuid, found {}", opaque.type_name()))),
            Value::Str(text) => Self::parse_str(&text)
                .map_err(|err| BindError::invalid_data(format!("`{text}` is not a UUID: {err}"))),
            other => mismatch(&Self::type_info(), &other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: Bindable + Clone + PartialEq + std::fmt::Debug>(value: T) {
        assert_eq!(T::from_value(value.clone().into_value()).unwrap(), value);
    }

    #[test]
    fn primitives_round_trip() {
        round_trip(true);
        round_trip(-7_i8);
        round_trip(u32::MAX);
        round_trip(u64::MAX);
        round_trip(1.25_f32);
        round_trip('λ');
        round_trip(String::from("text"));
        round_trip(Uuid::new_v4());
    }

    #[test]
    fn out_of_range_integers_are_invalid() {
        assert!(matches!(u8::from_value(Value::Int(300)), Err(BindError::InvalidData { .. })));
        assert!(matches!(u64::from_value(Value::Int(-1)), Err(BindError::InvalidData { .. })));
    }

    #[test]
    fn wide_integers_fall_back_to_text() {
        assert_eq!(u64::MAX.into_value(), Value::Str(u64::MAX.to_string()));
        assert_eq!(42_u64.into_value(), Value::Int(42));
    }

    #[test]
    fn strings_accept_any_scalar() {
        assert_eq!(String::from_value(Value::Int(8)).unwrap(), "8");
        assert_eq!(String::from_value(Value::Bool(false)).unwrap(), "false");
        assert!(String::from_value(Value::Array { items: vec![] }).is_err());
    }

    #[test]
    fn arrays_check_length() {
        let value = Value::Array { items: vec![Value::Int(1), Value::Int(2)] };
        assert!(matches!(<[i32; 3]>::from_value(value), Err(BindError::SchemaTypeMismatch { .. })));
    }

    #[test]
    fn collections_accept_generic_lists() {
        let value = Value::List { structure: "List".into(), items: vec![Value::Int(2), Value::Int(1)] };
        let set = BTreeSet::<i64>::from_value(value).unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn uuid_parses_from_text() {
        let id = Uuid::new_v4();
        assert_eq!(Uuid::from_value(Value::Str(id.to_string())).unwrap(), id);
        assert!(matches!(Uuid::from_value(Value::Str("nope".into())), Err(BindError::InvalidData { .. })));
    }
}
