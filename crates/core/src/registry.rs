//! Type-keyed serializer dispatch.

use crate::bindable::Bindable;
use crate::error::{BindError, Result};
use crate::serializer::{
    ArraySerializer, CollectionSerializer, EnumSerializer, MapSerializer, ObjectSerializer,
    Serializer, UuidSerializer,
};
use crate::types::{ScalarKind, TypeInfo, TypeKind};
use crate::value::Value;
use fxhash::FxHashMap;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use strum::IntoEnumIterator;
use tracing::debug;

static ARRAY: ArraySerializer = ArraySerializer;
static COLLECTION: CollectionSerializer = CollectionSerializer;
static MAP: MapSerializer = MapSerializer;
static OBJECT: ObjectSerializer = ObjectSerializer;

/// Registry key: one concrete type name, or every type of a capability class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKey {
    Exact(Cow<'static, str>),
    Kind(TypeKind),
}

impl TypeKey {
    pub fn exact(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Exact(name.into())
    }

    /// Exact key of a bindable type.
    #[must_use]
    pub fn of<T: Bindable>() -> Self {
        Self::Exact(Cow::Borrowed(T::type_info().name()))
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Kind(kind) => write!(f, "any {kind}"),
        }
    }
}

/// Ordered serializer registry.
///
/// Resolution, first match wins:
/// 1. an [`TypeKey::Exact`] entry for the type name;
/// 2. the first [`TypeKey::Kind`] entry of the type's kind, in registration order;
/// 3. the universal array, collection, map and object serializers, by shape;
/// 4. otherwise `MissingSerializer`.
///
/// Scalars never reach the registry. The registry also keeps a catalog of known type names,
/// used to tell a mismatched element type from an unknown one.
#[derive(Clone)]
pub struct SerializerRegistry {
    entries: Vec<(TypeKey, Arc<dyn Serializer>)>,
    types: FxHashMap<String, TypeInfo>,
}

impl fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerRegistry")
            .field("entries", &self.entries.iter().map(|(key, _)| key.to_string()).collect::<Vec<_>>())
            .field("types", &self.types.len())
            .finish()
    }
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializerRegistry {
    /// Registry with the built-in entries: `Uuid`, then any enum, any collection and any map.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.push(TypeKey::of::<uuid::Uuid>(), Arc::new(UuidSerializer));
        registry.push(TypeKey::Kind(TypeKind::Enum), Arc::new(EnumSerializer));
        registry.push(TypeKey::Kind(TypeKind::Collection), Arc::new(CollectionSerializer));
        registry.push(TypeKey::Kind(TypeKind::Map), Arc::new(MapSerializer));
        registry.register_type(uuid::Uuid::type_info());
        registry
    }

    /// Registry without serializers. Scalar type names are still known.
    #[must_use]
    pub fn empty() -> Self {
        let types = ScalarKind::iter()
            .map(|kind| {
                let info = TypeInfo::scalar(kind, kind.into());
                (info.name().to_owned(), info)
            })
            .collect();
        Self { entries: Vec::new(), types }
    }

    fn push(&mut self, key: TypeKey, serializer: Arc<dyn Serializer>) {
        if let Some(slot) = self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = serializer;
        } else {
            self.entries.push((key, serializer));
        }
    }

    /// Adds `serializer` under `key`. A duplicate key replaces the old entry in place.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRegistration` when `key` differs from the serializer's own target, or when
    /// `key` targets scalars, which are always stored natively.
    pub fn register(&mut self, key: TypeKey, serializer: Arc<dyn Serializer>) -> Result<()> {
        let target = serializer.target();
        if target != key {
            return Err(BindError::invalid_registration(format!(
                "serializer for {target} cannot be registered as {key}"
            )));
        }
        if key == TypeKey::Kind(TypeKind::Scalar) {
            return Err(BindError::invalid_registration("scalars are stored natively"));
        }
        debug!(key = %key, "Registered serializer");
        self.push(key, serializer);
        Ok(())
    }

    pub fn unregister(&mut self, key: &TypeKey) -> Option<Arc<dyn Serializer>> {
        let index = self.entries.iter().position(|(existing, _)| existing == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Keys in resolution order.
    pub fn keys(&self) -> impl Iterator<Item = &TypeKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Makes a type name known to the catalog.
    pub fn register_type(&mut self, info: TypeInfo) {
        self.types.insert(info.name().to_owned(), info);
    }

    #[must_use]
    pub fn lookup_type(&self, name: &str) -> Option<&TypeInfo> {
        self.types.get(name)
    }

    /// Serializer for a declared type.
    ///
    /// # Errors
    ///
    /// Returns `MissingSerializer` for scalars and for types no entry or fallback covers.
    pub fn resolve(&self, info: &TypeInfo) -> Result<&dyn Serializer> {
        self.lookup(info.name(), Some(info.kind()))
            .ok_or_else(|| BindError::missing_serializer(format!("no serializer for {info}")))
    }

    /// Serializer for a runtime value.
    ///
    /// # Errors
    ///
    /// Returns `MissingSerializer` for nulls, scalars and values no entry or fallback covers.
    pub fn resolve_by_value(&self, value: &Value) -> Result<&dyn Serializer> {
        self.lookup(value.type_name(), value.kind()).ok_or_else(|| {
            BindError::missing_serializer(format!("no serializer for {}", value.type_name()))
        })
    }

    fn lookup(&self, name: &str, kind: Option<TypeKind>) -> Option<&dyn Serializer> {
        let kind = kind.filter(|kind| *kind != TypeKind::Scalar)?;

        let exact = self.entries.iter().find(|(key, _)| matches!(key, TypeKey::Exact(n) if n == name));
        let by_kind = || self.entries.iter().find(|(key, _)| *key == TypeKey::Kind(kind));
        if let Some((_, serializer)) = exact.or_else(by_kind) {
            return Some(serializer.as_ref());
        }

        match kind {
            TypeKind::Array => Some(&ARRAY),
            TypeKind::Collection => Some(&COLLECTION),
            TypeKind::Map => Some(&MAP),
            TypeKind::Object => Some(&OBJECT),
            TypeKind::Scalar | TypeKind::Enum | TypeKind::Opaque => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    #[derive(Debug)]
    struct Named(&'static str, TypeKey);

    impl Serializer for Named {
        fn target(&self) -> TypeKey {
            self.1.clone()
        }

        fn serialize(&self, _: &str, _: &Value, _: &mut Document, _: &SerializerRegistry) -> Result<()> {
            Ok(())
        }

        fn deserialize(&self, _: &str, _: &TypeInfo, _: &Document, _: &SerializerRegistry) -> Result<Value> {
            Ok(Value::Str(self.0.to_owned()))
        }
    }

    fn label(serializer: &dyn Serializer) -> String {
        let document = Document::builder().memory("").open().unwrap();
        let registry = SerializerRegistry::empty();
        match serializer.deserialize("", &String::type_info(), &document, &registry).unwrap() {
            Value::Str(label) => label,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn default_order() {
        let registry = SerializerRegistry::new();
        let keys: Vec<String> = registry.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["Uuid", "any enum", "any collection", "any map"]);
    }

    #[test]
    fn exact_entry_beats_earlier_kind_entry() {
        let mut registry = SerializerRegistry::empty();
        let general = TypeKey::Kind(TypeKind::Collection);
        let specific = TypeKey::exact("Vec");
        registry.register(general.clone(), Arc::new(Named("general", general))).unwrap();
        registry.register(specific.clone(), Arc::new(Named("specific", specific))).unwrap();

        assert_eq!(label(registry.resolve(&Vec::<i32>::type_info()).unwrap()), "specific");
        assert_eq!(
            label(registry.resolve(&std::collections::VecDeque::<i32>::type_info()).unwrap()),
            "general"
        );
    }

    #[test]
    fn duplicate_key_overwrites_in_place() {
        let mut registry = SerializerRegistry::new();
        let key = TypeKey::Kind(TypeKind::Enum);
        registry.register(key.clone(), Arc::new(Named("replacement", key))).unwrap();

        let keys: Vec<String> = registry.keys().map(ToString::to_string).collect();
        assert_eq!(keys, ["Uuid", "any enum", "any collection", "any map"]);
        let info = TypeInfo::Enum(crate::types::EnumInfo::new("Mode", &["A"]));
        assert_eq!(label(registry.resolve(&info).unwrap()), "replacement");
    }

    #[test]
    fn mismatched_target_is_rejected() {
        let mut registry = SerializerRegistry::new();
        let result = registry.register(
            TypeKey::exact("Duration"),
            Arc::new(Named("x", TypeKey::exact("Instant"))),
        );
        assert!(matches!(result, Err(BindError::InvalidRegistration { .. })));

        let scalar = TypeKey::Kind(TypeKind::Scalar);
        let result = registry.register(scalar.clone(), Arc::new(Named("x", scalar)));
        assert!(matches!(result, Err(BindError::InvalidRegistration { .. })));
    }

    #[test]
    fn structural_fallbacks() {
        let registry = SerializerRegistry::empty();
        assert!(registry.resolve(&<[i32; 2]>::type_info()).is_ok());
        assert!(registry.resolve(&Vec::<i32>::type_info()).is_ok());
        assert!(registry.resolve(&std::collections::HashMap::<String, i32>::type_info()).is_ok());
        assert!(matches!(
            registry.resolve(&TypeInfo::Opaque { name: "Duration" }),
            Err(BindError::MissingSerializer { .. })
        ));
        assert!(matches!(registry.resolve(&i32::type_info()), Err(BindError::MissingSerializer { .. })));
        assert!(matches!(registry.resolve_by_value(&Value::Null), Err(BindError::MissingSerializer { .. })));
    }

    #[test]
    fn catalog_knows_scalars_and_uuid() {
        let registry = SerializerRegistry::new();
        assert!(registry.lookup_type("integer").is_some());
        assert!(registry.lookup_type("Uuid").is_some());
        assert!(registry.lookup_type("Nope").is_none());
    }
}
