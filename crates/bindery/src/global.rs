//! Process-wide serializer registry for the application boundary.
//!
//! Register custom serializers here during startup, before the first [`crate::Bindery`] is
//! built: every builder without an explicit registry takes a snapshot of this one.

use bindery_core::{Bindable, Result, Serializer, SerializerRegistry, TypeKey};
use parking_lot::RwLock;
use std::sync::{Arc, LazyLock};

static REGISTRY: LazyLock<RwLock<SerializerRegistry>> =
    LazyLock::new(|| RwLock::new(SerializerRegistry::new()));

/// Adds `serializer` to the global registry under `key`.
///
/// # Errors
///
/// Returns `InvalidRegistration` when `key` is not the serializer's own target.
pub fn register_serializer(key: TypeKey, serializer: Arc<dyn Serializer>) -> Result<()> {
    REGISTRY.write().register(key, serializer)
}

/// Makes `T`'s type name known, so stored element types naming it read as mismatches rather
/// than unknown types.
pub fn register_type<T: Bindable>() {
    REGISTRY.write().register_type(T::type_info());
}

/// Snapshot of the global registry.
#[must_use]
pub fn registry() -> SerializerRegistry {
    REGISTRY.read().clone()
}
