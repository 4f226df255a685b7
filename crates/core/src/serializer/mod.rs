//! The serializer contract, built-in serializers and the universal structural fallbacks.
//!
//! Composite values are stored as sub-mappings: integer keys (`"0"`, `"1"`, ...) for sequence
//! data, the original keys for map data, plus reserved `type` and `structure` metadata keys.

mod array;
mod collection;
mod enums;
mod map;
mod object;
mod uuids;

pub use array::ArraySerializer;
pub use collection::CollectionSerializer;
pub use enums::EnumSerializer;
pub use map::MapSerializer;
pub use object::ObjectSerializer;
pub use uuids::UuidSerializer;

use crate::document::Document;
use crate::error::{BindError, Result};
use crate::node::{Node, Scalar};
use crate::path;
use crate::registry::{SerializerRegistry, TypeKey};
use crate::types::{ScalarKind, TypeInfo, TypeKind};
use crate::value::Value;
use std::fmt::Debug;

/// Element type name (collections, maps, arrays) or concrete type name (enums, objects).
pub const TYPE_KEY: &str = "type";
/// Concrete collection or map type.
pub const STRUCTURE_KEY: &str = "structure";
/// Variant name of an enum.
pub const VALUE_KEY: &str = "value";

/// Metadata keys skipped when enumerating data keys.
#[must_use]
pub fn is_reserved_key(key: &str) -> bool {
    key == TYPE_KEY || key == STRUCTURE_KEY
}

/// Encoding strategy for one type or one capability class.
///
/// Serializers hold no document state. Composite serializers write their parts back through
/// [`Document::set`] with sub-paths, and read them through [`decode`].
pub trait Serializer: Send + Sync + Debug {
    /// Key this serializer must be registered under.
    fn target(&self) -> TypeKey;

    /// Writes `value` below `path`. The subtree at `path` has already been cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the value has the wrong shape or cannot be encoded.
    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()>;

    /// Reads the value stored at `path`. Only called when a non-null node exists there.
    ///
    /// # Errors
    ///
    /// Returns `SchemaTypeMismatch` for shapes that disagree with `declared` and `InvalidData`
    /// for broken metadata.
    fn deserialize(
        &self,
        path: &str,
        declared: &TypeInfo,
        document: &Document,
        registry: &SerializerRegistry,
    ) -> Result<Value>;
}

/// Reads the value at `path` as `declared`. Absent and null nodes are `None`.
///
/// Scalars are converted directly; everything else goes through the registry.
///
/// # Errors
///
/// Whatever the scalar conversion or the resolved serializer reports.
pub fn decode(
    document: &Document,
    registry: &SerializerRegistry,
    path: &str,
    declared: &TypeInfo,
) -> Result<Option<Value>> {
    let Some(node) = document.node(path).filter(|node| !node.is_null()) else {
        return Ok(None);
    };
    if let TypeInfo::Scalar { kind, .. } = declared {
        return decode_scalar(path, node, *kind).map(Some);
    }
    registry.resolve(declared)?.deserialize(path, declared, document, registry).map(Some)
}

fn decode_scalar(path: &str, node: &Node, kind: ScalarKind) -> Result<Value> {
    let Node::Scalar(scalar) = node else {
        return Err(BindError::type_mismatch(format!(
            "{path}: expected {kind}, found {}",
            node.shape()
        )));
    };
    match (kind, scalar) {
        (ScalarKind::Str, scalar) => Ok(Value::Str(scalar.to_string())),
        (ScalarKind::Bool, Scalar::Bool(value)) => Ok(Value::Bool(*value)),
        (ScalarKind::Int, Scalar::Int(value)) => Ok(Value::Int(*value)),
        (ScalarKind::Int, Scalar::Str(text)) if text.parse::<u64>().is_ok() => Ok(Value::Str(text.clone())),
        (ScalarKind::Float, Scalar::Float(value)) => Ok(Value::Float(*value)),
        #[allow(clippy::cast_precision_loss)]
        (ScalarKind::Float, Scalar::Int(value)) => Ok(Value::Float(*value as f64)),
        _ => Err(BindError::type_mismatch(format!(
            "{path}: expected {kind}, found {}",
            node.shape()
        ))),
    }
}

/// Text of a scalar metadata entry below `path`.
fn metadata(document: &Document, path: &str, key: &str) -> Option<String> {
    document.node(&path::join(path, key)).and_then(Node::as_scalar).map(ToString::to_string)
}

/// Checks a stored element `type` name against the declared element type.
fn check_element_type(
    registry: &SerializerRegistry,
    path: &str,
    stored: &str,
    declared: &TypeInfo,
) -> Result<()> {
    let compatible = stored == declared.name()
        || (stored == <&str>::from(ScalarKind::Int)
            && declared.scalar_kind() == Some(ScalarKind::Float))
        || (declared.scalar_kind() == Some(ScalarKind::Str) && stored.parse::<ScalarKind>().is_ok())
        || matches!(declared.kind(), TypeKind::Collection | TypeKind::Map);
    if compatible {
        return Ok(());
    }
    if registry.lookup_type(stored).is_some() {
        Err(BindError::type_mismatch(format!(
            "{path}: stored elements are {stored}, declared {declared}"
        )))
    } else {
        Err(BindError::invalid_data(format!("{path}: unknown element type `{stored}`")))
    }
}

/// Unsigned integers beyond `i64`, which travel as decimal strings.
fn is_wide_int(value: &Value) -> bool {
    matches!(value, Value::Str(text) if text.parse::<u64>().is_ok() && text.parse::<i64>().is_err())
}

/// Name of the first non-null element. Mixed or null elements are rejected; integers and wide
/// integers count as one `integer` element type.
fn element_type<'a>(path: &str, items: impl Iterator<Item = &'a Value>) -> Result<String> {
    let items: Vec<&Value> = items.collect();
    let Some(first) = items.first() else {
        return Err(BindError::cannot_infer(format!("{path}: cannot store an empty composite")));
    };
    if items.iter().all(|item| matches!(item, Value::Int(_)) || is_wide_int(item)) {
        return Ok(<&str>::from(ScalarKind::Int).to_owned());
    }
    let name = first.type_name();
    if let Some(odd) = items.iter().find(|item| item.is_null() || item.type_name() != name) {
        return Err(BindError::invalid_data(format!(
            "{path}: elements must share one type, found {name} and {}",
            odd.type_name()
        )));
    }
    Ok(name.to_owned())
}

/// Decodes one element of a composite; null elements are invalid.
fn decode_element(
    document: &Document,
    registry: &SerializerRegistry,
    path: &str,
    declared: &TypeInfo,
) -> Result<Value> {
    decode(document, registry, path, declared)?
        .ok_or_else(|| BindError::invalid_data(format!("{path}: element is null")))
}

/// Integer-keyed entries in index order. Non-integer data keys are invalid.
fn indexed_keys(document: &Document, path: &str) -> Result<Vec<String>> {
    let mut indexed = document
        .keys(path)
        .into_iter()
        .map(|key| match key.parse::<usize>() {
            Ok(index) => Ok((index, key)),
            Err(_) => Err(BindError::invalid_data(format!("{path}: `{key}` is not an index"))),
        })
        .collect::<Result<Vec<_>>>()?;
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, key)| key).collect())
}

/// Elements of an integer-keyed mapping, or of a plain sequence.
fn sequence_elements(
    document: &Document,
    registry: &SerializerRegistry,
    path: &str,
    element: &TypeInfo,
) -> Result<Vec<Value>> {
    let keys = match document.node(path) {
        Some(Node::Sequence(items)) => (0..items.len()).map(|index| index.to_string()).collect(),
        _ => indexed_keys(document, path)?,
    };
    keys.iter()
        .map(|key| decode_element(document, registry, &path::join(path, key), element))
        .collect()
}

/// Writes `items` under integer keys.
fn write_indexed(
    document: &mut Document,
    registry: &SerializerRegistry,
    path: &str,
    items: &[Value],
) -> Result<()> {
    for (index, item) in items.iter().enumerate() {
        document.set(&path::join(path, &index.to_string()), item.clone(), registry)?;
    }
    Ok(())
}
