use super::{
    STRUCTURE_KEY, Serializer, TYPE_KEY, check_element_type, decode_element, element_type,
    is_reserved_key, metadata,
};
use crate::document::Document;
use crate::error::{BindError, Result};
use crate::node::Node;
use crate::path;
use crate::registry::{SerializerRegistry, TypeKey};
use crate::types::{TypeInfo, TypeKind};
use crate::value::{GENERIC_MAP, Value};

/// Catch-all for string-keyed maps: `structure`, `type` and entries under their own keys.
///
/// Keys must be usable as a single path segment and must not be `type` or `structure`.
/// A mapping without metadata is read as a generic map.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapSerializer;

fn check_key(path: &str, key: &str) -> Result<()> {
    if key.is_empty() || key.contains(path::SEPARATOR) {
        return Err(BindError::invalid_data(format!("{path}: map key `{key}` is not a valid path segment")));
    }
    if is_reserved_key(key) {
        return Err(BindError::invalid_data(format!("{path}: map key `{key}` is reserved")));
    }
    Ok(())
}

impl Serializer for MapSerializer {
    fn target(&self) -> TypeKey {
        TypeKey::Kind(TypeKind::Map)
    }

    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let Value::Map { structure, entries } = value else {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected a map, found {}",
                value.type_name()
            )));
        };
        for (key, _) in entries {
            check_key(path, key)?;
        }
        let element = element_type(path, entries.iter().map(|(_, value)| value))?;

        document.set(&path::join(path, STRUCTURE_KEY), Value::Str(structure.clone()), registry)?;
        document.set(&path::join(path, TYPE_KEY), Value::Str(element), registry)?;
        for (key, item) in entries {
            document.set(&path::join(path, key), item.clone(), registry)?;
        }
        Ok(())
    }

    fn deserialize(
        &self,
        path: &str,
        declared: &TypeInfo,
        document: &Document,
        registry: &SerializerRegistry,
    ) -> Result<Value> {
        let TypeInfo::Map { structure, value } = declared else {
            return Err(BindError::type_mismatch(format!("{path}: {declared} is not a map")));
        };
        if !matches!(document.node(path), Some(Node::Mapping(_))) {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected {declared}, found {}",
                document.node(path).map_or("nothing", Node::shape)
            )));
        }

        let structure = match (metadata(document, path, STRUCTURE_KEY), metadata(document, path, TYPE_KEY)) {
            (Some(_), Some(stored)) => {
                check_element_type(registry, path, &stored, value)?;
                *structure
            },
            (None, None) => GENERIC_MAP,
            (Some(_), None) => {
                return Err(BindError::invalid_data(format!("{path}: map value type is not defined")));
            },
            (None, Some(_)) => {
                return Err(BindError::invalid_data(format!("{path}: map structure is not defined")));
            },
        };

        let entries = document
            .keys(path)
            .into_iter()
            .map(|key| {
                let item = decode_element(document, registry, &path::join(path, &key), value)?;
                Ok((key, item))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Map { structure: structure.to_owned(), entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindable::Bindable;
    use crate::serializer::decode;
    use std::collections::{BTreeMap, HashMap};

    #[test]
    fn round_trip_keeps_original_keys() {
        let registry = SerializerRegistry::new();
        let mut document = Document::builder().memory("").open().unwrap();
        let limits = BTreeMap::from([("alpha".to_owned(), 3_i32), ("beta".to_owned(), 5)]);
        document.set("limits", limits.clone().into_value(), &registry).unwrap();

        let text = document.to_yaml_string().unwrap();
        assert!(text.contains("  alpha: 3\n"), "{text}");

        let reloaded = Document::builder().memory(text).open().unwrap();
        let info = BTreeMap::<String, i32>::type_info();
        let value = decode(&reloaded, &registry, "limits", &info).unwrap().unwrap();
        assert_eq!(BTreeMap::<String, i32>::from_value(value).unwrap(), limits);
    }

    #[test]
    fn legacy_scalar_mapping_is_accepted() {
        let registry = SerializerRegistry::new();
        let document = Document::builder().memory("motd:\n  en: Hello\n  de: Hallo\n").open().unwrap();
        let info = HashMap::<String, String>::type_info();
        let value = decode(&document, &registry, "motd", &info).unwrap().unwrap();

        assert!(matches!(&value, Value::Map { structure, .. } if structure == GENERIC_MAP));
        let motd = HashMap::<String, String>::from_value(value).unwrap();
        assert_eq!(motd.get("de").map(String::as_str), Some("Hallo"));
    }

    #[test]
    fn reserved_and_dotted_keys_are_rejected() {
        let registry = SerializerRegistry::new();
        let mut document = Document::builder().memory("").open().unwrap();
        for key in ["type", "structure", "a.b"] {
            let map = HashMap::from([(key.to_owned(), 1_i32)]);
            assert!(matches!(
                document.set("limits", map.into_value(), &registry),
                Err(BindError::InvalidData { .. })
            ));
        }
    }

    #[test]
    fn sequence_is_not_a_map() {
        let registry = SerializerRegistry::new();
        let document = Document::builder().memory("limits:\n  - 1\n").open().unwrap();
        assert!(matches!(
            decode(&document, &registry, "limits", &HashMap::<String, i32>::type_info()),
            Err(BindError::SchemaTypeMismatch { .. })
        ));
    }
}
