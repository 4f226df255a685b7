use super::{Serializer, TYPE_KEY, VALUE_KEY, metadata};
use crate::document::Document;
use crate::error::{BindError, Result};
use crate::node::Node;
use crate::path;
use crate::registry::{SerializerRegistry, TypeKey};
use crate::types::{TypeInfo, TypeKind};
use crate::value::Value;

/// Catch-all for unit enums: `value` holds the variant, `type` the enum name.
///
/// A bare string at the path is read as a variant name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumSerializer;

impl Serializer for EnumSerializer {
    fn target(&self) -> TypeKey {
        TypeKey::Kind(TypeKind::Enum)
    }

    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let Value::Enum { type_name, variant } = value else {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected an enum, found {}",
                value.type_name()
            )));
        };
        document.set(&path::join(path, VALUE_KEY), Value::Str(variant.clone()), registry)?;
        document.set(&path::join(path, TYPE_KEY), Value::Str(type_name.clone()), registry)
    }

    fn deserialize(
        &self,
        path: &str,
        declared: &TypeInfo,
        document: &Document,
        _registry: &SerializerRegistry,
    ) -> Result<Value> {
        let TypeInfo::Enum(info) = declared else {
            return Err(BindError::type_mismatch(format!("{path}: {declared} is not an enum")));
        };

        let variant = match document.node(path) {
            Some(Node::Scalar(scalar)) => scalar.to_string(),
            Some(Node::Mapping(_)) => {
                let variant = metadata(document, path, VALUE_KEY).ok_or_else(|| {
                    BindError::invalid_data(format!("{path}: enum value is not defined"))
                })?;
                let stored = metadata(document, path, TYPE_KEY).ok_or_else(|| {
                    BindError::invalid_data(format!("{path}: enum type is not defined"))
                })?;
                if stored != info.name {
                    return Err(BindError::type_mismatch(format!(
                        "{path}: stored enum {stored}, declared {}",
                        info.name
                    )));
                }
                variant
            },
            other => {
                return Err(BindError::type_mismatch(format!(
                    "{path}: expected enum {}, found {}",
                    info.name,
                    other.map_or("nothing", Node::shape)
                )));
            },
        };

        if !info.has_variant(&variant) {
            return Err(BindError::invalid_data(format!(
                "{path}: `{variant}` is not a variant of {}",
                info.name
            )));
        }
        Ok(Value::Enum { type_name: info.name.to_owned(), variant })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::decode;
    use crate::types::EnumInfo;

    const MODE: TypeInfo = TypeInfo::Enum(EnumInfo::new("Mode", &["Fast", "Slow"]));

    fn fast() -> Value {
        Value::Enum { type_name: "Mode".into(), variant: "Fast".into() }
    }

    #[test]
    fn writes_value_and_type() {
        let registry = SerializerRegistry::new();
        let mut document = Document::builder().memory("").open().unwrap();
        document.set("mode", fast(), &registry).unwrap();

        assert_eq!(document.get("mode.value"), Some(Value::Str("Fast".into())));
        assert_eq!(document.get("mode.type"), Some(Value::Str("Mode".into())));
        assert_eq!(document.get("mode"), Some(fast()));
    }

    #[test]
    fn reads_legacy_plain_string() {
        let registry = SerializerRegistry::new();
        let document = Document::builder().memory("mode: Slow\n").open().unwrap();
        let value = decode(&document, &registry, "mode", &MODE).unwrap();
        assert_eq!(value, Some(Value::Enum { type_name: "Mode".into(), variant: "Slow".into() }));
    }

    #[test]
    fn rejects_unknown_variant_and_type() {
        let registry = SerializerRegistry::new();
        let document = Document::builder()
            .memory("a:\n  value: Warp\n  type: Mode\nb:\n  value: Fast\n  type: Level\nc:\n  value: Fast\n")
            .open()
            .unwrap();

        assert!(matches!(decode(&document, &registry, "a", &MODE), Err(BindError::InvalidData { .. })));
        assert!(matches!(
            decode(&document, &registry, "b", &MODE),
            Err(BindError::SchemaTypeMismatch { .. })
        ));
        assert!(matches!(decode(&document, &registry, "c", &MODE), Err(BindError::InvalidData { .. })));
    }
}
