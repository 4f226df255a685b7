use super::Serializer;
use crate::bindable::{Bindable, UUID_TYPE};
use crate::document::Document;
use crate::error::{BindError, Result};
use crate::node::Node;
use crate::registry::{SerializerRegistry, TypeKey};
use crate::types::TypeInfo;
use crate::value::Value;
use uuid::Uuid;

/// Stores a [`Uuid`] as its hyphenated string.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidSerializer;

impl Serializer for UuidSerializer {
    fn target(&self) -> TypeKey {
        TypeKey::exact(UUID_TYPE)
    }

    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let id = match value {
            Value::Opaque(opaque) => opaque.downcast_ref::<Uuid>().copied(),
            _ => None,
        }
        .ok_or_else(|| {
            BindError::type_mismatch(format!("{path}: expected Uuid, found {}", value.type_name()))
        })?;
        document.set(path, Value::Str(id.hyphenated().to_string()), registry)
    }

    fn deserialize(
        &self,
        path: &str,
        _declared: &TypeInfo,
        document: &Document,
        _registry: &SerializerRegistry,
    ) -> Result<Value> {
        match document.node(path) {
            Some(Node::Scalar(scalar)) => Uuid::from_value(Value::Str(scalar.to_string()))
                .map(Bindable::into_value)
                .map_err(|_| BindError::invalid_data(format!("{path}: `{scalar}` is not a UUID"))),
            other => Err(BindError::type_mismatch(format!(
                "{path}: expected Uuid, found {}",
                other.map_or("nothing", Node::shape)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::decode;

    #[test]
    fn stored_as_plain_string() {
        let registry = SerializerRegistry::new();
        let mut document = Document::builder().memory("").open().unwrap();
        let id = Uuid::new_v4();

        document.set("owner", id.into_value(), &registry).unwrap();
        assert_eq!(
            document.node("owner").and_then(Node::as_scalar).map(ToString::to_string),
            Some(id.to_string())
        );

        let decoded = decode(&document, &registry, "owner", &Uuid::type_info()).unwrap().unwrap();
        assert_eq!(Uuid::from_value(decoded).unwrap(), id);
    }

    #[test]
    fn malformed_text_is_invalid() {
        let registry = SerializerRegistry::new();
        let document = Document::builder().memory("owner: not-a-uuid\n").open().unwrap();
        assert!(matches!(
            decode(&document, &registry, "owner", &Uuid::type_info()),
            Err(BindError::InvalidData { .. })
        ));
    }
}
