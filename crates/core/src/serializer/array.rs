use super::{
    Serializer, TYPE_KEY, check_element_type, element_type, metadata, sequence_elements,
    write_indexed,
};
use crate::document::Document;
use crate::error::{BindError, Result};
use crate::node::Node;
use crate::path;
use crate::registry::{SerializerRegistry, TypeKey};
use crate::types::{TypeInfo, TypeKind};
use crate::value::Value;

/// Universal fallback for fixed arrays and boxed slices: `type` plus integer-keyed elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArraySerializer;

impl Serializer for ArraySerializer {
    fn target(&self) -> TypeKey {
        TypeKey::Kind(TypeKind::Array)
    }

    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let Value::Array { items } = value else {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected an array, found {}",
                value.type_name()
            )));
        };
        let element = element_type(path, items.iter())?;
        document.set(&path::join(path, TYPE_KEY), Value::Str(element), registry)?;
        write_indexed(document, registry, path, items)
    }

    fn deserialize(
        &self,
        path: &str,
        declared: &TypeInfo,
        document: &Document,
        registry: &SerializerRegistry,
    ) -> Result<Value> {
        let TypeInfo::Array { element, len } = declared else {
            return Err(BindError::type_mismatch(format!("{path}: {declared} is not an array")));
        };

        match document.node(path) {
            Some(Node::Mapping(_)) => {
                let stored = metadata(document, path, TYPE_KEY).ok_or_else(|| {
                    BindError::invalid_data(format!("{path}: array type is not defined"))
                })?;
                check_element_type(registry, path, &stored, element)?;
            },
            Some(Node::Sequence(_)) => {},
            other => {
                return Err(BindError::type_mismatch(format!(
                    "{path}: expected {declared}, found {}",
                    other.map_or("nothing", Node::shape)
                )));
            },
        }

        let items = sequence_elements(document, registry, path, element)?;
        if let Some(len) = len
            && items.len() != *len
        {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected {len} elements, found {}",
                items.len()
            )));
        }
        Ok(Value::Array { items })
    }
}
