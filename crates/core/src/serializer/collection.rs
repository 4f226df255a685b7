use super::{
    STRUCTURE_KEY, Serializer, TYPE_KEY, check_element_type, element_type, metadata,
    sequence_elements, write_indexed,
};
use crate::document::Document;
use crate::error::{BindError, Result};
use crate::node::Node;
use crate::path;
use crate::registry::{SerializerRegistry, TypeKey};
use crate::types::{TypeInfo, TypeKind};
use crate::value::{GENERIC_LIST, Value};

/// Catch-all for collections: `structure`, `type` and integer-keyed elements.
///
/// Plain YAML sequences and integer-keyed mappings without metadata are read as generic lists.
/// The declared collection type decides the result; a different stored `structure` is tolerated.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionSerializer;

impl Serializer for CollectionSerializer {
    fn target(&self) -> TypeKey {
        TypeKey::Kind(TypeKind::Collection)
    }

    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let Value::List { structure, items } = value else {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected a collection, found {}",
                value.type_name()
            )));
        };
        let element = element_type(path, items.iter())?;
        document.set(&path::join(path, STRUCTURE_KEY), Value::Str(structure.clone()), registry)?;
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
        let TypeInfo::Collection { structure, element } = declared else {
            return Err(BindError::type_mismatch(format!("{path}: {declared} is not a collection")));
        };

        let legacy = match document.node(path) {
            Some(Node::Sequence(_)) => true,
            Some(Node::Mapping(_)) => {
                match (metadata(document, path, STRUCTURE_KEY), metadata(document, path, TYPE_KEY)) {
                    (Some(_), Some(stored)) => {
                        check_element_type(registry, path, &stored, element)?;
                        false
                    },
                    (None, None) => true,
                    (Some(_), None) => {
                        return Err(BindError::invalid_data(format!(
                            "{path}: collection element type is not defined"
                        )));
                    },
                    (None, Some(_)) => {
                        return Err(BindError::invalid_data(format!(
                            "{path}: collection structure is not defined"
                        )));
                    },
                }
            },
            other => {
                return Err(BindError::type_mismatch(format!(
                    "{path}: expected {declared}, found {}",
                    other.map_or("nothing", Node::shape)
                )));
            },
        };

        let items = sequence_elements(document, registry, path, element)?;
        let structure = if legacy { GENERIC_LIST } else { structure };
        Ok(Value::List { structure: structure.to_owned(), items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindable::Bindable;
    use crate::serializer::decode;
    use std::collections::{BTreeSet, VecDeque};

    fn registry() -> SerializerRegistry {
        SerializerRegistry::new()
    }

    #[test]
    fn writes_metadata_and_indices() {
        let mut document = Document::builder().memory("").open().unwrap();
        let names = vec!["ann".to_owned(), "bob".to_owned()];
        document.set("names", names.into_value(), &registry()).unwrap();

        assert_eq!(
            document.to_yaml_string().unwrap(),
            "names:\n  structure: Vec\n  type: string\n  '0': ann\n  '1': bob\n"
        );
    }

    #[test]
    fn indices_are_read_in_numeric_order() {
        let document = Document::builder()
            .memory("nums:\n  structure: Vec\n  type: integer\n  '10': 3\n  '2': 2\n  '0': 1\n")
            .open()
            .unwrap();
        let value = decode(&document, &registry(), "nums", &Vec::<i32>::type_info()).unwrap().unwrap();
        assert_eq!(Vec::<i32>::from_value(value).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn legacy_sequence_is_accepted() {
        let document = Document::builder().memory("nums:\n  - 4\n  - 5\n").open().unwrap();
        let value = decode(&document, &registry(), "nums", &VecDeque::<i64>::type_info()).unwrap().unwrap();
        assert!(matches!(&value, Value::List { structure, .. } if structure == GENERIC_LIST));
        assert_eq!(VecDeque::<i64>::from_value(value).unwrap(), [4, 5]);
    }

    #[test]
    fn declared_structure_wins() {
        let document = Document::builder()
            .memory("nums:\n  structure: Vec\n  type: integer\n  '0': 2\n  '1': 1\n")
            .open()
            .unwrap();
        let value = decode(&document, &registry(), "nums", &BTreeSet::<i32>::type_info()).unwrap().unwrap();
        assert_eq!(BTreeSet::<i32>::from_value(value).unwrap().into_iter().collect::<Vec<_>>(), [1, 2]);
    }

    #[test]
    fn half_metadata_is_invalid() {
        let document =
            Document::builder().memory("nums:\n  structure: Vec\n  '0': 1\n").open().unwrap();
        assert!(matches!(
            decode(&document, &registry(), "nums", &Vec::<i32>::type_info()),
            Err(BindError::InvalidData { .. })
        ));
    }

    #[test]
    fn element_type_is_checked() {
        let document = Document::builder()
            .memory("a:\n  structure: Vec\n  type: string\n  '0': x\nb:\n  structure: Vec\n  type: Ghost\n  '0': x\nc:\n  structure: Vec\n  type: integer\n  '0': 1\n")
            .open()
            .unwrap();
        let declared = Vec::<i32>::type_info();
        assert!(matches!(
            decode(&document, &registry(), "a", &declared),
            Err(BindError::SchemaTypeMismatch { .. })
        ));
        assert!(matches!(decode(&document, &registry(), "b", &declared), Err(BindError::InvalidData { .. })));
        assert!(decode(&document, &registry(), "c", &Vec::<f64>::type_info()).is_ok());
    }

    #[test]
    fn non_index_keys_are_invalid() {
        let document = Document::builder()
            .memory("nums:\n  structure: Vec\n  type: integer\n  first: 1\n")
            .open()
            .unwrap();
        assert!(matches!(
            decode(&document, &registry(), "nums", &Vec::<i32>::type_info()),
            Err(BindError::InvalidData { .. })
        ));
    }

    #[test]
    fn mixed_and_empty_collections_are_rejected() {
        let mut document = Document::builder().memory("").open().unwrap();
        let mixed = Value::List { structure: "Vec".into(), items: vec![Value::Int(1), Value::Str("x".into())] };
        assert!(matches!(document.set("nums", mixed, &registry()), Err(BindError::InvalidData { .. })));
        assert!(matches!(
            document.set("nums", Vec::<i32>::new().into_value(), &registry()),
            Err(BindError::CannotInferElementType { .. })
        ));
    }
}
