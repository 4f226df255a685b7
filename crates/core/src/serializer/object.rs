use super::{Serializer, TYPE_KEY, decode, is_reserved_key, metadata};
use crate::document::Document;
use crate::error::{BindError, Result};
use crate::node::Node;
use crate::path;
use crate::registry::{SerializerRegistry, TypeKey};
use crate::types::{TypeInfo, TypeKind};
use crate::value::Value;

/// Universal fallback for derived composite objects.
///
/// Every present field is written under its name as formatted by the document's naming strategy,
/// then `type` is stamped with the object's type name. Fields read back under their raw names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

fn field_key(document: &Document, path: &str, name: &str) -> Result<String> {
    let key = document.naming().format(name);
    if is_reserved_key(&key) {
        return Err(BindError::invalid_schema(format!(
            "{path}: field `{name}` is stored under the reserved key `{key}`"
        )));
    }
    Ok(key)
}

impl Serializer for ObjectSerializer {
    fn target(&self) -> TypeKey {
        TypeKey::Kind(TypeKind::Object)
    }

    fn serialize(
        &self,
        path: &str,
        value: &Value,
        document: &mut Document,
        registry: &SerializerRegistry,
    ) -> Result<()> {
        let Value::Object { type_name, fields } = value else {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected an object, found {}",
                value.type_name()
            )));
        };
        let present = fields
            .iter()
            .filter(|(_, field)| !field.is_null())
            .map(|(name, field)| Ok((field_key(document, path, name)?, field)))
            .collect::<Result<Vec<_>>>()?;

        for (key, field) in present {
            document.set(&path::join(path, &key), field.clone(), registry)?;
        }
        document.set(&path::join(path, TYPE_KEY), Value::Str(type_name.clone()), registry)
    }

    fn deserialize(
        &self,
        path: &str,
        declared: &TypeInfo,
        document: &Document,
        registry: &SerializerRegistry,
    ) -> Result<Value> {
        let TypeInfo::Object(info) = declared else {
            return Err(BindError::type_mismatch(format!("{path}: {declared} is not an object")));
        };
        if !matches!(document.node(path), Some(Node::Mapping(_))) {
            return Err(BindError::type_mismatch(format!(
                "{path}: expected object {}, found {}",
                info.name,
                document.node(path).map_or("nothing", Node::shape)
            )));
        }

        let stored = metadata(document, path, TYPE_KEY)
            .ok_or_else(|| BindError::invalid_data(format!("{path}: object type is not defined")))?;
        if stored != info.name {
            return Err(BindError::type_mismatch(format!(
                "{path}: stored object {stored}, declared {}",
                info.name
            )));
        }

        let mut fields = Vec::new();
        for field in info.fields() {
            let field_path = path::join(path, &field_key(document, path, field.name)?);
            match decode(document, registry, &field_path, &field.type_info)? {
                Some(value) => fields.push((field.name.to_owned(), value)),
                None if field.optional => {},
                None => {
                    return Err(BindError::missing_required(format!("{field_path} is not set")));
                },
            }
        }
        Ok(Value::Object { type_name: info.name.to_owned(), fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindable::Bindable;
    use crate::naming::NameStyle;
    use crate::types::{FieldInfo, ObjectInfo};
    use crate::value::{ObjectBuilder, ObjectFields};

    #[derive(Debug, Clone, PartialEq)]
    struct Endpoint {
        host_name: String,
        port: u16,
        label: Option<String>,
    }

    impl Bindable for Endpoint {
        fn type_info() -> TypeInfo {
            fn fields() -> Vec<FieldInfo> {
                vec![
                    FieldInfo::required::<String>("host_name"),
                    FieldInfo::required::<u16>("port"),
                    FieldInfo::optional::<String>("label"),
                ]
            }
            TypeInfo::Object(ObjectInfo::new("Endpoint", fields))
        }

        fn into_value(self) -> Value {
            let mut object = ObjectBuilder::new("Endpoint");
            object.field("host_name", self.host_name);
            object.field("port", self.port);
            object.optional_field("label", self.label);
            object.build()
        }

        fn from_value(value: Value) -> Result<Self> {
            let mut object = ObjectFields::from_value(value, "Endpoint")?;
            Ok(Self {
                host_name: object.required("host_name")?,
                port: object.required("port")?,
                label: object.optional("label")?,
            })
        }
    }

    fn endpoint() -> Endpoint {
        Endpoint { host_name: "localhost".into(), port: 8080, label: None }
    }

    #[test]
    fn fields_follow_the_naming_strategy() {
        let registry = SerializerRegistry::new();
        let mut document =
            Document::builder().naming(NameStyle::KebabCase).memory("").open().unwrap();
        document.set("primary", endpoint().into_value(), &registry).unwrap();

        assert_eq!(
            document.to_yaml_string().unwrap(),
            "primary:\n  host-name: localhost\n  port: 8080\n  type: Endpoint\n"
        );

        let reloaded = Document::builder()
            .naming(NameStyle::KebabCase)
            .memory(document.to_yaml_string().unwrap())
            .open()
            .unwrap();
        let value =
            crate::serializer::decode(&reloaded, &registry, "primary", &Endpoint::type_info())
                .unwrap()
                .unwrap();
        assert_eq!(Endpoint::from_value(value).unwrap(), endpoint());
    }

    #[test]
    fn nested_lists_of_objects_round_trip() {
        let registry = SerializerRegistry::new();
        let mut document = Document::builder().memory("").open().unwrap();
        let endpoints = vec![endpoint(), Endpoint { label: Some("backup".into()), ..endpoint() }];
        document.set("endpoints", endpoints.clone().into_value(), &registry).unwrap();

        let reloaded =
            Document::builder().memory(document.to_yaml_string().unwrap()).open().unwrap();
        assert_eq!(reloaded.get("endpoints.type"), Some(Value::Str("Endpoint".into())));
        let value = crate::serializer::decode(
            &reloaded,
            &registry,
            "endpoints",
            &Vec::<Endpoint>::type_info(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(Vec::<Endpoint>::from_value(value).unwrap(), endpoints);
    }

    #[test]
    fn missing_type_and_required_fields_are_reported() {
        let registry = SerializerRegistry::new();
        let document = Document::builder()
            .memory("a:\n  hostName: x\n  port: 1\nb:\n  hostName: x\n  type: Endpoint\nc:\n  type: Socket\n")
            .open()
            .unwrap();
        let info = Endpoint::type_info();

        assert!(matches!(
            crate::serializer::decode(&document, &registry, "a", &info),
            Err(BindError::InvalidData { .. })
        ));
        assert!(matches!(
            crate::serializer::decode(&document, &registry, "b", &info),
            Err(BindError::MissingRequiredField { .. })
        ));
        assert!(matches!(
            crate::serializer::decode(&document, &registry, "c", &info),
            Err(BindError::SchemaTypeMismatch { .. })
        ));
    }

    #[test]
    fn reserved_field_keys_are_rejected() {
        let registry = SerializerRegistry::new();
        let mut document = Document::builder().memory("").open().unwrap();
        let object = Value::Object {
            type_name: "Tagged".into(),
            fields: vec![("type".into(), Value::Str("x".into()))],
        };
        assert!(matches!(
            document.set("tagged", object, &registry),
            Err(BindError::InvalidSchema { .. })
        ));
    }
}
