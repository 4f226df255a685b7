//! Declarative binding of typed configuration interfaces to hierarchical YAML documents.
//!
//! The engine is made of four layers:
//!
//! - [`Document`]: the node tree of one configuration file, with a value cache, comments and a
//!   backing medium (a file in a [`bindery_storage::ConfigStorage`], or memory).
//! - [`SerializerRegistry`]: type-keyed encoders for everything that is not a scalar, with
//!   structural fallbacks for arrays, collections, maps and composite objects.
//! - [`Schema`]: the validated field set extracted from an [`InterfaceDescription`].
//! - [`BoundConfig`]: schema and document together. Binding writes defaults for absent fields,
//!   persists them once and validates every field before any typed access happens.
//!
//! Nothing here keeps global state; the process-wide registry lives in the `bindery` facade.
//!
//! # Example
//!
//! ```rust
//! use bindery_core::{AccessorSpec, Bindable, BoundConfig, Document, InterfaceDescription, Shape};
//! use bindery_core::SerializerRegistry;
//! use std::sync::Arc;
//!
//! let description = InterfaceDescription::new("server").accessor(
//!     AccessorSpec::new("port").returns(Shape::required::<u16>()).default_value(|| 8080_u16.into_value()),
//! );
//! let document = Document::builder().memory("").open()?;
//! let mut bound = BoundConfig::bind(&description, document, Arc::new(SerializerRegistry::new()))?;
//!
//! assert_eq!(bound.get::<u16>("port")?, 8080);
//! assert_eq!(bound.document().to_yaml_string()?, "port: 8080\n");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bindable;
mod binding;
mod document;
mod error;
mod naming;
mod node;
pub mod path;
mod registry;
mod schema;
pub mod serializer;
pub mod text;
mod types;
mod value;
mod yaml;

pub use bindable::Bindable;
pub use binding::{BoundConfig, ConfigHandle, ConfigInterface};
pub use document::{Document, DocumentBuilder, NoBacking, Snapshot, WithBacking};
pub use error::{BindError, BindErrorExt, Result, StoreError, StoreErrorExt};
pub use naming::{CommentStyle, NameStyle, NamingStrategy};
pub use node::{Node, NodeMap, Scalar};
pub use registry::{SerializerRegistry, TypeKey};
pub use schema::{
    AccessorSpec, DefaultValue, FieldDescriptor, InterfaceDescription, PostProcess, Schema, Shape,
};
pub use serializer::{Serializer, decode};
pub use types::{EnumInfo, FieldInfo, ObjectInfo, ScalarKind, TypeInfo, TypeKind};
pub use value::{GENERIC_LIST, GENERIC_MAP, ObjectBuilder, ObjectFields, OpaqueValue, Value};
