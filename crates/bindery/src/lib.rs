//! Typed configuration files for applications.
//!
//! Declare a trait of accessors, let `#[interface]` generate the bound struct, and let
//! [`Bindery::init`] provision the YAML file, write defaults for absent fields and validate the
//! rest before handing the accessor back.
//!
//! ## Usage
//!
//! ```rust
//! use bindery::prelude::*;
//!
//! #[interface(name = "server", comment = "Server settings")]
//! pub trait ServerConfig {
//!     #[config(default = 25565, comment = "Listen port")]
//!     fn port(&self) -> Result<u16>;
//!     fn set_port(&self, port: u16) -> Result<()>;
//! }
//!
//! # let temp = tempfile::tempdir().unwrap();
//! let bindery = Bindery::builder().directory(temp.path()).build()?;
//! let server = bindery.init::<BoundServerConfig>()?;
//!
//! assert_eq!(server.port()?, 25565);
//! server.set_port(8080)?;
//! assert_eq!(bindery.configuration::<BoundServerConfig>().map(|c| c.port()).transpose()?, Some(8080));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Custom serializers go into the process-wide registry through [`register_serializer`] during
//! startup; the engine itself never reads global state.

mod facade;
mod global;
mod settings;

pub use bindery_core::{
    AccessorSpec, BindError, BindErrorExt, Bindable, BoundConfig, CommentStyle, ConfigHandle,
    ConfigInterface, DefaultValue, Document, EnumInfo, FieldDescriptor, FieldInfo, GENERIC_LIST,
    GENERIC_MAP, InterfaceDescription, NameStyle, NamingStrategy, Node, ObjectBuilder,
    ObjectFields, ObjectInfo, OpaqueValue, PostProcess, Result, Scalar, ScalarKind, Schema,
    Serializer, SerializerRegistry, Shape, StoreError, TypeInfo, TypeKey, TypeKind, Value, decode,
    path, serializer, text,
};
pub use bindery_derive::{ConfigEnum, ConfigObject, interface};
pub use bindery_storage::{Bootstrap, ConfigStorage, StorageError};
pub use facade::{Bindery, BinderyBuilder, file_name};
pub use global::{register_serializer, register_type, registry};
pub use settings::{BinderySettings, SettingsError, SettingsErrorExt};

pub mod prelude {
    pub use crate::{
        Bindable, Bindery, ConfigEnum, ConfigInterface, ConfigObject, Result, interface,
    };
}
