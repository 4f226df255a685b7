//! Live pairing of a schema with its document: reconciliation, validation and typed access.

use crate::bindable::Bindable;
use crate::document::Document;
use crate::error::{BindError, Result};
use crate::registry::SerializerRegistry;
use crate::schema::{FieldDescriptor, InterfaceDescription, Schema};
use crate::serializer::decode;
use crate::value::Value;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// A schema bound to one document.
///
/// Every failure during [`BoundConfig::bind`] or [`BoundConfig::write`] restores the in-memory
/// tree, so a failed operation leaves neither the document nor the file half-written.
#[derive(Debug)]
pub struct BoundConfig {
    schema: Arc<Schema>,
    document: Document,
    registry: Arc<SerializerRegistry>,
}

impl BoundConfig {
    /// Extracts the schema of `description` with the document's naming strategy, then binds it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for malformed descriptions, plus everything
    /// [`BoundConfig::bind_schema`] reports.
    pub fn bind(
        description: &InterfaceDescription,
        document: Document,
        registry: Arc<SerializerRegistry>,
    ) -> Result<Self> {
        let schema = Schema::build(description, document.naming())?;
        Self::bind_schema(Arc::new(schema), document, registry)
    }

    /// Writes defaults for absent fields, persists them once, then validates every field.
    ///
    /// # Errors
    ///
    /// * `SchemaDefaultMissing` - a required field is absent and declares no default.
    /// * `MissingRequiredField`, `SchemaTypeMismatch`, `InvalidData` - a stored value is unusable.
    /// * `Store` - the document could not be saved or reloaded.
    pub fn bind_schema(
        schema: Arc<Schema>,
        mut document: Document,
        registry: Arc<SerializerRegistry>,
    ) -> Result<Self> {
        if document.header_comment().is_empty()
            && let Some(comment) = schema.comment()
        {
            document.set_header_comment(comment);
        }
        for field in schema.fields() {
            if let Some(comment) = field.comment() {
                document.set_comment(field.path(), comment);
            }
        }

        let mut bound = Self { schema, document, registry };
        bound.reconcile()?;
        bound.validate()?;
        debug!(config = bound.schema.name(), fields = bound.schema.len(), "Bound configuration");
        Ok(bound)
    }

    fn reconcile(&mut self) -> Result<()> {
        let snapshot = self.document.snapshot();
        let written = match self.write_defaults() {
            Ok(written) => written,
            Err(err) => {
                self.document.restore(snapshot);
                return Err(err);
            },
        };
        if written == 0 {
            return Ok(());
        }

        if let Err(err) = self.document.save() {
            self.document.restore(snapshot);
            return Err(err.into());
        }
        self.document.load()?;
        info!(config = self.schema.name(), written, "Wrote default values");
        Ok(())
    }

    fn write_defaults(&mut self) -> Result<usize> {
        let mut written = 0;
        for field in self.schema.fields() {
            if self.document.contains(field.path()) {
                continue;
            }
            match field.default_value() {
                Some(value) => {
                    self.document.set(field.path(), value, &self.registry)?;
                    written += 1;
                },
                None if field.is_optional() => {},
                None => {
                    return Err(BindError::default_missing(format!(
                        "`{}` is absent from {} and has no default",
                        field.path(),
                        self.schema.name()
                    )));
                },
            }
        }
        Ok(written)
    }

    /// Reads every field once, stopping at the first failure.
    fn validate(&mut self) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        for field in schema.fields() {
            if let Some(value) = self.read_field(field)? {
                field.check(value)?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// Current value of `name`. Optional fields read as `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` for undeclared names, `MissingRequiredField` when a required field is
    /// absent, and whatever decoding reports.
    pub fn read(&mut self, name: &str) -> Result<Option<Value>> {
        let schema = Arc::clone(&self.schema);
        self.read_field(schema.field(name)?)
    }

    fn read_field(&mut self, field: &FieldDescriptor) -> Result<Option<Value>> {
        let path = field.path();
        if let Some(value) = self.document.cached(path) {
            return Ok(Some(value.clone()));
        }

        match decode(&self.document, &self.registry, path, field.declared_type())? {
            Some(value) => {
                let value = field.post_process(value);
                self.document.cache_value(path, value.clone());
                Ok(Some(value))
            },
            None if field.is_optional() => Ok(None),
            None => Err(BindError::missing_required(format!(
                "`{path}` is not set in {}",
                self.schema.name()
            ))),
        }
    }

    /// Stores `value` for `name` and persists the document.
    ///
    /// # Errors
    ///
    /// * `RequiredFieldUnset` - `Null` for a required field.
    /// * `SchemaTypeMismatch` - the value does not fit the declared type.
    /// * serializer errors and `Store` failures, after which the previous tree is restored.
    pub fn write(&mut self, name: &str, value: Value) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let field = schema.field(name)?;
        let path = field.path();

        if value.is_null() && !field.is_optional() {
            return Err(BindError::required_unset(format!("`{name}` is required")));
        }
        if !value.conforms_to(field.declared_type()) {
            return Err(BindError::type_mismatch(format!(
                "`{name}` is {}, got {}",
                field.declared_type(),
                value.type_name()
            )));
        }

        let snapshot = self.document.snapshot();
        let stored = if value.is_null() { None } else { Some(field.post_process(value.clone())) };
        if let Err(err) = self.document.set(path, value, &self.registry) {
            self.document.restore(snapshot);
            return Err(err);
        }
        if let Some(comment) = field.comment() {
            self.document.set_comment(path, comment);
        }
        if let Some(stored) = stored {
            self.document.cache_value(path, stored);
        }
        if let Err(err) = self.document.save() {
            self.document.restore(snapshot);
            return Err(err.into());
        }
        debug!(config = schema.name(), field = name, "Updated field");
        Ok(())
    }

    /// Clears an optional field.
    ///
    /// # Errors
    ///
    /// Returns `RequiredFieldUnset` for required fields.
    pub fn unset(&mut self, name: &str) -> Result<()> {
        self.write(name, Value::Null)
    }

    /// Re-reads the document from its backing medium and validates every field again.
    ///
    /// # Errors
    ///
    /// Returns `Store` when the document cannot be read, otherwise the first field failure.
    pub fn reload(&mut self) -> Result<()> {
        self.document.load()?;
        self.validate()
    }

    /// Typed read of a required field.
    ///
    /// # Errors
    ///
    /// Returns `SchemaTypeMismatch` when `T` is not the declared type, plus everything
    /// [`BoundConfig::read`] reports.
    pub fn get<T: Bindable>(&mut self, name: &str) -> Result<T> {
        self.check_type::<T>(name)?;
        let value = self
            .read(name)?
            .ok_or_else(|| BindError::missing_required(format!("`{name}` is not set")))?;
        T::from_value(value)
    }

    /// Typed read of an optional field.
    ///
    /// # Errors
    ///
    /// Same as [`BoundConfig::get`], except that absence is `Ok(None)`.
    pub fn get_optional<T: Bindable>(&mut self, name: &str) -> Result<Option<T>> {
        self.check_type::<T>(name)?;
        self.read(name)?.map(T::from_value).transpose()
    }

    /// Typed write.
    ///
    /// # Errors
    ///
    /// Same as [`BoundConfig::write`].
    pub fn set<T: Bindable>(&mut self, name: &str, value: T) -> Result<()> {
        self.check_type::<T>(name)?;
        self.write(name, value.into_value())
    }

    /// Typed write of an optional field; `None` removes it.
    ///
    /// # Errors
    ///
    /// Same as [`BoundConfig::write`].
    pub fn set_optional<T: Bindable>(&mut self, name: &str, value: Option<T>) -> Result<()> {
        self.check_type::<T>(name)?;
        self.write(name, value.map_or(Value::Null, Bindable::into_value))
    }

    fn check_type<T: Bindable>(&self, name: &str) -> Result<()> {
        let field = self.schema.field(name)?;
        let requested = T::type_info();
        if requested.same_as(field.declared_type()) {
            Ok(())
        } else {
            Err(BindError::type_mismatch(format!(
                "`{name}` is {}, accessed as {requested}",
                field.declared_type()
            )))
        }
    }
}

/// Shared handle to a [`BoundConfig`], serializing every access through one mutex.
#[derive(Debug, Clone)]
pub struct ConfigHandle(Arc<Mutex<BoundConfig>>);

impl ConfigHandle {
    #[must_use]
    pub fn new(bound: BoundConfig) -> Self {
        Self(Arc::new(Mutex::new(bound)))
    }

    #[must_use]
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.0.lock().schema)
    }

    /// Runs `f` with exclusive access to the bound configuration.
    pub fn with<R>(&self, f: impl FnOnce(&mut BoundConfig) -> R) -> R {
        f(&mut self.0.lock())
    }

    /// # Errors
    ///
    /// See [`BoundConfig::read`].
    pub fn read(&self, name: &str) -> Result<Option<Value>> {
        self.0.lock().read(name)
    }

    /// # Errors
    ///
    /// See [`BoundConfig::write`].
    pub fn write(&self, name: &str, value: Value) -> Result<()> {
        self.0.lock().write(name, value)
    }

    /// # Errors
    ///
    /// See [`BoundConfig::get`].
    pub fn get<T: Bindable>(&self, name: &str) -> Result<T> {
        self.0.lock().get(name)
    }

    /// # Errors
    ///
    /// See [`BoundConfig::get_optional`].
    pub fn get_optional<T: Bindable>(&self, name: &str) -> Result<Option<T>> {
        self.0.lock().get_optional(name)
    }

    /// # Errors
    ///
    /// See [`BoundConfig::set`].
    pub fn set<T: Bindable>(&self, name: &str, value: T) -> Result<()> {
        self.0.lock().set(name, value)
    }

    /// # Errors
    ///
    /// See [`BoundConfig::set_optional`].
    pub fn set_optional<T: Bindable>(&self, name: &str, value: Option<T>) -> Result<()> {
        self.0.lock().set_optional(name, value)
    }

    /// # Errors
    ///
    /// See [`BoundConfig::reload`].
    pub fn reload(&self) -> Result<()> {
        self.0.lock().reload()
    }
}

/// A typed accessor generated for a configuration interface by `#[interface]`.
pub trait ConfigInterface: Sized {
    /// File name of the configuration, without the `.yml` suffix.
    const NAME: &'static str;
    /// Header comment of the document.
    const COMMENT: Option<&'static str>;

    fn describe() -> InterfaceDescription;

    fn from_handle(handle: ConfigHandle) -> Self;

    fn handle(&self) -> &ConfigHandle;

    /// Binds the interface to an opened document.
    ///
    /// # Errors
    ///
    /// See [`BoundConfig::bind`].
    fn bind(document: Document, registry: Arc<SerializerRegistry>) -> Result<Self> {
        let bound = BoundConfig::bind(&Self::describe(), document, registry)?;
        Ok(Self::from_handle(ConfigHandle::new(bound)))
    }
}
