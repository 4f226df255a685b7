//! Interface descriptions and the validated schema extracted from them.
//!
//! An [`InterfaceDescription`] is what `#[interface]` generates (or what a caller builds by hand):
//! one [`AccessorSpec`] per trait method. [`Schema::build`] turns it into field descriptors and
//! rejects every malformed shape up front, so binding never meets them later.

use crate::bindable::Bindable;
use crate::error::{BindError, Result};
use crate::naming::NamingStrategy;
use crate::path;
use crate::serializer::is_reserved_key;
use crate::types::{ScalarKind, TypeInfo};
use crate::value::Value;
use fxhash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::Arc;

const SETTER_PREFIX: &str = "set_";
const GETTER_PREFIX: &str = "get_";

/// Declared shape of an accessor parameter or return value.
#[derive(Debug, Clone)]
pub enum Shape {
    Unit,
    Value { type_info: TypeInfo, optional: bool, check: fn(Value) -> Result<()> },
}

fn convert<T: Bindable>(value: Value) -> Result<()> {
    T::from_value(value).map(drop)
}

impl Shape {
    #[must_use]
    pub fn required<T: Bindable>() -> Self {
        Self::Value { type_info: T::type_info(), optional: false, check: convert::<T> }
    }

    #[must_use]
    pub fn optional<T: Bindable>() -> Self {
        Self::Value { type_info: T::type_info(), optional: true, check: convert::<T> }
    }

    #[must_use]
    pub const fn unit() -> Self {
        Self::Unit
    }

    const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    fn matches(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (
                Self::Value { type_info: a, optional: x, .. },
                Self::Value { type_info: b, optional: y, .. },
            ) => x == y && a.same_as(b),
            _ => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Value { type_info, optional: false, .. } => write!(f, "{type_info}"),
            Self::Value { type_info, optional: true, .. } => write!(f, "Option<{type_info}>"),
        }
    }
}

/// Produces the value written for an absent field.
#[derive(Clone)]
pub struct DefaultValue(Arc<dyn Fn() -> Value + Send + Sync>);

impl DefaultValue {
    pub fn new(produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(produce))
    }

    #[must_use]
    pub fn produce(&self) -> Value {
        (self.0)()
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultValue(..)")
    }
}

/// Transformation applied to every value read for a field, after decoding.
#[derive(Clone)]
pub struct PostProcess(Arc<dyn Fn(Value) -> Value + Send + Sync>);

impl PostProcess {
    pub fn new(process: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(process))
    }

    /// Typed hook. Values that do not convert to `T` pass through untouched.
    pub fn typed<T: Bindable + 'static>(process: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        Self::new(move |value| match T::from_value(value.clone()) {
            Ok(typed) => process(typed).into_value(),
            Err(_) => value,
        })
    }

    /// Hook running `self`, then `next`.
    #[must_use]
    pub fn then(self, next: Self) -> Self {
        Self::new(move |value| next.apply(self.apply(value)))
    }

    #[must_use]
    pub fn apply(&self, value: Value) -> Value {
        (self.0)(value)
    }
}

impl fmt::Debug for PostProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PostProcess(..)")
    }
}

/// One method of a configuration interface.
#[derive(Debug, Clone)]
pub struct AccessorSpec {
    method: String,
    params: Vec<Shape>,
    returns: Shape,
    default: Option<DefaultValue>,
    post_process: Option<PostProcess>,
    comment: Option<String>,
    path: Option<String>,
}

impl AccessorSpec {
    #[must_use = "Creates a new accessor description"]
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Vec::new(),
            returns: Shape::Unit,
            default: None,
            post_process: None,
            comment: None,
            path: None,
        }
    }

    #[must_use = "Adds a parameter to the accessor"]
    pub fn param(mut self, shape: Shape) -> Self {
        self.params.push(shape);
        self
    }

    #[must_use = "Sets the accessor return shape"]
    pub fn returns(mut self, shape: Shape) -> Self {
        self.returns = shape;
        self
    }

    #[must_use = "Sets the value written when the field is absent"]
    pub fn default_value(mut self, produce: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default = Some(DefaultValue::new(produce));
        self
    }

    #[must_use = "Sets the hook applied to values read for the field"]
    pub fn post_process(mut self, process: PostProcess) -> Self {
        self.post_process = Some(process);
        self
    }

    #[must_use = "Sets the comment rendered with the field"]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use = "Sets an explicit document path for the field"]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    const fn has_attributes(&self) -> bool {
        self.default.is_some()
            || self.post_process.is_some()
            || self.comment.is_some()
            || self.path.is_some()
    }
}

/// A configuration interface as a list of accessors, plus its file name and header comment.
#[derive(Debug, Clone)]
pub struct InterfaceDescription {
    name: String,
    comment: Option<String>,
    accessors: Vec<AccessorSpec>,
}

impl InterfaceDescription {
    #[must_use = "Creates a new interface description"]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), comment: None, accessors: Vec::new() }
    }

    #[must_use = "Sets the document header comment"]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use = "Adds an accessor to the interface"]
    pub fn accessor(mut self, accessor: AccessorSpec) -> Self {
        self.accessors.push(accessor);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn accessors(&self) -> &[AccessorSpec] {
        &self.accessors
    }
}

/// A validated field: where it lives, what it holds and how it is initialized.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    path: String,
    declared: TypeInfo,
    optional: bool,
    check: fn(Value) -> Result<()>,
    default: Option<DefaultValue>,
    comment: Option<String>,
    post_process: Option<PostProcess>,
    getter: String,
    setter: Option<String>,
}

impl FieldDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn declared_type(&self) -> &TypeInfo {
        &self.declared
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        self.optional
    }

    #[must_use]
    pub const fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// A fresh default value, if the field declares one.
    #[must_use]
    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(DefaultValue::produce)
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    #[must_use]
    pub fn getter(&self) -> &str {
        &self.getter
    }

    #[must_use]
    pub fn setter(&self) -> Option<&str> {
        self.setter.as_deref()
    }

    /// Converts `value` into the field's Rust type and discards the result.
    ///
    /// # Errors
    ///
    /// Whatever the conversion reports, typically `InvalidData` for out-of-range numbers.
    pub fn check(&self, value: Value) -> Result<()> {
        (self.check)(value)
    }

    /// Runs the post-process hook, if any.
    #[must_use]
    pub fn post_process(&self, value: Value) -> Value {
        match &self.post_process {
            Some(process) => process.apply(value),
            None => value,
        }
    }
}

/// Immutable, validated field set of one configuration interface.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    comment: Option<String>,
    fields: Vec<FieldDescriptor>,
    by_name: FxHashMap<String, usize>,
    by_accessor: FxHashMap<String, usize>,
}

struct Setter<'a> {
    field: &'a str,
    spec: &'a AccessorSpec,
}

impl Schema {
    /// Extracts the schema of `description`, deriving paths with `naming`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchema` for accessors that are neither pure getters nor pure setters,
    /// setters without a getter of the same type, duplicate accessors or paths, unusable defaults
    /// and object fields stored under reserved keys.
    pub fn build(description: &InterfaceDescription, naming: &dyn NamingStrategy) -> Result<Self> {
        let mut schema = Self {
            name: description.name.clone(),
            comment: description.comment.clone(),
            fields: Vec::new(),
            by_name: FxHashMap::default(),
            by_accessor: FxHashMap::default(),
        };
        let mut methods = FxHashSet::default();
        let mut setters = Vec::new();

        for spec in &description.accessors {
            if !methods.insert(spec.method.as_str()) {
                return Err(BindError::invalid_schema(format!("duplicate accessor `{}`", spec.method)));
            }
            match spec.method.strip_prefix(SETTER_PREFIX).filter(|field| !field.is_empty()) {
                Some(field) => setters.push(Setter { field, spec }),
                None => schema.add_getter(spec, naming)?,
            }
        }
        for setter in setters {
            schema.add_setter(&setter)?;
        }

        schema.check_paths()?;
        for field in &schema.fields {
            check_reserved_fields(&field.declared, naming, &field.path, &mut FxHashSet::default())?;
        }
        Ok(schema)
    }

    fn add_getter(&mut self, spec: &AccessorSpec, naming: &dyn NamingStrategy) -> Result<()> {
        let method = &spec.method;
        if !spec.params.is_empty() {
            return Err(BindError::invalid_schema(format!("getter `{method}` must not take arguments")));
        }
        let Shape::Value { type_info, optional, check } = &spec.returns else {
            return Err(BindError::invalid_schema(format!(
                "accessor `{method}` is neither a getter nor a setter"
            )));
        };
        let name = method.strip_prefix(GETTER_PREFIX).filter(|name| !name.is_empty()).unwrap_or(method);
        if self.by_name.contains_key(name) {
            return Err(BindError::invalid_schema(format!("field `{name}` has more than one getter")));
        }

        let path = match &spec.path {
            Some(path) if path::is_valid(path) => path.clone(),
            Some(path) => {
                return Err(BindError::invalid_schema(format!("`{method}`: `{path}` is not a valid path")));
            },
            None => naming.format(name),
        };
        if let Some(default) = &spec.default {
            check_default(method, &default.produce(), type_info)?;
        }

        let index = self.fields.len();
        self.fields.push(FieldDescriptor {
            name: name.to_owned(),
            path,
            declared: type_info.clone(),
            optional: *optional,
            check: *check,
            default: spec.default.clone(),
            comment: spec.comment.clone(),
            post_process: spec.post_process.clone(),
            getter: method.clone(),
            setter: None,
        });
        self.by_name.insert(name.to_owned(), index);
        self.by_accessor.insert(method.clone(), index);
        Ok(())
    }

    fn add_setter(&mut self, setter: &Setter<'_>) -> Result<()> {
        let Setter { field, spec } = setter;
        let method = &spec.method;
        let [param] = spec.params.as_slice() else {
            return Err(BindError::invalid_schema(format!("setter `{method}` must take exactly one value")));
        };
        if !spec.returns.is_unit() {
            return Err(BindError::invalid_schema(format!("setter `{method}` must not return a value")));
        }
        if spec.has_attributes() {
            return Err(BindError::invalid_schema(format!(
                "setter `{method}`: defaults, comments, paths and hooks belong on the getter"
            )));
        }
        let Some(&index) = self.by_name.get(*field) else {
            return Err(BindError::invalid_schema(format!("setter `{method}` has no getter `{field}`")));
        };

        let descriptor = &mut self.fields[index];
        let expected = Shape::Value {
            type_info: descriptor.declared.clone(),
            optional: descriptor.optional,
            check: descriptor.check,
        };
        if !param.matches(&expected) {
            return Err(BindError::invalid_schema(format!(
                "setter `{method}` takes {param}, getter `{}` returns {expected}",
                descriptor.getter
            )));
        }
        descriptor.setter = Some(method.clone());
        self.by_accessor.insert(method.clone(), index);
        Ok(())
    }

    /// Two fields may not share a path, nor may one live inside the other.
    fn check_paths(&self) -> Result<()> {
        for (index, field) in self.fields.iter().enumerate() {
            if let Some(other) = self.fields[index + 1..]
                .iter()
                .find(|other| path::is_within(&other.path, &field.path) || path::is_within(&field.path, &other.path))
            {
                return Err(BindError::invalid_schema(format!(
                    "fields `{}` and `{}` overlap at `{}`",
                    field.name, other.name, field.path
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Field by name.
    ///
    /// # Errors
    ///
    /// Returns `UnknownField` when the interface declares no such field.
    pub fn field(&self, name: &str) -> Result<&FieldDescriptor> {
        self.by_name
            .get(name)
            .map(|&index| &self.fields[index])
            .ok_or_else(|| BindError::unknown_field(format!("`{}` has no field `{name}`", self.name)))
    }

    /// Field read or written by the accessor method `accessor`.
    #[must_use]
    pub fn field_for_accessor(&self, accessor: &str) -> Option<&FieldDescriptor> {
        self.by_accessor.get(accessor).map(|&index| &self.fields[index])
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Appends `process` to the post-process hook of every string field.
    #[must_use]
    pub fn with_text_post_process(mut self, process: fn(&str) -> String) -> Self {
        let hook = PostProcess::typed::<String>(move |text| process(&text));
        for field in &mut self.fields {
            if field.declared.scalar_kind() == Some(ScalarKind::Str) {
                field.post_process = Some(match field.post_process.take() {
                    Some(existing) => existing.then(hook.clone()),
                    None => hook.clone(),
                });
            }
        }
        self
    }
}

fn check_default(method: &str, value: &Value, declared: &TypeInfo) -> Result<()> {
    if value.is_null() {
        return Err(BindError::invalid_schema(format!("`{method}`: the default value is empty")));
    }
    if value.is_empty_composite() {
        return Err(BindError::invalid_schema(format!(
            "`{method}`: an empty {} default has no element type to persist",
            value.type_name()
        )));
    }
    if !value.conforms_to(declared) {
        return Err(BindError::invalid_schema(format!(
            "`{method}`: the default {} does not fit {declared}",
            value.type_name()
        )));
    }
    Ok(())
}

/// Object fields must not be stored under `type` or `structure`, at any depth.
fn check_reserved_fields(
    info: &TypeInfo,
    naming: &dyn NamingStrategy,
    at: &str,
    seen: &mut FxHashSet<&'static str>,
) -> Result<()> {
    match info {
        TypeInfo::Array { element, .. } | TypeInfo::Collection { element, .. } => {
            check_reserved_fields(element, naming, at, seen)
        },
        TypeInfo::Map { value, .. } => check_reserved_fields(value, naming, at, seen),
        TypeInfo::Object(object) if seen.insert(object.name) => {
            for field in object.fields() {
                let key = naming.format(field.name);
                if is_reserved_key(&key) {
                    return Err(BindError::invalid_schema(format!(
                        "{at}: field `{}` of {} is stored under the reserved key `{key}`",
                        field.name, object.name
                    )));
                }
                check_reserved_fields(&field.type_info, naming, at, seen)?;
            }
            Ok(())
        },
        _ => Ok(()),
    }
}
