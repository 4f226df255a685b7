#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros for the configuration binding workspace.
//! This crate provides the error-enum attribute used by every crate, plus the code generation
//! that replaces runtime reflection: configuration interfaces become accessor structs with an
//! explicit schema description, and plain structs/enums become bindable values.
//!
//! ## Usage
//! Application code reaches these macros through the `bindery` facade, which re-exports them
//! alongside the runtime items the generated code refers to (`::bindery::...`).
//!
//! See each macro’s docstring for examples; they are `ignore`d to avoid compiling in this crate,
//! but should be copied into consuming crates’ tests/examples as needed.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemTrait, parse_macro_input};

/// A high-level attribute macro for defining domain-specific error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]`.
/// * **Context Support**: Generates a companion `...Ext` trait that adds `.context()`
///   to any `Result` that can be converted into this error type.
/// * **Standard Conversions**: Implements `From<T>` for variants containing a `source` field
///   (or a field marked `#[source]`/`#[from]`), enabling the `?` operator for upstream errors.
/// * **Inspection**: `variant_name()` and `context_message()` for structured log fields.
/// * **Internal Fallback**: Provides `From<&str>` and `From<String>` implementations
///   if an `Internal` variant is present.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum**, one per module (it emits a module-level
///    `format_context` helper used by the `#[error]` strings).
/// 2. Variants that support context must include a `context: Option<Cow<'static, str>>` field.
/// 3. Tuple or unit variants are rejected to keep error wiring explicit and reliable.
///
/// # Example
///
/// ```rust,ignore
/// use bindery_derive::bindery_error;
/// use std::borrow::Cow;
///
/// #[bindery_error]
/// pub enum StorageError {
///     #[error("Hardware I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn read(path: &std::path::Path) -> Result<String, StorageError> {
///     std::fs::read_to_string(path).context("Reading configuration file")
/// }
/// ```
#[proc_macro_attribute]
pub fn bindery_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}

/// Turns a trait of accessor methods into a bound configuration interface.
///
/// The trait is kept as written (minus the `#[config(...)]` helper attributes) and a
/// `Bound<Trait>` struct is generated. It implements the trait on top of a
/// `bindery::ConfigHandle` and implements `bindery::ConfigInterface`, whose `describe()`
/// produces the `InterfaceDescription` the schema is extracted from.
///
/// # Accessors
///
/// * Getters take `&self` and return `bindery::Result<T>`, or `bindery::Result<Option<T>>`
///   for optional fields. A `get_` prefix is accepted and stripped.
/// * Setters are named `set_<field>`, take one value (`Option<T>` for optional fields) and
///   return `bindery::Result<()>`.
/// * Any other shape still compiles but is reported as `InvalidSchema` when binding.
///
/// # Method arguments
///
/// * `default = expr` - value written when the field is absent from the document.
/// * `comment = "..."` - comment rendered next to the field.
/// * `path = "a.b"` - explicit document path instead of the naming-strategy one.
/// * `post = path::to::fn` - `fn(T) -> T` applied to every value read.
///
/// # Example
///
/// ```rust,ignore
/// #[bindery::interface(name = "server", comment = "Server settings")]
/// pub trait ServerConfig {
///     #[config(default = 8080, comment = "Listening port")]
///     fn port(&self) -> bindery::Result<u16>;
///     fn set_port(&self, port: u16) -> bindery::Result<()>;
///
///     fn motd(&self) -> bindery::Result<Option<String>>;
/// }
/// ```
#[proc_macro_attribute]
pub fn interface(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemTrait);
    macros::interface::expand(args.into(), input).into()
}

/// Derives `bindery::Bindable` for a struct with named fields.
///
/// Fields are persisted under their names (formatted by the document's naming strategy),
/// `Option<T>` fields are optional and `#[config(skip)]` fields are rebuilt from `Default`.
/// The stored type name defaults to the struct name; override it with
/// `#[config(type_name = "...")]`.
#[proc_macro_derive(ConfigObject, attributes(config))]
pub fn config_object(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::object::expand_object(input).into()
}

/// Derives `bindery::Bindable` for an enum made of unit variants.
#[proc_macro_derive(ConfigEnum, attributes(config))]
pub fn config_enum(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::object::expand_enum(input).into()
}
