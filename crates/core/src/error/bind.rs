use crate::error::StoreError;
use std::borrow::Cow;

/// Every failure the binding engine can report.
///
/// Schema problems surface while binding, data problems while loading or reading a field.
/// Nothing is swallowed: each variant is returned to the caller that triggered it.
#[bindery_derive::bindery_error]
pub enum BindError {
    /// Malformed accessor shapes, getter/setter disagreements, reserved key collisions or
    /// unusable defaults.
    #[error("Invalid schema{}: {message}", format_context(.context))]
    InvalidSchema { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A required field is absent from the document and declares no default.
    #[error("Schema default missing{}: {message}", format_context(.context))]
    SchemaDefaultMissing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A required value resolved to absence while reading.
    #[error("Missing required field{}: {message}", format_context(.context))]
    MissingRequiredField { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The stored shape or type name disagrees with the declared type.
    #[error("Schema type mismatch{}: {message}", format_context(.context))]
    SchemaTypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No registered serializer and no structural fallback applies.
    #[error("Missing serializer{}: {message}", format_context(.context))]
    MissingSerializer { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A serializer was registered under a key it does not target.
    #[error("Invalid serializer registration{}: {message}", format_context(.context))]
    InvalidRegistration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Empty collections, maps and arrays carry no element type to persist.
    #[error("Cannot infer element type{}: {message}", format_context(.context))]
    CannotInferElementType { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Malformed stored data: missing or broken metadata, bad indices, unknown variants.
    #[error("Invalid data{}: {message}", format_context(.context))]
    InvalidData { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Unknown field{}: {message}", format_context(.context))]
    UnknownField { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A null write was attempted on a field that is not optional.
    #[error("Required field cannot be unset{}: {message}", format_context(.context))]
    RequiredFieldUnset { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Document store failure{}: {source}", format_context(.context))]
    Store { source: StoreError, context: Option<Cow<'static, str>> },
}

macro_rules! constructors {
    ($($fn_name:ident => $variant:ident),* $(,)?) => {
        impl BindError {
            $(
                pub(crate) fn $fn_name(message: impl Into<Cow<'static, str>>) -> Self {
                    Self::$variant { message: message.into(), context: None }
                }
            )*
        }
    };
}

constructors! {
    invalid_schema => InvalidSchema,
    default_missing => SchemaDefaultMissing,
    missing_required => MissingRequiredField,
    type_mismatch => SchemaTypeMismatch,
    missing_serializer => MissingSerializer,
    invalid_registration => InvalidRegistration,
    cannot_infer => CannotInferElementType,
    invalid_data => InvalidData,
    unknown_field => UnknownField,
    required_unset => RequiredFieldUnset,
}
