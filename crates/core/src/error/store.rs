use bindery_storage::StorageError;
use std::borrow::Cow;

/// Failures touching the persisted form of a document.
#[bindery_derive::bindery_error]
pub enum StoreError {
    #[error("Document I/O failure{}: {source}", format_context(.context))]
    Io { source: StorageError, context: Option<Cow<'static, str>> },

    #[error("Document is corrupt{}: {source}", format_context(.context))]
    Corrupt { source: serde_yaml::Error, context: Option<Cow<'static, str>> },

    #[error("Document could not be rendered{}: {message}", format_context(.context))]
    Render { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
