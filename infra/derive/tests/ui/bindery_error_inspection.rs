use bindery_derive::bindery_error;
use std::borrow::Cow;

#[bindery_error]
pub enum LookupError {
    #[error("Missing key{}: {message}", format_context(.context))]
    Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Lookup aborted")]
    Aborted {},
}

fn lookup() -> Result<(), LookupError> {
    Err(LookupError::Missing { message: "port".into(), context: None })
}

fn main() {
    let err = lookup().context("server section").unwrap_err();
    assert_eq!(err.variant_name(), "Missing");
    assert_eq!(err.context_message(), Some("server section"));
    assert_eq!(err.to_string(), "Missing key (server section): port");

    let aborted = LookupError::Aborted {};
    assert_eq!(aborted.variant_name(), "Aborted");
    assert_eq!(aborted.context_message(), None);
}
